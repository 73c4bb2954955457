/*
 * CanaryScope
 * Copyright (c) 2024 CanaryScope Contributors
 *
 * This work is licensed under the Creative Commons Attribution-NonCommercial 4.0 International License.
 * To view a copy of this license, visit http://creativecommons.org/licenses/by-nc/4.0/
 *
 * You are free to share and adapt this work for non-commercial purposes with attribution.
 * Commercial use is prohibited without explicit written permission.
 *
 * For commercial licensing inquiries, please contact the project maintainers.
 */

//! Video-channel adapter (spec §4.1): commissions that publish hearing
//! recordings to a YouTube-style channel. Lists the channel via `yt-dlp
//! --flat-playlist --dump-json`, the same subprocess-JSON pattern the
//! media fetcher uses for the actual download, rather than talking to a
//! platform API directly.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::{config_str, HearingCandidate, SourceAdapter};
use crate::db::models::Source;

pub struct VideoChannelAdapter;

#[async_trait]
impl SourceAdapter for VideoChannelAdapter {
    async fn list(&self, source: &Source) -> anyhow::Result<Vec<HearingCandidate>> {
        let max_items = config_str(source, "max_items")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(25);

        let mut cmd = Command::new("yt-dlp");
        cmd.args([
            "--flat-playlist",
            "--dump-json",
            "--playlist-end",
            &max_items.to_string(),
            &source.url,
        ])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

        let mut child = cmd.spawn()?;
        let stdout = child.stdout.take().expect("piped stdout");
        let mut lines = BufReader::new(stdout).lines();

        let mut candidates = Vec::new();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let entry: serde_json::Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(_) => continue,
            };
            candidates.push(entry_to_candidate(&entry));
        }

        let status = child.wait().await?;
        if !status.success() && candidates.is_empty() {
            anyhow::bail!("yt-dlp channel listing failed for {}", source.url);
        }

        Ok(candidates)
    }
}

fn entry_to_candidate(entry: &serde_json::Value) -> HearingCandidate {
    let video_id = entry.get("id").and_then(|v| v.as_str()).map(String::from);
    let title = entry.get("title").and_then(|v| v.as_str()).unwrap_or("Untitled hearing").to_string();
    let webpage_url = entry
        .get("webpage_url")
        .or_else(|| entry.get("url"))
        .and_then(|v| v.as_str())
        .map(String::from);
    let hearing_date = entry
        .get("upload_date")
        .and_then(|v| v.as_str())
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y%m%d").ok());

    HearingCandidate {
        external_id: video_id,
        title,
        description: entry.get("description").and_then(|v| v.as_str()).map(String::from),
        hearing_date,
        hearing_type: None,
        utility_name: None,
        docket_numbers: Vec::new(),
        source_url: webpage_url.clone(),
        video_url: webpage_url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_video_id_and_upload_date() {
        let entry = serde_json::json!({
            "id": "abc123",
            "title": "March Commission Hearing",
            "webpage_url": "https://youtube.com/watch?v=abc123",
            "upload_date": "20240315",
        });
        let candidate = entry_to_candidate(&entry);
        assert_eq!(candidate.external_id.as_deref(), Some("abc123"));
        assert_eq!(candidate.hearing_date, NaiveDate::from_ymd_opt(2024, 3, 15));
    }
}
