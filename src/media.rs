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

//! Media fetcher (spec §4.4, C4). Downloads a hearing's source video and
//! extracts its audio track to a content-addressed cache on disk, the same
//! way `original_source/app/pipeline/stages/download.py` shells out to
//! `yt-dlp` rather than reimplementing extraction protocols in-process -
//! grounded here on the teacher's `audio.rs` subprocess idiom (`Stdio::piped`,
//! `tokio::time::timeout`, graceful-then-kill cleanup).

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::db::models::Hearing;
use crate::error::{CanaryError, StageResult};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);
const KNOWN_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "mp4"];

/// Deterministic cache filename stem for a hearing, independent of the audio
/// extension `yt-dlp` ends up writing. Mirrors download.py's sanitization:
/// alphanumerics, `-`, and `_` only.
pub fn cache_stem(hearing: &Hearing) -> String {
    if let Some(external_id) = &hearing.external_id {
        let sanitized: String = external_id
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if !sanitized.is_empty() {
            return sanitized;
        }
    }
    if let Some(url) = &hearing.source_url {
        let digest = md5::compute(url.as_bytes());
        return format!("rss_{:x}", digest).chars().take(20).collect();
    }
    format!("hearing_{}", hearing.id)
}

/// Looks for an already-downloaded file for this hearing across every
/// extension `yt-dlp` might have produced.
pub fn find_cached(audio_dir: &Path, hearing: &Hearing) -> Option<PathBuf> {
    let stem = cache_stem(hearing);
    for ext in KNOWN_EXTENSIONS {
        let candidate = audio_dir.join(format!("{stem}.{ext}"));
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

/// Runs `yt-dlp` against `hearing`'s source URL (falling back to
/// `video_url` if already populated) and returns the resulting audio path
/// and duration. Cleans up any partial file on failure (spec §4.4 edge case:
/// "a stage that fails after writing a partial file must not leave it
/// behind for the next attempt to mistake for a cache hit").
pub async fn fetch(audio_dir: &Path, hearing: &Hearing) -> anyhow::Result<StageResult> {
    if let Some(cached) = find_cached(audio_dir, hearing) {
        let duration = probe_duration(&cached).await.ok();
        return Ok(ok_result(&cached, duration));
    }

    let source_url = hearing
        .video_url
        .as_deref()
        .or(hearing.source_url.as_deref())
        .ok_or_else(|| CanaryError::PermanentInput("hearing has no source or video URL".into()))?;

    std::fs::create_dir_all(audio_dir).context("creating audio cache dir")?;
    let stem = cache_stem(hearing);
    let output_template = audio_dir.join(&stem);

    let mut cmd = Command::new("yt-dlp");
    cmd.args([
        "-x",
        "--audio-format",
        "mp3",
        "--audio-quality",
        "0",
        "-o",
        &output_template.to_string_lossy(),
        "--no-playlist",
        "--socket-timeout",
        "30",
        "--retries",
        "3",
        source_url,
    ])
    .stdin(Stdio::null())
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

    let output = match tokio::time::timeout(DOWNLOAD_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            cleanup_partial(audio_dir, &stem);
            return Ok(StageResult::failed(
                format!("failed to spawn yt-dlp: {e}"),
                true,
            ));
        }
        Err(_) => {
            cleanup_partial(audio_dir, &stem);
            return Ok(StageResult::failed("yt-dlp timed out after 600s", true));
        }
    };

    if !output.status.success() {
        cleanup_partial(audio_dir, &stem);
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Ok(StageResult::failed(
            format!("yt-dlp failed: {}", crate::error::truncate(&stderr, 500)),
            true,
        ));
    }

    let downloaded = find_cached(audio_dir, hearing).ok_or_else(|| {
        CanaryError::PartialArtifact("yt-dlp exited successfully but no output file was found".into())
    })?;

    let duration = probe_duration(&downloaded).await.ok();
    Ok(ok_result(&downloaded, duration))
}

fn ok_result(path: &Path, duration: Option<f64>) -> StageResult {
    let mut output = std::collections::HashMap::new();
    output.insert(
        "video_path".to_string(),
        serde_json::Value::String(path.to_string_lossy().to_string()),
    );
    if let Some(d) = duration {
        output.insert(
            "duration_seconds".to_string(),
            serde_json::json!(d.round() as i64),
        );
    }
    StageResult::ok(output, 0.0)
}

fn cleanup_partial(audio_dir: &Path, stem: &str) {
    for ext in KNOWN_EXTENSIONS.iter().chain(["part", "ytdl"].iter()) {
        let path = audio_dir.join(format!("{stem}.{ext}"));
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }
}

async fn probe_duration(path: &Path) -> anyhow::Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-show_entries",
            "format=duration",
            "-of",
            "csv=p=0",
            &path.to_string_lossy(),
        ])
        .output()
        .await
        .context("failed to spawn ffprobe")?;

    if !output.status.success() {
        anyhow::bail!("ffprobe failed for {:?}", path);
    }

    let text = String::from_utf8_lossy(&output.stdout);
    text.trim().parse::<f64>().context("failed to parse ffprobe duration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn hearing(external_id: Option<&str>, source_url: Option<&str>) -> Hearing {
        Hearing {
            id: 1,
            source_id: None,
            state_id: 1,
            external_id: external_id.map(String::from),
            title: "Test hearing".to_string(),
            description: None,
            hearing_date: None,
            hearing_type: None,
            utility_name: None,
            docket_numbers_json: "[]".to_string(),
            source_url: source_url.map(String::from),
            video_url: None,
            duration_seconds: None,
            status: "discovered".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn cache_stem_prefers_sanitized_external_id() {
        let h = hearing(Some("ABC 123!@#"), None);
        assert_eq!(cache_stem(&h), "ABC123");
    }

    #[test]
    fn cache_stem_falls_back_to_url_hash() {
        let h = hearing(None, Some("https://example.com/feed.rss"));
        assert!(cache_stem(&h).starts_with("rss_"));
    }

    #[test]
    fn cache_stem_falls_back_to_hearing_id() {
        let h = hearing(None, None);
        assert_eq!(cache_stem(&h), "hearing_1");
    }
}
