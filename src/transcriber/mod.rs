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

//! Transcriber (spec §4.5, C5). Picks a Whisper-family provider by a
//! priority probe, chunks audio over the provider's size limit, stitches
//! segment timing back together, and runs the deterministic mishearing
//! corrections table. Grounded on the teacher's `system.rs` backend-probe
//! shape (`check_whisper_available`'s ordered fallback) and `ai.rs`'s
//! multipart upload pattern (`transcribe_audio`), generalized from a single
//! OpenAI endpoint to the multi-provider fallback spec §4.5 calls for.

pub mod corrections;
pub mod polish;

use anyhow::Context;
use reqwest::Client;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::config::ProviderConfig;
use crate::db::store::NewSegment;
use crate::error::{CanaryError, StageResult};
use crate::types::TranscriptionProvider;

const MAX_FILE_SIZE_BYTES: u64 = 24 * 1024 * 1024;
const CHUNK_DURATION_SECONDS: f64 = 600.0;
const CHUNK_TIMEOUT: Duration = Duration::from_secs(120);

const OPENAI_WHISPER_COST_PER_MINUTE: f64 = 0.006;
const AZURE_WHISPER_COST_PER_MINUTE: f64 = 0.006;
const GROQ_WHISPER_COST_PER_MINUTE: f64 = 0.04 / 60.0;

/// Vocabulary hints fed to Whisper's `initial_prompt`, keyed by state code
/// (spec §4.5 step 2). Mirrors `transcribe.py`'s `state_context` dict -
/// commission name plus the utilities/dockets most likely to be misheard.
fn state_vocabulary(state_code: &str) -> &'static str {
    match state_code.to_uppercase().as_str() {
        "GA" => "Georgia Public Service Commission, Georgia Power, Atlanta Gas Light, Georgia EMC, docket, PSC",
        "TX" => "Public Utility Commission of Texas, PUCT, ERCOT, Oncor, CenterPoint Energy, AEP Texas, docket",
        "CA" => "California Public Utilities Commission, CPUC, PG&E, Southern California Edison, SDG&E, application, decision",
        "FL" => "Florida Public Service Commission, FPSC, Duke Energy Florida, Florida Power & Light, Tampa Electric, docket",
        "OH" => "Public Utilities Commission of Ohio, PUCO, AEP Ohio, Duke Energy Ohio, FirstEnergy, case number",
        "AZ" => "Arizona Corporation Commission, ACC, Arizona Public Service, Tucson Electric Power, docket",
        _ => "public utility commission, docket, rate case, commissioner",
    }
}

fn build_initial_prompt(state_code: &str, hearing_title: &str) -> String {
    let vocab = state_vocabulary(state_code);
    let title_excerpt: String = hearing_title.chars().take(200).collect();
    format!("{vocab}. {title_excerpt}")
}

pub struct TranscriptOutput {
    pub full_text: String,
    pub segments: Vec<NewSegment>,
    pub provider: TranscriptionProvider,
    pub cost_usd: f64,
}

pub struct Transcriber {
    client: Client,
    providers: ProviderConfig,
}

impl Transcriber {
    pub fn new(providers: ProviderConfig) -> Self {
        Self { client: Client::new(), providers }
    }

    /// Priority probe: Groq > Azure > OpenAI > local whisper binary (spec
    /// §4.5 step 1), same ordering idiom as `system.rs::check_whisper_available`.
    pub async fn select_provider(&self) -> anyhow::Result<TranscriptionProvider> {
        if self.providers.groq_api_key.is_some() {
            return Ok(TranscriptionProvider::Groq);
        }
        if self.providers.azure_openai_endpoint.is_some()
            && self.providers.azure_openai_api_key.is_some()
            && self.providers.azure_openai_whisper_deployment.is_some()
        {
            return Ok(TranscriptionProvider::Azure);
        }
        if self.providers.openai_api_key.is_some() {
            return Ok(TranscriptionProvider::OpenAi);
        }
        if which_local_whisper().await {
            return Ok(TranscriptionProvider::Local);
        }
        anyhow::bail!("no transcription provider is configured (Groq/Azure/OpenAI keys absent and no local whisper binary found)")
    }

    /// Returns `Ok(Ok(_))` on success, `Ok(Err(result))` for a failure the
    /// caller should persist as-is via `StageResult`, matching the
    /// `Result<Vec<NewSegment>, StageResult>` convention the chunking/whole
    /// helpers below already use.
    pub async fn transcribe(
        &self,
        audio_path: &Path,
        state_code: &str,
        hearing_title: &str,
    ) -> anyhow::Result<Result<TranscriptOutput, StageResult>> {
        let provider = match self.select_provider().await {
            Ok(p) => p,
            Err(e) => return Ok(Err(StageResult::failed(e.to_string(), false))),
        };

        let initial_prompt = build_initial_prompt(state_code, hearing_title);
        let size = std::fs::metadata(audio_path).context("stat audio file")?.len();

        let raw_segments = if size > MAX_FILE_SIZE_BYTES {
            self.transcribe_chunked(audio_path, provider, &initial_prompt).await?
        } else {
            self.transcribe_whole(audio_path, provider, &initial_prompt).await?
        };

        let raw_segments = match raw_segments {
            Ok(segments) => segments,
            Err(failed) => return Ok(Err(failed)),
        };

        let duration_minutes = raw_segments
            .iter()
            .map(|s| s.end_time)
            .fold(0.0_f64, f64::max)
            / 60.0;
        let cost_usd = duration_minutes * provider_rate(provider);

        let mut corrected: Vec<NewSegment> = raw_segments
            .into_iter()
            .map(|mut s| {
                s.text = corrections::apply(&s.text);
                s
            })
            .collect();

        let polish_cost = match polish::polish(&self.client, &self.providers, state_code, &mut corrected).await {
            Ok(cost) => cost,
            Err(e) => {
                tracing::warn!("LLM polish pass errored, keeping deterministic corrections only: {e}");
                0.0
            }
        };

        let full_text = corrected.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ");

        Ok(Ok(TranscriptOutput { full_text, segments: corrected, provider, cost_usd: cost_usd + polish_cost }))
    }

    async fn transcribe_whole(
        &self,
        audio_path: &Path,
        provider: TranscriptionProvider,
        initial_prompt: &str,
    ) -> anyhow::Result<Result<Vec<NewSegment>, StageResult>> {
        match self.call_provider(audio_path, provider, initial_prompt, 0.0).await {
            Ok(segments) => Ok(Ok(segments)),
            Err(e) => Ok(Err(provider_error_to_result(e))),
        }
    }

    /// Splits audio into 10-minute chunks via ffmpeg, transcribes each, and
    /// renumbers/time-shifts the resulting segments back into one timeline
    /// (spec §4.5 step 3: "segments from chunk N+1 carry a time offset of
    /// N * chunk_duration"). A single chunk failing does not abort the rest;
    /// its gap is simply absent from the stitched transcript.
    async fn transcribe_chunked(
        &self,
        audio_path: &Path,
        provider: TranscriptionProvider,
        initial_prompt: &str,
    ) -> anyhow::Result<Result<Vec<NewSegment>, StageResult>> {
        let tmp_dir = std::env::temp_dir().join(format!(
            "canaryscope-chunks-{}",
            audio_path.file_stem().and_then(|s| s.to_str()).unwrap_or("audio")
        ));
        std::fs::create_dir_all(&tmp_dir).context("creating chunk scratch dir")?;

        let chunk_paths = split_into_chunks(audio_path, &tmp_dir).await?;
        if chunk_paths.is_empty() {
            let _ = std::fs::remove_dir_all(&tmp_dir);
            return Ok(Err(StageResult::failed("ffmpeg produced zero chunks", true)));
        }

        let mut stitched = Vec::new();
        let mut next_index = 0_i64;
        for (chunk_index, chunk_path) in chunk_paths.iter().enumerate() {
            let offset = chunk_index as f64 * CHUNK_DURATION_SECONDS;
            match self.call_provider(chunk_path, provider, initial_prompt, offset).await {
                Ok(segments) => {
                    for mut segment in segments {
                        segment.segment_index = next_index;
                        next_index += 1;
                        stitched.push(segment);
                    }
                }
                Err(e) => {
                    tracing::warn!("chunk {chunk_index} failed, continuing: {e}");
                }
            }
        }

        let _ = std::fs::remove_dir_all(&tmp_dir);

        if stitched.is_empty() {
            return Ok(Err(StageResult::failed("every audio chunk failed to transcribe", true)));
        }
        Ok(Ok(stitched))
    }

    async fn call_provider(
        &self,
        path: &Path,
        provider: TranscriptionProvider,
        initial_prompt: &str,
        time_offset: f64,
    ) -> anyhow::Result<Vec<NewSegment>> {
        match provider {
            TranscriptionProvider::Groq => self.call_groq(path, initial_prompt, time_offset).await,
            TranscriptionProvider::Azure => self.call_azure(path, initial_prompt, time_offset).await,
            TranscriptionProvider::OpenAi => self.call_openai(path, initial_prompt, time_offset).await,
            TranscriptionProvider::Local => self.call_local(path, time_offset).await,
        }
    }

    async fn call_openai(&self, path: &Path, initial_prompt: &str, offset: f64) -> anyhow::Result<Vec<NewSegment>> {
        let api_key = self
            .providers
            .openai_api_key
            .as_deref()
            .context("OPENAI_API_KEY not configured")?;
        self.call_whisper_multipart(
            "https://api.openai.com/v1/audio/transcriptions",
            &[("Authorization", format!("Bearer {api_key}"))],
            &self.providers.whisper_model,
            path,
            initial_prompt,
            offset,
        )
        .await
    }

    async fn call_azure(&self, path: &Path, initial_prompt: &str, offset: f64) -> anyhow::Result<Vec<NewSegment>> {
        let endpoint = self
            .providers
            .azure_openai_endpoint
            .as_deref()
            .context("AZURE_OPENAI_ENDPOINT not configured")?;
        let deployment = self
            .providers
            .azure_openai_whisper_deployment
            .as_deref()
            .context("AZURE_OPENAI_WHISPER_DEPLOYMENT not configured")?;
        let api_key = self
            .providers
            .azure_openai_api_key
            .as_deref()
            .context("AZURE_OPENAI_API_KEY not configured")?;
        let url = format!(
            "{}/openai/deployments/{}/audio/transcriptions?api-version={}",
            endpoint.trim_end_matches('/'),
            deployment,
            self.providers.azure_openai_api_version
        );
        self.call_whisper_multipart(&url, &[("api-key", api_key.to_string())], "whisper-1", path, initial_prompt, offset)
            .await
    }

    async fn call_groq(&self, path: &Path, initial_prompt: &str, offset: f64) -> anyhow::Result<Vec<NewSegment>> {
        let api_key = self
            .providers
            .groq_api_key
            .as_deref()
            .context("GROQ_API_KEY not configured")?;
        self.call_whisper_multipart(
            "https://api.groq.com/openai/v1/audio/transcriptions",
            &[("Authorization", format!("Bearer {api_key}"))],
            &self.providers.groq_whisper_model,
            path,
            initial_prompt,
            offset,
        )
        .await
    }

    async fn call_whisper_multipart(
        &self,
        url: &str,
        headers: &[(&str, String)],
        model: &str,
        path: &Path,
        initial_prompt: &str,
        offset: f64,
    ) -> anyhow::Result<Vec<NewSegment>> {
        let bytes = tokio::fs::read(path).await.context("reading audio chunk")?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str("audio/mpeg")?,
            )
            .text("model", model.to_string())
            .text("language", "en")
            .text("response_format", "verbose_json")
            .text("prompt", initial_prompt.to_string());

        let mut request = self.client.post(url).multipart(form);
        for (key, value) in headers {
            request = request.header(*key, value);
        }

        let response = request.send().await.context("sending transcription request")?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("transcription provider returned {status}: {}", crate::error::truncate(&text, 500));
        }

        let body: Value = response.json().await.context("parsing transcription response")?;
        Ok(parse_verbose_json(&body, offset))
    }

    async fn call_local(&self, path: &Path, offset: f64) -> anyhow::Result<Vec<NewSegment>> {
        let model = self.providers.local_whisper_model.as_deref().unwrap_or("base");
        let output = Command::new("whisper")
            .args([
                &path.to_string_lossy(),
                "--model",
                model,
                "--output_format",
                "json",
                "--output_dir",
                &std::env::temp_dir().to_string_lossy(),
            ])
            .output()
            .await
            .context("spawning local whisper binary")?;

        if !output.status.success() {
            anyhow::bail!("local whisper exited with {}", output.status);
        }

        let json_path = std::env::temp_dir().join(
            path.file_stem().and_then(|s| s.to_str()).unwrap_or("audio").to_string() + ".json",
        );
        let body_text = tokio::fs::read_to_string(&json_path).await.context("reading local whisper output")?;
        let body: Value = serde_json::from_str(&body_text)?;
        let _ = tokio::fs::remove_file(&json_path).await;
        Ok(parse_verbose_json(&body, offset))
    }
}

fn parse_verbose_json(body: &Value, offset: f64) -> Vec<NewSegment> {
    let segments = body.get("segments").and_then(|s| s.as_array());
    match segments {
        Some(list) if !list.is_empty() => list
            .iter()
            .enumerate()
            .map(|(i, seg)| NewSegment {
                segment_index: i as i64,
                start_time: seg.get("start").and_then(|v| v.as_f64()).unwrap_or(0.0) + offset,
                end_time: seg.get("end").and_then(|v| v.as_f64()).unwrap_or(0.0) + offset,
                text: seg.get("text").and_then(|v| v.as_str()).unwrap_or("").trim().to_string(),
                speaker: None,
                speaker_role: None,
            })
            .collect(),
        _ => {
            let text = body.get("text").and_then(|v| v.as_str()).unwrap_or("").trim().to_string();
            if text.is_empty() {
                Vec::new()
            } else {
                vec![NewSegment {
                    segment_index: 0,
                    start_time: offset,
                    end_time: offset,
                    text,
                    speaker: None,
                    speaker_role: None,
                }]
            }
        }
    }
}

fn provider_rate(provider: TranscriptionProvider) -> f64 {
    match provider {
        TranscriptionProvider::Groq => GROQ_WHISPER_COST_PER_MINUTE,
        TranscriptionProvider::Azure => AZURE_WHISPER_COST_PER_MINUTE,
        TranscriptionProvider::OpenAi => OPENAI_WHISPER_COST_PER_MINUTE,
        TranscriptionProvider::Local => 0.0,
    }
}

fn provider_error_to_result(e: anyhow::Error) -> StageResult {
    let message = e.to_string();
    let retryable = message.contains("429")
        || message.contains("500")
        || message.contains("502")
        || message.contains("503")
        || message.contains("timed out");
    StageResult::failed(message, retryable)
}

async fn which_local_whisper() -> bool {
    Command::new("whisper")
        .arg("--help")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Splits `audio_path` into `CHUNK_DURATION_SECONDS`-long mp3 chunks using
/// ffmpeg's segment muxer, mirroring `transcribe.py`'s per-chunk subprocess
/// invocation with a 120s timeout per chunk.
async fn split_into_chunks(audio_path: &Path, tmp_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let pattern = tmp_dir.join("chunk_%03d.mp3");
    let result = tokio::time::timeout(
        CHUNK_TIMEOUT * 10,
        Command::new("ffmpeg")
            .args([
                "-i",
                &audio_path.to_string_lossy(),
                "-f",
                "segment",
                "-segment_time",
                &CHUNK_DURATION_SECONDS.to_string(),
                "-c",
                "copy",
                "-y",
                &pattern.to_string_lossy(),
            ])
            .output(),
    )
    .await;

    match result {
        Ok(Ok(output)) if output.status.success() => {}
        Ok(Ok(output)) => {
            anyhow::bail!("ffmpeg chunking failed: {}", String::from_utf8_lossy(&output.stderr));
        }
        Ok(Err(e)) => anyhow::bail!("failed to spawn ffmpeg for chunking: {e}"),
        Err(_) => anyhow::bail!("ffmpeg chunking timed out"),
    }

    let mut chunks = Vec::new();
    let mut entries = tokio::fs::read_dir(tmp_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("mp3") {
            chunks.push(path);
        }
    }
    chunks.sort();
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_vocabulary_known_state() {
        assert!(state_vocabulary("fl").contains("Florida"));
    }

    #[test]
    fn state_vocabulary_unknown_state_falls_back() {
        assert!(state_vocabulary("ZZ").contains("public utility commission"));
    }

    #[test]
    fn initial_prompt_truncates_long_titles() {
        let long_title = "x".repeat(500);
        let prompt = build_initial_prompt("TX", &long_title);
        assert!(prompt.len() < 500 + 100);
    }

    #[test]
    fn parses_verbose_json_segments_with_offset() {
        let body = serde_json::json!({
            "segments": [
                {"start": 1.0, "end": 2.0, "text": " hello "},
                {"start": 2.0, "end": 3.5, "text": "world"}
            ]
        });
        let segments = parse_verbose_json(&body, 600.0);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start_time, 601.0);
        assert_eq!(segments[1].end_time, 603.5);
        assert_eq!(segments[0].text, "hello");
    }

    #[test]
    fn parses_plain_text_fallback() {
        let body = serde_json::json!({"text": "just one blob"});
        let segments = parse_verbose_json(&body, 0.0);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "just one blob");
    }
}
