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

//! Analyzer (spec §4.6, C6). A single structured JSON chat-completion call
//! per hearing, with tiktoken-based truncation for oversized transcripts.
//! Grounded on the teacher's `ai.rs::simple_completion` (JSON body, bearer
//! auth, non-streaming `chat/completions` call) and
//! `original_source/app/pipeline/stages/analyze.py`'s prompt/cost constants.

use anyhow::Context;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tiktoken_rs::cl100k_base;

use crate::config::ProviderConfig;
use crate::db::store::NewAnalysis;
use crate::error::StageResult;

const MAX_TOKENS_INPUT: usize = 100_000;
const TRUNCATE_MARKER: &str = "\n[... TRANSCRIPT TRUNCATED FOR LENGTH ...]\n";
const GPT4O_INPUT_COST_PER_1M: f64 = 2.50;
const GPT4O_OUTPUT_COST_PER_1M: f64 = 10.00;
const MAX_COMPLETION_TOKENS: u32 = 4000;
const TEMPERATURE: f64 = 0.2;
const MAX_RATE_LIMIT_RETRIES: u32 = 5;
const RATE_LIMIT_BASE_BACKOFF: Duration = Duration::from_secs(60);

const SYSTEM_PROMPT: &str = "You are an analyst who reads public utility commission hearing transcripts \
and produces a structured summary for a regulatory-intelligence tool. Respond with a single JSON object \
only, matching the requested schema exactly - no markdown, no prose outside the JSON.";

fn user_prompt(title: &str, state_code: &str, transcript: &str) -> String {
    format!(
        "Hearing title: {title}\nState: {state_code}\n\n\
Analyze this public utility commission hearing transcript and return a JSON object with these fields:\n\
summary (2-3 paragraph overview), one_sentence_summary, hearing_type, utility_name, \
participants (array of {{name, role}}), issues (array of strings), commitments (array of strings made \
by utilities or the commission), vulnerabilities (array of consumer-impact concerns raised), \
commissioner_concerns (array of strings), commissioner_mood (one of: supportive, skeptical, hostile, \
neutral, mixed), public_comments (summary of public comment if any), public_sentiment (one of: \
supportive, opposed, mixed, none), likely_outcome (string), outcome_confidence (0.0-1.0), \
risk_factors (array of strings), action_items (array of strings), quotes (array of {{speaker, text}}), \
topics (array of strings), utilities (array of utility names mentioned), dockets (array of docket \
numbers mentioned verbatim).\n\n\
Transcript:\n{transcript}"
    )
}

/// Truncates `text` to roughly `MAX_TOKENS_INPUT` tokens by keeping the
/// first and last ~35% and splicing in a marker (spec §4.6 step 2), so the
/// opening framing and closing disposition of a hearing both survive even
/// when the middle doesn't.
pub fn truncate_for_tokens(text: &str) -> String {
    let bpe = cl100k_base().expect("cl100k_base tokenizer table is embedded at build time");
    let tokens = bpe.encode_with_special_tokens(text);
    if tokens.len() <= MAX_TOKENS_INPUT {
        return text.to_string();
    }

    let keep_each_side = (MAX_TOKENS_INPUT as f64 * 0.35) as usize;
    let head: Vec<u32> = tokens[..keep_each_side].to_vec();
    let tail: Vec<u32> = tokens[tokens.len() - keep_each_side..].to_vec();

    let head_text = bpe.decode(head).unwrap_or_default();
    let tail_text = bpe.decode(tail).unwrap_or_default();
    format!("{head_text}{TRUNCATE_MARKER}{tail_text}")
}

pub struct Analyzer {
    client: Client,
    providers: ProviderConfig,
}

impl Analyzer {
    pub fn new(providers: ProviderConfig) -> Self {
        Self { client: Client::new(), providers }
    }

    /// Runs the single analysis call and maps the JSON response onto
    /// `NewAnalysis`. Callers are responsible for the existing-analysis
    /// short-circuit (spec §4.6 step 1: re-running a complete hearing costs
    /// nothing) since that check needs the `Store`, which this module does
    /// not depend on.
    pub async fn analyze(
        &self,
        title: &str,
        state_code: &str,
        transcript: &str,
    ) -> anyhow::Result<Result<NewAnalysis, StageResult>> {
        let truncated = truncate_for_tokens(transcript);
        let prompt = user_prompt(title, state_code, &truncated);

        let response_body = match self.call_with_retries(&prompt).await {
            Ok(body) => body,
            Err(e) => return Ok(Err(StageResult::failed(e.to_string(), true))),
        };

        let content = response_body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or("");

        let parsed: Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(e) => {
                return Ok(Err(StageResult::failed(
                    format!("analysis model returned invalid JSON: {e}"),
                    false,
                )))
            }
        };

        let prompt_tokens = response_body
            .get("usage")
            .and_then(|u| u.get("prompt_tokens"))
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let completion_tokens = response_body
            .get("usage")
            .and_then(|u| u.get("completion_tokens"))
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let cost_usd = prompt_tokens / 1_000_000.0 * GPT4O_INPUT_COST_PER_1M
            + completion_tokens / 1_000_000.0 * GPT4O_OUTPUT_COST_PER_1M;

        Ok(Ok(map_to_new_analysis(&parsed, &self.providers.analysis_model, cost_usd)))
    }

    async fn call_with_retries(&self, prompt: &str) -> anyhow::Result<Value> {
        let api_key = self
            .providers
            .openai_api_key
            .as_deref()
            .context("OPENAI_API_KEY not configured for analysis")?;

        let body = serde_json::json!({
            "model": self.providers.analysis_model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt}
            ],
            "max_tokens": MAX_COMPLETION_TOKENS,
            "temperature": TEMPERATURE,
            "response_format": {"type": "json_object"},
            "stream": false,
        });

        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post("https://api.openai.com/v1/chat/completions")
                .header("Authorization", format!("Bearer {api_key}"))
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
                .context("sending analysis request")?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS && attempt < MAX_RATE_LIMIT_RETRIES {
                attempt += 1;
                let backoff = RATE_LIMIT_BASE_BACKOFF * attempt;
                tracing::warn!("analysis rate limited, retrying in {:?} (attempt {attempt})", backoff);
                tokio::time::sleep(backoff).await;
                continue;
            }

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                anyhow::bail!("analysis API error {status}: {}", crate::error::truncate(&text, 500));
            }

            return response.json().await.context("parsing analysis response");
        }
    }
}

fn map_to_new_analysis(parsed: &Value, model: &str, cost_usd: f64) -> NewAnalysis {
    let as_string = |key: &str| parsed.get(key).and_then(|v| v.as_str()).map(String::from);
    let as_json = |key: &str| parsed.get(key).map(|v| v.to_string());

    NewAnalysis {
        summary: as_string("summary"),
        one_sentence_summary: as_string("one_sentence_summary"),
        hearing_type: as_string("hearing_type"),
        utility_name: as_string("utility_name"),
        participants_json: as_json("participants"),
        issues_json: as_json("issues"),
        commitments_json: as_json("commitments"),
        vulnerabilities_json: as_json("vulnerabilities"),
        commissioner_concerns_json: as_json("commissioner_concerns"),
        commissioner_mood: as_string("commissioner_mood"),
        public_comments: as_string("public_comments"),
        public_sentiment: as_string("public_sentiment"),
        likely_outcome: as_string("likely_outcome"),
        outcome_confidence: parsed.get("outcome_confidence").and_then(|v| v.as_f64()),
        risk_factors_json: as_json("risk_factors"),
        action_items_json: as_json("action_items"),
        quotes_json: as_json("quotes"),
        topics_json: as_json("topics"),
        utilities_json: as_json("utilities"),
        dockets_json: as_json("dockets"),
        model: model.to_string(),
        cost_usd,
        confidence_score: parsed.get("outcome_confidence").and_then(|v| v.as_f64()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_transcript_is_not_truncated() {
        let text = "the commission convened at 9am".to_string();
        assert_eq!(truncate_for_tokens(&text), text);
    }

    #[test]
    fn long_transcript_is_truncated_with_marker() {
        let text = "word ".repeat(200_000);
        let truncated = truncate_for_tokens(&text);
        assert!(truncated.contains(TRUNCATE_MARKER));
        assert!(truncated.len() < text.len());
    }

    #[test]
    fn maps_minimal_json_without_panicking() {
        let parsed = serde_json::json!({"summary": "ok", "outcome_confidence": 0.8});
        let analysis = map_to_new_analysis(&parsed, "gpt-4o-mini", 0.01);
        assert_eq!(analysis.summary.as_deref(), Some("ok"));
        assert_eq!(analysis.outcome_confidence, Some(0.8));
    }
}
