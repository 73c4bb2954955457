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

//! Opt-in LLM polish pass (spec §10 `LLM_POLISH_MODEL`). Rather than sending
//! a whole transcript to a model, flags only the segments `SUSPICIOUS_PATTERNS`
//! thinks Whisper mangled and sends just those for correction - grounded on
//! `original_source/app/pipeline/stages/llm_polish.py`. Runs after the
//! deterministic `corrections` table and only when `llm_polish_model` is
//! configured; with no key or model set, `polish` is a no-op that costs
//! nothing, matching `LLMPolishStage.validate`'s early exit.

use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::sync::OnceLock;

use crate::config::ProviderConfig;
use crate::db::store::NewSegment;

const MAX_SEGMENTS_TO_POLISH: usize = 50;
const GPT4O_MINI_COST_PER_1K_TOKENS: f64 = 0.00015;

struct SuspiciousPattern {
    pattern: Regex,
    reason: &'static str,
}

fn suspicious_patterns() -> &'static Vec<SuspiciousPattern> {
    static TABLE: OnceLock<Vec<SuspiciousPattern>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let raw: &[(&str, &str)] = &[
            (r"(?i)\b(?:killer|killa)\s+(?:one|once|watts?)\b", "kilowatt mishearing"),
            (r"(?i)\bmega\s*(?:hertz|hurts)\b", "megawatt mishearing"),
            (r"(?i)\b(?:air|er)\s*(?:cot|caught|kot)\b", "ERCOT mishearing"),
            (r"(?i)\b(?:see|sea)\s*(?:puck|pack)\b", "CPUC mishearing"),
            (r"(?i)\bp\s*u\s*c\s*[ot]\b", "PUCO/PUCT mishearing"),
            (r"(?i)\bf\s*p\s*s\s*c\b", "FPSC mishearing"),
            (r"(?i)\b(?:george|gorge)\s+power\b", "Georgia Power mishearing"),
            (r"(?i)\b(?:on|encore)\s+core?\b", "Oncor mishearing"),
            (r"(?i)\binaudible\b", "inaudible marker"),
            (r"(?i)(\b\w{4,}\b)\s+\1\s+\1", "triple word repetition"),
            (r"\.{4,}", "excessive ellipsis"),
        ];
        raw.iter()
            .map(|(pattern, reason)| SuspiciousPattern { pattern: Regex::new(pattern).expect("static polish regex"), reason })
            .collect()
    })
}

fn flag_suspicious(segments: &[NewSegment]) -> Vec<usize> {
    segments
        .iter()
        .enumerate()
        .filter(|(_, s)| suspicious_patterns().iter().any(|p| p.pattern.is_match(&s.text)))
        .map(|(i, _)| i)
        .take(MAX_SEGMENTS_TO_POLISH)
        .collect()
}

/// Sends flagged segments to `llm_polish_model` for correction and applies
/// the results in place. Returns the call's cost in USD (`0.0` if nothing
/// was flagged or no polish model/key is configured).
pub async fn polish(client: &Client, providers: &ProviderConfig, state_code: &str, segments: &mut [NewSegment]) -> anyhow::Result<f64> {
    let Some(model) = providers.llm_polish_model.as_deref() else {
        return Ok(0.0);
    };
    let Some(api_key) = providers.openai_api_key.as_deref() else {
        tracing::warn!("LLM_POLISH_MODEL is set but OPENAI_API_KEY is not - skipping polish pass");
        return Ok(0.0);
    };

    let flagged = flag_suspicious(segments);
    if flagged.is_empty() {
        return Ok(0.0);
    }

    let segments_text = flagged
        .iter()
        .map(|&i| format!("[{i}] {}", segments[i].text))
        .collect::<Vec<_>>()
        .join("\n");

    let system_prompt = format!(
        "You are correcting transcription errors in a {state_code} Public Service Commission hearing transcript. \
         Common errors: \"killer one/once\" -> \"kilowatt\", \"mega hertz\" -> \"megawatt\", \"air cot\" -> \"ERCOT\", \
         \"see puck\" -> \"CPUC\", garbled docket numbers, split company names, repeated/filler words. \
         For each segment output ONLY the corrected text, one per line, with the same [index] prefix. \
         If no correction is needed, output the original text unchanged."
    );
    let user_prompt = format!("Correct these transcript segments:\n\n{segments_text}");

    let body = serde_json::json!({
        "model": model,
        "messages": [
            {"role": "system", "content": system_prompt},
            {"role": "user", "content": user_prompt}
        ],
        "temperature": 0.1,
        "max_tokens": (segments_text.len() + 500).min(8000),
    });

    let response = client
        .post("https://api.openai.com/v1/chat/completions")
        .header("Authorization", format!("Bearer {api_key}"))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        tracing::warn!("LLM polish call failed ({status}): {}", crate::error::truncate(&text, 300));
        return Ok(0.0);
    }

    let response_body: Value = response.json().await?;
    let content = response_body
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or("");

    apply_corrections(content, segments);

    let prompt_tokens = response_body.get("usage").and_then(|u| u.get("prompt_tokens")).and_then(|v| v.as_f64()).unwrap_or(0.0);
    let completion_tokens =
        response_body.get("usage").and_then(|u| u.get("completion_tokens")).and_then(|v| v.as_f64()).unwrap_or(0.0);
    Ok((prompt_tokens + completion_tokens) / 1000.0 * GPT4O_MINI_COST_PER_1K_TOKENS)
}

fn apply_corrections(response_text: &str, segments: &mut [NewSegment]) {
    let line_pattern = Regex::new(r"^\[(\d+)\]\s*(.+)$").expect("static polish line regex");
    for line in response_text.lines() {
        let Some(caps) = line_pattern.captures(line.trim()) else { continue };
        let Some(index) = caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) else { continue };
        let Some(corrected) = caps.get(2).map(|m| m.as_str().trim().to_string()) else { continue };
        if let Some(segment) = segments.get_mut(index) {
            segment.text = corrected;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str) -> NewSegment {
        NewSegment { segment_index: 0, start_time: 0.0, end_time: 1.0, text: text.to_string(), speaker: None, speaker_role: None }
    }

    #[test]
    fn flags_known_mishearing_patterns() {
        let segments = vec![segment("the air cot market operator set prices"), segment("the commission convened at nine am")];
        let flagged = flag_suspicious(&segments);
        assert_eq!(flagged, vec![0]);
    }

    #[test]
    fn caps_flagged_segments_at_the_limit() {
        let segments: Vec<NewSegment> = (0..80).map(|_| segment("inaudible inaudible inaudible")).collect();
        assert_eq!(flag_suspicious(&segments).len(), MAX_SEGMENTS_TO_POLISH);
    }

    #[test]
    fn applies_indexed_corrections_from_model_output() {
        let mut segments = vec![segment("the air cot market"), segment("unrelated text")];
        apply_corrections("[0] the ERCOT market\n[1] unrelated text", &mut segments);
        assert_eq!(segments[0].text, "the ERCOT market");
        assert_eq!(segments[1].text, "unrelated text");
    }

    #[test]
    fn ignores_malformed_response_lines() {
        let mut segments = vec![segment("the air cot market")];
        apply_corrections("no index prefix here", &mut segments);
        assert_eq!(segments[0].text, "the air cot market");
    }
}
