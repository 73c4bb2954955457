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

//! Turns `title + transcript` text into scored `ExtractedDocket` candidates
//! and Docket/HearingDocket rows (§4.7). Everything here is in-process -
//! no network calls, no LLM, zero marginal cost.

use crate::config::DocketConfig;
use crate::db::models::KnownDocket;
use crate::db::store::{NewDocket, NewExtractedDocket, NewHearingDocket};
use crate::db::Store;
use crate::types::{DocketConfidence, ExtractedDocketStatus, MatchType};

use super::fuzzy;
use super::patterns::{self, ParsedDocket};

const CONTEXT_CHARS: usize = 50;
const CONTEXT_KEYWORDS: [&str; 4] = ["docket", "case", "proceeding", "hearing"];
const CORROBORATION_WINDOW: usize = 100;

#[derive(Debug, Clone)]
struct Candidate {
    raw_text: String,
    normalized_id: String,
    parsed: ParsedDocket,
    trigger_phrase: Option<String>,
    context_before: String,
    context_after: String,
    /// Byte offset in the combined text, used to keep the earliest position
    /// on dedup (§4.7 "Tie-breaking").
    position: usize,
    match_type: MatchType,
    match_score: f64,
    matched_known_docket: Option<KnownDocket>,
}

pub struct ExtractionOutcome {
    pub candidates_found: usize,
    pub accepted: usize,
    pub needs_review: usize,
    pub rejected: usize,
}

/// Runs the full extraction pipeline for one hearing and persists the
/// result. `text` is `title + "\n" + transcript` per §4.7.
pub async fn extract_and_link(
    store: &Store,
    cfg: &DocketConfig,
    hearing_id: i64,
    state_code: &str,
    text: &str,
) -> anyhow::Result<ExtractionOutcome> {
    let state = store
        .get_state_by_code(state_code)
        .await?
        .ok_or_else(|| anyhow::anyhow!("unknown state code {state_code}"))?;
    let known = store.known_dockets_for_state(state.id).await?;

    let mut candidates = extract_candidates(state_code, text);
    for c in &mut candidates {
        match_known_docket(c, &known, cfg.fuzzy_gate);
    }

    let mut scored: Vec<(Candidate, f64, ExtractedDocketStatus)> = candidates
        .into_iter()
        .map(|c| {
            let confidence = score_confidence(&c, text);
            let status = route_status(confidence, cfg);
            (c, confidence, status)
        })
        .collect();

    // Dedup by normalized_id, keeping the highest-confidence, earliest-position instance.
    scored.sort_by(|a, b| {
        a.0.normalized_id
            .cmp(&b.0.normalized_id)
            .then(b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal))
            .then(a.0.position.cmp(&b.0.position))
    });
    scored.dedup_by(|keep_next, keep_prev| {
        // dedup_by compares adjacent (a=later, b=earlier) after sort;
        // since earlier comparisons grouped by normalized_id with best score
        // first, keep the first of each group.
        if keep_next.0.normalized_id == keep_prev.0.normalized_id {
            true
        } else {
            false
        }
    });

    let mut outcome = ExtractionOutcome {
        candidates_found: scored.len(),
        accepted: 0,
        needs_review: 0,
        rejected: 0,
    };

    let mut new_rows = Vec::with_capacity(scored.len());
    for (c, confidence, status) in &scored {
        match status {
            ExtractedDocketStatus::Accepted => outcome.accepted += 1,
            ExtractedDocketStatus::NeedsReview => outcome.needs_review += 1,
            ExtractedDocketStatus::Rejected => outcome.rejected += 1,
        }

        let suggested_correction = if *status != ExtractedDocketStatus::Accepted {
            suggest_correction(&c.normalized_id, &known)
        } else {
            None
        };

        new_rows.push(NewExtractedDocket {
            raw_text: c.raw_text.clone(),
            normalized_id: c.normalized_id.clone(),
            year: c.parsed.year,
            case_number: c.parsed.case_number,
            suffix: c.parsed.suffix.clone(),
            confidence: *confidence,
            status: *status,
            match_type: c.match_type,
            trigger_phrase: c.trigger_phrase.clone(),
            matched_known_docket_id: c.matched_known_docket.as_ref().map(|k| k.id),
            fuzzy_score: if c.match_type == MatchType::Fuzzy { Some(c.match_score) } else { None },
            context_before: Some(c.context_before.clone()),
            context_after: Some(c.context_after.clone()),
            suggested_correction,
        });
    }

    store.replace_extracted_dockets(hearing_id, &new_rows).await?;

    for (c, confidence, status) in &scored {
        if *status == ExtractedDocketStatus::Rejected {
            continue;
        }
        let confidence_tag = if c.match_type == MatchType::Exact {
            DocketConfidence::Verified
        } else if c.matched_known_docket.is_some() {
            DocketConfidence::Possible
        } else {
            DocketConfidence::Unverified
        };
        let docket = store
            .upsert_docket(NewDocket {
                state_id: state.id,
                docket_number: c.raw_text.clone(),
                normalized_id: c.normalized_id.clone(),
                title: c.matched_known_docket.as_ref().and_then(|k| k.title.clone()),
                company: c.matched_known_docket.as_ref().and_then(|k| k.utility_name.clone()),
                sector: c.matched_known_docket.as_ref().and_then(|k| k.utility_sector.clone()),
                status: c.matched_known_docket.as_ref().and_then(|k| k.status.clone()),
                confidence: confidence_tag.to_string(),
                known_docket_id: c.matched_known_docket.as_ref().map(|k| k.id),
                match_score: if c.match_type == MatchType::None { None } else { Some(c.match_score) },
            })
            .await?;

        store
            .link_hearing_docket(NewHearingDocket {
                hearing_id,
                docket_id: docket.id,
                confidence_score: *confidence,
                match_type: c.match_type,
                // §4.7 step 8: human verification is required for every
                // extracted link regardless of confidence.
                needs_review: cfg.needs_review_always || *status == ExtractedDocketStatus::NeedsReview,
                review_reason: if *status == ExtractedDocketStatus::NeedsReview {
                    Some("confidence below accept threshold".to_string())
                } else {
                    None
                },
                context_summary: Some(format!("...{}[{}]{}...", c.context_before, c.raw_text, c.context_after)),
                is_primary: *confidence >= 90.0,
            })
            .await?;
    }

    Ok(outcome)
}

fn extract_candidates(state_code: &str, text: &str) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    if let Some(fmt) = patterns::registry().get(state_code) {
        for m in fmt.pattern.find_iter(text) {
            let raw = m.as_str().to_string();
            let parsed = (fmt.parse)(&raw);
            candidates.push(Candidate {
                raw_text: raw.clone(),
                normalized_id: patterns::normalize(state_code, &raw),
                parsed,
                trigger_phrase: None,
                context_before: context_window(text, m.start(), false),
                context_after: context_window(text, m.end(), true),
                position: m.start(),
                match_type: MatchType::None,
                match_score: 0.0,
                matched_known_docket: None,
            });
        }
    }

    for caps in patterns::trigger_phrase_pattern().captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let digits = caps.get(1).unwrap().as_str().to_string();
        let parsed = patterns::registry()
            .get(state_code)
            .map(|fmt| (fmt.parse)(&digits))
            .unwrap_or_default();
        candidates.push(Candidate {
            raw_text: digits.clone(),
            normalized_id: patterns::normalize(state_code, &digits),
            parsed,
            trigger_phrase: Some(whole.as_str().to_string()),
            context_before: context_window(text, whole.start(), false),
            context_after: context_window(text, whole.end(), true),
            position: whole.start(),
            match_type: MatchType::None,
            match_score: 0.0,
            matched_known_docket: None,
        });
    }

    candidates
}

fn context_window(text: &str, byte_pos: usize, after: bool) -> String {
    if after {
        text[byte_pos..].chars().take(CONTEXT_CHARS).collect()
    } else {
        let start = byte_pos.saturating_sub(CONTEXT_CHARS * 4).max(0);
        // walk forward from a safe byte boundary, keep only the last
        // CONTEXT_CHARS characters before byte_pos
        let slice = &text[text.char_indices().find(|(i, _)| *i >= start).map(|(i, _)| i).unwrap_or(0)..byte_pos.min(text.len())];
        let chars: Vec<char> = slice.chars().collect();
        let skip = chars.len().saturating_sub(CONTEXT_CHARS);
        chars[skip..].iter().collect()
    }
}

fn match_known_docket(candidate: &mut Candidate, known: &[KnownDocket], fuzzy_gate: f64) {
    if let Some(exact) = known.iter().find(|k| k.normalized_id == candidate.normalized_id) {
        candidate.match_type = MatchType::Exact;
        candidate.match_score = 100.0;
        candidate.matched_known_docket = Some(exact.clone());
        return;
    }

    let best = fuzzy::best_match(
        known,
        |k| fuzzy::score(&k.normalized_id, &candidate.normalized_id),
        |k| k.filing_date.map(|d| d.and_hms_opt(0, 0, 0).map(|dt| dt.timestamp()).unwrap_or(0)).unwrap_or(0),
    );
    if let Some((k, score)) = best {
        if score >= fuzzy_gate {
            candidate.match_type = MatchType::Fuzzy;
            candidate.match_score = score;
            candidate.matched_known_docket = Some(k.clone());
        }
    }
}

fn score_confidence(candidate: &Candidate, full_text: &str) -> f64 {
    if candidate.match_type == MatchType::None {
        return 30.0;
    }

    let mut boost = 0.0;
    let window = format!("{} {}", candidate.context_before, candidate.context_after).to_lowercase();
    if CONTEXT_KEYWORDS.iter().any(|kw| window.contains(kw)) {
        boost += 15.0;
    }
    if candidate
        .parsed
        .suffix
        .as_deref()
        .map(|s| s != "XX")
        .unwrap_or(false)
    {
        boost += 10.0;
    }
    if let Some(known) = &candidate.matched_known_docket {
        if let Some(name) = &known.utility_name {
            if corroborating_name_nearby(full_text, candidate.position, name) {
                boost += 10.0;
            }
        }
    }

    (0.7 * candidate.match_score + boost).min(100.0)
}

fn corroborating_name_nearby(text: &str, position: usize, name: &str) -> bool {
    let start = position.saturating_sub(CORROBORATION_WINDOW);
    let end = (position + CORROBORATION_WINDOW).min(text.len());
    let start = text.char_indices().find(|(i, _)| *i >= start).map(|(i, _)| i).unwrap_or(0);
    let end = text.char_indices().find(|(i, _)| *i >= end).map(|(i, _)| i).unwrap_or(text.len());
    if start >= end {
        return false;
    }
    text[start..end].to_lowercase().contains(&name.to_lowercase())
}

fn route_status(confidence: f64, cfg: &DocketConfig) -> ExtractedDocketStatus {
    if confidence >= cfg.accept_threshold {
        ExtractedDocketStatus::Accepted
    } else if confidence >= cfg.review_threshold {
        ExtractedDocketStatus::NeedsReview
    } else {
        ExtractedDocketStatus::Rejected
    }
}

fn suggest_correction(normalized_id: &str, known: &[KnownDocket]) -> Option<String> {
    known
        .iter()
        .map(|k| (k, fuzzy::edit_distance(normalized_id, &k.normalized_id)))
        .filter(|(_, dist)| *dist <= 2)
        .min_by_key(|(_, dist)| *dist)
        .map(|(k, _)| k.normalized_id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;

    fn test_config() -> DocketConfig {
        DocketConfig {
            accept_threshold: 85.0,
            review_threshold: 60.0,
            fuzzy_gate: 60.0,
            needs_review_always: true,
        }
    }

    async fn memory_store() -> Store {
        Store::connect("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn exact_match_is_auto_accepted() {
        let store = memory_store().await;
        let state = store.upsert_state("FL", "Florida", None).await.unwrap();
        store
            .upsert_known_docket(crate::db::store::NewKnownDocket {
                state_id: state.id,
                docket_number: "20240035-GU".into(),
                normalized_id: "FL-20240035-GU".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let text = "The commission opened docket 20240035-GU for public comment today.";
        let outcome = extract_and_link(&store, &test_config(), 1, "FL", text).await.unwrap();
        assert_eq!(outcome.accepted, 1);
        assert_eq!(outcome.rejected, 0);
    }

    #[tokio::test]
    async fn unmatched_candidate_is_low_confidence() {
        let store = memory_store().await;
        store.upsert_state("FL", "Florida", None).await.unwrap();
        let text = "Reference docket number: 99999999-ZZ was briefly mentioned.";
        let outcome = extract_and_link(&store, &test_config(), 1, "FL", text).await.unwrap();
        assert_eq!(outcome.rejected, 1);
    }

    #[tokio::test]
    async fn dedup_keeps_highest_confidence_instance() {
        let store = memory_store().await;
        let state = store.upsert_state("FL", "Florida", None).await.unwrap();
        store
            .upsert_known_docket(crate::db::store::NewKnownDocket {
                state_id: state.id,
                docket_number: "20240035-GU".into(),
                normalized_id: "FL-20240035-GU".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let text = "docket 20240035-GU was opened; docket 20240035-GU remains open.";
        let outcome = extract_and_link(&store, &test_config(), 1, "FL", text).await.unwrap();
        assert_eq!(outcome.candidates_found, 1);
    }
}
