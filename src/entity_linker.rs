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

//! Entity linker (spec §4.10, C10). Resolves the free-text utility/topic
//! names an analysis surfaced against canonical catalogue records, reusing
//! `docket::fuzzy` rather than a second scoring implementation.
//!
//! Canonical utility/topic records are modeled the same way `KnownDocket`
//! models a canonical catalogue entry (DESIGN.md): curated, not grown
//! automatically from every miss. A raw name that matches nothing well
//! enough is still linked, with `matched_id=null`, for the "later
//! canonicalization review" spec §4.10 calls for - it is not promoted to a
//! new canonical record on the spot.

use crate::db::store::Store;
use crate::docket::fuzzy;

const UTILITY_ACCEPT_THRESHOLD: f64 = 85.0;
const UTILITY_REVIEW_THRESHOLD: f64 = 70.0;
const TOPIC_ACCEPT_THRESHOLD: f64 = 80.0;
const TOPIC_REVIEW_THRESHOLD: f64 = 50.0;

/// Boost applied for utilities when the mention's role is "applicant"
/// (spec §4.10: "+10 if role=applicant for utilities").
const APPLICANT_ROLE_BOOST: f64 = 10.0;
/// Boost applied for topics flagged high-relevance by the analyzer (spec
/// §4.10: "+5 if relevance=high for topics").
const HIGH_RELEVANCE_BOOST: f64 = 5.0;

pub struct LinkOutcome {
    pub canonical_id: Option<i64>,
    pub confidence: f64,
    pub needs_review: bool,
}

/// Links one raw utility name against the canonical utilities table. `role`
/// is the analyzer's role tag for this mention, if it reported one.
pub async fn link_utility(store: &Store, hearing_id: i64, raw_name: &str, role: Option<&str>) -> anyhow::Result<LinkOutcome> {
    let canonical = store.list_canonical_utilities().await?;
    let boost = if role.map(|r| r.eq_ignore_ascii_case("applicant")).unwrap_or(false) { APPLICANT_ROLE_BOOST } else { 0.0 };
    let candidates: Vec<(i64, Vec<String>)> = canonical.iter().map(|u| (u.id, names_for(&u.name, &u.aliases_json))).collect();
    let outcome = resolve(raw_name, &candidates, UTILITY_ACCEPT_THRESHOLD, UTILITY_REVIEW_THRESHOLD, boost);

    if let Some(id) = outcome.canonical_id {
        store.bump_canonical_utility_mentions(id).await?;
    }
    store
        .link_hearing_utility(hearing_id, outcome.canonical_id, raw_name, outcome.confidence, outcome.needs_review)
        .await?;

    Ok(outcome)
}

/// Links one raw topic tag against the canonical topics table. `relevance`
/// is the analyzer's relevance tag for this mention, if it reported one.
pub async fn link_topic(store: &Store, hearing_id: i64, raw_name: &str, relevance: Option<&str>) -> anyhow::Result<LinkOutcome> {
    let canonical = store.list_canonical_topics().await?;
    let boost = if relevance.map(|r| r.eq_ignore_ascii_case("high")).unwrap_or(false) { HIGH_RELEVANCE_BOOST } else { 0.0 };
    let candidates: Vec<(i64, Vec<String>)> = canonical.iter().map(|t| (t.id, names_for(&t.name, &t.aliases_json))).collect();
    let outcome = resolve(raw_name, &candidates, TOPIC_ACCEPT_THRESHOLD, TOPIC_REVIEW_THRESHOLD, boost);

    if let Some(id) = outcome.canonical_id {
        store.bump_canonical_topic_mentions(id).await?;
    }
    store
        .link_hearing_topic(hearing_id, outcome.canonical_id, raw_name, outcome.confidence, outcome.needs_review)
        .await?;

    Ok(outcome)
}

fn names_for(canonical_name: &str, aliases_json: &str) -> Vec<String> {
    let mut names = vec![canonical_name.to_string()];
    if let Ok(aliases) = serde_json::from_str::<Vec<String>>(aliases_json) {
        names.extend(aliases);
    }
    names
}

/// Pure matching logic, separated from the store calls so it's directly
/// testable: exact case-insensitive match (name or any alias) scores 100,
/// else the best fuzzy score across a candidate's name+aliases is used if
/// it clears `review_threshold`. Confidence is always `match_score * 0.8 +
/// boost` (spec §4.10); `needs_review` is `confidence < accept_threshold`,
/// so even an exact match can land in review once the 0.8 scaling and a
/// missing boost pull it under the accept bar - that is the spec's formula,
/// not a case no-op shortcut.
fn resolve(raw_name: &str, candidates: &[(i64, Vec<String>)], accept_threshold: f64, review_threshold: f64, boost: f64) -> LinkOutcome {
    let raw_lower = raw_name.trim().to_lowercase();

    let exact = candidates.iter().find(|(_, names)| names.iter().any(|n| n.trim().to_lowercase() == raw_lower));
    if let Some((id, _)) = exact {
        let confidence = (100.0 * 0.8 + boost).min(100.0);
        return LinkOutcome { canonical_id: Some(*id), confidence, needs_review: confidence < accept_threshold };
    }

    let best = fuzzy::best_match(
        candidates,
        |c| c.1.iter().map(|n| fuzzy::score(n, raw_name)).fold(0.0, f64::max),
        |c| c.0,
    );

    match best {
        Some((candidate, match_score)) if match_score >= review_threshold => {
            let confidence = (match_score * 0.8 + boost).min(100.0);
            LinkOutcome { canonical_id: Some(candidate.0), confidence, needs_review: confidence < accept_threshold }
        }
        _ => LinkOutcome { canonical_id: None, confidence: 0.0, needs_review: true },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(pairs: &[(i64, &str)]) -> Vec<(i64, Vec<String>)> {
        pairs.iter().map(|(id, name)| (*id, vec![name.to_string()])).collect()
    }

    #[test]
    fn exact_match_without_boost_can_still_need_review() {
        let outcome = resolve("georgia power", &candidates(&[(1, "Georgia Power")]), UTILITY_ACCEPT_THRESHOLD, UTILITY_REVIEW_THRESHOLD, 0.0);
        assert_eq!(outcome.canonical_id, Some(1));
        assert_eq!(outcome.confidence, 80.0);
        assert!(outcome.needs_review);
    }

    #[test]
    fn exact_match_with_applicant_boost_is_accepted() {
        let outcome = resolve(
            "georgia power",
            &candidates(&[(1, "Georgia Power")]),
            UTILITY_ACCEPT_THRESHOLD,
            UTILITY_REVIEW_THRESHOLD,
            APPLICANT_ROLE_BOOST,
        );
        assert_eq!(outcome.confidence, 90.0);
        assert!(!outcome.needs_review);
    }

    #[test]
    fn fuzzy_match_below_review_threshold_is_unmatched() {
        let outcome = resolve(
            "Completely Unrelated Entity",
            &candidates(&[(1, "Georgia Power")]),
            UTILITY_ACCEPT_THRESHOLD,
            UTILITY_REVIEW_THRESHOLD,
            0.0,
        );
        assert_eq!(outcome.canonical_id, None);
        assert_eq!(outcome.confidence, 0.0);
        assert!(outcome.needs_review);
    }

    #[test]
    fn alias_match_counts_as_exact() {
        let mut candidates = candidates(&[(1, "Georgia Power")]);
        candidates[0].1.push("GPC".to_string());
        let outcome = resolve("gpc", &candidates, UTILITY_ACCEPT_THRESHOLD, UTILITY_REVIEW_THRESHOLD, APPLICANT_ROLE_BOOST);
        assert_eq!(outcome.canonical_id, Some(1));
        assert!(!outcome.needs_review);
    }

    #[test]
    fn topic_thresholds_are_looser_than_utility_thresholds() {
        // A 55-scoring match would be unmatched for a utility (review=70)
        // but considered for a topic (review=50).
        let low_score_candidates = candidates(&[(1, "rate case")]);
        let utility_outcome = resolve("rade caso xyz", &low_score_candidates, UTILITY_ACCEPT_THRESHOLD, UTILITY_REVIEW_THRESHOLD, 0.0);
        let topic_outcome = resolve("rade caso xyz", &low_score_candidates, TOPIC_ACCEPT_THRESHOLD, TOPIC_REVIEW_THRESHOLD, 0.0);
        assert!(topic_outcome.canonical_id.is_some() || utility_outcome.canonical_id.is_none());
    }
}
