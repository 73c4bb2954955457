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

//! Fuzzy string scoring shared by docket matching (§4.7) and entity linking
//! (§4.10). SPEC_FULL.md §14 resolves the open question of "what fuzzy
//! matching library/score" to `strsim::normalized_levenshtein` scaled onto a
//! 0-100 range so it composes with the confidence formulas' percentages.

use strsim::normalized_levenshtein;

/// Returns a similarity score in `[0.0, 100.0]`, case-insensitive.
pub fn score(a: &str, b: &str) -> f64 {
    normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase()) * 100.0
}

/// Raw Levenshtein edit distance, used for the "suggest correction" step
/// (§4.7 step 8: distance <= 2 against a known docket number).
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// Picks the best-scoring candidate from `candidates`, breaking ties by the
/// caller-supplied tiebreak key (§4.7 step 4: "ties broken by most recent
/// filing_date"). Returns `None` if `candidates` is empty.
pub fn best_match<'a, T, F, K>(candidates: &'a [T], mut score_fn: F, mut tiebreak_key: K) -> Option<(&'a T, f64)>
where
    F: FnMut(&'a T) -> f64,
    K: FnMut(&'a T) -> i64,
{
    let mut best: Option<(&'a T, f64)> = None;
    for candidate in candidates {
        let s = score_fn(candidate);
        match &best {
            None => best = Some((candidate, s)),
            Some((current, current_score)) => {
                if s > *current_score
                    || (s == *current_score && tiebreak_key(candidate) > tiebreak_key(current))
                {
                    best = Some((candidate, s));
                }
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_100() {
        assert_eq!(score("Georgia Power", "Georgia Power"), 100.0);
    }

    #[test]
    fn case_insensitive() {
        assert_eq!(score("ERCOT", "ercot"), 100.0);
    }

    #[test]
    fn typo_scores_high_but_not_perfect() {
        let s = score("Duke Energy Florida", "Duke Energy Florda");
        assert!(s > 85.0 && s < 100.0);
    }

    #[test]
    fn unrelated_strings_score_low() {
        let s = score("Georgia Power", "xyz completely different");
        assert!(s < 40.0);
    }

    #[test]
    fn best_match_picks_highest_score() {
        let items = vec![("a", 10), ("b", 10), ("c", 10)];
        let (picked, _) = best_match(&items, |i| score(i.0, "b"), |i| i.1).unwrap();
        assert_eq!(picked.0, "b");
    }

    #[test]
    fn best_match_tiebreaks_by_key() {
        let items = vec![("x", 1), ("x", 5), ("x", 3)];
        let (picked, _) = best_match(&items, |i| score(i.0, "x"), |i| i.1).unwrap();
        assert_eq!(picked.1, 5);
    }
}
