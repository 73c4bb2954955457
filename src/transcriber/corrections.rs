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

//! Deterministic mishearing-correction table (spec §4.5: "a fixed regex
//! table of known mishearing corrections... a property of the system, not
//! per-hearing"). Distinct from the optional LLM-polish pass - this table
//! runs unconditionally and costs nothing.
//!
//! Entries are grounded on the mishearing examples
//! `original_source/app/pipeline/stages/llm_polish.py`'s `SUSPICIOUS_PATTERNS`
//! flags for human/LLM review (ERCOT, PUCO/PUCT, FPSC, utility names); here
//! they're applied directly as substitutions instead of flagged for a model
//! call.

use regex::Regex;
use std::sync::OnceLock;

struct Correction {
    pattern: Regex,
    replacement: &'static str,
}

fn corrections() -> &'static Vec<Correction> {
    static TABLE: OnceLock<Vec<Correction>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let raw: &[(&str, &str)] = &[
            (r"(?i)\bair\s*c[o0]t\b", "ERCOT"),
            (r"(?i)\bE[-\s]?R[-\s]?C[-\s]?O[-\s]?T\b", "ERCOT"),
            (r"(?i)\bpew[-\s]?c[-\s]?o\b", "PUCO"),
            (r"(?i)\bP[-\s]?U[-\s]?C[-\s]?O\b", "PUCO"),
            (r"(?i)\bpew[-\s]?c[-\s]?t\b", "PUCT"),
            (r"(?i)\bP[-\s]?U[-\s]?C[-\s]?T\b", "PUCT"),
            (r"(?i)\bF[-\s]?P[-\s]?S[-\s]?C\b", "FPSC"),
            (r"(?i)\bkiller\s*watt\s*hour\b", "kilowatt-hour"),
            (r"(?i)\bkiller\s*one\b", "kilowatt"),
            (r"(?i)\bkiller\s*watt\b", "kilowatt"),
            (r"(?i)\bjordan\s*power\b", "Georgia Power"),
            (r"(?i)\boncore\b", "Oncor"),
            (r"(?i)\bcenter\s*point\b", "CenterPoint"),
            (r"(?i)\bP\s*G\s*and\s*E\b", "PG&E"),
            (r"(?i)\bduke\s*energy\s*florda\b", "Duke Energy Florida"),
        ];
        raw.iter()
            .map(|(pattern, replacement)| Correction {
                pattern: Regex::new(pattern).expect("static correction regex"),
                replacement,
            })
            .collect()
    })
}

/// Applies every correction in order, returning the cleaned text.
pub fn apply(text: &str) -> String {
    let mut out = text.to_string();
    for correction in corrections() {
        out = correction.pattern.replace_all(&out, correction.replacement).into_owned();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixes_ercot_mishearing() {
        assert_eq!(apply("the air cot market operator"), "the ERCOT market operator");
    }

    #[test]
    fn fixes_puco_mishearing() {
        assert_eq!(apply("a filing with pewco staff"), "a filing with PUCO staff");
    }

    #[test]
    fn fixes_kilowatt_mishearing() {
        assert_eq!(apply("costs ten cents per killer watt hour"), "costs ten cents per kilowatt-hour");
    }

    #[test]
    fn leaves_unrelated_text_untouched() {
        let text = "the commission voted unanimously to approve the rate case";
        assert_eq!(apply(text), text);
    }
}
