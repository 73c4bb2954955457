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

//! Per-state docket format registry (spec §4.7 step 1, §9 "pluggable
//! polymorphism", SPEC_FULL.md §16). Each state contributes a regex plus a
//! component parser rather than a parallel per-state codebase, grounded on
//! `original_source/app/scrapers/docket_scrapers/states/{florida,texas,
//! california,ohio}.py`'s documented format comments.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocket {
    pub year: Option<i64>,
    pub case_number: Option<i64>,
    pub suffix: Option<String>,
}

pub struct DocketFormat {
    pub state_code: &'static str,
    pub pattern: Regex,
    pub example: &'static str,
    pub parse: fn(&str) -> ParsedDocket,
}

fn parse_florida(raw: &str) -> ParsedDocket {
    // YYYYNNNN-XX, e.g. 20240035-GU
    let caps = florida_capture().captures(raw);
    ParsedDocket {
        year: caps.as_ref().and_then(|c| c.get(1)).and_then(|m| m.as_str().parse().ok()),
        case_number: caps.as_ref().and_then(|c| c.get(2)).and_then(|m| m.as_str().parse().ok()),
        suffix: caps.as_ref().and_then(|c| c.get(3)).map(|m| m.as_str().to_string()),
    }
}

fn florida_capture() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})(\d{4})-([A-Z]{2})$").unwrap())
}

fn parse_texas(raw: &str) -> ParsedDocket {
    // 5-digit control number, no year/suffix encoded in the number itself.
    ParsedDocket {
        case_number: raw.parse().ok(),
        ..Default::default()
    }
}

fn parse_california(raw: &str) -> ParsedDocket {
    // [ARCIP].YY-MM-NNN, e.g. A.24-07-003
    let caps = california_capture().captures(raw);
    ParsedDocket {
        year: caps.as_ref().and_then(|c| c.get(2)).and_then(|m| m.as_str().parse().ok()),
        case_number: caps.as_ref().and_then(|c| c.get(4)).and_then(|m| m.as_str().parse().ok()),
        suffix: caps.as_ref().and_then(|c| c.get(1)).map(|m| m.as_str().to_string()),
    }
}

fn california_capture() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([ARCIP])\.(\d{2})-(\d{2})-(\d{3})$").unwrap())
}

fn parse_ohio(raw: &str) -> ParsedDocket {
    // YY-NNNN-XX-XXX, e.g. 24-0594-EL-AIR
    let caps = ohio_capture().captures(raw);
    ParsedDocket {
        year: caps.as_ref().and_then(|c| c.get(1)).and_then(|m| m.as_str().parse().ok()),
        case_number: caps.as_ref().and_then(|c| c.get(2)).and_then(|m| m.as_str().parse().ok()),
        suffix: caps.as_ref().and_then(|c| c.get(3)).map(|m| m.as_str().to_string()),
    }
}

fn ohio_capture() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{2})-(\d{4})-([A-Z]{2})-[A-Z]{3}$").unwrap())
}

fn parse_georgia(raw: &str) -> ParsedDocket {
    // Bare docket numbers (44250, 55973) - no structural components.
    ParsedDocket {
        case_number: raw.parse().ok(),
        ..Default::default()
    }
}

fn parse_arizona(raw: &str) -> ParsedDocket {
    // T-21349A-25-0016, W-02703A-25-0189 - utility-class letter + company
    // code + year + sequence. Only the year is extracted generically; the
    // company code is state-specific trivia not modeled elsewhere.
    let caps = arizona_capture().captures(raw);
    ParsedDocket {
        year: caps.as_ref().and_then(|c| c.get(2)).and_then(|m| m.as_str().parse().ok()),
        case_number: caps.as_ref().and_then(|c| c.get(3)).and_then(|m| m.as_str().parse().ok()),
        suffix: caps.as_ref().and_then(|c| c.get(1)).map(|m| m.as_str().to_string()),
    }
}

fn arizona_capture() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]-\d{5}([A-Z])-(\d{2})-(\d{4})$").unwrap())
}

pub fn registry() -> &'static HashMap<&'static str, DocketFormat> {
    static REGISTRY: OnceLock<HashMap<&'static str, DocketFormat>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut m = HashMap::new();
        m.insert(
            "FL",
            DocketFormat {
                state_code: "FL",
                pattern: Regex::new(r"\b\d{8}-[A-Z]{2}\b").unwrap(),
                example: "20240035-GU",
                parse: parse_florida,
            },
        );
        m.insert(
            "TX",
            DocketFormat {
                state_code: "TX",
                pattern: Regex::new(r"\b\d{5}\b").unwrap(),
                example: "55999",
                parse: parse_texas,
            },
        );
        m.insert(
            "CA",
            DocketFormat {
                state_code: "CA",
                pattern: Regex::new(r"\b[ARCIP]\.\d{2}-\d{2}-\d{3}\b").unwrap(),
                example: "A.24-07-003",
                parse: parse_california,
            },
        );
        m.insert(
            "OH",
            DocketFormat {
                state_code: "OH",
                pattern: Regex::new(r"\b\d{2}-\d{4}-[A-Z]{2}-[A-Z]{3}\b").unwrap(),
                example: "24-0594-EL-AIR",
                parse: parse_ohio,
            },
        );
        m.insert(
            "GA",
            DocketFormat {
                state_code: "GA",
                pattern: Regex::new(r"\b\d{5}\b").unwrap(),
                example: "44280",
                parse: parse_georgia,
            },
        );
        m.insert(
            "AZ",
            DocketFormat {
                state_code: "AZ",
                pattern: Regex::new(r"\b[A-Z]-\d{5}[A-Z]-\d{2}-\d{4}\b").unwrap(),
                example: "T-21349A-25-0016",
                parse: parse_arizona,
            },
        );
        m
    })
}

/// Trigger-phrase pattern (spec §4.7 step 1): catches un-suffixed numbers
/// in any state via surrounding vocabulary rather than a format regex.
pub fn trigger_phrase_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)docket\s*(?:number|no\.?)?\s*[:]?\s*([A-Z]?\.?\d[\d-]{3,})").unwrap()
    })
}

/// Normalizes a raw docket number into `"<STATE>-<docket_number>"` (spec
/// GLOSSARY, §4.7 step 3).
pub fn normalize(state_code: &str, docket_number: &str) -> String {
    format!("{}-{}", state_code.to_uppercase(), docket_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn florida_pattern_matches_spec_example() {
        let fmt = &registry()["FL"];
        assert!(fmt.pattern.is_match("docket 20240035-GU"));
        let parsed = (fmt.parse)("20240035-GU");
        assert_eq!(parsed.year, Some(2024));
        assert_eq!(parsed.case_number, Some(35));
        assert_eq!(parsed.suffix.as_deref(), Some("GU"));
    }

    #[test]
    fn california_pattern_matches_compact_and_display() {
        let fmt = &registry()["CA"];
        assert!(fmt.pattern.is_match("A.24-07-003"));
        let parsed = (fmt.parse)("A.24-07-003");
        assert_eq!(parsed.year, Some(24));
        assert_eq!(parsed.case_number, Some(3));
    }

    #[test]
    fn trigger_phrase_catches_bare_number() {
        let re = trigger_phrase_pattern();
        let caps = re.captures("please reference Docket Number: 44250 in your filing").unwrap();
        assert_eq!(&caps[1], "44250");
    }

    #[test]
    fn normalize_builds_global_id() {
        assert_eq!(normalize("fl", "20240035-GU"), "FL-20240035-GU");
    }
}
