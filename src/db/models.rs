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

//! Row types for every persisted entity (spec §3). Field shapes follow the
//! reference SQLAlchemy schema where it and spec.md agree; where spec.md is
//! richer (Docket/HearingDocket gained confidence/match_type/needs_review
//! fields the reference never had), spec.md wins — it's the authoritative
//! document, the reference is only used to resolve what it leaves silent.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub commission_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: i64,
    pub state_id: i64,
    pub name: String,
    pub source_type: String,
    pub url: String,
    pub config_json: String,
    pub enabled: bool,
    pub check_frequency_hours: i64,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_hearing_at: Option<DateTime<Utc>>,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hearing {
    pub id: i64,
    pub source_id: Option<i64>,
    pub state_id: i64,
    pub external_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub hearing_date: Option<NaiveDate>,
    pub hearing_type: Option<String>,
    pub utility_name: Option<String>,
    /// JSON-encoded array of docket number strings (portable across
    /// Postgres/SQLite per spec §9 — no native ARRAY type on SQLite).
    pub docket_numbers_json: String,
    pub source_url: Option<String>,
    pub video_url: Option<String>,
    pub duration_seconds: Option<i64>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineJob {
    pub id: i64,
    pub hearing_id: i64,
    pub stage: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub retry_count: i64,
    pub cost_usd: f64,
    pub metadata_json: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub id: i64,
    pub hearing_id: i64,
    pub full_text: String,
    pub word_count: i64,
    pub model: String,
    pub cost_usd: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: i64,
    pub hearing_id: i64,
    pub transcript_id: i64,
    pub segment_index: i64,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    pub speaker: Option<String>,
    pub speaker_role: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub id: i64,
    pub hearing_id: i64,
    pub summary: Option<String>,
    pub one_sentence_summary: Option<String>,
    pub hearing_type: Option<String>,
    pub utility_name: Option<String>,
    pub participants_json: Option<String>,
    pub issues_json: Option<String>,
    pub commitments_json: Option<String>,
    pub vulnerabilities_json: Option<String>,
    pub commissioner_concerns_json: Option<String>,
    pub commissioner_mood: Option<String>,
    pub public_comments: Option<String>,
    pub public_sentiment: Option<String>,
    pub likely_outcome: Option<String>,
    pub outcome_confidence: Option<f64>,
    pub risk_factors_json: Option<String>,
    pub action_items_json: Option<String>,
    pub quotes_json: Option<String>,
    pub topics_json: Option<String>,
    pub utilities_json: Option<String>,
    pub dockets_json: Option<String>,
    pub model: String,
    pub cost_usd: f64,
    pub confidence_score: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownDocket {
    pub id: i64,
    pub state_id: i64,
    pub docket_number: String,
    pub normalized_id: String,
    pub year: Option<i64>,
    pub case_number: Option<i64>,
    pub suffix: Option<String>,
    pub utility_sector: Option<String>,
    pub title: Option<String>,
    pub utility_name: Option<String>,
    pub filing_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub case_type: Option<String>,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Docket {
    pub id: i64,
    pub state_id: i64,
    pub docket_number: String,
    pub normalized_id: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub sector: Option<String>,
    pub status: Option<String>,
    pub first_seen_at: DateTime<Utc>,
    pub last_mentioned_at: Option<DateTime<Utc>>,
    pub mention_count: i64,
    pub confidence: String,
    pub known_docket_id: Option<i64>,
    pub match_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HearingDocket {
    pub id: i64,
    pub hearing_id: i64,
    pub docket_id: i64,
    pub confidence_score: f64,
    pub match_type: String,
    pub needs_review: bool,
    pub review_reason: Option<String>,
    pub context_summary: Option<String>,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDocket {
    pub id: i64,
    pub hearing_id: i64,
    pub raw_text: String,
    pub normalized_id: String,
    pub year: Option<i64>,
    pub case_number: Option<i64>,
    pub suffix: Option<String>,
    pub confidence: f64,
    pub status: String,
    pub match_type: String,
    pub trigger_phrase: Option<String>,
    pub matched_known_docket_id: Option<i64>,
    pub fuzzy_score: Option<f64>,
    pub context_before: Option<String>,
    pub context_after: Option<String>,
    pub suggested_correction: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSchedule {
    pub id: i64,
    pub name: String,
    pub target: String,
    pub schedule_type: String,
    pub schedule_value: String,
    pub config_json: String,
    pub enabled: bool,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_run_status: Option<String>,
    pub last_run_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Canonical utility/topic records for C10 entity linking. Not in spec.md
/// §3's enumerated list by name, but required by §4.10's "canonical
/// records" and "junction-table links" language — modeled the same way
/// `KnownDocket` models a canonical catalogue entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalUtility {
    pub id: i64,
    pub name: String,
    pub aliases_json: String,
    pub mention_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalTopic {
    pub id: i64,
    pub name: String,
    pub aliases_json: String,
    pub mention_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HearingUtilityLink {
    pub id: i64,
    pub hearing_id: i64,
    pub utility_id: Option<i64>,
    pub raw_name: String,
    pub confidence: f64,
    pub needs_review: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HearingTopicLink {
    pub id: i64,
    pub hearing_id: i64,
    pub topic_id: Option<i64>,
    pub raw_name: String,
    pub confidence: f64,
    pub needs_review: bool,
    pub created_at: DateTime<Utc>,
}

/// Cross-process pause flag (spec §5: "the PipelineState table is the only
/// cross-process coordination channel"). Single row, id=1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub id: i64,
    pub paused: bool,
    pub updated_at: DateTime<Utc>,
}
