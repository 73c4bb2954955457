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

//! Error taxonomy shared by every stage and adapter (spec §7).
//!
//! `CanaryError` classifies a failure into the kinds the orchestrator cares
//! about (retry or not); `anyhow::Result` is used at the glue layer (CLI
//! commands, orchestrator/scheduler loops) the same way the teacher's
//! `main.rs`/`ai.rs`/`audio.rs` lean on `anyhow::{Result, Context}`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum CanaryError {
    /// HTTP 429/5xx, subprocess timeout, provider rate limit. Stage-level
    /// retry is appropriate.
    #[error("transient upstream error: {0}")]
    Transient(String),

    /// Missing media URL, transcript too short, unparseable provider JSON.
    /// Not worth retrying.
    #[error("permanent input error: {0}")]
    PermanentInput(String),

    /// A stage left a partial artifact behind (e.g. transcription died
    /// mid-chunk); the caller must clean up before retrying.
    #[error("partial artifact: {0}")]
    PartialArtifact(String),

    /// Violated unique index, stale transaction: the current pass should
    /// retry from the hearing's current status.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),

    /// DB connectivity, disk full: bubble up, the run aborts but individual
    /// hearings are untouched.
    #[error("systemic error: {0}")]
    Systemic(#[from] sqlx::Error),

    /// Wrong stage requested, bad schedule grammar, unknown source kind:
    /// surfaced synchronously to whoever asked.
    #[error("logical error: {0}")]
    Logical(String),
}

impl CanaryError {
    pub fn should_retry(&self) -> bool {
        matches!(self, CanaryError::Transient(_) | CanaryError::DataIntegrity(_))
    }
}

/// Uniform return type every pipeline stage produces (spec §4.8/§7).
/// The orchestrator never re-interprets `should_retry`; it only bounds
/// retries globally via `PipelineJob.retry_count`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub success: bool,
    #[serde(default)]
    pub output: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub cost_usd: f64,
    #[serde(default = "default_true")]
    pub should_retry: bool,
    #[serde(default)]
    pub skip_remaining: bool,
}

fn default_true() -> bool {
    true
}

impl StageResult {
    pub fn ok(output: HashMap<String, serde_json::Value>, cost_usd: f64) -> Self {
        Self {
            success: true,
            output,
            error: None,
            cost_usd,
            should_retry: true,
            skip_remaining: false,
        }
    }

    pub fn failed(error: impl Into<String>, should_retry: bool) -> Self {
        Self {
            success: false,
            output: HashMap::new(),
            error: Some(truncate(&error.into(), 500)),
            cost_usd: 0.0,
            should_retry,
            skip_remaining: false,
        }
    }
}

/// Error messages are stored truncated (spec §4.2 step 3, §4.8 step 5, §7).
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
