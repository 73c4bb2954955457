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

//! Pipeline orchestrator (spec §4.8, C8). Drives each actionable hearing
//! through the `download -> transcribe -> analyze -> extract` stage chain
//! one status transition per pass, bounded by a per-run cost cap and a
//! per-hearing retry cap, and respects the cross-process `PipelineState`
//! pause flag (spec §5).

pub mod stage;
pub mod stages;

use std::sync::Arc;

use crate::config::{Config, OrchestratorConfig};
use crate::db::store::Store;
use crate::types::{HearingStatus, StageName};

/// Summary of one orchestrator pass, returned to the CLI/scheduler caller.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PipelineRunSummary {
    pub hearings_processed: u32,
    pub stages_run: u32,
    pub stages_failed: u32,
    pub total_cost_usd: f64,
    pub stopped_on_cost_cap: bool,
}

/// Per-run filters (spec §4.8 step 1: "restricted by optional filters:
/// state subset, only-stage, max cost per run, max hearings").
#[derive(Debug, Clone, Default)]
pub struct PipelineFilters {
    pub state_code: Option<String>,
    pub only_stage: Option<StageName>,
    pub max_cost_per_run: Option<f64>,
    pub max_hearings: Option<u32>,
}

pub struct PipelineOrchestrator {
    store: Arc<Store>,
    config: Arc<Config>,
}

impl PipelineOrchestrator {
    pub fn new(store: Arc<Store>, config: Arc<Config>) -> Self {
        Self { store, config }
    }

    /// Runs one pass over actionable hearings with no filters applied.
    pub async fn run_once(&self) -> anyhow::Result<PipelineRunSummary> {
        self.run_filtered(&PipelineFilters::default()).await
    }

    /// Runs one pass over actionable hearings, oldest `updated_at` first
    /// (spec §4.8 step 1), stopping early if the pause flag is set or the
    /// run's accumulated cost exceeds `max_cost_per_run`. `filters.only_stage`
    /// processes exactly one stage per hearing then leaves the rest of that
    /// hearing's chain for the next run, per spec §4.8 step 1's "only-stage"
    /// filter.
    pub async fn run_filtered(&self, filters: &PipelineFilters) -> anyhow::Result<PipelineRunSummary> {
        let mut summary = PipelineRunSummary::default();

        if self.store.is_paused().await? {
            return Ok(summary);
        }

        let orchestrator_cfg: &OrchestratorConfig = &self.config.orchestrator;
        let max_cost = filters.max_cost_per_run.unwrap_or(orchestrator_cfg.max_cost_per_run);
        let max_hearings = filters.max_hearings.unwrap_or(orchestrator_cfg.max_hearings_per_run);
        let hearings = self
            .store
            .hearings_for_pipeline(max_hearings, filters.state_code.as_deref())
            .await?;

        for hearing in hearings {
            if summary.total_cost_usd >= max_cost {
                summary.stopped_on_cost_cap = true;
                break;
            }
            if self.store.is_paused().await? {
                break;
            }

            let status: HearingStatus = match hearing.status.parse() {
                Ok(s) => s,
                Err(_) => continue,
            };
            if !status.is_actionable() {
                continue;
            }

            let Some(stage_name) = stage::stage_for_status(status) else {
                // Rest state (e.g. `transcribed`, waiting to start `analyzing`) -
                // no stage owns it, just advance past it.
                if let Some(next) = status.next_on_success() {
                    self.store.advance_status(hearing.id, next).await?;
                }
                continue;
            };

            if let Some(only_stage) = filters.only_stage {
                if only_stage != stage_name {
                    continue;
                }
            }

            let retries = self.store.retry_count(hearing.id, stage_name).await?;
            if retries >= orchestrator_cfg.max_retries as i64 {
                self.store.mark_error(hearing.id, "exceeded max retries").await?;
                summary.hearings_processed += 1;
                continue;
            }

            let result = stages::run_stage(&self.store, &self.config, &hearing, stage_name).await?;

            summary.stages_run += 1;
            summary.total_cost_usd += result.cost_usd;
            if !result.success {
                summary.stages_failed += 1;
            }

            self.store.record_job(hearing.id, stage_name, &result).await?;

            // On success the stage function has already persisted its output
            // and the resulting status in one transaction (e.g. `save_transcript`
            // writes the transcript and advances to `transcribed` together) -
            // the orchestrator only needs to react to failure here.
            if !result.success && !result.should_retry {
                self.store.mark_error(hearing.id, result.error.as_deref().unwrap_or("stage failed")).await?;
            }
            // else: leave status as-is, the next pass retries the same stage.

            summary.hearings_processed += 1;
        }

        Ok(summary)
    }

    /// One-shot synchronous single-stage run against one hearing (spec §6.3
    /// `pipeline.run_stage`).
    pub async fn run_stage(&self, hearing_id: i64, stage: StageName) -> anyhow::Result<crate::error::StageResult> {
        let hearing = self
            .store
            .get_hearing(hearing_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("no such hearing: {hearing_id}"))?;

        let result = stages::run_stage(&self.store, &self.config, &hearing, stage).await?;
        self.store.record_job(hearing.id, stage, &result).await?;
        if !result.success && !result.should_retry {
            self.store.mark_error(hearing.id, result.error.as_deref().unwrap_or("stage failed")).await?;
        }
        Ok(result)
    }
}
