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

//! Per-stage runners the pipeline orchestrator dispatches into. Each one
//! wraps the matching processing module (`media`, `transcriber`, `analyzer`,
//! `docket`) and is responsible for persisting its own success - the
//! orchestrator only reacts to the returned `StageResult`'s failure case.

mod analyze;
mod download;
mod extract;
mod transcribe;

use crate::config::Config;
use crate::db::models::Hearing;
use crate::db::store::Store;
use crate::error::StageResult;
use crate::types::StageName;

pub async fn run_stage(
    store: &Store,
    config: &Config,
    hearing: &Hearing,
    stage: StageName,
) -> anyhow::Result<StageResult> {
    match stage {
        StageName::Download => download::run(store, config, hearing).await,
        StageName::Transcribe => transcribe::run(store, config, hearing).await,
        StageName::Analyze => analyze::run(store, config, hearing).await,
        StageName::Extract => extract::run(store, config, hearing).await,
    }
}
