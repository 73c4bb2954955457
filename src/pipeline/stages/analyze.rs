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

//! Analyze stage: the existing-analysis short-circuit `Analyzer` itself
//! can't perform (spec §4.6 step 1) lives here, since this is the layer
//! that holds the `Store`. A hearing that somehow reaches `analyzing` with
//! an analysis already on file (e.g. re-queued after a later stage failed)
//! costs nothing to skip.

use std::collections::HashMap;

use crate::analyzer::Analyzer;
use crate::config::Config;
use crate::db::models::Hearing;
use crate::db::store::Store;
use crate::error::StageResult;

pub async fn run(store: &Store, config: &Config, hearing: &Hearing) -> anyhow::Result<StageResult> {
    if store.get_analysis(hearing.id).await?.is_some() {
        store.advance_status(hearing.id, crate::types::HearingStatus::Analyzed).await?;
        return Ok(StageResult::ok(HashMap::new(), 0.0));
    }

    let Some(transcript) = store.get_transcript(hearing.id).await? else {
        return Ok(StageResult::failed(
            "no transcript found for a hearing in the analyzing stage",
            false,
        ));
    };

    let state_code = store
        .get_state(hearing.state_id)
        .await?
        .map(|s| s.code)
        .unwrap_or_else(|| "XX".to_string());

    let analyzer = Analyzer::new(config.providers.clone());
    let outcome = analyzer.analyze(&hearing.title, &state_code, &transcript.full_text).await?;

    let analysis = match outcome {
        Ok(a) => a,
        Err(failed) => return Ok(failed),
    };

    let cost_usd = analysis.cost_usd;
    store.save_analysis(hearing.id, analysis).await?;

    Ok(StageResult::ok(HashMap::new(), cost_usd))
}
