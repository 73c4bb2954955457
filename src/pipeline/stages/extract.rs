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

//! Extract stage: runs docket extraction over the transcript and links the
//! analysis's free-text utilities/topics against the canonical catalogues,
//! then marks the hearing complete. Docket extraction and entity linking
//! are both idempotent against re-runs (`known_dockets`/canonical tables are
//! looked up, not blindly re-inserted), so a retried extract stage is safe.

use std::collections::HashMap;

use crate::config::Config;
use crate::db::models::Hearing;
use crate::db::store::Store;
use crate::docket;
use crate::entity_linker;
use crate::error::StageResult;

pub async fn run(store: &Store, config: &Config, hearing: &Hearing) -> anyhow::Result<StageResult> {
    let Some(transcript) = store.get_transcript(hearing.id).await? else {
        return Ok(StageResult::failed(
            "no transcript found for a hearing in the extracting stage",
            false,
        ));
    };
    let Some(analysis) = store.get_analysis(hearing.id).await? else {
        return Ok(StageResult::failed(
            "no analysis found for a hearing in the extracting stage",
            false,
        ));
    };

    let state_code = store
        .get_state(hearing.state_id)
        .await?
        .map(|s| s.code)
        .unwrap_or_else(|| "XX".to_string());

    let text = format!("{}\n{}", hearing.title, transcript.full_text);
    let docket_outcome = docket::extract_and_link(store, &config.docket, hearing.id, &state_code, &text).await?;

    let utilities = string_array(&analysis.utilities_json);
    let topics = string_array(&analysis.topics_json);

    // The analyzer's utilities/topics fields are flat string arrays (spec §9
    // "JSON payload flexibility" leaves the Analysis JSON's internal shape to
    // the implementation); no per-mention role/relevance tag is available to
    // feed the §4.10 boost, so it's passed as `None` here.
    for utility in &utilities {
        entity_linker::link_utility(store, hearing.id, utility, None).await?;
    }
    for topic in &topics {
        entity_linker::link_topic(store, hearing.id, topic, None).await?;
    }

    store.complete_extraction(hearing.id).await?;

    let mut output = HashMap::new();
    output.insert("dockets_accepted".to_string(), serde_json::json!(docket_outcome.accepted));
    output.insert("dockets_needs_review".to_string(), serde_json::json!(docket_outcome.needs_review));
    output.insert("utilities_linked".to_string(), serde_json::json!(utilities.len()));
    output.insert("topics_linked".to_string(), serde_json::json!(topics.len()));
    Ok(StageResult::ok(output, 0.0))
}

fn string_array(raw: &Option<String>) -> Vec<String> {
    raw.as_deref()
        .and_then(|s| serde_json::from_str::<Vec<String>>(s).ok())
        .unwrap_or_default()
}
