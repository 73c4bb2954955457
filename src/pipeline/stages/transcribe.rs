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

//! Transcribe stage: locates the cached audio the download stage wrote
//! (by re-deriving its content-addressed path - no path is stored on the
//! Hearing row) and runs it through `Transcriber`, persisting the full
//! transcript and segments on success.

use std::collections::HashMap;

use crate::config::Config;
use crate::db::models::Hearing;
use crate::db::store::Store;
use crate::error::StageResult;
use crate::media;
use crate::transcriber::Transcriber;

pub async fn run(store: &Store, config: &Config, hearing: &Hearing) -> anyhow::Result<StageResult> {
    let Some(audio_path) = media::find_cached(&config.audio_dir, hearing) else {
        return Ok(StageResult::failed(
            "no cached audio file found for a hearing in the transcribing stage",
            false,
        ));
    };

    let state_code = store
        .get_state(hearing.state_id)
        .await?
        .map(|s| s.code)
        .unwrap_or_else(|| "XX".to_string());

    let transcriber = Transcriber::new(config.providers.clone());
    let outcome = transcriber.transcribe(&audio_path, &state_code, &hearing.title).await?;

    let output = match outcome {
        Ok(output) => output,
        Err(failed) => return Ok(failed),
    };

    let word_count = output.full_text.split_whitespace().count() as i64;
    store
        .save_transcript(
            hearing.id,
            &output.full_text,
            word_count,
            &output.segments,
            output.provider.to_string().as_str(),
            output.cost_usd,
        )
        .await?;

    let mut result_output = HashMap::new();
    result_output.insert("word_count".to_string(), serde_json::json!(word_count));
    result_output.insert("provider".to_string(), serde_json::json!(output.provider.to_string()));
    Ok(StageResult::ok(result_output, output.cost_usd))
}
