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

//! Download stage: fetches a hearing's source audio via `media::fetch` and,
//! on success, records the fetched URL and duration - advancing the hearing
//! straight to `transcribing` in the same call (`Store::complete_download`).

use crate::config::Config;
use crate::db::models::Hearing;
use crate::db::store::Store;
use crate::error::StageResult;
use crate::media;

pub async fn run(store: &Store, config: &Config, hearing: &Hearing) -> anyhow::Result<StageResult> {
    let result = media::fetch(&config.audio_dir, hearing).await?;
    if !result.success {
        return Ok(result);
    }

    let duration_seconds = result
        .output
        .get("duration_seconds")
        .and_then(|v| v.as_i64());

    let video_url = hearing
        .video_url
        .as_deref()
        .or(hearing.source_url.as_deref())
        .unwrap_or_default();

    store.complete_download(hearing.id, video_url, duration_seconds).await?;
    Ok(result)
}
