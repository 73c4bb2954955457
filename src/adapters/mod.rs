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

//! Source adapters (spec §4.1, C1, §9 "pluggable polymorphism"): one
//! implementation per `SourceKind`, registered by a table lookup rather than
//! a dynamic-dispatch service locator, the same pattern `docket/patterns.rs`
//! uses for per-state docket formats and the teacher's `plugin_system.rs`
//! uses for its `HashMap<String, Box<dyn Plugin>>` registry.

pub mod calendar;
pub mod rss;
pub mod vendor_api;
pub mod video_channel;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::db::models::Source;
use crate::types::SourceKind;

/// A hearing candidate surfaced by an adapter, not yet checked against
/// existing rows (spec §4.2 step 2 owns dedup).
#[derive(Debug, Clone, Default)]
pub struct HearingCandidate {
    pub external_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub hearing_date: Option<NaiveDate>,
    pub hearing_type: Option<String>,
    pub utility_name: Option<String>,
    pub docket_numbers: Vec<String>,
    pub source_url: Option<String>,
    pub video_url: Option<String>,
}

/// A docket-catalogue filing surfaced by the vendor-API adapter (spec
/// §4.1: "Returns DocketRecord for the KnownDocket catalogue rather than
/// hearings"). `state_id`/normalization are resolved by the caller, which
/// knows the source's state - the adapter itself is state-agnostic.
#[derive(Debug, Clone, Default)]
pub struct DocketRecord {
    pub docket_number: String,
    pub utility_sector: Option<String>,
    pub title: Option<String>,
    pub utility_name: Option<String>,
    pub filing_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub case_type: Option<String>,
    pub source_url: Option<String>,
}

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Lists every candidate currently visible at this source. Adapters do
    /// not paginate against a `since_marker` themselves - the scraper
    /// orchestrator dedups against `hearings.source_id + external_id`
    /// instead (spec §4.2 step 2), so a full listing each run is correct,
    /// if not the cheapest possible call.
    async fn list(&self, source: &Source) -> anyhow::Result<Vec<HearingCandidate>>;
}

/// A source that feeds the `KnownDocket` catalogue directly rather than
/// producing hearing candidates (spec §4.1, vendor-API family). Kept as a
/// separate trait rather than a second `SourceAdapter` method, since the
/// scraper orchestrator routes these sources down an entirely different
/// persistence path (`Store::upsert_known_docket`, not `upsert_hearing`).
#[async_trait]
pub trait DocketCatalogAdapter: Send + Sync {
    async fn list_dockets(&self, source: &Source) -> anyhow::Result<Vec<DocketRecord>>;
}

/// Looks up the hearing adapter for a source kind (spec §4.1's per-kind
/// dispatch). `ApiEndpoint` sources aren't hearing adapters at all - they're
/// routed through `docket_catalog_adapter` instead - so asking for one here
/// is a caller bug, not a runtime condition to recover from.
pub fn for_kind(kind: SourceKind) -> anyhow::Result<Box<dyn SourceAdapter>> {
    match kind {
        SourceKind::VideoChannel => Ok(Box::new(video_channel::VideoChannelAdapter)),
        SourceKind::AdminMonitor => Ok(Box::new(calendar::CalendarAdapter)),
        SourceKind::RssFeed => Ok(Box::new(rss::RssAdapter)),
        SourceKind::ApiEndpoint => anyhow::bail!(
            "api_endpoint sources feed the KnownDocket catalogue via docket_catalog_adapter, not the hearing pipeline"
        ),
    }
}

/// Looks up the docket-catalogue adapter for a source kind. Only
/// `ApiEndpoint` sources have one today.
pub fn docket_catalog_adapter(kind: SourceKind) -> anyhow::Result<Box<dyn DocketCatalogAdapter>> {
    match kind {
        SourceKind::ApiEndpoint => Ok(Box::new(vendor_api::VendorApiAdapter)),
        other => anyhow::bail!("source kind {other} has no docket-catalog adapter"),
    }
}

/// Shared helper: most adapter configs are small JSON objects in
/// `sources.config_json`. Reads a config key as a string, rather than every
/// adapter duplicating this parse-and-discard dance.
pub(crate) fn config_str(source: &Source, key: &str) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(&source.config_json).ok()?;
    parsed.get(key)?.as_str().map(String::from)
}
