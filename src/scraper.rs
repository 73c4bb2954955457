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

//! Scraper orchestrator (spec §4.2, C2). Walks every enabled source through
//! its adapter, upserts new hearings, and exposes an in-process progress
//! snapshot. Grounded on
//! `original_source/scripts/scraper_orchestrator.py`'s `ScraperProgress`
//! dataclass (status enum, truncated/capped error list, `to_dict`) and its
//! single-run-at-a-time `is_running` guard.

use parking_lot::Mutex;
use std::str::FromStr;
use std::sync::Arc;

use crate::adapters::{self, HearingCandidate};
use crate::db::store::{NewHearing, NewKnownDocket, Store};
use crate::docket::patterns;
use crate::types::SourceKind;

const MAX_TRACKED_ERRORS: usize = 20;
const MAX_ERROR_LEN: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScraperStatus {
    Idle,
    Running,
    Stopping,
    Completed,
    Error,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ScraperProgress {
    pub status: Option<ScraperStatus>,
    pub current_source: Option<String>,
    pub items_found: u32,
    pub new_hearings: u32,
    pub existing_hearings: u32,
    pub errors: Vec<String>,
}

impl ScraperProgress {
    fn add_error(&mut self, message: impl Into<String>) {
        let mut message = message.into();
        if message.chars().count() > MAX_ERROR_LEN {
            message = crate::error::truncate(&message, MAX_ERROR_LEN);
        }
        self.errors.push(message);
        if self.errors.len() > MAX_TRACKED_ERRORS {
            self.errors.remove(0);
        }
    }
}

/// Shared, lock-protected run state (spec §4.2: "at most one scrape runs at
/// a time; a second `scrape` invocation while one is active is rejected").
#[derive(Clone)]
pub struct ScraperOrchestrator {
    store: Arc<Store>,
    state: Arc<Mutex<ScraperProgress>>,
    stop_requested: Arc<Mutex<bool>>,
}

impl ScraperOrchestrator {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(ScraperProgress { status: Some(ScraperStatus::Idle), ..Default::default() })),
            stop_requested: Arc::new(Mutex::new(false)),
        }
    }

    pub fn progress(&self) -> ScraperProgress {
        self.state.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state.lock().status, Some(ScraperStatus::Running) | Some(ScraperStatus::Stopping))
    }

    pub fn request_stop(&self) {
        *self.stop_requested.lock() = true;
        self.state.lock().status = Some(ScraperStatus::Stopping);
    }

    /// Runs a full scrape pass across every enabled source, optionally
    /// restricted to a single state. Returns early with an error if a run
    /// is already active - callers should check `is_running()` first.
    pub async fn run(&self, state_code_filter: Option<&str>) -> anyhow::Result<ScraperProgress> {
        if self.is_running() {
            anyhow::bail!("a scrape is already in progress");
        }

        *self.stop_requested.lock() = false;
        {
            let mut state = self.state.lock();
            *state = ScraperProgress { status: Some(ScraperStatus::Running), ..Default::default() };
        }

        let sources = self.store.list_enabled_sources().await?;
        for source in sources {
            if *self.stop_requested.lock() {
                break;
            }

            if let Some(filter) = state_code_filter {
                if let Ok(Some(state)) = self.store.get_state(source.state_id).await {
                    if !state.code.eq_ignore_ascii_case(filter) {
                        continue;
                    }
                }
            }

            self.state.lock().current_source = Some(source.name.clone());

            let kind = match SourceKind::from_str(&source.source_type) {
                Ok(k) => k,
                Err(e) => {
                    self.state.lock().add_error(format!("{}: {e}", source.name));
                    continue;
                }
            };

            let found_any = if kind == SourceKind::ApiEndpoint {
                match self.discover_known_dockets(&source).await {
                    Ok(found_any) => found_any,
                    Err(e) => {
                        self.state.lock().add_error(format!("{}: {e}", source.name));
                        let _ = self.store.mark_source_error(source.id, &e.to_string()).await;
                        continue;
                    }
                }
            } else {
                let adapter = match adapters::for_kind(kind) {
                    Ok(a) => a,
                    Err(e) => {
                        self.state.lock().add_error(format!("{}: {e}", source.name));
                        let _ = self.store.mark_source_error(source.id, &e.to_string()).await;
                        continue;
                    }
                };
                let candidates = match adapter.list(&source).await {
                    Ok(c) => c,
                    Err(e) => {
                        self.state.lock().add_error(format!("{}: {e}", source.name));
                        let _ = self.store.mark_source_error(source.id, &e.to_string()).await;
                        continue;
                    }
                };

                self.state.lock().items_found += candidates.len() as u32;

                let mut found_any = false;
                for candidate in candidates {
                    match self.persist_candidate(&source, candidate).await {
                        Ok(true) => {
                            found_any = true;
                            self.state.lock().new_hearings += 1;
                        }
                        Ok(false) => {
                            self.state.lock().existing_hearings += 1;
                        }
                        Err(e) => {
                            self.state.lock().add_error(format!("{}: {e}", source.name));
                        }
                    }
                }
                found_any
            };

            let _ = self.store.mark_source_checked(source.id, found_any).await;
        }

        let mut state = self.state.lock();
        state.current_source = None;
        state.status = Some(if *self.stop_requested.lock() { ScraperStatus::Idle } else { ScraperStatus::Completed });
        Ok(state.clone())
    }

    /// Upserts one candidate as a hearing, returning `true` if it was new.
    /// `upsert_hearing` is idempotent on `(source_id, external_id)` and
    /// stamps `created_at`/`updated_at` identically on insert, so comparing
    /// the two after the call tells new from existing without a separate
    /// lookup query.
    async fn persist_candidate(&self, source: &crate::db::models::Source, candidate: HearingCandidate) -> anyhow::Result<bool> {
        let new = NewHearing {
            source_id: Some(source.id),
            state_id: source.state_id,
            external_id: candidate.external_id,
            title: candidate.title,
            description: candidate.description,
            hearing_date: candidate.hearing_date,
            hearing_type: candidate.hearing_type,
            utility_name: candidate.utility_name,
            docket_numbers: candidate.docket_numbers,
            source_url: candidate.source_url,
            video_url: candidate.video_url,
            duration_seconds: None,
        };

        let hearing = self.store.upsert_hearing(new).await?;
        Ok(hearing.created_at == hearing.updated_at)
    }

    /// Runs an `api_endpoint` source's docket-catalogue adapter and upserts
    /// each result into `known_dockets` (spec §4.1). Unlike
    /// `persist_candidate`, there is no hearing involved - these sources feed
    /// the docket-matching catalogue that `docket::extractor` fuzzy-matches
    /// transcript mentions against. Returns whether any docket was found.
    async fn discover_known_dockets(&self, source: &crate::db::models::Source) -> anyhow::Result<bool> {
        let adapter = adapters::docket_catalog_adapter(SourceKind::ApiEndpoint)?;
        let records = adapter.list_dockets(source).await?;
        self.state.lock().items_found += records.len() as u32;

        let state = self
            .store
            .get_state(source.state_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("source {} references an unknown state_id {}", source.name, source.state_id))?;

        let mut found_any = false;
        for record in records {
            let normalized_id = patterns::normalize(&state.code, &record.docket_number);
            let parsed = patterns::registry()
                .get(state.code.as_str())
                .map(|fmt| (fmt.parse)(&record.docket_number))
                .unwrap_or_default();

            let new = NewKnownDocket {
                state_id: source.state_id,
                docket_number: record.docket_number,
                normalized_id,
                year: parsed.year,
                case_number: parsed.case_number,
                suffix: parsed.suffix,
                utility_sector: record.utility_sector,
                title: record.title,
                utility_name: record.utility_name,
                filing_date: record.filing_date,
                status: record.status,
                case_type: record.case_type,
                source_url: record.source_url,
            };

            match self.store.upsert_known_docket(new).await {
                Ok(docket) => {
                    if docket.created_at == docket.updated_at {
                        found_any = true;
                        self.state.lock().new_hearings += 1;
                    } else {
                        self.state.lock().existing_hearings += 1;
                    }
                }
                Err(e) => self.state.lock().add_error(format!("{}: {e}", source.name)),
            }
        }
        Ok(found_any)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_caps_tracked_errors_at_twenty() {
        let mut progress = ScraperProgress::default();
        for i in 0..25 {
            progress.add_error(format!("error {i}"));
        }
        assert_eq!(progress.errors.len(), MAX_TRACKED_ERRORS);
        assert_eq!(progress.errors[0], "error 5");
    }

    #[test]
    fn progress_truncates_long_errors() {
        let mut progress = ScraperProgress::default();
        progress.add_error("x".repeat(1000));
        assert_eq!(progress.errors[0].len(), MAX_ERROR_LEN);
    }
}
