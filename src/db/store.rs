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

//! The Hearing Store (spec §4.3): typed operations over the schema in
//! `schema.sql`, each one either a single statement or a short transaction.
//! Nothing upstream of this module writes SQL directly.

use anyhow::Context as _;
use chrono::Utc;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::Row;

use crate::error::CanaryError;
use crate::types::HearingStatus;

use super::models::*;
use super::{format_dt, format_dt_opt, format_date_opt, parse_date_opt, parse_dt, parse_dt_opt};

pub type DbResult<T> = Result<T, CanaryError>;

fn integrity<E: std::fmt::Display>(e: E) -> CanaryError {
    CanaryError::DataIntegrity(e.to_string())
}

#[derive(Clone)]
pub struct Store {
    pool: sqlx::AnyPool,
}

impl Store {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await
            .context("failed to connect to database")?;
        let store = Self { pool };
        super::apply_schema(&store.pool).await?;
        store.ensure_pipeline_state_row().await?;
        Ok(store)
    }

    async fn ensure_pipeline_state_row(&self) -> anyhow::Result<()> {
        let row: Option<AnyRow> = sqlx::query("SELECT id FROM pipeline_state WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        if row.is_none() {
            sqlx::query("INSERT INTO pipeline_state (id, paused, updated_at) VALUES (1, false, ?)")
                .bind(format_dt(Utc::now()))
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    // ---- states / sources -------------------------------------------------

    pub async fn upsert_state(&self, code: &str, name: &str, commission_name: Option<&str>) -> DbResult<State> {
        if let Some(existing) = self.get_state_by_code(code).await? {
            return Ok(existing);
        }
        let now = format_dt(Utc::now());
        let id: i64 = sqlx::query(
            "INSERT INTO states (code, name, commission_name, created_at) VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(code)
        .bind(name)
        .bind(commission_name)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?
        .try_get(0)?;
        Ok(State {
            id,
            code: code.to_string(),
            name: name.to_string(),
            commission_name: commission_name.map(str::to_string),
            created_at: parse_dt(&now).map_err(integrity)?,
        })
    }

    pub async fn get_state_by_code(&self, code: &str) -> DbResult<Option<State>> {
        let row = sqlx::query("SELECT id, code, name, commission_name, created_at FROM states WHERE code = ?")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| state_from_row(&r)).transpose().map_err(integrity)
    }

    pub async fn get_state(&self, id: i64) -> DbResult<Option<State>> {
        let row = sqlx::query("SELECT id, code, name, commission_name, created_at FROM states WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| state_from_row(&r)).transpose().map_err(integrity)
    }

    pub async fn list_enabled_sources(&self) -> DbResult<Vec<Source>> {
        let rows = sqlx::query(
            "SELECT id, state_id, name, source_type, url, config_json, enabled, check_frequency_hours, \
             last_checked_at, last_hearing_at, status, error_message, created_at, updated_at \
             FROM sources WHERE enabled = true",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(source_from_row).collect::<anyhow::Result<_>>().map_err(integrity)
    }

    pub async fn mark_source_checked(&self, source_id: i64, found_hearing: bool) -> DbResult<()> {
        let now = format_dt(Utc::now());
        if found_hearing {
            sqlx::query(
                "UPDATE sources SET last_checked_at = ?, last_hearing_at = ?, status = 'active', \
                 error_message = NULL, updated_at = ? WHERE id = ?",
            )
            .bind(&now)
            .bind(&now)
            .bind(&now)
            .bind(source_id)
        } else {
            sqlx::query(
                "UPDATE sources SET last_checked_at = ?, status = 'active', error_message = NULL, \
                 updated_at = ? WHERE id = ?",
            )
            .bind(&now)
            .bind(&now)
            .bind(source_id)
        }
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn mark_source_error(&self, source_id: i64, message: &str) -> DbResult<()> {
        let now = format_dt(Utc::now());
        sqlx::query("UPDATE sources SET status = 'error', error_message = ?, updated_at = ? WHERE id = ?")
            .bind(crate::error::truncate(message, 500))
            .bind(&now)
            .bind(source_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Registers a new ingestion endpoint (spec §3 Source: "operator-managed").
    pub async fn create_source(&self, new: NewSource) -> DbResult<Source> {
        let now = format_dt(Utc::now());
        let id: i64 = sqlx::query(
            "INSERT INTO sources (state_id, name, source_type, url, config_json, enabled, \
             check_frequency_hours, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?, ?) RETURNING id",
        )
        .bind(new.state_id)
        .bind(&new.name)
        .bind(new.source_type.to_string())
        .bind(&new.url)
        .bind(&new.config_json)
        .bind(new.enabled)
        .bind(new.check_frequency_hours)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?
        .try_get("id")
        .map_err(integrity)?;

        self.get_source(id).await?.ok_or_else(|| integrity("source vanished after insert"))
    }

    pub async fn get_source(&self, id: i64) -> DbResult<Option<Source>> {
        let row = sqlx::query(
            "SELECT id, state_id, name, source_type, url, config_json, enabled, check_frequency_hours, \
             last_checked_at, last_hearing_at, status, error_message, created_at, updated_at \
             FROM sources WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| source_from_row(&r)).transpose().map_err(integrity)
    }

    pub async fn list_sources(&self) -> DbResult<Vec<Source>> {
        let rows = sqlx::query(
            "SELECT id, state_id, name, source_type, url, config_json, enabled, check_frequency_hours, \
             last_checked_at, last_hearing_at, status, error_message, created_at, updated_at \
             FROM sources ORDER BY state_id, name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(source_from_row).collect::<anyhow::Result<_>>().map_err(integrity)
    }

    // ---- hearings -----------------------------------------------------------

    /// Upserts a Hearing keyed by `(source_id, external_id)` (spec §4.3). A
    /// matching row's mutable fields are refreshed; a new one is inserted
    /// `discovered`. Returns the row as it stands after the write.
    pub async fn upsert_hearing(&self, new: NewHearing) -> DbResult<Hearing> {
        let existing = sqlx::query(
            "SELECT id FROM hearings WHERE source_id IS ? AND external_id IS ?",
        )
        .bind(new.source_id)
        .bind(&new.external_id)
        .fetch_optional(&self.pool)
        .await?;

        let now = format_dt(Utc::now());
        let docket_json = serde_json::to_string(&new.docket_numbers).unwrap_or_else(|_| "[]".to_string());

        let id = if let Some(row) = existing {
            let id: i64 = row.try_get(0)?;
            sqlx::query(
                "UPDATE hearings SET title = ?, description = ?, hearing_date = ?, hearing_type = ?, \
                 utility_name = ?, docket_numbers_json = ?, source_url = ?, video_url = ?, \
                 duration_seconds = ?, updated_at = ? WHERE id = ?",
            )
            .bind(&new.title)
            .bind(&new.description)
            .bind(format_date_opt(new.hearing_date))
            .bind(&new.hearing_type)
            .bind(&new.utility_name)
            .bind(&docket_json)
            .bind(&new.source_url)
            .bind(&new.video_url)
            .bind(new.duration_seconds)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;
            id
        } else {
            sqlx::query(
                "INSERT INTO hearings (source_id, state_id, external_id, title, description, hearing_date, \
                 hearing_type, utility_name, docket_numbers_json, source_url, video_url, duration_seconds, \
                 status, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'discovered', ?, ?) RETURNING id",
            )
            .bind(new.source_id)
            .bind(new.state_id)
            .bind(&new.external_id)
            .bind(&new.title)
            .bind(&new.description)
            .bind(format_date_opt(new.hearing_date))
            .bind(&new.hearing_type)
            .bind(&new.utility_name)
            .bind(&docket_json)
            .bind(&new.source_url)
            .bind(&new.video_url)
            .bind(new.duration_seconds)
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?
        };

        self.get_hearing(id).await?.ok_or_else(|| CanaryError::Logical("hearing vanished after upsert".into()))
    }

    pub async fn get_hearing(&self, id: i64) -> DbResult<Option<Hearing>> {
        let row = sqlx::query(
            "SELECT id, source_id, state_id, external_id, title, description, hearing_date, hearing_type, \
             utility_name, docket_numbers_json, source_url, video_url, duration_seconds, status, \
             created_at, updated_at FROM hearings WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| hearing_from_row(&r)).transpose().map_err(integrity)
    }

    /// Hearings the pipeline can still act on (spec §4.8 step 1): any
    /// non-terminal status, oldest `updated_at` first, bounded by the
    /// per-run cap the caller passes.
    /// Actionable hearings, oldest `updated_at` first (spec §4.8 step 1),
    /// optionally restricted to a single state code.
    pub async fn hearings_for_pipeline(&self, limit: u32, state_code: Option<&str>) -> DbResult<Vec<Hearing>> {
        let rows = if let Some(code) = state_code {
            sqlx::query(
                "SELECT h.id, h.source_id, h.state_id, h.external_id, h.title, h.description, h.hearing_date, \
                 h.hearing_type, h.utility_name, h.docket_numbers_json, h.source_url, h.video_url, \
                 h.duration_seconds, h.status, h.created_at, h.updated_at \
                 FROM hearings h JOIN states s ON s.id = h.state_id \
                 WHERE h.status NOT IN ('complete', 'error', 'skipped') AND s.code = ? \
                 ORDER BY h.updated_at ASC LIMIT ?",
            )
            .bind(code)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, source_id, state_id, external_id, title, description, hearing_date, hearing_type, \
                 utility_name, docket_numbers_json, source_url, video_url, duration_seconds, status, \
                 created_at, updated_at FROM hearings \
                 WHERE status NOT IN ('complete', 'error', 'skipped') \
                 ORDER BY updated_at ASC LIMIT ?",
            )
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?
        };
        rows.iter().map(hearing_from_row).collect::<anyhow::Result<_>>().map_err(integrity)
    }

    async fn set_hearing_status(&self, hearing_id: i64, status: HearingStatus) -> DbResult<()> {
        sqlx::query("UPDATE hearings SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(format_dt(Utc::now()))
            .bind(hearing_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Download stage success: records the resolved media URL/duration and
    /// advances `discovered|downloading -> transcribing` atomically.
    pub async fn complete_download(&self, hearing_id: i64, video_url: &str, duration_seconds: Option<i64>) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE hearings SET video_url = ?, duration_seconds = ?, status = ?, updated_at = ? WHERE id = ?")
            .bind(video_url)
            .bind(duration_seconds)
            .bind(HearingStatus::Transcribing.to_string())
            .bind(format_dt(Utc::now()))
            .bind(hearing_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Transcription stage success: writes the Transcript and its Segments
    /// and advances the hearing to `transcribed`, all in one transaction so
    /// a crash mid-write never leaves a transcript without segments or a
    /// status claiming more progress than was actually saved.
    pub async fn save_transcript(
        &self,
        hearing_id: i64,
        full_text: &str,
        word_count: i64,
        segments: &[NewSegment],
        model: &str,
        cost_usd: f64,
    ) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;
        let now = format_dt(Utc::now());
        let transcript_id: i64 = sqlx::query(
            "INSERT INTO transcripts (hearing_id, full_text, word_count, model, cost_usd, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(hearing_id)
        .bind(full_text)
        .bind(word_count)
        .bind(model)
        .bind(cost_usd)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await?
        .try_get(0)?;

        for seg in segments {
            sqlx::query(
                "INSERT INTO segments (hearing_id, transcript_id, segment_index, start_time, end_time, text, \
                 speaker, speaker_role, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(hearing_id)
            .bind(transcript_id)
            .bind(seg.segment_index)
            .bind(seg.start_time)
            .bind(seg.end_time)
            .bind(&seg.text)
            .bind(&seg.speaker)
            .bind(&seg.speaker_role)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE hearings SET status = ?, updated_at = ? WHERE id = ?")
            .bind(HearingStatus::Transcribed.to_string())
            .bind(&now)
            .bind(hearing_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(transcript_id)
    }

    /// Analysis stage success: writes the Analysis row and advances the
    /// hearing to `analyzed`.
    pub async fn save_analysis(&self, hearing_id: i64, analysis: NewAnalysis) -> DbResult<i64> {
        let mut tx = self.pool.begin().await?;
        let now = format_dt(Utc::now());
        let id: i64 = sqlx::query(
            "INSERT INTO analyses (hearing_id, summary, one_sentence_summary, hearing_type, utility_name, \
             participants_json, issues_json, commitments_json, vulnerabilities_json, \
             commissioner_concerns_json, commissioner_mood, public_comments, public_sentiment, \
             likely_outcome, outcome_confidence, risk_factors_json, action_items_json, quotes_json, \
             topics_json, utilities_json, dockets_json, model, cost_usd, confidence_score, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(hearing_id)
        .bind(&analysis.summary)
        .bind(&analysis.one_sentence_summary)
        .bind(&analysis.hearing_type)
        .bind(&analysis.utility_name)
        .bind(&analysis.participants_json)
        .bind(&analysis.issues_json)
        .bind(&analysis.commitments_json)
        .bind(&analysis.vulnerabilities_json)
        .bind(&analysis.commissioner_concerns_json)
        .bind(&analysis.commissioner_mood)
        .bind(&analysis.public_comments)
        .bind(&analysis.public_sentiment)
        .bind(&analysis.likely_outcome)
        .bind(analysis.outcome_confidence)
        .bind(&analysis.risk_factors_json)
        .bind(&analysis.action_items_json)
        .bind(&analysis.quotes_json)
        .bind(&analysis.topics_json)
        .bind(&analysis.utilities_json)
        .bind(&analysis.dockets_json)
        .bind(&analysis.model)
        .bind(analysis.cost_usd)
        .bind(analysis.confidence_score)
        .bind(&now)
        .fetch_one(&mut *tx)
        .await?
        .try_get(0)?;

        sqlx::query("UPDATE hearings SET status = ?, updated_at = ? WHERE id = ?")
            .bind(HearingStatus::Analyzed.to_string())
            .bind(&now)
            .bind(hearing_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(id)
    }

    pub async fn get_transcript(&self, hearing_id: i64) -> DbResult<Option<Transcript>> {
        let row = sqlx::query(
            "SELECT id, hearing_id, full_text, word_count, model, cost_usd, created_at \
             FROM transcripts WHERE hearing_id = ?",
        )
        .bind(hearing_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| transcript_from_row(&r)).transpose().map_err(integrity)
    }

    pub async fn get_analysis(&self, hearing_id: i64) -> DbResult<Option<Analysis>> {
        let row = sqlx::query(
            "SELECT id, hearing_id, summary, one_sentence_summary, hearing_type, utility_name, \
             participants_json, issues_json, commitments_json, vulnerabilities_json, \
             commissioner_concerns_json, commissioner_mood, public_comments, public_sentiment, \
             likely_outcome, outcome_confidence, risk_factors_json, action_items_json, quotes_json, \
             topics_json, utilities_json, dockets_json, model, cost_usd, confidence_score, created_at \
             FROM analyses WHERE hearing_id = ?",
        )
        .bind(hearing_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| analysis_from_row(&r)).transpose().map_err(integrity)
    }

    /// Extraction stage success: docket/entity rows are written by the
    /// caller through their own upsert methods first; this just advances
    /// the hearing's terminal status.
    pub async fn complete_extraction(&self, hearing_id: i64) -> DbResult<()> {
        self.set_hearing_status(hearing_id, HearingStatus::Complete).await
    }

    pub async fn mark_error(&self, hearing_id: i64, message: &str) -> DbResult<()> {
        sqlx::query("UPDATE hearings SET status = 'error', updated_at = ? WHERE id = ?")
            .bind(format_dt(Utc::now()))
            .bind(hearing_id)
            .execute(&self.pool)
            .await?;
        tracing::warn!(hearing_id, message, "hearing moved to error");
        Ok(())
    }

    pub async fn mark_skipped(&self, hearing_id: i64) -> DbResult<()> {
        self.set_hearing_status(hearing_id, HearingStatus::Skipped).await
    }

    pub async fn advance_status(&self, hearing_id: i64, status: HearingStatus) -> DbResult<()> {
        self.set_hearing_status(hearing_id, status).await
    }

    /// Deletes a Hearing and every row that references it (spec §3: Transcript,
    /// Segment, Analysis, PipelineJob, HearingDocket cascade). `Any` doesn't
    /// give us `ON DELETE CASCADE` portably, so the children go first,
    /// oldest dependency last, inside one transaction.
    pub async fn delete_hearing_cascade(&self, hearing_id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        for table in [
            "hearing_dockets",
            "hearing_utility_links",
            "hearing_topic_links",
            "extracted_dockets",
            "pipeline_jobs",
            "segments",
        ] {
            sqlx::query(&format!("DELETE FROM {table} WHERE hearing_id = ?"))
                .bind(hearing_id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("DELETE FROM analyses WHERE hearing_id = ?")
            .bind(hearing_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM transcripts WHERE hearing_id = ?")
            .bind(hearing_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM hearings WHERE id = ?")
            .bind(hearing_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    // ---- pipeline jobs --------------------------------------------------

    /// Records a stage attempt's `StageResult` (spec §4.8 step 5): one row
    /// per attempt, `retry_count` carried forward from the prior attempt for
    /// this hearing+stage so the orchestrator can bound retries globally.
    pub async fn record_job(
        &self,
        hearing_id: i64,
        stage: crate::types::StageName,
        result: &crate::error::StageResult,
    ) -> DbResult<i64> {
        let prior_retries: i64 = sqlx::query(
            "SELECT COALESCE(MAX(retry_count), -1) FROM pipeline_jobs WHERE hearing_id = ? AND stage = ?",
        )
        .bind(hearing_id)
        .bind(stage.to_string())
        .fetch_one(&self.pool)
        .await?
        .try_get(0)?;
        let retry_count = if result.success { 0 } else { prior_retries + 1 };

        let now = format_dt(Utc::now());
        let status = if result.success { "complete" } else { "failed" };
        let metadata_json = serde_json::to_string(&result.output).unwrap_or_else(|_| "{}".to_string());
        let id: i64 = sqlx::query(
            "INSERT INTO pipeline_jobs (hearing_id, stage, status, started_at, completed_at, error_message, \
             retry_count, cost_usd, metadata_json, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(hearing_id)
        .bind(stage.to_string())
        .bind(status)
        .bind(&now)
        .bind(&now)
        .bind(&result.error)
        .bind(retry_count)
        .bind(result.cost_usd)
        .bind(&metadata_json)
        .bind(&now)
        .bind(&now)
        .fetch_one(&self.pool)
        .await?
        .try_get(0)?;
        Ok(id)
    }

    pub async fn retry_count(&self, hearing_id: i64, stage: crate::types::StageName) -> DbResult<i64> {
        let count: i64 = sqlx::query(
            "SELECT COALESCE(MAX(retry_count), 0) FROM pipeline_jobs WHERE hearing_id = ? AND stage = ?",
        )
        .bind(hearing_id)
        .bind(stage.to_string())
        .fetch_one(&self.pool)
        .await?
        .try_get(0)?;
        Ok(count)
    }

    // ---- dockets ----------------------------------------------------------

    /// Upserts a catalogue entry keyed by `(state, normalized_id)` (spec
    /// §4.3). Catalogue rows are append-mostly; a repeat sighting refreshes
    /// the mutable descriptive fields only.
    pub async fn upsert_known_docket(&self, new: NewKnownDocket) -> DbResult<KnownDocket> {
        let existing = sqlx::query("SELECT id FROM known_dockets WHERE state_id = ? AND normalized_id = ?")
            .bind(new.state_id)
            .bind(&new.normalized_id)
            .fetch_optional(&self.pool)
            .await?;
        let now = format_dt(Utc::now());
        let id = if let Some(row) = existing {
            let id: i64 = row.try_get(0)?;
            sqlx::query(
                "UPDATE known_dockets SET title = COALESCE(?, title), utility_name = COALESCE(?, utility_name), \
                 status = COALESCE(?, status), case_type = COALESCE(?, case_type), updated_at = ? WHERE id = ?",
            )
            .bind(&new.title)
            .bind(&new.utility_name)
            .bind(&new.status)
            .bind(&new.case_type)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;
            id
        } else {
            sqlx::query(
                "INSERT INTO known_dockets (state_id, docket_number, normalized_id, year, case_number, suffix, \
                 utility_sector, title, utility_name, filing_date, status, case_type, source_url, created_at, \
                 updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
            )
            .bind(new.state_id)
            .bind(&new.docket_number)
            .bind(&new.normalized_id)
            .bind(new.year)
            .bind(new.case_number)
            .bind(&new.suffix)
            .bind(&new.utility_sector)
            .bind(&new.title)
            .bind(&new.utility_name)
            .bind(format_date_opt(new.filing_date))
            .bind(&new.status)
            .bind(&new.case_type)
            .bind(&new.source_url)
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?
        };
        self.get_known_docket(id).await?.ok_or_else(|| CanaryError::Logical("known docket vanished".into()))
    }

    pub async fn get_known_docket(&self, id: i64) -> DbResult<Option<KnownDocket>> {
        let row = sqlx::query(
            "SELECT id, state_id, docket_number, normalized_id, year, case_number, suffix, utility_sector, \
             title, utility_name, filing_date, status, case_type, source_url, created_at, updated_at \
             FROM known_dockets WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| known_docket_from_row(&r)).transpose().map_err(integrity)
    }

    pub async fn known_dockets_for_state(&self, state_id: i64) -> DbResult<Vec<KnownDocket>> {
        let rows = sqlx::query(
            "SELECT id, state_id, docket_number, normalized_id, year, case_number, suffix, utility_sector, \
             title, utility_name, filing_date, status, case_type, source_url, created_at, updated_at \
             FROM known_dockets WHERE state_id = ?",
        )
        .bind(state_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(known_docket_from_row).collect::<anyhow::Result<_>>().map_err(integrity)
    }

    /// Upserts a sighted-in-the-wild docket keyed by `normalized_id` within a
    /// state, bumping `mention_count` and `last_mentioned_at` on repeats
    /// (spec §4.3/§4.7 step 8).
    pub async fn upsert_docket(&self, new: NewDocket) -> DbResult<Docket> {
        let existing = sqlx::query("SELECT id, mention_count FROM dockets WHERE state_id = ? AND normalized_id = ?")
            .bind(new.state_id)
            .bind(&new.normalized_id)
            .fetch_optional(&self.pool)
            .await?;
        let now = format_dt(Utc::now());
        let id = if let Some(row) = existing {
            let id: i64 = row.try_get(0)?;
            let mention_count: i64 = row.try_get(1)?;
            sqlx::query(
                "UPDATE dockets SET last_mentioned_at = ?, mention_count = ?, \
                 confidence = CASE WHEN ? = 'verified' THEN 'verified' ELSE confidence END, \
                 known_docket_id = COALESCE(?, known_docket_id), match_score = COALESCE(?, match_score), \
                 updated_at = ? WHERE id = ?",
            )
            .bind(&now)
            .bind(mention_count + 1)
            .bind(&new.confidence)
            .bind(new.known_docket_id)
            .bind(new.match_score)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;
            id
        } else {
            sqlx::query(
                "INSERT INTO dockets (state_id, docket_number, normalized_id, title, company, sector, status, \
                 first_seen_at, last_mentioned_at, mention_count, confidence, known_docket_id, match_score, \
                 created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?, ?) RETURNING id",
            )
            .bind(new.state_id)
            .bind(&new.docket_number)
            .bind(&new.normalized_id)
            .bind(&new.title)
            .bind(&new.company)
            .bind(&new.sector)
            .bind(&new.status)
            .bind(&now)
            .bind(&now)
            .bind(&new.confidence)
            .bind(new.known_docket_id)
            .bind(new.match_score)
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?
        };
        self.get_docket(id).await?.ok_or_else(|| CanaryError::Logical("docket vanished".into()))
    }

    pub async fn get_docket(&self, id: i64) -> DbResult<Option<Docket>> {
        let row = sqlx::query(
            "SELECT id, state_id, docket_number, normalized_id, title, company, sector, status, first_seen_at, \
             last_mentioned_at, mention_count, confidence, known_docket_id, match_score, created_at, updated_at \
             FROM dockets WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| docket_from_row(&r)).transpose().map_err(integrity)
    }

    /// Links a hearing to a docket keyed by the pair (spec §4.3), updating
    /// the confidence/review fields in place on a repeat link rather than
    /// duplicating the row.
    pub async fn link_hearing_docket(&self, new: NewHearingDocket) -> DbResult<()> {
        let existing = sqlx::query("SELECT id FROM hearing_dockets WHERE hearing_id = ? AND docket_id = ?")
            .bind(new.hearing_id)
            .bind(new.docket_id)
            .fetch_optional(&self.pool)
            .await?;
        if let Some(row) = existing {
            let id: i64 = row.try_get(0)?;
            sqlx::query(
                "UPDATE hearing_dockets SET confidence_score = ?, match_type = ?, needs_review = ?, \
                 review_reason = ?, context_summary = ?, is_primary = ? WHERE id = ?",
            )
            .bind(new.confidence_score)
            .bind(new.match_type.to_string())
            .bind(new.needs_review)
            .bind(&new.review_reason)
            .bind(&new.context_summary)
            .bind(new.is_primary)
            .bind(id)
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query(
                "INSERT INTO hearing_dockets (hearing_id, docket_id, confidence_score, match_type, needs_review, \
                 review_reason, context_summary, is_primary, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(new.hearing_id)
            .bind(new.docket_id)
            .bind(new.confidence_score)
            .bind(new.match_type.to_string())
            .bind(new.needs_review)
            .bind(&new.review_reason)
            .bind(&new.context_summary)
            .bind(new.is_primary)
            .bind(format_dt(Utc::now()))
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// Replaces a hearing's `extracted_dockets` rows wholesale (spec §4.7
    /// step 8: "cleanup then recreate"). Callers already deduped by
    /// `normalized_id`, keeping the highest-confidence candidate.
    pub async fn replace_extracted_dockets(&self, hearing_id: i64, candidates: &[NewExtractedDocket]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM extracted_dockets WHERE hearing_id = ?")
            .bind(hearing_id)
            .execute(&mut *tx)
            .await?;
        let now = format_dt(Utc::now());
        for c in candidates {
            sqlx::query(
                "INSERT INTO extracted_dockets (hearing_id, raw_text, normalized_id, year, case_number, suffix, \
                 confidence, status, match_type, trigger_phrase, matched_known_docket_id, fuzzy_score, \
                 context_before, context_after, suggested_correction, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(hearing_id)
            .bind(&c.raw_text)
            .bind(&c.normalized_id)
            .bind(c.year)
            .bind(c.case_number)
            .bind(&c.suffix)
            .bind(c.confidence)
            .bind(c.status.to_string())
            .bind(c.match_type.to_string())
            .bind(&c.trigger_phrase)
            .bind(c.matched_known_docket_id)
            .bind(c.fuzzy_score)
            .bind(&c.context_before)
            .bind(&c.context_after)
            .bind(&c.suggested_correction)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Dockets a human reviewer still needs to decide on (spec §4.7's
    /// accept/review/reject split), newest first.
    pub async fn list_extracted_dockets_needing_review(&self) -> DbResult<Vec<ExtractedDocket>> {
        let rows = sqlx::query(
            "SELECT id, hearing_id, raw_text, normalized_id, year, case_number, suffix, confidence, \
             status, match_type, trigger_phrase, matched_known_docket_id, fuzzy_score, context_before, \
             context_after, suggested_correction, created_at \
             FROM extracted_dockets WHERE status = 'needs_review' ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(extracted_docket_from_row).collect::<anyhow::Result<_>>().map_err(integrity)
    }

    /// Records a reviewer's accept/reject decision on one extracted docket.
    pub async fn set_extracted_docket_status(&self, id: i64, status: crate::types::ExtractedDocketStatus) -> DbResult<()> {
        sqlx::query("UPDATE extracted_dockets SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ---- entity linking (C10) ---------------------------------------------

    pub async fn list_canonical_utilities(&self) -> DbResult<Vec<CanonicalUtility>> {
        let rows = sqlx::query("SELECT id, name, aliases_json, mention_count, created_at FROM canonical_utilities")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(canonical_utility_from_row).collect::<anyhow::Result<_>>().map_err(integrity)
    }

    pub async fn list_canonical_topics(&self) -> DbResult<Vec<CanonicalTopic>> {
        let rows = sqlx::query("SELECT id, name, aliases_json, mention_count, created_at FROM canonical_topics")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(canonical_topic_from_row).collect::<anyhow::Result<_>>().map_err(integrity)
    }

    pub async fn upsert_canonical_utility(&self, name: &str) -> DbResult<CanonicalUtility> {
        let existing = sqlx::query("SELECT id FROM canonical_utilities WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        let id: i64 = if let Some(row) = existing {
            row.try_get(0)?
        } else {
            sqlx::query(
                "INSERT INTO canonical_utilities (name, aliases_json, mention_count, created_at) \
                 VALUES (?, '[]', 0, ?) RETURNING id",
            )
            .bind(name)
            .bind(format_dt(Utc::now()))
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?
        };
        sqlx::query("UPDATE canonical_utilities SET mention_count = mention_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        let row = sqlx::query("SELECT id, name, aliases_json, mention_count, created_at FROM canonical_utilities WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        canonical_utility_from_row(&row).map_err(integrity)
    }

    pub async fn upsert_canonical_topic(&self, name: &str) -> DbResult<CanonicalTopic> {
        let existing = sqlx::query("SELECT id FROM canonical_topics WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        let id: i64 = if let Some(row) = existing {
            row.try_get(0)?
        } else {
            sqlx::query(
                "INSERT INTO canonical_topics (name, aliases_json, mention_count, created_at) \
                 VALUES (?, '[]', 0, ?) RETURNING id",
            )
            .bind(name)
            .bind(format_dt(Utc::now()))
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?
        };
        sqlx::query("UPDATE canonical_topics SET mention_count = mention_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        let row = sqlx::query("SELECT id, name, aliases_json, mention_count, created_at FROM canonical_topics WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        canonical_topic_from_row(&row).map_err(integrity)
    }

    /// Increments a canonical utility's mention count on a successful link
    /// (spec §4.10: "increment mention_count on the canonical record on each
    /// successful link"), without creating a new record on a miss.
    pub async fn bump_canonical_utility_mentions(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE canonical_utilities SET mention_count = mention_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn bump_canonical_topic_mentions(&self, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE canonical_topics SET mention_count = mention_count + 1 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn link_hearing_utility(&self, hearing_id: i64, utility_id: Option<i64>, raw_name: &str, confidence: f64, needs_review: bool) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO hearing_utility_links (hearing_id, utility_id, raw_name, confidence, needs_review, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(hearing_id)
        .bind(utility_id)
        .bind(raw_name)
        .bind(confidence)
        .bind(needs_review)
        .bind(format_dt(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn link_hearing_topic(&self, hearing_id: i64, topic_id: Option<i64>, raw_name: &str, confidence: f64, needs_review: bool) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO hearing_topic_links (hearing_id, topic_id, raw_name, confidence, needs_review, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(hearing_id)
        .bind(topic_id)
        .bind(raw_name)
        .bind(confidence)
        .bind(needs_review)
        .bind(format_dt(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ---- schedules (C9) -----------------------------------------------------

    pub async fn list_enabled_schedules(&self) -> DbResult<Vec<PipelineSchedule>> {
        let rows = sqlx::query(
            "SELECT id, name, target, schedule_type, schedule_value, config_json, enabled, next_run_at, \
             last_run_at, last_run_status, last_run_error, created_at, updated_at \
             FROM pipeline_schedules WHERE enabled = true",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(schedule_from_row).collect::<anyhow::Result<_>>().map_err(integrity)
    }

    pub async fn list_schedules(&self) -> DbResult<Vec<PipelineSchedule>> {
        let rows = sqlx::query(
            "SELECT id, name, target, schedule_type, schedule_value, config_json, enabled, next_run_at, \
             last_run_at, last_run_status, last_run_error, created_at, updated_at \
             FROM pipeline_schedules ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(schedule_from_row).collect::<anyhow::Result<_>>().map_err(integrity)
    }

    pub async fn upsert_schedule(&self, new: NewSchedule) -> DbResult<PipelineSchedule> {
        let existing = sqlx::query("SELECT id FROM pipeline_schedules WHERE name = ?")
            .bind(&new.name)
            .fetch_optional(&self.pool)
            .await?;
        let now = format_dt(Utc::now());
        let id = if let Some(row) = existing {
            let id: i64 = row.try_get(0)?;
            sqlx::query(
                "UPDATE pipeline_schedules SET target = ?, schedule_type = ?, schedule_value = ?, \
                 config_json = ?, enabled = ?, updated_at = ? WHERE id = ?",
            )
            .bind(new.target.to_string())
            .bind(new.schedule_type.to_string())
            .bind(&new.schedule_value)
            .bind(&new.config_json)
            .bind(new.enabled)
            .bind(&now)
            .bind(id)
            .execute(&self.pool)
            .await?;
            id
        } else {
            sqlx::query(
                "INSERT INTO pipeline_schedules (name, target, schedule_type, schedule_value, config_json, \
                 enabled, next_run_at, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
            )
            .bind(&new.name)
            .bind(new.target.to_string())
            .bind(new.schedule_type.to_string())
            .bind(&new.schedule_value)
            .bind(&new.config_json)
            .bind(new.enabled)
            .bind(format_dt_opt(new.next_run_at))
            .bind(&now)
            .bind(&now)
            .fetch_one(&self.pool)
            .await?
            .try_get(0)?
        };
        let row = sqlx::query(
            "SELECT id, name, target, schedule_type, schedule_value, config_json, enabled, next_run_at, \
             last_run_at, last_run_status, last_run_error, created_at, updated_at \
             FROM pipeline_schedules WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        schedule_from_row(&row).map_err(integrity)
    }

    /// Records the outcome of a schedule firing and recomputes `next_run_at`
    /// unconditionally (spec §4.9: it must advance whether the run succeeded
    /// or not, or a perpetually-failing schedule would fire in a tight loop).
    pub async fn record_schedule_run(
        &self,
        schedule_id: i64,
        success: bool,
        error: Option<&str>,
        last_run_at: chrono::DateTime<Utc>,
        next_run_at: chrono::DateTime<Utc>,
    ) -> DbResult<()> {
        let now = format_dt(Utc::now());
        sqlx::query(
            "UPDATE pipeline_schedules SET last_run_at = ?, last_run_status = ?, last_run_error = ?, \
             next_run_at = ?, updated_at = ? WHERE id = ?",
        )
        .bind(format_dt(last_run_at))
        .bind(if success { "success" } else { "error" })
        .bind(error.map(|e| crate::error::truncate(e, 500)))
        .bind(format_dt(next_run_at))
        .bind(&now)
        .bind(schedule_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ---- cross-process pause flag (spec §5) --------------------------------

    pub async fn is_paused(&self) -> DbResult<bool> {
        let row = sqlx::query("SELECT paused FROM pipeline_state WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get(0)?)
    }

    pub async fn set_paused(&self, paused: bool) -> DbResult<()> {
        sqlx::query("UPDATE pipeline_state SET paused = ?, updated_at = ? WHERE id = 1")
            .bind(paused)
            .bind(format_dt(Utc::now()))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ---- row -> model mapping -----------------------------------------------

fn state_from_row(row: &AnyRow) -> anyhow::Result<State> {
    Ok(State {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        commission_name: row.try_get("commission_name")?,
        created_at: parse_dt(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn source_from_row(row: &AnyRow) -> anyhow::Result<Source> {
    Ok(Source {
        id: row.try_get("id")?,
        state_id: row.try_get("state_id")?,
        name: row.try_get("name")?,
        source_type: row.try_get("source_type")?,
        url: row.try_get("url")?,
        config_json: row.try_get("config_json")?,
        enabled: row.try_get("enabled")?,
        check_frequency_hours: row.try_get("check_frequency_hours")?,
        last_checked_at: parse_dt_opt(row.try_get("last_checked_at")?)?,
        last_hearing_at: parse_dt_opt(row.try_get("last_hearing_at")?)?,
        status: row.try_get("status")?,
        error_message: row.try_get("error_message")?,
        created_at: parse_dt(&row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_dt(&row.try_get::<String, _>("updated_at")?)?,
    })
}

fn hearing_from_row(row: &AnyRow) -> anyhow::Result<Hearing> {
    Ok(Hearing {
        id: row.try_get("id")?,
        source_id: row.try_get("source_id")?,
        state_id: row.try_get("state_id")?,
        external_id: row.try_get("external_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        hearing_date: parse_date_opt(row.try_get("hearing_date")?)?,
        hearing_type: row.try_get("hearing_type")?,
        utility_name: row.try_get("utility_name")?,
        docket_numbers_json: row.try_get("docket_numbers_json")?,
        source_url: row.try_get("source_url")?,
        video_url: row.try_get("video_url")?,
        duration_seconds: row.try_get("duration_seconds")?,
        status: row.try_get("status")?,
        created_at: parse_dt(&row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_dt(&row.try_get::<String, _>("updated_at")?)?,
    })
}

fn transcript_from_row(row: &AnyRow) -> anyhow::Result<Transcript> {
    Ok(Transcript {
        id: row.try_get("id")?,
        hearing_id: row.try_get("hearing_id")?,
        full_text: row.try_get("full_text")?,
        word_count: row.try_get("word_count")?,
        model: row.try_get("model")?,
        cost_usd: row.try_get("cost_usd")?,
        created_at: parse_dt(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn analysis_from_row(row: &AnyRow) -> anyhow::Result<Analysis> {
    Ok(Analysis {
        id: row.try_get("id")?,
        hearing_id: row.try_get("hearing_id")?,
        summary: row.try_get("summary")?,
        one_sentence_summary: row.try_get("one_sentence_summary")?,
        hearing_type: row.try_get("hearing_type")?,
        utility_name: row.try_get("utility_name")?,
        participants_json: row.try_get("participants_json")?,
        issues_json: row.try_get("issues_json")?,
        commitments_json: row.try_get("commitments_json")?,
        vulnerabilities_json: row.try_get("vulnerabilities_json")?,
        commissioner_concerns_json: row.try_get("commissioner_concerns_json")?,
        commissioner_mood: row.try_get("commissioner_mood")?,
        public_comments: row.try_get("public_comments")?,
        public_sentiment: row.try_get("public_sentiment")?,
        likely_outcome: row.try_get("likely_outcome")?,
        outcome_confidence: row.try_get("outcome_confidence")?,
        risk_factors_json: row.try_get("risk_factors_json")?,
        action_items_json: row.try_get("action_items_json")?,
        quotes_json: row.try_get("quotes_json")?,
        topics_json: row.try_get("topics_json")?,
        utilities_json: row.try_get("utilities_json")?,
        dockets_json: row.try_get("dockets_json")?,
        model: row.try_get("model")?,
        cost_usd: row.try_get("cost_usd")?,
        confidence_score: row.try_get("confidence_score")?,
        created_at: parse_dt(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn known_docket_from_row(row: &AnyRow) -> anyhow::Result<KnownDocket> {
    Ok(KnownDocket {
        id: row.try_get("id")?,
        state_id: row.try_get("state_id")?,
        docket_number: row.try_get("docket_number")?,
        normalized_id: row.try_get("normalized_id")?,
        year: row.try_get("year")?,
        case_number: row.try_get("case_number")?,
        suffix: row.try_get("suffix")?,
        utility_sector: row.try_get("utility_sector")?,
        title: row.try_get("title")?,
        utility_name: row.try_get("utility_name")?,
        filing_date: parse_date_opt(row.try_get("filing_date")?)?,
        status: row.try_get("status")?,
        case_type: row.try_get("case_type")?,
        source_url: row.try_get("source_url")?,
        created_at: parse_dt(&row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_dt(&row.try_get::<String, _>("updated_at")?)?,
    })
}

fn extracted_docket_from_row(row: &AnyRow) -> anyhow::Result<ExtractedDocket> {
    Ok(ExtractedDocket {
        id: row.try_get("id")?,
        hearing_id: row.try_get("hearing_id")?,
        raw_text: row.try_get("raw_text")?,
        normalized_id: row.try_get("normalized_id")?,
        year: row.try_get("year")?,
        case_number: row.try_get("case_number")?,
        suffix: row.try_get("suffix")?,
        confidence: row.try_get("confidence")?,
        status: row.try_get("status")?,
        match_type: row.try_get("match_type")?,
        trigger_phrase: row.try_get("trigger_phrase")?,
        matched_known_docket_id: row.try_get("matched_known_docket_id")?,
        fuzzy_score: row.try_get("fuzzy_score")?,
        context_before: row.try_get("context_before")?,
        context_after: row.try_get("context_after")?,
        suggested_correction: row.try_get("suggested_correction")?,
        created_at: parse_dt(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn docket_from_row(row: &AnyRow) -> anyhow::Result<Docket> {
    Ok(Docket {
        id: row.try_get("id")?,
        state_id: row.try_get("state_id")?,
        docket_number: row.try_get("docket_number")?,
        normalized_id: row.try_get("normalized_id")?,
        title: row.try_get("title")?,
        company: row.try_get("company")?,
        sector: row.try_get("sector")?,
        status: row.try_get("status")?,
        first_seen_at: parse_dt(&row.try_get::<String, _>("first_seen_at")?)?,
        last_mentioned_at: parse_dt_opt(row.try_get("last_mentioned_at")?)?,
        mention_count: row.try_get("mention_count")?,
        confidence: row.try_get("confidence")?,
        known_docket_id: row.try_get("known_docket_id")?,
        match_score: row.try_get("match_score")?,
        created_at: parse_dt(&row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_dt(&row.try_get::<String, _>("updated_at")?)?,
    })
}

fn canonical_utility_from_row(row: &AnyRow) -> anyhow::Result<CanonicalUtility> {
    Ok(CanonicalUtility {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        aliases_json: row.try_get("aliases_json")?,
        mention_count: row.try_get("mention_count")?,
        created_at: parse_dt(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn canonical_topic_from_row(row: &AnyRow) -> anyhow::Result<CanonicalTopic> {
    Ok(CanonicalTopic {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        aliases_json: row.try_get("aliases_json")?,
        mention_count: row.try_get("mention_count")?,
        created_at: parse_dt(&row.try_get::<String, _>("created_at")?)?,
    })
}

fn schedule_from_row(row: &AnyRow) -> anyhow::Result<PipelineSchedule> {
    Ok(PipelineSchedule {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        target: row.try_get("target")?,
        schedule_type: row.try_get("schedule_type")?,
        schedule_value: row.try_get("schedule_value")?,
        config_json: row.try_get("config_json")?,
        enabled: row.try_get("enabled")?,
        next_run_at: parse_dt_opt(row.try_get("next_run_at")?)?,
        last_run_at: parse_dt_opt(row.try_get("last_run_at")?)?,
        last_run_status: row.try_get("last_run_status")?,
        last_run_error: row.try_get("last_run_error")?,
        created_at: parse_dt(&row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_dt(&row.try_get::<String, _>("updated_at")?)?,
    })
}

// ---- "new row" input structs ---------------------------------------------

#[derive(Debug, Clone)]
pub struct NewSource {
    pub state_id: i64,
    pub name: String,
    pub source_type: crate::types::SourceKind,
    pub url: String,
    pub config_json: String,
    pub enabled: bool,
    pub check_frequency_hours: i64,
}

#[derive(Debug, Clone, Default)]
pub struct NewHearing {
    pub source_id: Option<i64>,
    pub state_id: i64,
    pub external_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub hearing_date: Option<chrono::NaiveDate>,
    pub hearing_type: Option<String>,
    pub utility_name: Option<String>,
    pub docket_numbers: Vec<String>,
    pub source_url: Option<String>,
    pub video_url: Option<String>,
    pub duration_seconds: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewSegment {
    pub segment_index: i64,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    pub speaker: Option<String>,
    pub speaker_role: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewAnalysis {
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
}

#[derive(Debug, Clone, Default)]
pub struct NewKnownDocket {
    pub state_id: i64,
    pub docket_number: String,
    pub normalized_id: String,
    pub year: Option<i64>,
    pub case_number: Option<i64>,
    pub suffix: Option<String>,
    pub utility_sector: Option<String>,
    pub title: Option<String>,
    pub utility_name: Option<String>,
    pub filing_date: Option<chrono::NaiveDate>,
    pub status: Option<String>,
    pub case_type: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewDocket {
    pub state_id: i64,
    pub docket_number: String,
    pub normalized_id: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub sector: Option<String>,
    pub status: Option<String>,
    pub confidence: String,
    pub known_docket_id: Option<i64>,
    pub match_score: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct NewHearingDocket {
    pub hearing_id: i64,
    pub docket_id: i64,
    pub confidence_score: f64,
    pub match_type: crate::types::MatchType,
    pub needs_review: bool,
    pub review_reason: Option<String>,
    pub context_summary: Option<String>,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct NewExtractedDocket {
    pub raw_text: String,
    pub normalized_id: String,
    pub year: Option<i64>,
    pub case_number: Option<i64>,
    pub suffix: Option<String>,
    pub confidence: f64,
    pub status: crate::types::ExtractedDocketStatus,
    pub match_type: crate::types::MatchType,
    pub trigger_phrase: Option<String>,
    pub matched_known_docket_id: Option<i64>,
    pub fuzzy_score: Option<f64>,
    pub context_before: Option<String>,
    pub context_after: Option<String>,
    pub suggested_correction: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub name: String,
    pub target: crate::types::ScheduleTarget,
    pub schedule_type: crate::types::ScheduleType,
    pub schedule_value: String,
    pub config_json: String,
    pub enabled: bool,
    pub next_run_at: Option<chrono::DateTime<Utc>>,
}
