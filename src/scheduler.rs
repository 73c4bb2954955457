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

//! Pipeline scheduler (spec §4.9, C9). A database-backed daemon that fires
//! due `PipelineSchedule` rows on their `interval`/`daily`/`cron` cadence,
//! grounded on `original_source/app/pipeline/scheduler.py`'s
//! `calculate_next_run`/`_check_schedules` loop, recast onto `tokio` the way
//! `audio.rs` sleeps in short increments so a stop request is never more
//! than a second late.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Timelike, Utc};
use cron::Schedule as CronSchedule;

use crate::config::Config;
use crate::db::models::PipelineSchedule;
use crate::db::store::Store;
use crate::pipeline::PipelineOrchestrator;
use crate::scraper::ScraperOrchestrator;
use crate::types::ScheduleTarget;

/// Parses an `interval` schedule value (`"30m"`, `"1h"`, `"1d"`).
pub fn parse_interval(value: &str) -> anyhow::Result<chrono::Duration> {
    let value = value.trim().to_lowercase();
    let (amount, unit) = value.split_at(value.len() - 1);
    let amount: i64 = amount
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid interval format: {value} - use e.g. '30m', '1h', '1d'"))?;
    match unit {
        "m" => Ok(chrono::Duration::minutes(amount)),
        "h" => Ok(chrono::Duration::hours(amount)),
        "d" => Ok(chrono::Duration::days(amount)),
        _ => anyhow::bail!("invalid interval unit in '{value}' - use 'm', 'h', or 'd'"),
    }
}

/// Parses a `daily` schedule value (`"08:00"`, `"14:30"`) into (hour, minute).
pub fn parse_daily_time(value: &str) -> anyhow::Result<(u32, u32)> {
    let (h, m) = value
        .split_once(':')
        .ok_or_else(|| anyhow::anyhow!("invalid time format: {value} - use e.g. '08:00', '14:30'"))?;
    let hour: u32 = h.parse().map_err(|_| anyhow::anyhow!("invalid hour in '{value}'"))?;
    let minute: u32 = m.parse().map_err(|_| anyhow::anyhow!("invalid minute in '{value}'"))?;
    if hour > 23 || minute > 59 {
        anyhow::bail!("invalid time '{value}' - hours must be 0-23, minutes 0-59");
    }
    Ok((hour, minute))
}

/// Computes a schedule's next fire time from its type/value and last run,
/// mirroring `scheduler.py::calculate_next_run` exactly (interval anchors off
/// `last_run_at` when present, daily/cron always anchor off "now").
pub fn calculate_next_run(schedule: &PipelineSchedule) -> anyhow::Result<DateTime<Utc>> {
    let now = Utc::now();
    match schedule.schedule_type.as_str() {
        "interval" => {
            let interval = parse_interval(&schedule.schedule_value)?;
            Ok(schedule.last_run_at.map(|t| t + interval).unwrap_or(now))
        }
        "daily" => {
            let (hour, minute) = parse_daily_time(&schedule.schedule_value)?;
            let mut next = now
                .with_hour(hour)
                .and_then(|t| t.with_minute(minute))
                .and_then(|t| t.with_second(0))
                .and_then(|t| t.with_nanosecond(0))
                .ok_or_else(|| anyhow::anyhow!("could not construct daily fire time for '{}'", schedule.schedule_value))?;
            if next <= now {
                next += chrono::Duration::days(1);
            }
            Ok(next)
        }
        "cron" => {
            let expr = CronSchedule::from_str(&schedule.schedule_value)
                .map_err(|e| anyhow::anyhow!("invalid cron expression '{}': {e}", schedule.schedule_value))?;
            expr.upcoming(Utc)
                .next()
                .ok_or_else(|| anyhow::anyhow!("cron expression '{}' has no upcoming fire time", schedule.schedule_value))
        }
        other => anyhow::bail!("unknown schedule type '{other}'"),
    }
}

/// Human-readable schedule description for `scheduler list`.
pub fn format_schedule_display(schedule: &PipelineSchedule) -> String {
    match schedule.schedule_type.as_str() {
        "interval" => format!("Every {}", schedule.schedule_value),
        "daily" => match parse_daily_time(&schedule.schedule_value) {
            Ok((hour, minute)) => {
                let period = if hour < 12 { "AM" } else { "PM" };
                let display_hour = if hour % 12 == 0 { 12 } else { hour % 12 };
                format!("Daily at {display_hour}:{minute:02} {period} UTC")
            }
            Err(_) => "Unknown".to_string(),
        },
        "cron" => format!("Cron: {}", schedule.schedule_value),
        _ => "Unknown".to_string(),
    }
}

/// Database-backed scheduler daemon (spec §4.9 step 1: "checks every
/// `scheduler_check_interval_secs`, sleeping in 1-second increments so a
/// stop request lands within a second").
pub struct Scheduler {
    store: Arc<Store>,
    config: Arc<Config>,
    stop_requested: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(store: Arc<Store>, config: Arc<Config>) -> Self {
        Self { store, config, stop_requested: Arc::new(AtomicBool::new(false)) }
    }

    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    /// Runs the scheduler loop until `request_stop` is called.
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!("scheduler started");
        while !self.stop_requested.load(Ordering::SeqCst) {
            if let Err(e) = self.check_schedules().await {
                tracing::error!("scheduler check failed: {e}");
            }

            let check_interval = self.config.orchestrator.scheduler_check_interval_secs;
            for _ in 0..check_interval {
                if self.stop_requested.load(Ordering::SeqCst) {
                    break;
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
        tracing::info!("scheduler stopped");
        Ok(())
    }

    async fn check_schedules(&self) -> anyhow::Result<()> {
        let now = Utc::now();
        for schedule in self.store.list_enabled_schedules().await? {
            let due = schedule.next_run_at.map(|t| t <= now).unwrap_or(true);
            if due {
                self.fire(&schedule).await;
            }
        }
        Ok(())
    }

    /// Runs one due schedule's target(s) and unconditionally recomputes
    /// `next_run_at` whether the run succeeded or failed (spec §4.9 step 3:
    /// a perpetually-failing schedule must not fire in a tight loop).
    async fn fire(&self, schedule: &PipelineSchedule) {
        tracing::info!(schedule = %schedule.name, target = %schedule.target, "running schedule");

        let result = self.run_target(schedule).await;
        let (success, error) = match &result {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };
        if let Err(e) = &result {
            tracing::error!(schedule = %schedule.name, "schedule failed: {e}");
        }

        // `calculate_next_run`'s interval branch anchors off `last_run_at`, so
        // it must see *this* firing's timestamp, not the stale one the
        // schedule carried in from before it ran (mirrors
        // `scheduler.py::_run_schedule` setting `last_run_at` before computing
        // `next_run_at` in its `finally` block).
        let last_run_at = Utc::now();
        let fired = PipelineSchedule { last_run_at: Some(last_run_at), ..schedule.clone() };
        let next_run_at = calculate_next_run(&fired).unwrap_or_else(|e| {
            tracing::warn!(schedule = %schedule.name, "could not compute next run, retrying in 1h: {e}");
            last_run_at + chrono::Duration::hours(1)
        });

        if let Err(e) = self
            .store
            .record_schedule_run(schedule.id, success, error.as_deref(), last_run_at, next_run_at)
            .await
        {
            tracing::error!(schedule = %schedule.name, "failed to record schedule run: {e}");
        }
    }

    async fn run_target(&self, schedule: &PipelineSchedule) -> anyhow::Result<()> {
        let target: ScheduleTarget = schedule
            .target
            .parse()
            .map_err(|_| anyhow::anyhow!("unknown schedule target '{}'", schedule.target))?;

        if matches!(target, ScheduleTarget::Pipeline | ScheduleTarget::All) {
            let orchestrator = PipelineOrchestrator::new(self.store.clone(), self.config.clone());
            let summary = orchestrator.run_once().await?;
            tracing::info!(schedule = %schedule.name, ?summary, "scheduled pipeline run complete");
        }

        if matches!(target, ScheduleTarget::Scraper | ScheduleTarget::All) {
            let orchestrator = ScraperOrchestrator::new(self.store.clone());
            let progress = orchestrator.run(None).await?;
            tracing::info!(schedule = %schedule.name, ?progress, "scheduled scraper run complete");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_interval_values() {
        assert_eq!(parse_interval("30m").unwrap(), chrono::Duration::minutes(30));
        assert_eq!(parse_interval("4h").unwrap(), chrono::Duration::hours(4));
        assert_eq!(parse_interval("1d").unwrap(), chrono::Duration::days(1));
    }

    #[test]
    fn rejects_malformed_interval() {
        assert!(parse_interval("garbage").is_err());
    }

    #[test]
    fn parses_daily_time() {
        assert_eq!(parse_daily_time("08:00").unwrap(), (8, 0));
        assert_eq!(parse_daily_time("23:59").unwrap(), (23, 59));
    }

    #[test]
    fn rejects_out_of_range_daily_time() {
        assert!(parse_daily_time("24:00").is_err());
        assert!(parse_daily_time("12:60").is_err());
    }

    #[test]
    fn formats_interval_display() {
        let schedule = PipelineSchedule {
            id: 1,
            name: "nightly-scrape".into(),
            target: "scraper".into(),
            schedule_type: "interval".into(),
            schedule_value: "1h".into(),
            config_json: "{}".into(),
            enabled: true,
            next_run_at: None,
            last_run_at: None,
            last_run_status: None,
            last_run_error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(format_schedule_display(&schedule), "Every 1h");
    }

    fn interval_schedule(last_run_at: Option<DateTime<Utc>>) -> PipelineSchedule {
        PipelineSchedule {
            id: 1,
            name: "nightly-scrape".into(),
            target: "scraper".into(),
            schedule_type: "interval".into(),
            schedule_value: "30m".into(),
            config_json: "{}".into(),
            enabled: true,
            next_run_at: None,
            last_run_at,
            last_run_status: None,
            last_run_error: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    /// Regression test for the `fire()` bug where `next_run_at` was computed
    /// from the schedule's stale pre-firing `last_run_at` instead of this
    /// firing's timestamp (testable property #9: `next_run_at` must be
    /// strictly greater than the firing instant).
    #[test]
    fn next_run_is_computed_from_the_firing_timestamp_not_a_stale_one() {
        let stale_last_run = Utc::now() - chrono::Duration::days(1);
        let schedule = interval_schedule(Some(stale_last_run));

        // Using the stale, pre-firing schedule directly would anchor 30m
        // after yesterday's run - in the past relative to now.
        let stale_next_run = calculate_next_run(&schedule).unwrap();
        assert!(stale_next_run < Utc::now());

        // `fire()`'s fix: clone the schedule with this firing's timestamp
        // before computing `next_run_at`.
        let firing_instant = Utc::now();
        let fired = PipelineSchedule { last_run_at: Some(firing_instant), ..schedule.clone() };
        let next_run_at = calculate_next_run(&fired).unwrap();

        assert!(next_run_at > firing_instant);
        assert_eq!(next_run_at, firing_instant + chrono::Duration::minutes(30));
    }

    #[test]
    fn next_run_for_first_ever_firing_has_no_stale_last_run_to_anchor_on() {
        let schedule = interval_schedule(None);
        let firing_instant = Utc::now();
        let fired = PipelineSchedule { last_run_at: Some(firing_instant), ..schedule };
        let next_run_at = calculate_next_run(&fired).unwrap();
        assert_eq!(next_run_at, firing_instant + chrono::Duration::minutes(30));
    }
}
