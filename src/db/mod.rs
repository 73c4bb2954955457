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

//! Persistence (spec §3, §9). A single `sqlx::AnyPool` backs both SQLite and
//! Postgres deployments; the schema and every query in `store.rs` stick to
//! the portable subset spec §9 calls for - no native arrays, no JSONB, and
//! timestamps bound/read as RFC3339 text rather than driver-native DATETIME
//! params, since `Any`'s value decoding doesn't reliably round-trip chrono
//! types across both drivers.

pub mod models;
pub mod store;

pub use store::Store;

use chrono::{DateTime, NaiveDate, Utc};

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Splits the embedded schema into individual statements and runs each one.
/// `Any` doesn't support multi-statement `execute` calls, unlike a native
/// sqlite/postgres connection, so each `CREATE` has to go over the wire on
/// its own.
pub(crate) async fn apply_schema(pool: &sqlx::AnyPool) -> anyhow::Result<()> {
    for statement in SCHEMA_SQL.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

pub(crate) fn format_dt(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

pub(crate) fn format_dt_opt(dt: Option<DateTime<Utc>>) -> Option<String> {
    dt.map(format_dt)
}

pub(crate) fn parse_dt(s: &str) -> anyhow::Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

pub(crate) fn parse_dt_opt(s: Option<String>) -> anyhow::Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_dt(&s)).transpose()
}

pub(crate) fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub(crate) fn format_date_opt(d: Option<NaiveDate>) -> Option<String> {
    d.map(format_date)
}

pub(crate) fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(s, "%Y-%m-%d")?)
}

pub(crate) fn parse_date_opt(s: Option<String>) -> anyhow::Result<Option<NaiveDate>> {
    s.map(|s| parse_date(&s)).transpose()
}
