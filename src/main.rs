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

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;

mod adapters;
mod analyzer;
mod config;
mod db;
mod docket;
mod entity_linker;
mod error;
mod media;
mod pipeline;
mod scheduler;
mod scraper;
mod transcriber;
mod types;

use config::Config;
use db::store::{NewSchedule, NewSource, Store};
use pipeline::{PipelineFilters, PipelineOrchestrator};
use scheduler::Scheduler;
use scraper::ScraperOrchestrator;
use types::{ScheduleTarget, ScheduleType, SourceKind, StageName};

/// CanaryScope - regulatory intelligence pipeline for public utility
/// commission proceedings: scrapes hearing recordings, transcribes and
/// analyzes them with an LLM, and cross-links extracted docket references
/// to a persistent catalogue.
#[derive(Parser)]
#[command(name = "canaryscope")]
#[command(version = "0.1.0")]
#[command(about = "Ingestion and enrichment pipeline for PSC/PUC hearing recordings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scraper orchestrator once across enabled sources (C2).
    Scrape {
        /// Restrict to a single state code (e.g. "FL").
        #[arg(long)]
        state: Option<String>,
        /// Log what would be discovered without writing any hearings.
        #[arg(long)]
        dry_run: bool,
    },
    /// Drive the per-hearing pipeline orchestrator (C8).
    #[command(subcommand)]
    Pipeline(PipelineCommand),
    /// Manage the recurring schedule daemon (C9).
    #[command(subcommand)]
    Scheduler(SchedulerCommand),
    /// Review and decide on extracted docket candidates (C7).
    #[command(subcommand)]
    Docket(DocketCommand),
    /// Manage ingestion source registrations.
    #[command(subcommand)]
    Source(SourceCommand),
    /// Manage reference State rows.
    #[command(subcommand)]
    State(StateCommand),
    /// Manage canonical utility/topic records the entity linker (C10)
    /// resolves analyzer mentions against.
    #[command(subcommand)]
    Entity(EntityCommand),
}

#[derive(Subcommand)]
enum PipelineCommand {
    /// Run one orchestrator pass over actionable hearings.
    Start {
        #[arg(long)]
        state: Option<String>,
        /// Process only this stage across hearings this pass, then stop.
        #[arg(long, value_name = "download|transcribe|analyze|extract")]
        stage: Option<String>,
        #[arg(long)]
        max_cost: Option<f64>,
        #[arg(long)]
        max_hearings: Option<u32>,
    },
    /// Run a single stage against one hearing synchronously (spec §6.3
    /// `pipeline.run_stage`).
    RunStage {
        hearing_id: i64,
        #[arg(value_name = "download|transcribe|analyze|extract")]
        stage: String,
    },
    /// Set the cross-process pause flag (spec §5 `PipelineState`).
    Pause,
    /// Clear the pause flag.
    Resume,
    /// Report whether the pipeline is currently paused.
    Status,
}

#[derive(Subcommand)]
enum SchedulerCommand {
    /// Run the scheduler daemon loop until Ctrl-C.
    Run,
    /// List all configured schedules.
    List,
    /// Create or update a schedule by name.
    Add {
        name: String,
        #[arg(long, value_name = "pipeline|scraper|all")]
        target: String,
        #[arg(long = "type", value_name = "interval|daily|cron")]
        schedule_type: String,
        /// "30m"/"2h"/"1d" for interval, "HH:MM" for daily, 5-field for cron.
        #[arg(long)]
        value: String,
        #[arg(long, default_value_t = true)]
        enabled: bool,
    },
}

#[derive(Subcommand)]
enum DocketCommand {
    /// List ExtractedDocket rows awaiting human review.
    Review,
    /// Accept a reviewed docket candidate.
    Accept { id: i64 },
    /// Reject a reviewed docket candidate.
    Reject { id: i64 },
}

#[derive(Subcommand)]
enum SourceCommand {
    /// Register a new ingestion endpoint.
    Add {
        state: String,
        name: String,
        #[arg(long, value_name = "video_channel|admin_monitor|rss_feed|api_endpoint")]
        kind: String,
        #[arg(long)]
        url: String,
        /// Adapter-private JSON configuration blob, e.g. '{"channel_id": "..."}'.
        #[arg(long, default_value = "{}")]
        config: String,
        #[arg(long, default_value_t = 24)]
        check_frequency_hours: i64,
    },
    /// List every registered source.
    List,
}

#[derive(Subcommand)]
enum StateCommand {
    /// Upsert a reference State row.
    Add {
        code: String,
        name: String,
        #[arg(long)]
        commission_name: Option<String>,
    },
}

#[derive(Subcommand)]
enum EntityCommand {
    /// Seed a canonical utility name.
    AddUtility { name: String },
    /// Seed a canonical topic tag.
    AddTopic { name: String },
    /// List canonical utilities with their mention counts.
    ListUtilities,
    /// List canonical topics with their mention counts.
    ListTopics,
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging().context("failed to initialize logging")?;

    let cli = Cli::parse();
    let config = Arc::new(Config::load().context("failed to load configuration")?);
    let store = Arc::new(Store::connect(&config.database_url).await.context("failed to connect to database")?);

    match cli.command {
        Commands::Scrape { state, dry_run } => run_scrape(store, state, dry_run).await,
        Commands::Pipeline(cmd) => run_pipeline_command(store, config, cmd).await,
        Commands::Scheduler(cmd) => run_scheduler_command(store, config, cmd).await,
        Commands::Docket(cmd) => run_docket_command(store, cmd).await,
        Commands::Source(cmd) => run_source_command(store, cmd).await,
        Commands::State(cmd) => run_state_command(store, cmd).await,
        Commands::Entity(cmd) => run_entity_command(store, cmd).await,
    }
}

async fn run_scrape(store: Arc<Store>, state: Option<String>, dry_run: bool) -> Result<()> {
    if dry_run {
        println!("{}", "dry run: listing sources, no hearings will be written".yellow());
        let sources = store.list_sources().await?;
        for source in sources.iter().filter(|s| s.enabled) {
            if let Some(filter) = &state {
                let Some(source_state) = store.get_state(source.state_id).await? else { continue };
                if !source_state.code.eq_ignore_ascii_case(filter) {
                    continue;
                }
            }
            println!("  {} ({}) -> {}", source.name, source.source_type, source.url);
        }
        return Ok(());
    }

    let orchestrator = ScraperOrchestrator::new(store);
    let progress = orchestrator.run(state.as_deref()).await?;

    println!("{} {:?}", "scrape status:".bold(), progress.status);
    println!("  items found:       {}", progress.items_found);
    println!("  new hearings:      {}", progress.new_hearings.to_string().green());
    println!("  existing hearings: {}", progress.existing_hearings);
    if !progress.errors.is_empty() {
        println!("  {}", format!("{} errors:", progress.errors.len()).red());
        for err in &progress.errors {
            println!("    - {err}");
        }
    }
    Ok(())
}

async fn run_pipeline_command(store: Arc<Store>, config: Arc<Config>, cmd: PipelineCommand) -> Result<()> {
    let orchestrator = PipelineOrchestrator::new(store.clone(), config);

    match cmd {
        PipelineCommand::Start { state, stage, max_cost, max_hearings } => {
            let only_stage = stage.as_deref().map(parse_stage_name).transpose()?;
            let filters = PipelineFilters { state_code: state, only_stage, max_cost_per_run: max_cost, max_hearings };
            let summary = orchestrator.run_filtered(&filters).await?;

            println!("{}", "pipeline run complete".bold());
            println!("  hearings processed: {}", summary.hearings_processed);
            println!("  stages run:         {}", summary.stages_run);
            println!("  stages failed:      {}", summary.stages_failed.to_string().red());
            println!("  total cost:         ${:.4}", summary.total_cost_usd);
            if summary.stopped_on_cost_cap {
                println!("  {}", "stopped early: cost cap reached".yellow());
            }
        }
        PipelineCommand::RunStage { hearing_id, stage } => {
            let stage = parse_stage_name(&stage)?;
            let result = orchestrator.run_stage(hearing_id, stage).await?;
            if result.success {
                println!("{} stage {} on hearing {}", "ok:".green().bold(), stage, hearing_id);
            } else {
                println!(
                    "{} stage {} on hearing {}: {}",
                    "failed:".red().bold(),
                    stage,
                    hearing_id,
                    result.error.unwrap_or_default()
                );
            }
            println!("  cost: ${:.4}", result.cost_usd);
        }
        PipelineCommand::Pause => {
            store.set_paused(true).await?;
            println!("{}", "pipeline paused".yellow());
        }
        PipelineCommand::Resume => {
            store.set_paused(false).await?;
            println!("{}", "pipeline resumed".green());
        }
        PipelineCommand::Status => {
            let paused = store.is_paused().await?;
            println!("pipeline state: {}", if paused { "paused".yellow() } else { "running".green() });
        }
    }
    Ok(())
}

fn parse_stage_name(raw: &str) -> Result<StageName> {
    match raw {
        "download" => Ok(StageName::Download),
        "transcribe" => Ok(StageName::Transcribe),
        "analyze" => Ok(StageName::Analyze),
        "extract" => Ok(StageName::Extract),
        other => anyhow::bail!("unknown stage '{other}' - use download, transcribe, analyze, or extract"),
    }
}

async fn run_scheduler_command(store: Arc<Store>, config: Arc<Config>, cmd: SchedulerCommand) -> Result<()> {
    match cmd {
        SchedulerCommand::Run => {
            let scheduler = Arc::new(Scheduler::new(store, config));
            let stop_signal = scheduler.clone();
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("received shutdown signal, requesting scheduler stop");
                stop_signal.request_stop();
            });
            scheduler.run().await?;
        }
        SchedulerCommand::List => {
            let schedules = store.list_schedules().await?;
            if schedules.is_empty() {
                println!("no schedules configured");
            }
            for s in &schedules {
                let status = s.last_run_status.as_deref().unwrap_or("never run");
                println!(
                    "{:<20} {:<10} {:<28} enabled={:<5} next={:<25} last_status={}",
                    s.name,
                    s.target,
                    scheduler::format_schedule_display(s),
                    s.enabled,
                    s.next_run_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".into()),
                    status,
                );
            }
        }
        SchedulerCommand::Add { name, target, schedule_type, value, enabled } => {
            let target: ScheduleTarget = target.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let schedule_type: ScheduleType = schedule_type.parse().map_err(|e: String| anyhow::anyhow!(e))?;

            // Validate the grammar up front (spec §6.2) rather than persisting
            // something the scheduler would only reject later at fire time.
            match schedule_type {
                ScheduleType::Interval => {
                    scheduler::parse_interval(&value)?;
                }
                ScheduleType::Daily => {
                    scheduler::parse_daily_time(&value)?;
                }
                ScheduleType::Cron => {
                    cron::Schedule::from_str(&value).map_err(|e| anyhow::anyhow!("invalid cron expression: {e}"))?;
                }
            }

            let schedule = store
                .upsert_schedule(NewSchedule {
                    name,
                    target,
                    schedule_type,
                    schedule_value: value,
                    config_json: "{}".to_string(),
                    enabled,
                    next_run_at: None,
                })
                .await?;
            println!("{} schedule '{}' ({})", "saved:".green().bold(), schedule.name, scheduler::format_schedule_display(&schedule));
        }
    }
    Ok(())
}

async fn run_docket_command(store: Arc<Store>, cmd: DocketCommand) -> Result<()> {
    match cmd {
        DocketCommand::Review => {
            let candidates = store.list_extracted_dockets_needing_review().await?;
            if candidates.is_empty() {
                println!("nothing awaiting review");
            }
            for c in &candidates {
                println!(
                    "[{}] hearing={} {} confidence={:.0} match={} trigger={}",
                    c.id,
                    c.hearing_id,
                    c.normalized_id.bold(),
                    c.confidence,
                    c.match_type,
                    c.trigger_phrase.as_deref().unwrap_or("-"),
                );
                if let Some(correction) = &c.suggested_correction {
                    println!("    suggested correction: {correction}");
                }
                println!("    ...{}[{}]{}...", c.context_before.as_deref().unwrap_or(""), c.raw_text, c.context_after.as_deref().unwrap_or(""));
            }
        }
        DocketCommand::Accept { id } => {
            store.set_extracted_docket_status(id, types::ExtractedDocketStatus::Accepted).await?;
            println!("{} extracted docket {id} accepted", "ok:".green().bold());
        }
        DocketCommand::Reject { id } => {
            store.set_extracted_docket_status(id, types::ExtractedDocketStatus::Rejected).await?;
            println!("{} extracted docket {id} rejected", "ok:".green().bold());
        }
    }
    Ok(())
}

async fn run_source_command(store: Arc<Store>, cmd: SourceCommand) -> Result<()> {
    match cmd {
        SourceCommand::Add { state, name, kind, url, config, check_frequency_hours } => {
            let kind: SourceKind = kind.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            serde_json::from_str::<serde_json::Value>(&config).context("--config must be valid JSON")?;

            let state_row = store
                .get_state_by_code(&state)
                .await?
                .ok_or_else(|| anyhow::anyhow!("unknown state code '{state}' - add it first with `state add`"))?;

            let source = store
                .create_source(NewSource {
                    state_id: state_row.id,
                    name,
                    source_type: kind,
                    url,
                    config_json: config,
                    enabled: true,
                    check_frequency_hours,
                })
                .await?;
            println!("{} source '{}' (id={}) for {}", "created:".green().bold(), source.name, source.id, state_row.code);
        }
        SourceCommand::List => {
            let sources = store.list_sources().await?;
            for s in &sources {
                println!(
                    "[{}] {:<24} {:<14} status={:<8} enabled={:<5} last_checked={}",
                    s.id,
                    s.name,
                    s.source_type,
                    s.status,
                    s.enabled,
                    s.last_checked_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".into()),
                );
            }
        }
    }
    Ok(())
}

async fn run_state_command(store: Arc<Store>, cmd: StateCommand) -> Result<()> {
    match cmd {
        StateCommand::Add { code, name, commission_name } => {
            let state = store.upsert_state(&code, &name, commission_name.as_deref()).await?;
            println!("{} state '{}' ({})", "saved:".green().bold(), state.code, state.name);
        }
    }
    Ok(())
}

async fn run_entity_command(store: Arc<Store>, cmd: EntityCommand) -> Result<()> {
    match cmd {
        EntityCommand::AddUtility { name } => {
            let utility = store.upsert_canonical_utility(&name).await?;
            println!("{} canonical utility '{}' (id={})", "saved:".green().bold(), utility.name, utility.id);
        }
        EntityCommand::AddTopic { name } => {
            let topic = store.upsert_canonical_topic(&name).await?;
            println!("{} canonical topic '{}' (id={})", "saved:".green().bold(), topic.name, topic.id);
        }
        EntityCommand::ListUtilities => {
            for u in store.list_canonical_utilities().await? {
                println!("[{}] {:<30} mentions={}", u.id, u.name, u.mention_count);
            }
        }
        EntityCommand::ListTopics => {
            for t in store.list_canonical_topics().await? {
                println!("[{}] {:<30} mentions={}", t.id, t.name, t.mention_count);
            }
        }
    }
    Ok(())
}

/// File + stderr layered logging, mirroring the teacher's `setup_logging`
/// (daily-rotated file gets everything, stderr only surfaces errors).
fn setup_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = dirs::home_dir().unwrap_or_else(|| std::path::PathBuf::from(".")).join(".canaryscope").join("logs");
    std::fs::create_dir_all(&log_dir).context("failed to create log directory")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "canaryscope.log");

    let subscriber = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_filter(EnvFilter::from_default_env().add_directive("canaryscope=debug".parse()?).add_directive("info".parse()?)),
        )
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact()
                .with_filter(EnvFilter::from_default_env().add_directive("canaryscope=warn".parse()?).add_directive("warn".parse()?)),
        );

    tracing::subscriber::set_global_default(subscriber).context("failed to set tracing subscriber")?;
    Ok(())
}
