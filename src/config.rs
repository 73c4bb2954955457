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

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub groq_api_key: Option<String>,
    pub groq_whisper_model: String,
    pub azure_openai_endpoint: Option<String>,
    pub azure_openai_api_key: Option<String>,
    pub azure_openai_api_version: String,
    pub azure_openai_whisper_deployment: Option<String>,
    pub azure_openai_chat_deployment: Option<String>,
    pub openai_api_key: Option<String>,
    pub analysis_model: String,
    pub llm_polish_model: Option<String>,
    pub whisper_model: String,
    pub local_whisper_model: Option<String>,
    pub use_openai_whisper: bool,
}

#[derive(Debug, Clone)]
pub struct DocketConfig {
    pub accept_threshold: f64,
    pub review_threshold: f64,
    pub fuzzy_gate: f64,
    pub needs_review_always: bool,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_cost_per_run: f64,
    pub max_hearings_per_run: u32,
    pub max_retries: u32,
    pub scheduler_check_interval_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub audio_dir: PathBuf,
    pub generate_embeddings: bool,
    pub providers: ProviderConfig,
    pub docket: DocketConfig,
    pub orchestrator: OrchestratorConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists.
        dotenv::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://canaryscope.db".to_string());

        let audio_dir = env::var("AUDIO_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/audio"));

        std::fs::create_dir_all(&audio_dir)
            .context("Failed to create audio cache directory")?;

        let generate_embeddings = env_bool("GENERATE_EMBEDDINGS", false);

        let providers = ProviderConfig {
            groq_api_key: env::var("GROQ_API_KEY").ok(),
            groq_whisper_model: env::var("GROQ_WHISPER_MODEL")
                .unwrap_or_else(|_| "whisper-large-v3-turbo".to_string()),
            azure_openai_endpoint: env::var("AZURE_OPENAI_ENDPOINT").ok(),
            azure_openai_api_key: env::var("AZURE_OPENAI_API_KEY").ok(),
            azure_openai_api_version: env::var("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|_| "2024-06-01".to_string()),
            azure_openai_whisper_deployment: env::var("AZURE_OPENAI_WHISPER_DEPLOYMENT").ok(),
            azure_openai_chat_deployment: env::var("AZURE_OPENAI_CHAT_DEPLOYMENT").ok(),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            analysis_model: env::var("ANALYSIS_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            llm_polish_model: env::var("LLM_POLISH_MODEL").ok(),
            whisper_model: env::var("WHISPER_MODEL").unwrap_or_else(|_| "whisper-1".to_string()),
            local_whisper_model: env::var("LOCAL_WHISPER_MODEL").ok(),
            use_openai_whisper: env_bool("USE_OPENAI_WHISPER", false),
        };

        let docket = DocketConfig {
            accept_threshold: env_f64("DOCKET_ACCEPT_THRESHOLD", 85.0),
            review_threshold: env_f64("DOCKET_REVIEW_THRESHOLD", 60.0),
            fuzzy_gate: env_f64("DOCKET_FUZZY_GATE", 60.0),
            needs_review_always: env_bool("DOCKET_NEEDS_REVIEW_ALWAYS", true),
        };

        let orchestrator = OrchestratorConfig {
            max_cost_per_run: env_f64("PIPELINE_MAX_COST_PER_RUN", 25.0),
            max_hearings_per_run: env_u32("PIPELINE_MAX_HEARINGS_PER_RUN", 50),
            max_retries: env_u32("PIPELINE_MAX_RETRIES", 3),
            scheduler_check_interval_secs: env_u64("SCHEDULER_CHECK_INTERVAL_SECS", 60),
        };

        Ok(Config {
            database_url,
            audio_dir,
            generate_embeddings,
            providers,
            docket,
            orchestrator,
        })
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
