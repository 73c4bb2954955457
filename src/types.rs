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

//! Domain enums shared across the store, pipeline, and adapters (spec §3).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A Hearing's ground-truth status. The orchestrator is the only writer.
///
/// Legal transitions (spec §3):
/// discovered -> downloading -> transcribing -> transcribed -> analyzing
///            -> analyzed -> extracting -> extracted -> complete
///            \-> error (from any state, terminal-unless-retried)
///            \-> skipped (terminal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HearingStatus {
    Discovered,
    Downloading,
    Transcribing,
    Transcribed,
    Analyzing,
    Analyzed,
    Extracting,
    Extracted,
    Complete,
    Error,
    Skipped,
}

impl HearingStatus {
    /// The next status this one advances to on a successful stage, if any
    /// stage owns that transition. `None` for terminal/branch-only states.
    pub fn next_on_success(self) -> Option<HearingStatus> {
        use HearingStatus::*;
        match self {
            Discovered => Some(Downloading),
            Downloading => Some(Transcribing),
            Transcribing => Some(Transcribed),
            Transcribed => Some(Analyzing),
            Analyzing => Some(Analyzed),
            Analyzed => Some(Extracting),
            Extracting => Some(Extracted),
            Extracted => Some(Complete),
            Complete | Error | Skipped => None,
        }
    }

    /// Statuses the orchestrator considers "actionable" for a pipeline pass
    /// (spec §4.8 step 1): anything not terminal.
    pub fn is_actionable(self) -> bool {
        !matches!(self, HearingStatus::Complete | HearingStatus::Error | HearingStatus::Skipped)
    }
}

impl fmt::Display for HearingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HearingStatus::Discovered => "discovered",
            HearingStatus::Downloading => "downloading",
            HearingStatus::Transcribing => "transcribing",
            HearingStatus::Transcribed => "transcribed",
            HearingStatus::Analyzing => "analyzing",
            HearingStatus::Analyzed => "analyzed",
            HearingStatus::Extracting => "extracting",
            HearingStatus::Extracted => "extracted",
            HearingStatus::Complete => "complete",
            HearingStatus::Error => "error",
            HearingStatus::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for HearingStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "discovered" => HearingStatus::Discovered,
            "downloading" => HearingStatus::Downloading,
            "transcribing" => HearingStatus::Transcribing,
            "transcribed" => HearingStatus::Transcribed,
            "analyzing" => HearingStatus::Analyzing,
            "analyzed" => HearingStatus::Analyzed,
            "extracting" => HearingStatus::Extracting,
            "extracted" => HearingStatus::Extracted,
            "complete" => HearingStatus::Complete,
            "error" => HearingStatus::Error,
            "skipped" => HearingStatus::Skipped,
            other => return Err(format!("unknown hearing status: {other}")),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    VideoChannel,
    AdminMonitor,
    RssFeed,
    ApiEndpoint,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::VideoChannel => "video_channel",
            SourceKind::AdminMonitor => "admin_monitor",
            SourceKind::RssFeed => "rss_feed",
            SourceKind::ApiEndpoint => "api_endpoint",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for SourceKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "video_channel" => SourceKind::VideoChannel,
            "admin_monitor" => SourceKind::AdminMonitor,
            "rss_feed" => SourceKind::RssFeed,
            "api_endpoint" => SourceKind::ApiEndpoint,
            other => return Err(format!("unknown source kind: {other}")),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Pending,
    Active,
    Error,
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceStatus::Pending => "pending",
            SourceStatus::Active => "active",
            SourceStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineJobStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

impl fmt::Display for PipelineJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineJobStatus::Pending => "pending",
            PipelineJobStatus::Running => "running",
            PipelineJobStatus::Complete => "complete",
            PipelineJobStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Stage identifiers, also used as `PipelineJob.stage` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    Download,
    Transcribe,
    Analyze,
    Extract,
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageName::Download => "download",
            StageName::Transcribe => "transcribe",
            StageName::Analyze => "analyze",
            StageName::Extract => "extract",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionerMood {
    Supportive,
    Skeptical,
    Hostile,
    Neutral,
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicSentiment {
    Supportive,
    Opposed,
    Mixed,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocketConfidence {
    Verified,
    Possible,
    Unverified,
}

impl fmt::Display for DocketConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocketConfidence::Verified => "verified",
            DocketConfidence::Possible => "possible",
            DocketConfidence::Unverified => "unverified",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Fuzzy,
    None,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchType::Exact => "exact",
            MatchType::Fuzzy => "fuzzy",
            MatchType::None => "none",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractedDocketStatus {
    Accepted,
    NeedsReview,
    Rejected,
}

impl fmt::Display for ExtractedDocketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExtractedDocketStatus::Accepted => "accepted",
            ExtractedDocketStatus::NeedsReview => "needs_review",
            ExtractedDocketStatus::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleTarget {
    Pipeline,
    Scraper,
    All,
}

impl fmt::Display for ScheduleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScheduleTarget::Pipeline => "pipeline",
            ScheduleTarget::Scraper => "scraper",
            ScheduleTarget::All => "all",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ScheduleTarget {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pipeline" => ScheduleTarget::Pipeline,
            "scraper" => ScheduleTarget::Scraper,
            "all" => ScheduleTarget::All,
            other => return Err(format!("unknown schedule target: {other}")),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleType {
    Interval,
    Daily,
    Cron,
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScheduleType::Interval => "interval",
            ScheduleType::Daily => "daily",
            ScheduleType::Cron => "cron",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ScheduleType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "interval" => ScheduleType::Interval,
            "daily" => ScheduleType::Daily,
            "cron" => ScheduleType::Cron,
            other => return Err(format!("unknown schedule type: {other}")),
        })
    }
}

/// Whisper-family transcription provider, chosen once at construction by a
/// priority probe (spec §4.5), mirroring the teacher's `WhisperBackend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionProvider {
    Groq,
    Azure,
    OpenAi,
    Local,
}

impl fmt::Display for TranscriptionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TranscriptionProvider::Groq => "groq",
            TranscriptionProvider::Azure => "azure",
            TranscriptionProvider::OpenAi => "openai",
            TranscriptionProvider::Local => "local",
        };
        write!(f, "{}", s)
    }
}
