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

//! Maps a hearing's current status onto the stage that owns its next
//! transition (spec §4.8 step 2).
//!
//! The four working stages each persist their own success status as part
//! of the same transaction that writes their output (`Store::complete_download`,
//! `save_transcript`, `save_analysis`, `complete_extraction`), so the status
//! chain isn't a uniform single-hop walk: download and extraction jump
//! straight past their `-ing` rest marker into the following stage (or
//! `complete`), while transcribe and analyze land on `transcribed`/`analyzed`
//! as a visible rest state for one orchestrator pass before the next stage
//! picks the hearing back up. `transcribed`/`analyzed`/`extracted` therefore
//! own no stage here - the orchestrator just advances past them.

use crate::types::{HearingStatus, StageName};

pub fn stage_for_status(status: HearingStatus) -> Option<StageName> {
    use HearingStatus::*;
    match status {
        Discovered | Downloading => Some(StageName::Download),
        Transcribing => Some(StageName::Transcribe),
        Transcribed => None,
        Analyzing => Some(StageName::Analyze),
        Analyzed => None,
        Extracting => Some(StageName::Extract),
        Extracted => None,
        Complete | Error | Skipped => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovered_and_downloading_route_to_download() {
        assert_eq!(stage_for_status(HearingStatus::Discovered), Some(StageName::Download));
        assert_eq!(stage_for_status(HearingStatus::Downloading), Some(StageName::Download));
    }

    #[test]
    fn rest_states_have_no_stage() {
        assert_eq!(stage_for_status(HearingStatus::Transcribed), None);
        assert_eq!(stage_for_status(HearingStatus::Analyzed), None);
        assert_eq!(stage_for_status(HearingStatus::Extracted), None);
    }

    #[test]
    fn terminal_statuses_have_no_stage() {
        assert_eq!(stage_for_status(HearingStatus::Complete), None);
        assert_eq!(stage_for_status(HearingStatus::Error), None);
    }
}
