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

//! Docket extraction (spec §4.7): candidate recognition, known-docket
//! matching, and confidence scoring, assembled from the three submodules
//! below.

pub mod extractor;
pub mod fuzzy;
pub mod patterns;

pub use extractor::{extract_and_link, ExtractionOutcome};
