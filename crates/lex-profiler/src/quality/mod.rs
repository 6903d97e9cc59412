//! Data quality and sensitivity scoring.
//!
//! This module grades each finalized column (GOOD / WARNING / CRITICAL) from
//! its blank and consistency ratios, and tags it with a governance level
//! derived from its dominant type.

mod sensitivity;
mod sla;

pub use sensitivity::SensitivityClassifier;
pub use sla::{QualityScorer, Severity};
