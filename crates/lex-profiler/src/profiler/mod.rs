//! Column profiling.
//!
//! Type inference runs per value, [`ColumnAccumulator`] folds one column in a
//! single pass, and the orchestrator drives a set of accumulators from either
//! materialized columns or a row-event stream.

pub mod accumulator;
pub mod orchestrator;
pub mod reservoir;
pub mod statistics;
pub mod type_inference;

pub use accumulator::{ColumnAccumulator, dominant_type};
pub use orchestrator::{StreamAggregator, profile, profile_async};
pub use reservoir::Reservoir;
pub use statistics::{NumericSummary, histogram};
pub use type_inference::{HeaderHints, classify, classify_with_hints};
