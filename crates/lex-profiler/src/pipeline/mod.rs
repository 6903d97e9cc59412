//! Pipeline module.
//!
//! This module provides the [`Profiler`] facade and the progress and
//! cancellation plumbing it shares with the ingest layer.

mod builder;
pub mod progress;

pub use builder::{Profiler, ProfilerBuilder};
pub use progress::{
    BytesCounter, CancellationToken, ClosureProgressReporter, ProfilingStage, ProgressReader,
    ProgressReporter, ProgressUpdate,
};
