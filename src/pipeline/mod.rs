//! Watch pipeline.
//!
//! - `snapshot`: top-N rows of a listing
//! - `diff`: records that are new since the previous snapshot
//! - `search`: GitHub cross-reference with the admission threshold
//! - `driver`: one polling loop per target
//! - `runner`: all targets concurrently

pub mod diff;
pub mod driver;
pub mod retry;
pub mod runner;
pub mod search;
pub mod snapshot;

#[cfg(test)]
pub(crate) mod testing;

pub use diff::{NoveltySet, novel};
pub use driver::{
    CycleReport, DriverExit, DriverSettings, DriverSummary, PipelineContext, PipelineDriver,
};
pub use retry::{RetryPolicy, call_with_policy, call_with_state};
pub use runner::{RunSummary, TargetFault, run_targets};
pub use search::CrossReferencer;
pub use snapshot::Snapshotter;
