// src/pipeline/runner.rs

//! Runs one driver per target concurrently.

use chrono::{DateTime, Utc};
use futures::future;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::client::PageClient;
use crate::error::Result;
use crate::models::TargetConfig;
use crate::pipeline::driver::{DriverSummary, PipelineContext, PipelineDriver};

/// A target whose driver stopped on a fatal error.
#[derive(Debug, Clone, Serialize)]
pub struct TargetFault {
    pub target: String,
    pub error: String,
    pub at: DateTime<Utc>,
}

impl TargetFault {
    fn new(target: String, error: impl ToString) -> Self {
        Self {
            target,
            error: error.to_string(),
            at: Utc::now(),
        }
    }
}

/// Outcome of every driver of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub finished: Vec<DriverSummary>,
    pub faults: Vec<TargetFault>,
}

impl RunSummary {
    pub fn matches(&self) -> usize {
        self.finished.iter().map(|s| s.matches).sum()
    }
}

/// Watch every target until each driver stops.
///
/// `factory` opens a dedicated page client per target. A fault in one target
/// (including a failure to open its client) does not affect the others.
pub async fn run_targets<C, F>(
    targets: Vec<TargetConfig>,
    ctx: PipelineContext,
    factory: F,
    cancel: CancellationToken,
) -> RunSummary
where
    C: PageClient + 'static,
    F: Fn(&TargetConfig) -> Result<C>,
{
    let mut summary = RunSummary::default();
    let mut handles = Vec::with_capacity(targets.len());

    for target in targets {
        let name = target.name();
        let client = match factory(&target) {
            Ok(client) => client,
            Err(e) => {
                log::error!("[{}] Failed to open page client: {}", name, e);
                summary.faults.push(TargetFault::new(name, e));
                continue;
            }
        };
        let driver = PipelineDriver::new(target, client, ctx.clone(), cancel.child_token());
        handles.push((name, tokio::spawn(driver.run())));
    }

    log::info!("Started {} drivers", handles.len());

    let (names, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
    let results = future::join_all(handles).await;

    for (name, result) in names.into_iter().zip(results) {
        match result {
            Ok(Ok(finished)) => summary.finished.push(finished),
            Ok(Err(e)) => {
                log::error!("[{}] Driver stopped: {}", name, e);
                summary.faults.push(TargetFault::new(name, e));
            }
            Err(e) => {
                log::error!("[{}] Driver task failed: {}", name, e);
                summary.faults.push(TargetFault::new(name, e));
            }
        }
    }

    summary
}
