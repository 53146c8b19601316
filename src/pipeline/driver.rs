// src/pipeline/driver.rs

//! Per-target polling loop.
//!
//! ```text
//! INIT ──▶ POLLING ──▶ RESOLVING (each novel record, rank order) ──▶ sleep ──▶ POLLING ...
//! ```
//!
//! The driver exclusively owns its page client. Snapshot fetches and searches
//! share that session, so everything within one driver runs sequentially.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::client::PageClient;
use crate::error::{AppError, Result};
use crate::models::{Config, Record, SearchQuery, SearchResult, Snapshot, TargetConfig};
use crate::notify::{Notifier, match_message};
use crate::pipeline::diff::{NoveltySet, novel};
use crate::pipeline::search::CrossReferencer;
use crate::pipeline::snapshot::Snapshotter;
use crate::storage::{LogEntry, MatchStage, ResultLog};

/// Loop cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverSettings {
    /// Sleep after each polling cycle
    pub poll_interval: Duration,
    /// Rows per snapshot
    pub snapshot_size: usize,
    /// Stop after this many polling cycles; `None` runs until shutdown
    pub max_cycles: Option<u64>,
}

impl DriverSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.watch.poll_interval_secs),
            snapshot_size: config.watch.snapshot_size,
            max_cycles: None,
        }
    }
}

/// Collaborators shared by every driver of a run.
#[derive(Clone)]
pub struct PipelineContext {
    pub snapshotter: Snapshotter,
    pub searcher: CrossReferencer,
    pub notifier: Arc<dyn Notifier>,
    pub results: Arc<dyn ResultLog>,
    pub settings: DriverSettings,
}

impl PipelineContext {
    pub fn from_config(
        config: &Config,
        notifier: Arc<dyn Notifier>,
        results: Arc<dyn ResultLog>,
    ) -> Self {
        Self {
            snapshotter: Snapshotter::from_config(config),
            searcher: CrossReferencer::from_config(config),
            notifier,
            results,
            settings: DriverSettings::from_config(config),
        }
    }
}

/// What one polling cycle found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub novel: usize,
    pub matches: usize,
}

/// How a driver stopped without a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverExit {
    /// Reached `max_cycles`
    Completed,
    /// Shutdown signal observed
    Shutdown,
}

/// Totals reported when a driver stops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverSummary {
    pub target: String,
    pub cycles: u64,
    pub novel: usize,
    pub matches: usize,
    pub exit: DriverExit,
}

/// Watches one listing.
pub struct PipelineDriver<C: PageClient> {
    target: TargetConfig,
    client: C,
    ctx: PipelineContext,
    cancel: CancellationToken,
    previous: Option<Snapshot>,
    cycles: u64,
    novel_total: usize,
    match_total: usize,
}

impl<C: PageClient> PipelineDriver<C> {
    pub fn new(
        target: TargetConfig,
        client: C,
        ctx: PipelineContext,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            target,
            client,
            ctx,
            cancel,
            previous: None,
            cycles: 0,
            novel_total: 0,
            match_total: 0,
        }
    }

    pub fn target(&self) -> &TargetConfig {
        &self.target
    }

    /// Snapshot kept from the last cycle.
    pub fn previous(&self) -> Option<&Snapshot> {
        self.previous.as_ref()
    }

    /// Run until `max_cycles`, a fatal error, or shutdown.
    ///
    /// The page client is released exactly once on every one of those paths.
    pub async fn run(mut self) -> Result<DriverSummary> {
        let outcome = self.run_loop().await;

        if let Err(e) = self.client.release().await {
            log::warn!("[{}] Failed to release page client: {}", self.target.name(), e);
        }

        let exit = match outcome {
            Ok(()) => DriverExit::Completed,
            Err(e) if e.is_cancelled() => DriverExit::Shutdown,
            Err(e) => return Err(e),
        };
        Ok(DriverSummary {
            target: self.target.name(),
            cycles: self.cycles,
            novel: self.novel_total,
            matches: self.match_total,
            exit,
        })
    }

    async fn run_loop(&mut self) -> Result<()> {
        log::info!("[{}] Watching {}", self.target.name(), self.target.origin());
        self.init().await?;

        loop {
            if self
                .ctx
                .settings
                .max_cycles
                .is_some_and(|max| self.cycles >= max)
            {
                return Ok(());
            }
            if self.cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }

            let report = self.run_cycle().await?;
            if report.novel > 0 {
                log::info!(
                    "[{}] Cycle {}: {} new contracts, {} on GitHub",
                    self.target.name(),
                    self.cycles,
                    report.novel,
                    report.matches
                );
            }

            if self
                .ctx
                .settings
                .max_cycles
                .is_some_and(|max| self.cycles >= max)
            {
                return Ok(());
            }
            tokio::select! {
                _ = tokio::time::sleep(self.ctx.settings.poll_interval) => {}
                _ = self.cancel.cancelled() => return Err(AppError::Cancelled),
            }
        }
    }

    /// Take the baseline snapshot.
    pub async fn init(&mut self) -> Result<()> {
        let snapshot = self.take_snapshot().await?;
        log::debug!(
            "[{}] Baseline snapshot with {} records",
            self.target.name(),
            snapshot.len()
        );
        self.previous = Some(snapshot);
        Ok(())
    }

    /// One POLLING step: snapshot, diff, resolve every novel record.
    ///
    /// Without a previous snapshot the new one only becomes the baseline.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let current = self.take_snapshot().await?;
        let novelty = match &self.previous {
            Some(previous) => novel(previous, &current),
            None => NoveltySet::default(),
        };

        let mut report = CycleReport {
            novel: novelty.len(),
            matches: 0,
        };
        for record in novelty {
            if self.cancel.is_cancelled() {
                return Err(AppError::Cancelled);
            }
            if self.resolve(&record).await?.is_some() {
                report.matches += 1;
            }
        }

        self.previous = Some(current);
        self.cycles += 1;
        self.novel_total += report.novel;
        self.match_total += report.matches;
        Ok(report)
    }

    async fn take_snapshot(&mut self) -> Result<Snapshot> {
        self.ctx
            .snapshotter
            .snapshot(
                &mut self.client,
                &self.target,
                self.ctx.settings.snapshot_size,
                &self.cancel,
            )
            .await
    }

    /// RESOLVING: search the address, then the name if the address missed.
    async fn resolve(&mut self, record: &Record) -> Result<Option<MatchStage>> {
        let by_address = self.lookup(&record.primary_token).await?;
        let (stage, result) = if by_address.is_match() {
            (Some(MatchStage::Address), by_address)
        } else {
            log::debug!(
                "[{}] No match for address {}: {:?}",
                self.target.name(),
                record.primary_token,
                by_address
            );
            let by_name = self.lookup(&record.secondary_token).await?;
            if by_name.is_match() {
                (Some(MatchStage::Name), by_name)
            } else {
                (None, by_name)
            }
        };

        let reference = result.url().map(str::to_string);
        if let Some(url) = &reference {
            log::info!("[{}] Found {} on GitHub: {}", self.target.name(), record.key, url);
            let message = match_message(self.target.host_name(), url);
            if let Err(e) = self.ctx.notifier.send(&message).await {
                log::warn!("[{}] Notification failed: {}", self.target.name(), e);
            }
        }

        let entry = LogEntry::new(self.target.name(), stage, reference, &record.raw_text);
        if let Err(e) = self.ctx.results.append(&entry).await {
            log::warn!("[{}] Failed to append outcome log: {}", self.target.name(), e);
        }

        Ok(stage)
    }

    async fn lookup(&mut self, term: &str) -> Result<SearchResult> {
        let query = SearchQuery {
            term: term.to_string(),
            language: self.target.language.clone(),
            result_type: self.target.result_type,
            max_comments: self.target.max_comments,
            max_results: self.target.max_results,
        };
        self.ctx
            .searcher
            .search(&mut self.client, &query, &self.cancel)
            .await
    }
}
