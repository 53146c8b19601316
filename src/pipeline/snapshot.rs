// src/pipeline/snapshot.rs

//! Listing snapshots.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::PageClient;
use crate::error::{AppError, Result};
use crate::models::{Config, ListingConfig, Record, Snapshot, TargetConfig};
use crate::pipeline::retry::{RetryPolicy, call_with_state};

/// Fetches the top rows of a verified-contracts listing.
#[derive(Debug, Clone)]
pub struct Snapshotter {
    listing: ListingConfig,
    timeout: Duration,
    policy: RetryPolicy,
}

impl Snapshotter {
    pub fn new(listing: ListingConfig, timeout: Duration, policy: RetryPolicy) -> Self {
        Self {
            listing,
            timeout,
            policy,
        }
    }

    /// Snapshotter with an unbounded retry policy, from application config.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.listing.clone(),
            Duration::from_secs(config.client.timeout_secs),
            RetryPolicy::unbounded(Duration::from_secs(config.watch.retry_wait_secs)),
        )
    }

    /// Take a snapshot of at most `n` rows.
    ///
    /// Fewer rows than `n` is not an error, but an empty listing is retried
    /// like a page that has not rendered yet. A row with too few cells, or
    /// without an address and a name, fails with `MalformedPage` and is not
    /// retried.
    pub async fn snapshot<C: PageClient + ?Sized>(
        &self,
        client: &mut C,
        target: &TargetConfig,
        n: usize,
        cancel: &CancellationToken,
    ) -> Result<Snapshot> {
        let url = target.listing_url(&self.listing);
        let selector = self.listing.region_selector.clone();
        let timeout = self.timeout;

        let region = call_with_state(&self.policy, cancel, client, |client| {
            let url = url.clone();
            let selector = selector.clone();
            Box::pin(async move {
                let region = client.fetch_region(&url, &selector, timeout).await?;
                // A listing with no rows has not finished loading.
                if client.extract_rows(&region).is_empty() {
                    return Err(AppError::transient(&url, &selector, "listing has no rows"));
                }
                Ok(region)
            })
        })
        .await?;

        let rows = client.extract_rows(&region);
        let mut snapshot = Snapshot::new();
        for (rank, cells) in rows.iter().take(n).enumerate() {
            if cells.len() < self.listing.min_columns {
                return Err(AppError::malformed(
                    &url,
                    format!(
                        "row {} has {} columns, expected at least {}",
                        rank + 1,
                        cells.len(),
                        self.listing.min_columns
                    ),
                ));
            }
            let record = Record::from_cells(cells)
                .map_err(|e| AppError::malformed(&url, format!("row {}: {}", rank + 1, e)))?;
            if !snapshot.insert(record) {
                log::debug!("Duplicate listing key at row {} of {}", rank + 1, url);
            }
        }

        log::debug!("Snapshot of {} holds {} records", url, snapshot.len());
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::scripted::{ScriptedClient, Step};

    fn snapshotter(min_columns: usize) -> Snapshotter {
        let listing = ListingConfig {
            min_columns,
            ..ListingConfig::default()
        };
        Snapshotter::new(
            listing,
            Duration::from_secs(1),
            RetryPolicy::unbounded(Duration::from_secs(10)),
        )
    }

    #[tokio::test]
    async fn test_snapshot_caps_at_n_in_rank_order() {
        let mut client = ScriptedClient::new().listing(Step::listing(&[
            "0x3 Gamma 0.8.1",
            "0x2 Beta 0.8.1",
            "0x1 Alpha 0.8.1",
        ]));
        let target = TargetConfig::new("etherscan.io");

        let snapshot = snapshotter(2)
            .snapshot(&mut client, &target, 2, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(snapshot.keys().collect::<Vec<_>>(), vec!["0x3", "0x2"]);
        assert_eq!(snapshot.get("0x3").unwrap().raw_text, "0x3 Gamma 0.8.1");
    }

    #[tokio::test]
    async fn test_snapshot_short_listing_returns_all_rows() {
        let mut client = ScriptedClient::new().listing(Step::listing(&["0xa Token"]));
        let target = TargetConfig::new("etherscan.io");

        let snapshot = snapshotter(2)
            .snapshot(&mut client, &target, 15, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_fetches_listing_url() {
        let mut client = ScriptedClient::new().listing(Step::listing(&["0xa Token"]));
        let recorder = client.recorder();
        let target = TargetConfig::new("ftmscan.com");

        snapshotter(2)
            .snapshot(&mut client, &target, 15, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            recorder.fetched(),
            vec!["https://ftmscan.com/contractsVerified/1?ps=100"]
        );
    }

    #[tokio::test]
    async fn test_snapshot_too_few_columns_is_malformed() {
        let mut client =
            ScriptedClient::new().listing(Step::listing(&["0xa Token Solidity", "0xb"]));
        let target = TargetConfig::new("etherscan.io");

        let err = snapshotter(2)
            .snapshot(&mut client, &target, 15, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MalformedPage { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_retries_until_rendered() {
        let mut client = ScriptedClient::new()
            .listing(Step::Transient)
            .listing(Step::Transient)
            .listing(Step::listing(&["0xa Token"]));
        let recorder = client.recorder();
        let target = TargetConfig::new("etherscan.io");

        let snapshot = snapshotter(2)
            .snapshot(&mut client, &target, 15, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(recorder.fetched().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_empty_listing_is_retried() {
        let mut client = ScriptedClient::new()
            .listing(Step::listing(&[]))
            .listing(Step::listing(&["0xb Router", "0xa Token"]));
        let recorder = client.recorder();
        let target = TargetConfig::new("etherscan.io");

        let started = tokio::time::Instant::now();
        let snapshot = snapshotter(2)
            .snapshot(&mut client, &target, 15, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(recorder.fetched().len(), 2);
        assert!(started.elapsed() >= Duration::from_secs(10));
    }
}
