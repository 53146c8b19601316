//! In-memory `PageClient` replaying canned responses.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{PageClient, Region};
use crate::error::{AppError, Result};

/// One canned response.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    /// Listing table rows
    Rows(Vec<Vec<String>>),
    /// Search header text
    Text(String),
    /// Region never rendered
    Transient,
    /// Page structure changed
    Malformed,
}

impl Step {
    /// Listing rows from row texts, one cell per whitespace token.
    pub(crate) fn listing(rows: &[&str]) -> Self {
        Step::Rows(
            rows.iter()
                .map(|r| r.split_whitespace().map(str::to_string).collect())
                .collect(),
        )
    }

    pub(crate) fn header(text: &str) -> Self {
        Step::Text(text.to_string())
    }
}

/// Shared handles for inspecting a client after it moved into a driver.
#[derive(Debug, Clone, Default)]
pub(crate) struct Recorder {
    pub fetched: Arc<Mutex<Vec<String>>>,
    pub releases: Arc<AtomicUsize>,
}

impl Recorder {
    pub(crate) fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub(crate) fn search_urls(&self) -> Vec<String> {
        self.fetched()
            .into_iter()
            .filter(|u| !u.contains("/contractsVerified/"))
            .collect()
    }

    pub(crate) fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

/// Listing URLs pop from `listings`, everything else from `searches`.
/// An exhausted queue answers `Malformed` so a test never hangs in retries.
#[derive(Debug, Default)]
pub(crate) struct ScriptedClient {
    listings: VecDeque<Step>,
    searches: VecDeque<Step>,
    current_url: Option<String>,
    released: bool,
    recorder: Recorder,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn listing(mut self, step: Step) -> Self {
        self.listings.push_back(step);
        self
    }

    pub(crate) fn search(mut self, step: Step) -> Self {
        self.searches.push_back(step);
        self
    }

    pub(crate) fn recorder(&self) -> Recorder {
        self.recorder.clone()
    }
}

#[async_trait]
impl PageClient for ScriptedClient {
    async fn fetch_region(
        &mut self,
        url: &str,
        selector: &str,
        _timeout: Duration,
    ) -> Result<Region> {
        if self.released {
            return Err(AppError::SessionClosed);
        }
        self.recorder.fetched.lock().unwrap().push(url.to_string());
        self.current_url = Some(url.to_string());

        let queue = if url.contains("/contractsVerified/") {
            &mut self.listings
        } else {
            &mut self.searches
        };
        let step = queue.pop_front().unwrap_or(Step::Malformed);

        let (text, rows) = match step {
            Step::Rows(rows) => {
                let text = rows
                    .iter()
                    .map(|r| r.join(" "))
                    .collect::<Vec<_>>()
                    .join(" ");
                (text, rows)
            }
            Step::Text(text) => (text.clone(), vec![vec![text]]),
            Step::Transient => return Err(AppError::transient(url, selector, "scripted")),
            Step::Malformed => return Err(AppError::malformed(url, "scripted")),
        };

        Ok(Region {
            url: url.to_string(),
            selector: selector.to_string(),
            text,
            rows,
        })
    }

    fn current_url(&self) -> Option<String> {
        self.current_url.clone()
    }

    async fn release(&mut self) -> Result<()> {
        // Counted on every call so tests can see double releases.
        self.recorder.releases.fetch_add(1, Ordering::SeqCst);
        self.released = true;
        Ok(())
    }
}
