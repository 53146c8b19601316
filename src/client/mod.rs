//! Remote page access.
//!
//! A [`PageClient`] opens a page, waits until a region matching a CSS
//! selector is present and hands back that region's rows of text. One client
//! is one browsing session: its navigation state (the current URL) changes on
//! every fetch, so a client must never be shared between workers.

mod http;

#[cfg(test)]
pub(crate) mod scripted;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use http::HttpPageClient;

/// A rendered page region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// URL the region was read from (after redirects)
    pub url: String,

    /// Selector that matched
    pub selector: String,

    /// Whitespace-normalized text of the whole region
    pub text: String,

    /// Table rows under the region, each as its cell texts.
    /// A region without rows is one row holding `text`.
    pub rows: Vec<Vec<String>>,
}

/// Contract for the remote page surface.
#[async_trait]
pub trait PageClient: Send {
    /// Navigate to `url` and wait up to `timeout` for `selector` to match.
    ///
    /// Fails with [`AppError::TransientFetch`](crate::error::AppError::TransientFetch)
    /// when the region does not appear in time.
    async fn fetch_region(
        &mut self,
        url: &str,
        selector: &str,
        timeout: Duration,
    ) -> Result<Region>;

    /// Rows of text in the region, in document order.
    fn extract_rows(&self, region: &Region) -> Vec<Vec<String>> {
        region.rows.clone()
    }

    /// URL of the page the session is currently on.
    fn current_url(&self) -> Option<String>;

    /// Release the session. Later fetches fail; releasing twice is a no-op.
    async fn release(&mut self) -> Result<()>;
}
