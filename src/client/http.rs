// src/client/http.rs

//! HTTP-backed page client.
//!
//! Re-fetches the page until the wanted region is present, which covers pages
//! that are still rendering, rate-limit interstitials and flaky connections.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tokio::time::Instant;

use crate::client::{PageClient, Region};
use crate::error::{AppError, Result};
use crate::models::ClientConfig;
use crate::utils::http::create_async_client;

/// Lower bound for a single request timeout near the render deadline.
const MIN_REQUEST_TIMEOUT: Duration = Duration::from_millis(250);

/// Page client backed by a reqwest session.
pub struct HttpPageClient {
    client: Client,
    render_poll: Duration,
    current_url: Option<String>,
    released: bool,
}

impl HttpPageClient {
    /// Create a new client with its own connection pool and cookie-less session.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self::with_client(
            create_async_client(config)?,
            Duration::from_millis(config.render_poll_ms),
        ))
    }

    pub fn with_client(client: Client, render_poll: Duration) -> Self {
        Self {
            client,
            render_poll,
            current_url: None,
            released: false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// One navigation: fetch the page and look for the region.
    async fn fetch_once(
        &mut self,
        url: &str,
        selector: &str,
        timeout: Duration,
    ) -> Result<Option<Region>> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| AppError::transient(url, selector, e))?;

        let final_url = response.url().to_string();
        self.current_url = Some(final_url.clone());

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::transient(url, selector, format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::transient(url, selector, e))?;

        Ok(read_region(&body, selector)?.map(|(text, rows)| Region {
            url: final_url,
            selector: selector.to_string(),
            text,
            rows,
        }))
    }
}

#[async_trait]
impl PageClient for HttpPageClient {
    async fn fetch_region(
        &mut self,
        url: &str,
        selector: &str,
        timeout: Duration,
    ) -> Result<Region> {
        if self.released {
            return Err(AppError::SessionClosed);
        }
        // Reject a bad selector up front; waiting would never fix it.
        parse_selector(selector)?;

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let reason = match self
                .fetch_once(url, selector, remaining.max(MIN_REQUEST_TIMEOUT))
                .await
            {
                Ok(Some(region)) => return Ok(region),
                Ok(None) => "region not present".to_string(),
                Err(e) if e.is_transient() => e.to_string(),
                Err(e) => return Err(e),
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                log::debug!("Gave up waiting for '{}' at {}: {}", selector, url, reason);
                return Err(AppError::transient(url, selector, reason));
            }
            tokio::time::sleep(self.render_poll.min(remaining)).await;
        }
    }

    fn current_url(&self) -> Option<String> {
        self.current_url.clone()
    }

    async fn release(&mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            self.current_url = None;
            log::debug!("Page client session released");
        }
        Ok(())
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn normalize_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn cell_texts(row: ElementRef<'_>, cell_sel: &Selector) -> Vec<String> {
    row.select(cell_sel)
        .map(|cell| normalize_text(cell.text()))
        .collect()
}

/// Find the region in a document and read its text and rows.
///
/// Everything is extracted here so the parsed document never outlives the call.
fn read_region(html: &str, selector: &str) -> Result<Option<(String, Vec<Vec<String>>)>> {
    let region_sel = parse_selector(selector)?;
    let row_sel = parse_selector("tr")?;
    let cell_sel = parse_selector("td, th")?;

    let document = Html::parse_document(html);
    let Some(region) = document.select(&region_sel).next() else {
        return Ok(None);
    };

    let text = normalize_text(region.text());
    let mut rows: Vec<Vec<String>> = if region.value().name() == "tr" {
        vec![cell_texts(region, &cell_sel)]
    } else {
        region
            .select(&row_sel)
            .map(|row| cell_texts(row, &cell_sel))
            .collect()
    };

    if rows.is_empty() {
        // Matched but still empty: keep waiting for it to fill in.
        if text.is_empty() {
            return Ok(None);
        }
        rows.push(vec![text.clone()]);
    }

    Ok(Some((text, rows)))
}
