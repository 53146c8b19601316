// src/pipeline/search.rs

//! Cross-reference lookups against the code-search provider.
//!
//! A lookup is admitted as a match only when the provider reports between
//! one and `max_results` results. A single relevant repository usually yields
//! few hits; a large count means the term is common, so precision wins over
//! recall.

use std::time::Duration;

use regex::Regex;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::client::PageClient;
use crate::error::{AppError, Result};
use crate::models::{Config, NoMatchReason, SearchConfig, SearchQuery, SearchResult};
use crate::pipeline::retry::{RetryPolicy, call_with_state};

/// Result-count pattern: first digit run, with group separators.
const COUNT_PATTERN: &str = "\\d[\\d,.'\u{a0}\u{202f}]*";

/// Issues search queries and applies the admission threshold.
#[derive(Debug, Clone)]
pub struct CrossReferencer {
    search: SearchConfig,
    timeout: Duration,
    policy: RetryPolicy,
}

impl CrossReferencer {
    pub fn new(search: SearchConfig, timeout: Duration, policy: RetryPolicy) -> Self {
        Self {
            search,
            timeout,
            policy,
        }
    }

    /// Searcher with an unbounded retry policy, from application config.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.search.clone(),
            Duration::from_secs(config.client.search_timeout_secs),
            RetryPolicy::unbounded(Duration::from_secs(config.watch.search_retry_wait_secs)),
        )
    }

    /// Build the provider query URL.
    pub fn query_url(&self, query: &SearchQuery) -> Result<String> {
        let mut q = query.term.clone();
        let language = normalize_language(&query.language);
        if !language.is_empty() {
            q.push_str(&format!(" language:{language}"));
        }
        q.push_str(&format!(" comments:<={}", query.max_comments));

        let mut url = Url::parse(&self.search.base_url)?;
        url.query_pairs_mut()
            .append_pair("q", &q)
            .append_pair("type", query.result_type.as_str());
        Ok(url.to_string())
    }

    /// Run one lookup.
    pub async fn search<C: PageClient + ?Sized>(
        &self,
        client: &mut C,
        query: &SearchQuery,
        cancel: &CancellationToken,
    ) -> Result<SearchResult> {
        let url = self.query_url(query)?;
        let selector = self.search.region_selector.clone();
        let timeout = self.timeout;

        let region = call_with_state(&self.policy, cancel, client, |client| {
            let url = url.clone();
            let selector = selector.clone();
            Box::pin(async move { client.fetch_region(&url, &selector, timeout).await })
        })
        .await?;

        if self.reports_no_results(&region.text) {
            return Ok(SearchResult::NoMatch(NoMatchReason::NoResults));
        }

        let count = match parse_result_count(&region.text) {
            Ok(count) => count,
            Err(e) => {
                log::warn!("Treating '{}' as no match: {}", query.term, e);
                return Ok(SearchResult::NoMatch(NoMatchReason::Unparseable));
            }
        };

        let locator = client.current_url().unwrap_or(region.url);
        Ok(admit(count, query.max_results, locator))
    }

    fn reports_no_results(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.search
            .no_results_phrases
            .iter()
            .any(|phrase| text.contains(&phrase.to_lowercase()))
    }
}

/// Apply the admission threshold to a parsed result count.
///
/// A count equal to `max_results` is still a match.
pub fn admit(count: u64, max_results: u64, url: String) -> SearchResult {
    if count == 0 {
        SearchResult::NoMatch(NoMatchReason::NoResults)
    } else if count > max_results {
        SearchResult::NoMatch(NoMatchReason::TooMany { count })
    } else {
        SearchResult::Match { url, count }
    }
}

/// Capitalize a language name the way the provider expects (`solidity` → `Solidity`).
pub fn normalize_language(language: &str) -> String {
    let lower = language.trim().to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Read the result count out of a header such as `1,234 repository results`.
///
/// Abbreviated counts (`1.5k`, `2M`) are scaled to their full value.
pub fn parse_result_count(text: &str) -> Result<u64> {
    let re = Regex::new(COUNT_PATTERN).map_err(|e| AppError::config(e.to_string()))?;
    let found = re.find(text).ok_or_else(|| AppError::search_parse(text))?;
    let run = found
        .as_str()
        .trim_end_matches(|c: char| !c.is_ascii_digit());

    let count = match magnitude(&text[found.end()..]) {
        Some(multiplier) => scale_abbreviated(run, multiplier),
        None => digits_of(run).parse().ok(),
    };
    count.ok_or_else(|| AppError::search_parse(text))
}

fn digits_of(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

/// Multiplier of a `k`/`m` suffix directly after a number.
fn magnitude(rest: &str) -> Option<u64> {
    let mut chars = rest.trim_start_matches([' ', '\u{a0}', '\u{202f}']).chars();
    let multiplier = match chars.next()? {
        'k' | 'K' => 1_000,
        'm' | 'M' => 1_000_000,
        _ => return None,
    };
    match chars.next() {
        Some(c) if c.is_alphanumeric() => None,
        _ => Some(multiplier),
    }
}

/// `1.5` with multiplier 1000 is 1500. A trailing group of one or two digits
/// after `.` or `,` is the fraction; a longer one is a thousands group.
fn scale_abbreviated(run: &str, multiplier: u64) -> Option<u64> {
    let (whole, fraction) = match run.rfind(['.', ',']) {
        Some(i)
            if (1..=2).contains(&run[i + 1..].len())
                && run[i + 1..].chars().all(|c| c.is_ascii_digit()) =>
        {
            (&run[..i], &run[i + 1..])
        }
        _ => (run, ""),
    };

    let mut value = digits_of(whole).parse::<u64>().ok()?.checked_mul(multiplier)?;
    let mut unit = multiplier;
    for digit in fraction.chars() {
        unit /= 10;
        value = value.checked_add(u64::from(digit.to_digit(10)?) * unit)?;
    }
    Some(value)
}
