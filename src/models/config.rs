//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::SearchType;

/// Explorers whose verified-contracts listing layout is known to work.
pub const KNOWN_EXPLORERS: &[&str] = &[
    "etherscan.io",
    "ropsten.etherscan.io",
    "kovan.etherscan.io",
    "rinkeby.etherscan.io",
    "goerli.etherscan.io",
    "beacon.etherscan.io",
    "ftmscan.com",
    "testnet.ftmscan.com",
];

/// Environment variable holding the Telegram bot token.
pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
/// Environment variable holding the Telegram chat id.
pub const ENV_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and page-render settings
    #[serde(default)]
    pub client: ClientConfig,

    /// Polling cadence and retry waits
    #[serde(default)]
    pub watch: WatchConfig,

    /// Listing page layout
    #[serde(default)]
    pub listing: ListingConfig,

    /// Code-search endpoint and page layout
    #[serde(default)]
    pub search: SearchConfig,

    /// Notification channel
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Append-only outcome log
    #[serde(default)]
    pub log: LogConfig,

    /// Listings to watch
    #[serde(default = "defaults::targets")]
    pub targets: Vec<TargetConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Override notification credentials from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Override notification credentials using the given variable lookup.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = non_empty(ENV_BOT_TOKEN) {
            self.notify.bot_token = Some(token);
        }
        if let Some(chat_id) = non_empty(ENV_CHAT_ID) {
            self.notify.chat_id = Some(chat_id);
        }
    }

    /// Look up a target by name.
    pub fn target(&self, name: &str) -> Option<&TargetConfig> {
        self.targets.iter().find(|t| t.name() == name)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.client.user_agent.trim().is_empty() {
            return Err(AppError::validation("client.user_agent is empty"));
        }
        if self.client.timeout_secs == 0 {
            return Err(AppError::validation("client.timeout_secs must be > 0"));
        }
        if self.client.search_timeout_secs == 0 {
            return Err(AppError::validation(
                "client.search_timeout_secs must be > 0",
            ));
        }
        if self.watch.snapshot_size == 0 {
            return Err(AppError::validation("watch.snapshot_size must be > 0"));
        }
        if self.listing.min_columns == 0 {
            return Err(AppError::validation("listing.min_columns must be > 0"));
        }
        if self.listing.region_selector.trim().is_empty() {
            return Err(AppError::validation("listing.region_selector is empty"));
        }
        if self.search.region_selector.trim().is_empty() {
            return Err(AppError::validation("search.region_selector is empty"));
        }
        url::Url::parse(&self.search.base_url)?;
        if self.targets.is_empty() {
            return Err(AppError::validation("No targets defined"));
        }

        let mut names = HashSet::new();
        for target in &self.targets {
            if target.host.trim().is_empty() {
                return Err(AppError::validation("target host is empty"));
            }
            if !names.insert(target.name()) {
                return Err(AppError::validation(format!(
                    "duplicate target name '{}'",
                    target.name()
                )));
            }
            if !target.is_known_explorer() {
                log::warn!(
                    "Target host '{}' is not a known explorer; listing layout may differ",
                    target.host
                );
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            watch: WatchConfig::default(),
            listing: ListingConfig::default(),
            search: SearchConfig::default(),
            notify: NotifyConfig::default(),
            log: LogConfig::default(),
            targets: defaults::targets(),
        }
    }
}

/// HTTP client and page-render settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Seconds to wait for the listing table to render
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Seconds to wait for the search results header to render
    #[serde(default = "defaults::search_timeout")]
    pub search_timeout_secs: u64,

    /// Delay between re-fetches while waiting for a region
    #[serde(default = "defaults::render_poll")]
    pub render_poll_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            search_timeout_secs: defaults::search_timeout(),
            render_poll_ms: defaults::render_poll(),
        }
    }
}

/// Polling cadence and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Sleep between polling cycles
    #[serde(default = "defaults::poll_interval")]
    pub poll_interval_secs: u64,

    /// Number of listing rows kept per snapshot
    #[serde(default = "defaults::snapshot_size")]
    pub snapshot_size: usize,

    /// Wait before retrying a listing fetch
    #[serde(default = "defaults::retry_wait")]
    pub retry_wait_secs: u64,

    /// Wait before retrying a search fetch
    #[serde(default = "defaults::search_retry_wait")]
    pub search_retry_wait_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: defaults::poll_interval(),
            snapshot_size: defaults::snapshot_size(),
            retry_wait_secs: defaults::retry_wait(),
            search_retry_wait_secs: defaults::search_retry_wait(),
        }
    }
}

/// Verified-contracts listing layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Listing page number
    #[serde(default = "defaults::page")]
    pub page: u32,

    /// Rows per listing page (`ps` parameter)
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    /// Selector of the table body holding the rows
    #[serde(default = "defaults::listing_selector")]
    pub region_selector: String,

    /// Fewer cells than this in a row means the layout changed
    #[serde(default = "defaults::min_columns")]
    pub min_columns: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page: defaults::page(),
            page_size: defaults::page_size(),
            region_selector: defaults::listing_selector(),
            min_columns: defaults::min_columns(),
        }
    }
}

/// Code-search endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search endpoint URL
    #[serde(default = "defaults::search_base_url")]
    pub base_url: String,

    /// Selector of the results header reporting the count
    #[serde(default = "defaults::search_selector")]
    pub region_selector: String,

    /// Header phrases meaning "nothing found" (case-insensitive)
    #[serde(default = "defaults::no_results_phrases")]
    pub no_results_phrases: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::search_base_url(),
            region_selector: defaults::search_selector(),
            no_results_phrases: defaults::no_results_phrases(),
        }
    }
}

/// Telegram notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Bot API base URL
    #[serde(default = "defaults::telegram_api")]
    pub telegram_api: String,

    /// Bot token (usually provided via `TELEGRAM_BOT_TOKEN`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_token: Option<String>,

    /// Destination chat (usually provided via `TELEGRAM_CHAT_ID`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

impl NotifyConfig {
    /// Token and chat id, when both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.bot_token.as_deref(), self.chat_id.as_deref()) {
            (Some(token), Some(chat)) if !token.trim().is_empty() && !chat.trim().is_empty() => {
                Some((token, chat))
            }
            _ => None,
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            telegram_api: defaults::telegram_api(),
            bot_token: None,
            chat_id: None,
        }
    }
}

/// Outcome log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// JSON-lines file receiving one entry per resolved record
    #[serde(default = "defaults::log_path")]
    pub path: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: defaults::log_path(),
        }
    }
}

/// One watched listing and the filters used to cross-reference its records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetConfig {
    /// Display name; defaults to the host with dots replaced by dashes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Explorer host (e.g. `etherscan.io`), or a full origin such as `http://127.0.0.1:8080`
    pub host: String,

    /// Source language filter
    #[serde(default = "defaults::language")]
    pub language: String,

    /// Provider result type
    #[serde(default)]
    pub result_type: SearchType,

    /// Admission threshold: more results than this is not a match
    #[serde(default = "defaults::max_results")]
    pub max_results: u64,

    /// Comment-count filter
    #[serde(default)]
    pub max_comments: u32,
}

impl TargetConfig {
    /// Target for a host with default filters.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            name: None,
            host: host.into(),
            language: defaults::language(),
            result_type: SearchType::default(),
            max_results: defaults::max_results(),
            max_comments: 0,
        }
    }

    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.host_name().replace('.', "-"),
        }
    }

    /// Host without scheme or port.
    pub fn host_name(&self) -> &str {
        let host = self
            .host
            .split_once("://")
            .map_or(self.host.as_str(), |(_, rest)| rest);
        host.split(['/', ':']).next().unwrap_or(host)
    }

    /// Scheme and authority used to build listing URLs.
    pub fn origin(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.contains("://") {
            host.to_string()
        } else {
            format!("https://{host}")
        }
    }

    /// URL of a verified-contracts listing page.
    pub fn listing_url(&self, listing: &ListingConfig) -> String {
        format!(
            "{}/contractsVerified/{}?ps={}",
            self.origin(),
            listing.page,
            listing.page_size
        )
    }

    pub fn is_known_explorer(&self) -> bool {
        KNOWN_EXPLORERS.contains(&self.host_name())
    }
}

mod defaults {
    use super::TargetConfig;

    // Client defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; contract-watch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        20
    }
    pub fn search_timeout() -> u64 {
        3
    }
    pub fn render_poll() -> u64 {
        500
    }

    // Watch defaults
    pub fn poll_interval() -> u64 {
        30
    }
    pub fn snapshot_size() -> usize {
        15
    }
    pub fn retry_wait() -> u64 {
        10
    }
    pub fn search_retry_wait() -> u64 {
        5
    }

    // Listing defaults
    pub fn page() -> u32 {
        1
    }
    pub fn page_size() -> u32 {
        100
    }
    pub fn listing_selector() -> String {
        "table tbody".into()
    }
    pub fn min_columns() -> usize {
        2
    }

    // Search defaults
    pub fn search_base_url() -> String {
        "https://github.com/search".into()
    }
    pub fn search_selector() -> String {
        "div.codesearch-results h3".into()
    }
    pub fn no_results_phrases() -> Vec<String> {
        vec![
            "couldn’t find any".into(),
            "couldn't find any".into(),
            "no results".into(),
        ]
    }

    // Notify and log defaults
    pub fn telegram_api() -> String {
        "https://api.telegram.org".into()
    }
    pub fn log_path() -> String {
        "log_files/results.jsonl".into()
    }

    // Target defaults
    pub fn language() -> String {
        "Solidity".into()
    }
    pub fn max_results() -> u64 {
        7
    }
    pub fn targets() -> Vec<TargetConfig> {
        vec![TargetConfig::new("etherscan.io")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agent() {
        let mut config = Config::default();
        config.client.user_agent = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_snapshot_size() {
        let mut config = Config::default();
        config.watch.snapshot_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicate_targets() {
        let mut config = Config::default();
        config.targets.push(TargetConfig::new("etherscan.io"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_no_targets() {
        let mut config = Config::default();
        config.targets.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [watch]
            poll_interval_secs = 60

            [[targets]]
            host = "ftmscan.com"
            result_type = "code"
            max_results = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.watch.poll_interval_secs, 60);
        assert_eq!(config.watch.snapshot_size, 15);
        assert_eq!(config.client.timeout_secs, 20);
        assert_eq!(config.targets.len(), 1);
        let target = &config.targets[0];
        assert_eq!(target.name(), "ftmscan-com");
        assert_eq!(target.language, "Solidity");
        assert_eq!(target.result_type, SearchType::Code);
        assert_eq!(target.max_results, 3);
        assert_eq!(target.max_comments, 0);
    }

    #[test]
    fn apply_env_overrides_credentials() {
        let mut config = Config::default();
        assert!(config.notify.credentials().is_none());

        config.apply_env_with(|key| match key {
            ENV_BOT_TOKEN => Some("123:abc".to_string()),
            ENV_CHAT_ID => Some("-10042".to_string()),
            _ => None,
        });
        assert_eq!(config.notify.credentials(), Some(("123:abc", "-10042")));
    }

    #[test]
    fn apply_env_ignores_blank_values() {
        let mut config = Config::default();
        config.notify.bot_token = Some("from-file".into());
        config.apply_env_with(|_| Some("   ".to_string()));
        assert_eq!(config.notify.bot_token.as_deref(), Some("from-file"));
    }

    #[test]
    fn target_listing_url() {
        let listing = ListingConfig::default();
        let target = TargetConfig::new("goerli.etherscan.io");
        assert_eq!(
            target.listing_url(&listing),
            "https://goerli.etherscan.io/contractsVerified/1?ps=100"
        );
        assert!(target.is_known_explorer());

        let local = TargetConfig::new("http://127.0.0.1:8080/");
        assert_eq!(
            local.listing_url(&listing),
            "http://127.0.0.1:8080/contractsVerified/1?ps=100"
        );
        assert_eq!(local.host_name(), "127.0.0.1");
        assert!(!local.is_known_explorer());
    }
}
