// src/error.rs

//! Unified error handling for the watcher.

use std::fmt;

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// The expected page region did not render in time.
    ///
    /// Covers slow rendering, anti-bot interstitials and connection hiccups.
    /// This is the only category the retry layer recovers from.
    #[error("Region '{selector}' did not appear at {url}: {message}")]
    TransientFetch {
        url: String,
        selector: String,
        message: String,
    },

    /// The page rendered but its structure does not match the expected layout.
    #[error("Malformed page at {url}: {message}")]
    MalformedPage { url: String, message: String },

    /// The search result-count indicator was not a number
    #[error("Could not parse result count from '{text}'")]
    SearchParse { text: String },

    /// Notification delivery failed
    #[error("Notification error: {0}")]
    Notify(String),

    /// Shutdown was requested while the operation was pending
    #[error("Operation cancelled by shutdown signal")]
    Cancelled,

    /// The page client was used after its session was released
    #[error("Browsing session already released")]
    SessionClosed,

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a transient fetch error.
    pub fn transient(
        url: impl Into<String>,
        selector: impl Into<String>,
        message: impl fmt::Display,
    ) -> Self {
        Self::TransientFetch {
            url: url.into(),
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a malformed page error.
    pub fn malformed(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::MalformedPage {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a search-count parse error.
    pub fn search_parse(text: impl Into<String>) -> Self {
        Self::SearchParse { text: text.into() }
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a notification error.
    pub fn notify(message: impl fmt::Display) -> Self {
        Self::Notify(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the retry layer should wait and try again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientFetch { .. })
    }

    /// Whether this error is the shutdown signal rather than a fault.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
