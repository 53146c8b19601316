// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod record;
mod search;

// Re-export all public types
pub use config::{
    ClientConfig, Config, ENV_BOT_TOKEN, ENV_CHAT_ID, KNOWN_EXPLORERS, ListingConfig, LogConfig,
    NotifyConfig, SearchConfig, TargetConfig, WatchConfig,
};
pub use record::{Record, Snapshot};
pub use search::{NoMatchReason, SearchQuery, SearchResult, SearchType};
