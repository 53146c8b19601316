//! Append-only outcome log.
//!
//! Every resolved record produces one entry, whether or not a match was
//! found. Entries are written one JSON object per line:
//!
//! ```text
//! {"timestamp":"2026-10-14T09:30:00Z","target":"etherscan-io","stage":"address","reference":"https://github.com/search?...","record":"0xabc Vault ..."}
//! {"timestamp":"2026-10-14T09:30:04Z","target":"etherscan-io","stage":null,"reference":null,"record":"0xdef Token ..."}
//! ```

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

// Re-export for convenience
pub use local::LocalLog;

/// Which search term produced the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStage {
    Address,
    Name,
}

/// One outcome log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub target: String,
    pub stage: Option<MatchStage>,
    /// Matching results page, or `None` when neither term matched
    pub reference: Option<String>,
    /// Raw listing row text
    pub record: String,
}

impl LogEntry {
    pub fn new(
        target: impl Into<String>,
        stage: Option<MatchStage>,
        reference: Option<String>,
        record: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            target: target.into(),
            stage,
            reference,
            record: record.into(),
        }
    }
}

/// Durable sink for outcome entries.
///
/// Shared by all drivers; implementations must accept concurrent appends.
#[async_trait]
pub trait ResultLog: Send + Sync {
    async fn append(&self, entry: &LogEntry) -> Result<()>;
}
