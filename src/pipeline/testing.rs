//! In-memory notifier and outcome log for pipeline tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::notify::Notifier;
use crate::pipeline::driver::PipelineContext;
use crate::storage::{LogEntry, ResultLog};

#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingNotifier {
    /// Records every message, then reports a delivery failure.
    pub(crate) fn failing() -> Self {
        Self {
            messages: Mutex::default(),
            fail: true,
        }
    }

    pub(crate) fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        self.messages.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(AppError::notify("scripted failure"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct MemoryLog {
    entries: Mutex<Vec<LogEntry>>,
    fail: bool,
}

impl MemoryLog {
    /// Rejects every append without storing it.
    pub(crate) fn failing() -> Self {
        Self {
            entries: Mutex::default(),
            fail: true,
        }
    }

    pub(crate) fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResultLog for MemoryLog {
    async fn append(&self, entry: &LogEntry) -> Result<()> {
        if self.fail {
            return Err(AppError::Io(std::io::Error::other("disk full")));
        }
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// Context built from default config: 30s poll, 10s listing retry wait.
pub(crate) fn context(
    notifier: Arc<RecordingNotifier>,
    log: Arc<MemoryLog>,
    max_cycles: Option<u64>,
) -> PipelineContext {
    let mut ctx = PipelineContext::from_config(&Config::default(), notifier, log);
    ctx.settings.max_cycles = max_cycles;
    ctx
}
