//! Match notifications.
//!
//! A notifier delivers one text message to a pre-configured destination.
//! Delivery is best effort; the driver logs failures and keeps polling.

mod telegram;

use async_trait::async_trait;

use crate::error::Result;

pub use telegram::TelegramNotifier;

/// Destination for match messages. Shared by all drivers.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}

/// Notifier that only writes the message to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        log::info!("Notification: {}", text.replace('\n', " "));
        Ok(())
    }
}

/// Message announcing a published match.
pub fn match_message(host: &str, reference: &str) -> String {
    format!("New {host} contract on GitHub:\n{reference}")
}
