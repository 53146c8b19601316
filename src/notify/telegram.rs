// src/notify/telegram.rs

//! Telegram Bot API notifier.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::NotifyConfig;
use crate::notify::Notifier;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends messages through `sendMessage` of a Telegram bot.
pub struct TelegramNotifier {
    client: Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(
        client: Client,
        api_base: &str,
        bot_token: &str,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                api_base.trim_end_matches('/'),
                bot_token
            ),
            chat_id: chat_id.into(),
        }
    }

    /// Notifier for the configured bot, or `None` when credentials are missing.
    pub fn from_config(client: Client, config: &NotifyConfig) -> Option<Self> {
        config
            .credentials()
            .map(|(token, chat_id)| Self::new(client, &config.telegram_api, token, chat_id))
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<()> {
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(SEND_TIMEOUT)
            .json(&payload)
            .send()
            .await
            .map_err(AppError::notify)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::notify(format!("Telegram returned {status}: {body}")));
        }
        Ok(())
    }
}
