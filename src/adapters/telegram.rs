//! Telegram bot notifications
//!
//! Operator messages go to the notification chat, log messages to the log chat.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::TelegramConfig;
use crate::strategy::NotificationChannel;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
struct ChatTarget {
    token: String,
    chat_id: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Telegram notification client
#[derive(Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    prefix: String,
    notify: ChatTarget,
    log: Option<ChatTarget>,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig, prefix: &str) -> Self {
        Self::with_api_url(config, prefix, TELEGRAM_API_URL)
    }

    pub fn with_api_url(config: &TelegramConfig, prefix: &str, api_url: &str) -> Self {
        let log = config.log_chat_id.as_ref().map(|chat_id| ChatTarget {
            token: config
                .log_token
                .clone()
                .unwrap_or_else(|| config.token.clone()),
            chat_id: chat_id.clone(),
        });

        Self {
            client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            prefix: prefix.to_string(),
            notify: ChatTarget {
                token: config.token.clone(),
                chat_id: config.chat_id.clone(),
            },
            log,
        }
    }

    fn format(&self, text: &str) -> String {
        format!("{} {}", self.prefix, text)
    }

    async fn deliver(&self, target: &ChatTarget, text: &str) -> Result<(), String> {
        let url = format!("{}/bot{}/sendMessage", self.api_url, target.token);
        let message = SendMessage {
            chat_id: &target.chat_id,
            text,
        };

        match self.client.post(&url).json(&message).send().await {
            Ok(resp) => {
                if resp.status().is_success() {
                    debug!("Telegram message delivered");
                    Ok(())
                } else {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    Err(format!("HTTP {}: {}", status, body))
                }
            }
            Err(e) => Err(e.to_string()),
        }
    }
}

#[async_trait]
impl NotificationChannel for TelegramNotifier {
    async fn send(&self, text: &str) {
        let text = self.format(text);
        info!("{}", text);
        if let Err(e) = self.deliver(&self.notify, &text).await {
            error!("Failed to send Telegram notification: {}", e);
        }
    }

    async fn log(&self, text: &str) {
        let text = self.format(text);
        info!("{}", text);
        if let Some(target) = &self.log {
            if let Err(e) = self.deliver(target, &text).await {
                error!("Failed to send Telegram log message: {}", e);
            }
        }
    }
}

/// Channel that only writes to the tracing log
#[derive(Debug, Clone)]
pub struct LogNotifier {
    prefix: String,
}

impl LogNotifier {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }
}

#[async_trait]
impl NotificationChannel for LogNotifier {
    async fn send(&self, text: &str) {
        info!(target: "vault_maxi::notify", "{} {}", self.prefix, text);
    }

    async fn log(&self, text: &str) {
        info!(target: "vault_maxi::log", "{} {}", self.prefix, text);
    }
}
