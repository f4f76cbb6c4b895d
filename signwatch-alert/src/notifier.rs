//! Outbound notification backends.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::error::NotifierError;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Username Discord shows for webhook posts
pub const DISCORD_USERNAME: &str = "signwatch";

#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    /// One delivery attempt. Retrying is the dispatcher's job.
    async fn send(&self, message: &str) -> Result<(), NotifierError>;
}

#[derive(Debug, Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    api_base: String,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(client: Client, token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            client,
            api_base: TELEGRAM_API_BASE.to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    /// Point at a different Bot API host (self-hosted bot API server, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, message: &str) -> Result<(), NotifierError> {
        let payload = TelegramMessage {
            chat_id: &self.chat_id,
            text: message,
        };
        post_json(&self.client, self.name(), &self.send_message_url(), &payload).await
    }
}

#[derive(Debug, Serialize)]
struct DiscordMessage<'a> {
    username: &'a str,
    content: &'a str,
}

#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    client: Client,
    webhook: String,
}

impl DiscordNotifier {
    pub fn new(client: Client, webhook: impl Into<String>) -> Self {
        Self {
            client,
            webhook: webhook.into(),
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send(&self, message: &str) -> Result<(), NotifierError> {
        let payload = DiscordMessage {
            username: DISCORD_USERNAME,
            content: message,
        };
        post_json(&self.client, self.name(), &self.webhook, &payload).await
    }
}

async fn post_json<T: Serialize>(
    client: &Client,
    backend: &str,
    url: &str,
    payload: &T,
) -> Result<(), NotifierError> {
    let body = serde_json::to_vec(payload).map_err(|e| NotifierError::Encode {
        backend: backend.to_string(),
        message: e.to_string(),
    })?;

    // The url may embed a bot token, so only the backend name goes into errors.
    let response = client
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body(body)
        .send()
        .await
        .map_err(|e| NotifierError::Request {
            backend: backend.to_string(),
            message: e.without_url().to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(NotifierError::Status {
            backend: backend.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(())
}
