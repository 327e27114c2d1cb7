use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use herald_core::SubscriberId;

use super::Transport;
use crate::error::NotifyError;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram Bot API transport. The subscriber id is the chat id.
pub struct TelegramTransport {
    http_client: Client,
    bot_token: String,
    api_base: String,
}

impl TelegramTransport {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            bot_token: bot_token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Override the API base URL, used to point tests at a mock server.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn send(&self, recipient: &SubscriberId, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);

        let body = json!({
            "chat_id": recipient.as_str(),
            "text": text,
            "disable_web_page_preview": true
        });

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NotifyError::send_failed(e.to_string()))?;

        let status = response.status();
        let response_body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| NotifyError::send_failed(e.to_string()))?;

        if status.is_success() && response_body["ok"].as_bool() == Some(true) {
            Ok(())
        } else {
            let description = response_body["description"]
                .as_str()
                .unwrap_or("Unknown error");
            Err(NotifyError::send_failed(description))
        }
    }
}
