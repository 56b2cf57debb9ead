//! Telegram Bot API client.
//!
//! Implements the `MessageSender` port with raw `sendMessage` calls -- the
//! business variant carries `business_connection_id` so the platform relays
//! the reply through the owner's account -- plus webhook management
//! (`setWebhook` with secret token and allowed update kinds, `deleteWebhook`)
//! and `getMe` for startup verification.

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use relayguard_core::outbound::MessageSender;
use relayguard_types::error::SendError;

use super::types::BotProfile;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Update kinds the webhook subscribes to. Business kinds must be listed
/// explicitly or the platform will not deliver relay traffic.
const ALLOWED_UPDATES: [&str; 5] = [
    "message",
    "business_connection",
    "business_message",
    "edited_business_message",
    "deleted_business_messages",
];

/// Bot API response envelope.
#[derive(Debug, serde::Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

pub struct TelegramClient {
    http: reqwest::Client,
    token: SecretString,
    api_base: String,
}

impl TelegramClient {
    pub fn new(token: SecretString) -> Self {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Client with a custom API base URL, for tests and self-hosted Bot API
    /// servers.
    pub fn with_api_base(token: SecretString, api_base: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            token,
            api_base: api_base.into(),
        }
    }

    /// Fetch the bot's own profile.
    pub async fn get_me(&self) -> Result<BotProfile, SendError> {
        self.call("getMe", &json!({})).await
    }

    /// Register the webhook URL, subscribing to the business update kinds.
    pub async fn set_webhook(&self, url: &str, secret_token: Option<&str>) -> Result<(), SendError> {
        let mut payload = json!({
            "url": url,
            "allowed_updates": ALLOWED_UPDATES,
        });
        if let Some(secret) = secret_token {
            payload["secret_token"] = json!(secret);
        }
        let _: bool = self.call("setWebhook", &payload).await?;
        tracing::info!(url, "webhook registered");
        Ok(())
    }

    pub async fn delete_webhook(&self) -> Result<(), SendError> {
        let _: bool = self.call("deleteWebhook", &json!({})).await?;
        Ok(())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &serde_json::Value,
    ) -> Result<T, SendError> {
        let url = format!("{}/bot{}/{}", self.api_base, self.token.expose_secret(), method);

        let response = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        if !envelope.ok {
            return Err(SendError::Api(
                envelope
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        envelope
            .result
            .ok_or_else(|| SendError::Api("missing result".to_string()))
    }
}

/// Payload for a `sendMessage` call, with or without a business connection.
fn send_payload(chat_id: i64, text: &str, connection_id: Option<&str>) -> serde_json::Value {
    let mut payload = json!({
        "chat_id": chat_id,
        "text": text,
    });
    if let Some(connection_id) = connection_id {
        payload["business_connection_id"] = json!(connection_id);
    }
    payload
}

impl MessageSender for TelegramClient {
    async fn send_standard(&self, chat_id: i64, text: &str) -> Result<(), SendError> {
        let _: serde_json::Value = self
            .call("sendMessage", &send_payload(chat_id, text, None))
            .await?;
        tracing::debug!(chat_id, "standard message sent");
        Ok(())
    }

    async fn send_business(
        &self,
        chat_id: i64,
        text: &str,
        connection_id: &str,
    ) -> Result<(), SendError> {
        let _: serde_json::Value = self
            .call("sendMessage", &send_payload(chat_id, text, Some(connection_id)))
            .await?;
        tracing::debug!(chat_id, connection_id, "business message sent");
        Ok(())
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}
