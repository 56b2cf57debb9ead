//! Application configuration types.
//!
//! Deserialized from `config.toml` in the data directory. Every field is
//! defaulted so a missing or partial file still yields a working config.
//! Secrets (bot token, generator API key) are never part of this file; they
//! come from the environment.

use serde::{Deserialize, Serialize};

/// Loop detector thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum allowed interval between messages in one chat, in seconds.
    pub min_message_interval_secs: f64,
    /// How long a fingerprint counts as a duplicate, in seconds.
    pub duplicate_window_secs: i64,
    /// Bounded per-chat fingerprint history length.
    pub max_tracked_messages: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_message_interval_secs: 2.0,
            duplicate_window_secs: 300,
            max_tracked_messages: 50,
        }
    }
}

/// Bot-authored phrase table for content-based echo detection.
///
/// This is data, not logic: the phrase set can be replaced in `config.toml`
/// without a code change. `fragments` match anywhere in the text,
/// `openers` match only at the start; both are case-insensitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignaturePatterns {
    pub fragments: Vec<String>,
    pub openers: Vec<String>,
}

impl Default for SignaturePatterns {
    fn default() -> Self {
        Self {
            fragments: vec![
                "Елена, Textile Pro".to_string(),
                "Textile Pro".to_string(),
                "Текстиль Про".to_string(),
                "Передала информацию менеджеру".to_string(),
                "Передам ваше сообщение менеджеру".to_string(),
                "скоро подключится к диалогу".to_string(),
                "подключится к диалогу".to_string(),
                "Поняла, мне нужно немного времени".to_string(),
                "Скоро вернусь".to_string(),
            ],
            openers: vec![
                "Добрый день!".to_string(),
                "Здравствуйте!".to_string(),
                "Меня зовут Елена".to_string(),
                "Я - Елена".to_string(),
                "консультант компании Textile Pro".to_string(),
                "консультант Textile Pro".to_string(),
            ],
        }
    }
}

/// Webhook registration settings for serve startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Public URL Telegram should deliver updates to. When unset, webhook
    /// auto-installation is skipped at startup.
    pub url: Option<String>,
    /// Shared secret echoed back by Telegram in the
    /// `X-Telegram-Bot-Api-Secret-Token` header. When unset, the header
    /// check is skipped.
    pub secret_token: Option<String>,
}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub detector: DetectorConfig,
    pub signatures: SignaturePatterns,
    pub webhook: WebhookConfig,
    /// System persona handed to the reply generator.
    pub persona_prompt: String,
    /// Reply sent when the generator fails.
    pub fallback_reply: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            signatures: SignaturePatterns::default(),
            webhook: WebhookConfig::default(),
            persona_prompt:
                "Вы — Елена, консультант компании Textile Pro. Отвечайте кратко и дружелюбно."
                    .to_string(),
            fallback_reply:
                "Извините, произошла временная ошибка. Пожалуйста, попробуйте позже \
                 или обратитесь к нашему менеджеру."
                    .to_string(),
        }
    }
}
