//! Infrastructure layer for Relayguard.
//!
//! Contains implementations of the ports defined in `relayguard-core`:
//! SQLite connection registry, Telegram Bot API client (standard and
//! business-channel sends, webhook management), an OpenAI-compatible reply
//! generator, and the config.toml loader.

pub mod config;
pub mod generator;
pub mod sqlite;
pub mod telegram;
