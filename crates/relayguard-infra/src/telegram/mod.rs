//! Telegram Bot API integration.
//!
//! Wire types for the update envelope and a reqwest-based client for the
//! send primitives and webhook management.

pub mod client;
pub mod types;

pub use client::TelegramClient;
