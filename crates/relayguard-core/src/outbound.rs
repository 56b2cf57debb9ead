//! MessageSender trait definition.
//!
//! Two send primitives: a standard chat send, and a business-channel send
//! carrying the connection id so the platform relays the reply through the
//! owner's account. The dispatcher must use the business variant whenever
//! the inbound event carried a connection id, falling back to the standard
//! send only when it fails or no id is present.

use relayguard_types::error::SendError;

/// Trait for outbound message delivery.
///
/// Implementations live in relayguard-infra (e.g., `TelegramClient`).
pub trait MessageSender: Send + Sync {
    /// Send a plain chat message.
    fn send_standard(
        &self,
        chat_id: i64,
        text: &str,
    ) -> impl std::future::Future<Output = Result<(), SendError>> + Send;

    /// Send a reply through the business relay identified by
    /// `connection_id`.
    fn send_business(
        &self,
        chat_id: i64,
        text: &str,
        connection_id: &str,
    ) -> impl std::future::Future<Output = Result<(), SendError>> + Send;
}
