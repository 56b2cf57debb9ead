//! ReplyGenerator trait definition.
//!
//! The AI backend is a black box to the core: given text and a session id it
//! returns reply text, and it may fail. The dispatcher substitutes a static
//! fallback reply on failure. Implementations live in relayguard-infra.

use relayguard_types::error::GeneratorError;

/// Trait for reply generation backends.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ReplyGenerator: Send + Sync {
    /// Generate a reply to `text` within the conversation identified by
    /// `session_id`. `display_name` is the sender's name, used only to
    /// personalize the reply.
    fn generate(
        &self,
        text: &str,
        session_id: &str,
        display_name: &str,
    ) -> impl std::future::Future<Output = Result<String, GeneratorError>> + Send;
}
