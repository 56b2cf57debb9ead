//! Message router: the composition point of ownership and loop detection.
//!
//! For each inbound event the router decides one of three outcomes: ignore
//! (with a reason), owner speaking (suppress auto-reply), or customer
//! message (reply). The ownership check runs *before* loop detection: an
//! owner's own outgoing message, observed via the relay, must never be
//! auto-replied to, independent of whether it superficially resembles bot
//! phrasing. Loop detection is specifically about catching the bot's own
//! prior output, a different failure mode.

use chrono::{DateTime, Utc};

use relayguard_types::event::InboundMessage;
use relayguard_types::routing::{LoopVerdict, RouteDecision};

use crate::detector::LoopDetector;
use crate::repository::ConnectionRepository;
use crate::service::OwnershipService;

pub struct MessageRouter<R: ConnectionRepository> {
    ownership: OwnershipService<R>,
    detector: LoopDetector,
}

impl<R: ConnectionRepository> MessageRouter<R> {
    pub fn new(ownership: OwnershipService<R>, detector: LoopDetector) -> Self {
        Self { ownership, detector }
    }

    /// Classify one inbound event.
    ///
    /// A relay event without a connection id cannot match an owner, so it
    /// falls straight through to loop detection; the dispatcher is
    /// responsible for logging the anomaly.
    pub async fn route(&self, message: &InboundMessage, now: DateTime<Utc>) -> RouteDecision {
        if message.from_business_channel {
            if let Some(connection_id) = message.connection_id.as_deref() {
                if self.ownership.is_owner(connection_id, message.sender_id).await {
                    tracing::info!(
                        connection_id,
                        sender_id = message.sender_id,
                        chat_id = message.chat_id,
                        "owner is speaking, auto-reply suppressed"
                    );
                    return RouteDecision::OwnerSpeaking;
                }
            }
        }

        match self.detector.classify(
            &message.text,
            message.chat_id,
            message.sender_id,
            message.from_business_channel,
            now,
        ) {
            LoopVerdict::Ignore(reason) => {
                tracing::warn!(
                    chat_id = message.chat_id,
                    sender_id = message.sender_id,
                    reason = %reason,
                    "inbound message ignored"
                );
                RouteDecision::Ignore(reason)
            }
            LoopVerdict::Proceed => RouteDecision::CustomerMessage,
        }
    }

    /// Register a reply the dispatcher just sent, so a relayed echo of it is
    /// recognized as a duplicate.
    pub fn record_outgoing(&self, text: &str, chat_id: i64, now: DateTime<Utc>) {
        self.detector.record_outgoing(text, chat_id, now);
    }

    pub fn ownership(&self) -> &OwnershipService<R> {
        &self.ownership
    }

    pub fn detector(&self) -> &LoopDetector {
        &self.detector
    }
}
