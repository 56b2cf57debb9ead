//! Inbound event types handed from the dispatcher to the routing core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A well-formed inbound chat message.
///
/// The dispatcher rejects malformed events (missing chat id or text) before
/// constructing one of these; the router assumes well-formed input and does
/// not validate further.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Business connection id, when the event arrived on the relay.
    /// A missing id on a relay event is anomalous; the dispatcher logs it.
    pub connection_id: Option<String>,
    pub sender_id: i64,
    pub chat_id: i64,
    pub text: String,
    /// True when the event arrived through the business relay. Only relay
    /// traffic can echo the bot's own output back, so loop prevention is
    /// scoped to this path.
    pub from_business_channel: bool,
    pub event_time: DateTime<Utc>,
}

/// A business connection lifecycle event.
///
/// Established events upsert the ownership record (creation, metadata
/// refresh, or reactivation); revocation deactivates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConnectionUpdate {
    Established {
        connection_id: String,
        owner_user_id: i64,
        owner_name: Option<String>,
        owner_username: Option<String>,
    },
    Revoked {
        connection_id: String,
    },
}

impl ConnectionUpdate {
    pub fn connection_id(&self) -> &str {
        match self {
            ConnectionUpdate::Established { connection_id, .. } => connection_id,
            ConnectionUpdate::Revoked { connection_id } => connection_id,
        }
    }
}
