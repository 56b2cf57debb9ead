//! Routing decision types.
//!
//! The loop detector classifies a message as safe or ignorable; the router
//! folds that verdict together with ownership into the final decision the
//! dispatcher acts on.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Why a message was dropped instead of processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Text matched a configured bot phrase fragment or greeting opener.
    BotSignature,
    /// Arrived inside the minimum inter-message interval for its chat.
    RapidMessage,
    /// Fingerprint already live inside the duplicate-detection window.
    DuplicateMessage,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::BotSignature => write!(f, "bot_signature"),
            IgnoreReason::RapidMessage => write!(f, "rapid_message"),
            IgnoreReason::DuplicateMessage => write!(f, "duplicate_message"),
        }
    }
}

impl FromStr for IgnoreReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bot_signature" => Ok(IgnoreReason::BotSignature),
            "rapid_message" => Ok(IgnoreReason::RapidMessage),
            "duplicate_message" => Ok(IgnoreReason::DuplicateMessage),
            other => Err(format!("invalid ignore reason: '{other}'")),
        }
    }
}

/// Loop detector verdict for a single inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopVerdict {
    /// Message passed all checks and is safe to process.
    Proceed,
    /// Message should be discarded.
    Ignore(IgnoreReason),
}

/// Final routing decision for one inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDecision {
    /// Discard the event; no reply of any kind.
    Ignore(IgnoreReason),
    /// The account owner is speaking through the relay. Auto-replies are
    /// suppressed; the event is logged only.
    OwnerSpeaking,
    /// A genuine customer message: generate and send a reply, then record
    /// the outgoing text with the loop detector.
    CustomerMessage,
}
