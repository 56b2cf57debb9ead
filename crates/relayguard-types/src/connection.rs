//! Business connection ownership types.
//!
//! A business connection links a premium account owner's chats to the bot;
//! every message on that relay is tagged with the connection id. The registry
//! maps connection ids to their owning account so the router can tell owner
//! traffic apart from customer traffic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A durable ownership record for one business connection.
///
/// `connection_id` is the primary key; there is at most one record per id.
/// Revocation flips `is_active` instead of deleting the row, so inactive
/// records remain available for audit and statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub connection_id: String,
    /// Account id of the user who granted the connection.
    pub owner_user_id: i64,
    /// Display name of the owner. Non-authoritative metadata.
    pub owner_name: Option<String>,
    /// Handle of the owner. Non-authoritative metadata.
    pub owner_username: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every write, including reactivation and deactivation.
    pub updated_at: DateTime<Utc>,
}

/// Parameters for an idempotent registry upsert.
///
/// All fields are supplied together on every write; conflicting concurrent
/// upserts for the same id resolve last-write-wins with no merge logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionUpsert {
    pub connection_id: String,
    pub owner_user_id: i64,
    pub owner_name: Option<String>,
    pub owner_username: Option<String>,
    pub is_active: bool,
}

impl ConnectionUpsert {
    /// Build an upsert for an active connection with no display metadata.
    pub fn new(connection_id: impl Into<String>, owner_user_id: i64) -> Self {
        Self {
            connection_id: connection_id.into(),
            owner_user_id,
            owner_name: None,
            owner_username: None,
            is_active: true,
        }
    }
}

/// Aggregate registry statistics for the ops surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub active_count: i64,
    pub total_count: i64,
    /// Most recent `updated_at` across all records, if any exist.
    pub last_update: Option<DateTime<Utc>>,
    /// Approximate on-disk size of the backing store, in bytes.
    pub storage_size_bytes: i64,
}
