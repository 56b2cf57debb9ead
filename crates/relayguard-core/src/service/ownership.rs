//! Ownership registry service.
//!
//! Wraps a `ConnectionRepository` and enforces the failure policy: ownership
//! lookups must never crash message processing. Every storage error is
//! caught, logged, and surfaced as a safe default -- `None`, `false`, or a
//! reported failure -- so a storage outage degrades to "treat everyone as a
//! customer" rather than halting replies.

use relayguard_types::connection::{ConnectionRecord, ConnectionUpsert, RegistryStats};

use crate::repository::ConnectionRepository;

/// Registry of business connection ownership, generic over its storage port.
///
/// Constructed once at process start and injected into the dispatcher;
/// tests construct one over an in-memory fake for fresh state per case.
pub struct OwnershipService<R: ConnectionRepository> {
    repo: R,
}

impl<R: ConnectionRepository> OwnershipService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Record or refresh an ownership mapping. Returns false on storage
    /// failure; the caller decides whether that matters.
    pub async fn record_connection(&self, params: &ConnectionUpsert) -> bool {
        match self.repo.upsert(params).await {
            Ok(()) => {
                tracing::info!(
                    connection_id = %params.connection_id,
                    owner_user_id = params.owner_user_id,
                    is_active = params.is_active,
                    "business connection recorded"
                );
                true
            }
            Err(err) => {
                tracing::error!(
                    connection_id = %params.connection_id,
                    error = %err,
                    "failed to record business connection"
                );
                false
            }
        }
    }

    /// Owner account id for an active connection, or `None` when the record
    /// is missing, inactive, or the storage lookup failed.
    pub async fn lookup_owner(&self, connection_id: &str) -> Option<i64> {
        match self.repo.active_owner(connection_id).await {
            Ok(owner) => owner,
            Err(err) => {
                tracing::error!(connection_id, error = %err, "owner lookup failed");
                None
            }
        }
    }

    /// Whether `candidate` owns the connection.
    ///
    /// Unknown ownership yields false: silently suppressing replies to an
    /// unrecognized connection is worse than occasionally replying to an
    /// owner whose mapping has not been recorded yet.
    pub async fn is_owner(&self, connection_id: &str, candidate: i64) -> bool {
        match self.lookup_owner(connection_id).await {
            Some(owner) => owner == candidate,
            None => {
                tracing::debug!(
                    connection_id,
                    candidate,
                    "no active owner on record, treating sender as customer"
                );
                false
            }
        }
    }

    /// Soft-delete the mapping. Returns false only on storage failure;
    /// deactivating an unknown id is a successful no-op.
    pub async fn deactivate(&self, connection_id: &str) -> bool {
        match self.repo.deactivate(connection_id).await {
            Ok(()) => {
                tracing::info!(connection_id, "business connection deactivated");
                true
            }
            Err(err) => {
                tracing::error!(connection_id, error = %err, "failed to deactivate connection");
                false
            }
        }
    }

    /// Active records, most recently updated first. Empty on storage failure.
    pub async fn list_active(&self) -> Vec<ConnectionRecord> {
        match self.repo.list_active().await {
            Ok(records) => records,
            Err(err) => {
                tracing::error!(error = %err, "failed to list active connections");
                Vec::new()
            }
        }
    }

    /// Registry statistics. Zeroed on storage failure.
    pub async fn stats(&self) -> RegistryStats {
        match self.repo.stats().await {
            Ok(stats) => stats,
            Err(err) => {
                tracing::error!(error = %err, "failed to read registry stats");
                RegistryStats::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use relayguard_types::error::RepositoryError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory repository fake with upsert/deactivate semantics matching
    /// the SQLite implementation.
    #[derive(Default)]
    struct MemoryRepository {
        records: Mutex<HashMap<String, ConnectionRecord>>,
    }

    impl ConnectionRepository for MemoryRepository {
        async fn upsert(&self, params: &ConnectionUpsert) -> Result<(), RepositoryError> {
            let mut records = self.records.lock().unwrap();
            let now = Utc::now();
            records
                .entry(params.connection_id.clone())
                .and_modify(|record| {
                    record.owner_user_id = params.owner_user_id;
                    record.owner_name = params.owner_name.clone();
                    record.owner_username = params.owner_username.clone();
                    record.is_active = params.is_active;
                    record.updated_at = now;
                })
                .or_insert_with(|| ConnectionRecord {
                    connection_id: params.connection_id.clone(),
                    owner_user_id: params.owner_user_id,
                    owner_name: params.owner_name.clone(),
                    owner_username: params.owner_username.clone(),
                    is_active: params.is_active,
                    created_at: now,
                    updated_at: now,
                });
            Ok(())
        }

        async fn get(&self, connection_id: &str) -> Result<Option<ConnectionRecord>, RepositoryError> {
            Ok(self.records.lock().unwrap().get(connection_id).cloned())
        }

        async fn active_owner(&self, connection_id: &str) -> Result<Option<i64>, RepositoryError> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .get(connection_id)
                .filter(|record| record.is_active)
                .map(|record| record.owner_user_id))
        }

        async fn deactivate(&self, connection_id: &str) -> Result<(), RepositoryError> {
            if let Some(record) = self.records.lock().unwrap().get_mut(connection_id) {
                record.is_active = false;
                record.updated_at = Utc::now();
            }
            Ok(())
        }

        async fn list_active(&self) -> Result<Vec<ConnectionRecord>, RepositoryError> {
            let mut records: Vec<ConnectionRecord> = self
                .records
                .lock()
                .unwrap()
                .values()
                .filter(|record| record.is_active)
                .cloned()
                .collect();
            records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
            Ok(records)
        }

        async fn stats(&self) -> Result<RegistryStats, RepositoryError> {
            let records = self.records.lock().unwrap();
            Ok(RegistryStats {
                active_count: records.values().filter(|r| r.is_active).count() as i64,
                total_count: records.len() as i64,
                last_update: records.values().map(|r| r.updated_at).max(),
                storage_size_bytes: 0,
            })
        }
    }

    /// Repository fake where every operation fails.
    struct BrokenRepository;

    impl ConnectionRepository for BrokenRepository {
        async fn upsert(&self, _params: &ConnectionUpsert) -> Result<(), RepositoryError> {
            Err(RepositoryError::Connection)
        }
        async fn get(&self, _id: &str) -> Result<Option<ConnectionRecord>, RepositoryError> {
            Err(RepositoryError::Connection)
        }
        async fn active_owner(&self, _id: &str) -> Result<Option<i64>, RepositoryError> {
            Err(RepositoryError::Connection)
        }
        async fn deactivate(&self, _id: &str) -> Result<(), RepositoryError> {
            Err(RepositoryError::Connection)
        }
        async fn list_active(&self) -> Result<Vec<ConnectionRecord>, RepositoryError> {
            Err(RepositoryError::Connection)
        }
        async fn stats(&self) -> Result<RegistryStats, RepositoryError> {
            Err(RepositoryError::Connection)
        }
    }

    #[tokio::test]
    async fn unknown_connection_is_not_owned() {
        let service = OwnershipService::new(MemoryRepository::default());
        assert!(!service.is_owner("conn1", 555).await);
        assert!(service.lookup_owner("conn1").await.is_none());
    }

    #[tokio::test]
    async fn recorded_owner_is_recognized() {
        let service = OwnershipService::new(MemoryRepository::default());
        assert!(service.record_connection(&ConnectionUpsert::new("conn1", 555)).await);
        assert!(service.is_owner("conn1", 555).await);
        assert!(!service.is_owner("conn1", 777).await);
        assert_eq!(service.lookup_owner("conn1").await, Some(555));
    }

    #[tokio::test]
    async fn deactivated_connection_loses_ownership() {
        let service = OwnershipService::new(MemoryRepository::default());
        service.record_connection(&ConnectionUpsert::new("conn1", 555)).await;
        assert!(service.deactivate("conn1").await);
        assert!(service.lookup_owner("conn1").await.is_none());
        assert!(!service.is_owner("conn1", 555).await);
    }

    #[tokio::test]
    async fn deactivating_unknown_connection_succeeds() {
        let service = OwnershipService::new(MemoryRepository::default());
        assert!(service.deactivate("never-seen").await);
    }

    #[tokio::test]
    async fn reupsert_reactivates_and_updates_owner() {
        let service = OwnershipService::new(MemoryRepository::default());
        service.record_connection(&ConnectionUpsert::new("conn1", 555)).await;
        service.deactivate("conn1").await;
        service.record_connection(&ConnectionUpsert::new("conn1", 556)).await;
        assert_eq!(service.lookup_owner("conn1").await, Some(556));
    }

    #[tokio::test]
    async fn storage_outage_degrades_to_customer() {
        let service = OwnershipService::new(BrokenRepository);
        assert!(!service.is_owner("conn1", 555).await);
        assert!(service.lookup_owner("conn1").await.is_none());
        assert!(!service.record_connection(&ConnectionUpsert::new("conn1", 555)).await);
        assert!(!service.deactivate("conn1").await);
        assert!(service.list_active().await.is_empty());
        assert_eq!(service.stats().await, RegistryStats::default());
    }

    #[tokio::test]
    async fn list_active_skips_inactive_records() {
        let service = OwnershipService::new(MemoryRepository::default());
        service.record_connection(&ConnectionUpsert::new("conn1", 555)).await;
        service.record_connection(&ConnectionUpsert::new("conn2", 777)).await;
        service.deactivate("conn1").await;

        let active = service.list_active().await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].connection_id, "conn2");

        let stats = service.stats().await;
        assert_eq!(stats.active_count, 1);
        assert_eq!(stats.total_count, 2);
    }
}
