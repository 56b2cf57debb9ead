//! Connection ownership repository trait definition.

use relayguard_types::connection::{ConnectionRecord, ConnectionUpsert, RegistryStats};
use relayguard_types::error::RepositoryError;

/// Repository trait for business connection persistence.
///
/// Implementations live in relayguard-infra (e.g., SqliteConnectionRepository).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
///
/// Each upsert must be a single atomic insert-or-update keyed on
/// `connection_id`: concurrent upserts to different connections never block
/// each other, and concurrent upserts to the same connection serialize in
/// the storage layer, last write wins.
pub trait ConnectionRepository: Send + Sync {
    /// Insert or update the ownership record for a connection. Idempotent;
    /// `created_at` is preserved across updates, `updated_at` is refreshed
    /// on every write.
    fn upsert(
        &self,
        params: &ConnectionUpsert,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Fetch a record by connection id regardless of its active flag.
    fn get(
        &self,
        connection_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<ConnectionRecord>, RepositoryError>> + Send;

    /// Owner account id for an *active* connection. Inactive or missing
    /// records yield `None`.
    fn active_owner(
        &self,
        connection_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<i64>, RepositoryError>> + Send;

    /// Soft-delete: clear the active flag and refresh `updated_at`. The row
    /// is retained. Deactivating an unknown id is a successful no-op.
    fn deactivate(
        &self,
        connection_id: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All active records, most recently updated first.
    fn list_active(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ConnectionRecord>, RepositoryError>> + Send;

    /// Aggregate counts and storage size for the ops surface.
    fn stats(
        &self,
    ) -> impl std::future::Future<Output = Result<RegistryStats, RepositoryError>> + Send;
}
