//! Error type for the `SQLite` storage adapter.

use planhub_domain::error::PlanHubError;

/// Errors produced while talking to `SQLite`.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A JSON column could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Embedded migrations failed to apply.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for PlanHubError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
