//! Error types for the data layer.
//!
//! Store methods in this crate return [`DbError`]. The engine only sees
//! [`StoreError`]: rows that fail to decode stay distinguishable as
//! [`StoreError::Corrupt`], everything else becomes a backend failure.

use holdfast_core::StoreError;

/// Failures of the `PostgreSQL` store.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A query, transaction, or connection failed.
    #[error("simulation database query failed: {0}")]
    Postgres(#[from] sqlx::Error),

    /// The schema could not be brought up to date.
    #[error("simulation schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// An enum column or JSON amounts column did not match its domain type.
    #[error("column encoding failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value is out of range for the domain type.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// The connection settings are unusable.
    #[error("database settings rejected: {0}")]
    Config(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Corrupt(reason) => Self::Corrupt(reason),
            other => Self::Backend(Box::new(other)),
        }
    }
}
