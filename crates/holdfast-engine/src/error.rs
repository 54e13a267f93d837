//! Error types for the engine binary.
//!
//! [`StartupError`] wraps every failure that can stop the process before
//! or after the scheduler runs.

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: holdfast_core::ConfigError,
    },

    /// Connecting to or migrating `PostgreSQL` failed.
    #[error("database error: {source}")]
    Database {
        /// The underlying database error.
        #[from]
        source: holdfast_db::DbError,
    },

    /// Reading scheduler state back from the store failed.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: holdfast_core::StoreError,
    },

    /// NATS connection failed.
    #[error("NATS error: {message}")]
    Nats {
        /// Description of the NATS failure.
        message: String,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {0}")]
    Signal(#[from] std::io::Error),
}
