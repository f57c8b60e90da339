//! Error types for the reward engine and its catalog store

use thiserror::Error;

/// Reward engine error
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed card or transaction data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No card stored under this identifier
    #[error("Card not found: {0}")]
    CardNotFound(String),

    /// Catalog storage failure
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Rule list (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for reward engine operations
pub type Result<T> = std::result::Result<T, Error>;
