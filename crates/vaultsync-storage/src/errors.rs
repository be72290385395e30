//! Storage error types.

use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// RocksDB read or iterator failure
    #[error("Database error: {0}")]
    Database(String),

    /// Key or value could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Stored bytes do not decode into the requested type
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// Column family was not registered when the database was opened
    #[error("Invalid column family: {0}")]
    InvalidColumnFamily(String),

    /// Commit of a batch or transaction failed; none of its writes applied
    #[error("Commit failed: {0}")]
    TransactionError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;
