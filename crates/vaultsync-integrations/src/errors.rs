//! Error types for integrations subsystem.

use thiserror::Error;
use uuid::Uuid;
use vaultsync_permission::PermissionError;
use vaultsync_storage::StorageError;

/// Result type alias for integrations operations
pub type Result<T> = std::result::Result<T, Error>;

/// Integrations subsystem errors
#[derive(Debug, Error)]
pub enum Error {
    /// No integration with this id
    #[error("Integration with ID '{0}' not found")]
    IntegrationNotFound(Uuid),

    /// No integration auth with this id (or it vanished mid-operation)
    #[error("Integration auth with ID '{0}' not found")]
    IntegrationAuthNotFound(Uuid),

    /// No folder for the requested environment and secret path
    #[error("Folder path not found (environment={environment}, secret_path={secret_path})")]
    FolderNotFound {
        environment: String,
        secret_path: String,
    },

    /// Permission gate rejected the actor
    #[error(transparent)]
    Permission(#[from] PermissionError),

    /// Storage operation failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Sync trigger could not enqueue
    #[error("Failed to enqueue integration sync: {0}")]
    SyncTrigger(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::IntegrationNotFound(_)
                | Error::IntegrationAuthNotFound(_)
                | Error::FolderNotFound { .. }
        )
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Error::Permission(err) if err.is_forbidden())
    }
}
