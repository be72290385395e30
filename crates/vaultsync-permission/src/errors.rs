//! Permission error types.

use crate::types::{ProjectPermissionAction, ProjectPermissionSub, SecretScope};
use thiserror::Error;
use uuid::Uuid;

/// Permission gate errors
#[derive(Debug, Error)]
pub enum PermissionError {
    /// A capability check failed
    #[error("Forbidden: not allowed to {action} {subject}{}", scope_suffix(.attributes))]
    Forbidden {
        action: ProjectPermissionAction,
        subject: ProjectPermissionSub,
        attributes: Option<SecretScope>,
    },

    /// Actor has no membership in the project
    #[error("Actor {actor_id} is not a member of project {project_id}")]
    NotProjectMember { actor_id: Uuid, project_id: Uuid },

    /// Actor's organization does not own the membership
    #[error("Actor {actor_id} does not belong to the organization of project {project_id}")]
    OrgMismatch { actor_id: Uuid, project_id: Uuid },

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(#[from] vaultsync_storage::StorageError),
}

impl PermissionError {
    /// True for every variant meaning "the actor may not do this"
    pub fn is_forbidden(&self) -> bool {
        !matches!(self, PermissionError::Storage(_))
    }
}

fn scope_suffix(attributes: &Option<SecretScope>) -> String {
    match attributes {
        Some(scope) => format!(
            " (environment={}, secret_path={})",
            scope.environment, scope.secret_path
        ),
        None => String::new(),
    }
}

/// Result type for permission operations
pub type Result<T> = std::result::Result<T, PermissionError>;
