//! Permission service trait and storage-backed implementation.

use crate::{
    errors::{PermissionError, Result},
    permission::ProjectPermission,
    types::*,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use vaultsync_storage::{Storage, CF_PROJECT_MEMBERSHIPS};

/// Permission gate consumed by the lifecycle service
#[async_trait]
pub trait PermissionService: Send + Sync {
    /// Resolve the actor's capability set for one project
    ///
    /// Fails rather than returning a partial handle.
    async fn get_project_permission(
        &self,
        actor: &ActorContext,
        project_id: Uuid,
    ) -> Result<ProjectPermission>;
}

/// Membership-based permission service
pub struct PermissionServiceImpl<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> PermissionServiceImpl<S> {
    /// Create a new permission service
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Create or replace an actor's membership in a project
    pub async fn grant_membership(&self, membership: ProjectMembership) -> Result<()> {
        let key = (membership.project_id, membership.actor_id);
        self.storage
            .put(CF_PROJECT_MEMBERSHIPS, &key, &membership)
            .await?;

        info!(
            project_id = %membership.project_id,
            actor_id = %membership.actor_id,
            role = ?membership.role,
            "Project membership granted"
        );
        Ok(())
    }

    /// Remove an actor's membership
    pub async fn revoke_membership(&self, project_id: Uuid, actor_id: Uuid) -> Result<()> {
        self.storage
            .delete(CF_PROJECT_MEMBERSHIPS, &(project_id, actor_id))
            .await?;
        Ok(())
    }

    /// Get an actor's membership, if any
    pub async fn get_membership(
        &self,
        project_id: Uuid,
        actor_id: Uuid,
    ) -> Result<Option<ProjectMembership>> {
        Ok(self
            .storage
            .get(CF_PROJECT_MEMBERSHIPS, &(project_id, actor_id))
            .await?)
    }
}

#[async_trait]
impl<S: Storage + 'static> PermissionService for PermissionServiceImpl<S> {
    async fn get_project_permission(
        &self,
        actor: &ActorContext,
        project_id: Uuid,
    ) -> Result<ProjectPermission> {
        let membership = self
            .get_membership(project_id, actor.actor_id)
            .await?
            .filter(|m| m.actor == actor.actor)
            .ok_or(PermissionError::NotProjectMember {
                actor_id: actor.actor_id,
                project_id,
            })?;

        if membership.actor_org_id != actor.actor_org_id {
            warn!(
                actor_id = %actor.actor_id,
                project_id = %project_id,
                "Actor organization does not match project membership"
            );
            return Err(PermissionError::OrgMismatch {
                actor_id: actor.actor_id,
                project_id,
            });
        }

        debug!(
            actor = actor.actor.as_str(),
            actor_id = %actor.actor_id,
            auth_method = ?actor.actor_auth_method,
            project_id = %project_id,
            role = ?membership.role,
            "Resolved project permission"
        );

        Ok(ProjectPermission::new(
            project_id,
            actor.clone(),
            membership.effective_rules(),
        ))
    }
}
