//! Listing and manual sync.

use super::IntegrationService;
use crate::traits::{FolderResolver, SyncTrigger};
use crate::types::*;
use crate::Result;
use tracing::{debug, info};
use uuid::Uuid;
use vaultsync_permission::{
    ActorContext, PermissionService, ProjectPermissionAction, ProjectPermissionSub,
};
use vaultsync_storage::Storage;

impl<P, F, T, S> IntegrationService<P, F, T, S>
where
    P: PermissionService,
    F: FolderResolver,
    T: SyncTrigger,
    S: Storage + 'static,
{
    pub(crate) async fn list_by_project(
        &self,
        actor: &ActorContext,
        project_id: Uuid,
    ) -> Result<Vec<Integration>> {
        let permission = self
            .permissions
            .get_project_permission(actor, project_id)
            .await?;
        permission.ensure(
            ProjectPermissionAction::Read,
            ProjectPermissionSub::Integrations,
            None,
        )?;

        let integrations = self.integrations.find_by_project_id(project_id).await?;
        debug!(
            project_id = %project_id,
            count = integrations.len(),
            "Listed integrations"
        );
        Ok(integrations)
    }

    pub(crate) async fn sync(&self, actor: &ActorContext, id: Uuid) -> Result<Integration> {
        let mut integration = self.find_integration(id).await?;

        let permission = self
            .permissions
            .get_project_permission(actor, integration.project_id)
            .await?;
        permission.ensure(
            ProjectPermissionAction::Read,
            ProjectPermissionSub::Integrations,
            None,
        )?;

        let ticket = self
            .sync_trigger
            .sync_integrations(SyncScope::new(
                integration.project_id,
                integration.environment.slug.clone(),
                &integration.secret_path,
            ))
            .await?;

        info!(
            integration_id = %id,
            job_id = %ticket.job_id,
            deduplicated = ticket.deduplicated,
            "Manual integration sync requested"
        );

        integration.env_id = integration.environment.id;
        Ok(integration)
    }
}
