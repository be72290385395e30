//! Create, update and delete.

use super::{secret_scope, IntegrationService};
use crate::traits::{FolderResolver, SyncTrigger};
use crate::types::*;
use crate::{Error, Result};
use tracing::info;
use uuid::Uuid;
use vaultsync_permission::{
    ActorContext, PermissionService, ProjectPermissionAction, ProjectPermissionSub,
};
use vaultsync_storage::{Storage, Transaction};

impl<P, F, T, S> IntegrationService<P, F, T, S>
where
    P: PermissionService,
    F: FolderResolver,
    T: SyncTrigger,
    S: Storage + 'static,
{
    pub(crate) async fn create(
        &self,
        actor: &ActorContext,
        request: CreateIntegrationRequest,
    ) -> Result<CreatedIntegration> {
        let integration_auth = self
            .integration_auths
            .find_by_id(request.integration_auth_id)
            .await?
            .ok_or(Error::IntegrationAuthNotFound(request.integration_auth_id))?;
        let project_id = integration_auth.project_id;

        let permission = self
            .permissions
            .get_project_permission(actor, project_id)
            .await?;
        permission.ensure(
            ProjectPermissionAction::Create,
            ProjectPermissionSub::Integrations,
            None,
        )?;
        permission.ensure(
            ProjectPermissionAction::Read,
            ProjectPermissionSub::Secrets,
            Some(&secret_scope(
                &request.source_environment,
                &request.secret_path,
            )),
        )?;

        let folder = self
            .resolve_folder(project_id, &request.source_environment, &request.secret_path)
            .await?;

        let CreateIntegrationRequest {
            source_environment,
            secret_path,
            is_active,
            target,
            metadata,
            ..
        } = request;

        let now = current_timestamp();
        let mut integration = Integration {
            id: Uuid::new_v4(),
            project_id,
            integration_auth_id: integration_auth.id,
            env_id: folder.env_id,
            environment: folder.environment,
            secret_path: folder.path,
            is_active,
            url: None,
            app: None,
            app_id: None,
            owner: None,
            path: None,
            region: None,
            scope: None,
            target_service: None,
            target_service_id: None,
            target_environment: None,
            target_environment_id: None,
            integration: integration_auth.integration.clone(),
            metadata,
            is_synced: None,
            sync_message: None,
            last_sync_job_id: None,
            last_used: None,
            created_at: now,
            updated_at: now,
        };
        target.apply_to(&mut integration);

        self.integrations.create(&integration).await?;

        info!(
            integration_id = %integration.id,
            project_id = %project_id,
            integration_auth_id = %integration_auth.id,
            actor_id = %actor.actor_id,
            "Integration created"
        );

        self.sync_trigger
            .sync_integrations(SyncScope::new(project_id, source_environment, &secret_path))
            .await?;

        Ok(CreatedIntegration {
            integration,
            integration_auth,
        })
    }

    pub(crate) async fn update(
        &self,
        actor: &ActorContext,
        id: Uuid,
        request: UpdateIntegrationRequest,
    ) -> Result<Integration> {
        let existing = self.find_integration(id).await?;

        let permission = self
            .permissions
            .get_project_permission(actor, existing.project_id)
            .await?;
        permission.ensure(
            ProjectPermissionAction::Edit,
            ProjectPermissionSub::Integrations,
            None,
        )?;
        permission.ensure(
            ProjectPermissionAction::Read,
            ProjectPermissionSub::Secrets,
            Some(&secret_scope(&request.environment, &request.secret_path)),
        )?;

        let folder = self
            .resolve_folder(existing.project_id, &request.environment, &request.secret_path)
            .await?;
        let scope = SyncScope::new(
            folder.project_id,
            folder.environment.slug.clone(),
            &folder.path,
        );

        let UpdateIntegrationRequest {
            is_active,
            target,
            metadata,
            ..
        } = request;

        let integration = self
            .integrations
            .update_by_id(id, move |integration| {
                target.apply_to(integration);
                if let Some(is_active) = is_active {
                    integration.is_active = is_active;
                }
                integration.env_id = folder.env_id;
                integration.environment = folder.environment;
                integration.secret_path = folder.path;
                integration.metadata.merge(metadata);
            })
            .await?;

        info!(
            integration_id = %id,
            project_id = %integration.project_id,
            actor_id = %actor.actor_id,
            "Integration updated"
        );

        self.sync_trigger.sync_integrations(scope).await?;

        Ok(integration)
    }

    pub(crate) async fn delete(&self, actor: &ActorContext, id: Uuid) -> Result<DeletedIntegration> {
        let existing = self.find_integration(id).await?;

        // Delete only needs the integration capability; the bound secret
        // scope is not re-checked.
        let permission = self
            .permissions
            .get_project_permission(actor, existing.project_id)
            .await?;
        permission.ensure(
            ProjectPermissionAction::Delete,
            ProjectPermissionSub::Integrations,
            None,
        )?;

        let mut tx = self.storage.begin_transaction().await?;
        let (integration, integration_auth_deleted) = match self.delete_in(tx.as_mut(), id) {
            Ok(deleted) => deleted,
            Err(e) => {
                tx.rollback();
                return Err(e);
            }
        };
        tx.commit().await?;

        info!(
            integration_id = %id,
            project_id = %integration.project_id,
            integration_auth_id = %integration.integration_auth_id,
            integration_auth_deleted,
            actor_id = %actor.actor_id,
            "Integration deleted"
        );

        Ok(DeletedIntegration {
            integration,
            deleted_at: current_timestamp(),
            integration_auth_deleted,
        })
    }

    /// Delete the row, then the auth record if nothing else references it
    fn delete_in(&self, tx: &mut dyn Transaction, id: Uuid) -> Result<(Integration, bool)> {
        let integration = self.integrations.delete_by_id(tx, id)?;

        let siblings = self.integrations.find_in(
            &*tx,
            &IntegrationFilter::by_auth(integration.integration_auth_id),
        )?;
        let integration_auth_deleted = if siblings.is_empty() {
            self.integration_auths
                .delete_by_id(tx, integration.integration_auth_id)?
        } else {
            false
        };

        Ok((integration, integration_auth_deleted))
    }
}
