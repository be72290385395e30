//! Integration lifecycle service implementation.

mod mutations;
mod queries;

use crate::folders::normalize_secret_path;
use crate::store::{IntegrationAuthStore, IntegrationStore};
use crate::traits::{FolderResolver, IntegrationLifecycle, SyncTrigger};
use crate::types::*;
use crate::{Error, Result};
use std::sync::Arc;
use uuid::Uuid;
use vaultsync_permission::{ActorContext, PermissionService, SecretScope};
use vaultsync_storage::Storage;

/// Integration lifecycle service
///
/// Every entry point follows the same order: resolve the owning project from
/// the stored record, check capabilities, resolve the folder, write, trigger
/// sync. A failed check leaves no trace in the folder or integration stores.
pub struct IntegrationService<P, F, T, S>
where
    P: PermissionService,
    F: FolderResolver,
    T: SyncTrigger,
    S: Storage,
{
    pub(crate) storage: Arc<S>,
    pub(crate) permissions: Arc<P>,
    pub(crate) folders: Arc<F>,
    pub(crate) sync_trigger: Arc<T>,
    pub(crate) integrations: IntegrationStore<S>,
    pub(crate) integration_auths: IntegrationAuthStore<S>,
}

impl<P, F, T, S> IntegrationService<P, F, T, S>
where
    P: PermissionService,
    F: FolderResolver,
    T: SyncTrigger,
    S: Storage + 'static,
{
    /// Create new integration service
    pub fn new(storage: Arc<S>, permissions: Arc<P>, folders: Arc<F>, sync_trigger: Arc<T>) -> Self {
        Self {
            integrations: IntegrationStore::new(storage.clone()),
            integration_auths: IntegrationAuthStore::new(storage.clone()),
            storage,
            permissions,
            folders,
            sync_trigger,
        }
    }

    pub fn integrations(&self) -> &IntegrationStore<S> {
        &self.integrations
    }

    pub fn integration_auths(&self) -> &IntegrationAuthStore<S> {
        &self.integration_auths
    }

    pub(crate) async fn find_integration(&self, id: Uuid) -> Result<Integration> {
        self.integrations
            .find_by_id(id)
            .await?
            .ok_or(Error::IntegrationNotFound(id))
    }

    pub(crate) async fn resolve_folder(
        &self,
        project_id: Uuid,
        environment: &str,
        secret_path: &str,
    ) -> Result<Folder> {
        self.folders
            .find_by_secret_path(project_id, environment, secret_path)
            .await?
            .ok_or_else(|| Error::FolderNotFound {
                environment: environment.to_string(),
                secret_path: secret_path.to_string(),
            })
    }
}

/// Attribute bag for a Secrets check on `(environment, secret_path)`
pub(crate) fn secret_scope(environment: &str, secret_path: &str) -> SecretScope {
    SecretScope::new(environment, normalize_secret_path(secret_path))
}

impl<P, F, T, S> IntegrationLifecycle for IntegrationService<P, F, T, S>
where
    P: PermissionService,
    F: FolderResolver,
    T: SyncTrigger,
    S: Storage + 'static,
{
    async fn create_integration(
        &self,
        actor: &ActorContext,
        request: CreateIntegrationRequest,
    ) -> Result<CreatedIntegration> {
        self.create(actor, request).await
    }

    async fn update_integration(
        &self,
        actor: &ActorContext,
        id: Uuid,
        request: UpdateIntegrationRequest,
    ) -> Result<Integration> {
        self.update(actor, id, request).await
    }

    async fn delete_integration(
        &self,
        actor: &ActorContext,
        id: Uuid,
    ) -> Result<DeletedIntegration> {
        self.delete(actor, id).await
    }

    async fn list_integration_by_project(
        &self,
        actor: &ActorContext,
        project_id: Uuid,
    ) -> Result<Vec<Integration>> {
        self.list_by_project(actor, project_id).await
    }

    async fn sync_integration(&self, actor: &ActorContext, id: Uuid) -> Result<Integration> {
        self.sync(actor, id).await
    }
}
