//! Trait definitions for integrations subsystem.

use crate::types::*;
use crate::Result;
use uuid::Uuid;
use vaultsync_permission::ActorContext;

/// Integration lifecycle operations
///
/// Every operation resolves the owning project, checks the actor's
/// capabilities there, and only then touches folders or stored integrations.
pub trait IntegrationLifecycle: Send + Sync {
    /// Bind a secret scope to an external target
    ///
    /// # Arguments
    /// * `actor` - Calling actor
    /// * `request` - Auth record, source scope and target descriptor
    ///
    /// # Returns
    /// * The new integration and the auth record it references
    ///
    /// # Errors
    /// * `IntegrationAuthNotFound` - Auth record missing (also when it is
    ///   deleted while the create is in flight)
    /// * `Permission` - Missing Create on integrations or Read on the scope
    /// * `FolderNotFound` - No folder for the source scope
    fn create_integration(
        &self,
        actor: &ActorContext,
        request: CreateIntegrationRequest,
    ) -> impl std::future::Future<Output = Result<CreatedIntegration>> + Send;

    /// Replace target fields, move scope, merge metadata
    ///
    /// # Errors
    /// * `IntegrationNotFound` - Integration missing
    /// * `Permission` - Missing Edit on integrations or Read on the new scope
    /// * `FolderNotFound` - No folder for the new scope
    fn update_integration(
        &self,
        actor: &ActorContext,
        id: Uuid,
        request: UpdateIntegrationRequest,
    ) -> impl std::future::Future<Output = Result<Integration>> + Send;

    /// Delete an integration, and its auth record if no other integration
    /// references it
    ///
    /// # Errors
    /// * `IntegrationNotFound` - Integration missing
    /// * `Permission` - Missing Delete on integrations
    /// * `Storage` - Transaction failed; nothing was removed
    fn delete_integration(
        &self,
        actor: &ActorContext,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<DeletedIntegration>> + Send;

    /// All integrations of a project, oldest first
    ///
    /// # Errors
    /// * `Permission` - Missing Read on integrations
    fn list_integration_by_project(
        &self,
        actor: &ActorContext,
        project_id: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Integration>>> + Send;

    /// Request a sync pass for the integration's scope
    ///
    /// # Errors
    /// * `IntegrationNotFound` - Integration missing
    /// * `Permission` - Missing Read on integrations
    /// * `SyncTrigger` - Enqueue failed
    fn sync_integration(
        &self,
        actor: &ActorContext,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<Integration>> + Send;
}

/// Secret folder lookup
pub trait FolderResolver: Send + Sync {
    /// Resolve the folder owning `(environment, secret_path)` in a project
    fn find_by_secret_path(
        &self,
        project_id: Uuid,
        environment: &str,
        secret_path: &str,
    ) -> impl std::future::Future<Output = Result<Option<Folder>>> + Send;
}

/// Enqueue contract for downstream synchronization
///
/// Delivery is at-least-once: duplicate triggers for one scope are harmless.
pub trait SyncTrigger: Send + Sync {
    /// Schedule a sync pass over every active integration in `scope`
    fn sync_integrations(
        &self,
        scope: SyncScope,
    ) -> impl std::future::Future<Output = Result<SyncTicket>> + Send;
}

/// Pushes current secret state of one integration to its external target
pub trait SyncExecutor: Send + Sync + 'static {
    /// Sync a single integration
    ///
    /// # Returns
    /// * `Err(message)` - Target rejected or was unreachable; the message is
    ///   recorded as the integration's `sync_message`
    fn sync_integration(
        &self,
        job_id: Uuid,
        integration: &Integration,
    ) -> impl std::future::Future<Output = std::result::Result<(), String>> + Send;
}
