//! Type definitions for the integrations subsystem.

use crate::folders::normalize_secret_path;
use crate::metadata::Metadata;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Denormalized environment descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrationEnvironment {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// Resolved secret folder anchoring an (environment, path) scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: Uuid,
    pub env_id: Uuid,
    pub environment: IntegrationEnvironment,
    pub project_id: Uuid,
    /// Normalized secret path (`/`, `/app`, `/app/api`)
    pub path: String,
}

/// Shared credential/connection record for one external provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrationAuth {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Provider kind, e.g. `github`, `aws-parameter-store`
    pub integration: String,
    pub team_id: Option<String>,
    pub url: Option<String>,
    pub namespace: Option<String>,
    pub access_id: Option<String>,
    pub access_expires_at: Option<u64>,
    pub metadata: Metadata,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Binding of one secret scope to one external target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Integration {
    pub id: Uuid,
    pub project_id: Uuid,
    pub integration_auth_id: Uuid,

    // Secret scope
    pub env_id: Uuid,
    pub environment: IntegrationEnvironment,
    pub secret_path: String,

    pub is_active: bool,

    // Target descriptor
    pub url: Option<String>,
    pub app: Option<String>,
    pub app_id: Option<String>,
    pub owner: Option<String>,
    pub path: Option<String>,
    pub region: Option<String>,
    pub scope: Option<String>,
    pub target_service: Option<String>,
    pub target_service_id: Option<String>,
    pub target_environment: Option<String>,
    pub target_environment_id: Option<String>,
    /// Provider kind copied from the auth record at creation
    pub integration: String,
    pub metadata: Metadata,

    // Sync bookkeeping
    pub is_synced: Option<bool>,
    pub sync_message: Option<String>,
    pub last_sync_job_id: Option<Uuid>,
    pub last_used: Option<u64>,

    pub created_at: u64,
    pub updated_at: u64,
}

/// Target-descriptor fields with replace semantics
///
/// On create every field is taken as given. On update `Some` replaces the
/// stored value and `None` keeps it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetDescriptor {
    pub url: Option<String>,
    pub app: Option<String>,
    pub app_id: Option<String>,
    pub owner: Option<String>,
    pub path: Option<String>,
    pub region: Option<String>,
    pub scope: Option<String>,
    pub target_service: Option<String>,
    pub target_service_id: Option<String>,
    pub target_environment: Option<String>,
    pub target_environment_id: Option<String>,
}

impl TargetDescriptor {
    /// Replace every field of `integration` this descriptor sets
    pub fn apply_to(self, integration: &mut Integration) {
        fn replace(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }

        replace(&mut integration.url, self.url);
        replace(&mut integration.app, self.app);
        replace(&mut integration.app_id, self.app_id);
        replace(&mut integration.owner, self.owner);
        replace(&mut integration.path, self.path);
        replace(&mut integration.region, self.region);
        replace(&mut integration.scope, self.scope);
        replace(&mut integration.target_service, self.target_service);
        replace(&mut integration.target_service_id, self.target_service_id);
        replace(&mut integration.target_environment, self.target_environment);
        replace(&mut integration.target_environment_id, self.target_environment_id);
    }
}

/// Create request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateIntegrationRequest {
    pub integration_auth_id: Uuid,
    /// Environment slug of the secret scope being bound
    pub source_environment: String,
    pub secret_path: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(flatten)]
    pub target: TargetDescriptor,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Update request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateIntegrationRequest {
    /// Environment slug of the (possibly new) secret scope
    pub environment: String,
    pub secret_path: String,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub target: TargetDescriptor,
    /// Merge patch applied over the stored metadata
    #[serde(default)]
    pub metadata: Metadata,
}

fn default_true() -> bool {
    true
}

/// Result of a create
#[derive(Debug, Clone, Serialize)]
pub struct CreatedIntegration {
    pub integration: Integration,
    pub integration_auth: IntegrationAuth,
}

/// Result of a delete: the removed record plus what the delete produced
#[derive(Debug, Clone, Serialize)]
pub struct DeletedIntegration {
    #[serde(flatten)]
    pub integration: Integration,
    pub deleted_at: u64,
    /// Whether this was the last reference and the auth record went with it
    pub integration_auth_deleted: bool,
}

/// Selection over stored integrations
///
/// One of `integration_auth_id` / `project_id` must be set; it picks the
/// index to scan. Remaining fields narrow the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrationFilter {
    pub integration_auth_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub environment: Option<String>,
    pub secret_path: Option<String>,
    pub is_active: Option<bool>,
}

impl IntegrationFilter {
    pub fn by_auth(integration_auth_id: Uuid) -> Self {
        Self {
            integration_auth_id: Some(integration_auth_id),
            ..Self::default()
        }
    }

    /// Active integrations bound to one sync scope
    pub fn by_scope(scope: &SyncScope) -> Self {
        Self {
            project_id: Some(scope.project_id),
            environment: Some(scope.environment.clone()),
            secret_path: Some(scope.secret_path.clone()),
            is_active: Some(true),
            ..Self::default()
        }
    }

    pub fn matches(&self, integration: &Integration) -> bool {
        self.integration_auth_id
            .map_or(true, |id| integration.integration_auth_id == id)
            && self
                .project_id
                .map_or(true, |id| integration.project_id == id)
            && self
                .environment
                .as_ref()
                .map_or(true, |slug| &integration.environment.slug == slug)
            && self.secret_path.as_ref().map_or(true, |path| {
                normalize_secret_path(&integration.secret_path) == normalize_secret_path(path)
            })
            && self
                .is_active
                .map_or(true, |active| integration.is_active == active)
    }
}

/// (project, environment, secret path) tuple a sync pass covers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncScope {
    pub project_id: Uuid,
    pub environment: String,
    pub secret_path: String,
}

impl SyncScope {
    /// Build a scope; the secret path is normalized
    pub fn new(project_id: Uuid, environment: impl Into<String>, secret_path: &str) -> Self {
        Self {
            project_id,
            environment: environment.into(),
            secret_path: normalize_secret_path(secret_path),
        }
    }
}

/// Receipt returned by the sync trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTicket {
    pub job_id: Uuid,
    /// True when an identical queued job absorbed this trigger
    pub deduplicated: bool,
}

/// Persisted sync job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncJob {
    pub job_id: Uuid,
    pub scope: SyncScope,
    pub status: SyncJobStatus,
    /// Completed passes (1-indexed once the first pass ran)
    pub attempt: u32,
    pub queued_at: u64,
    pub first_attempt_at: Option<u64>,
    pub last_attempt_at: Option<u64>,
    pub next_attempt_at: Option<u64>,
    pub finished_at: Option<u64>,
    pub synced_count: u32,
    pub failed_count: u32,
    pub error_message: Option<String>,
}

/// Sync job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SyncJobStatus {
    /// Waiting for the worker; further triggers for the scope fold into it
    Queued = 0x01,

    /// Pass in progress
    Running = 0x02,

    /// Some integrations failed; another pass is scheduled
    Retrying = 0x03,

    /// Every integration in scope synced
    Succeeded = 0x04,

    /// Max attempts or retention reached
    Abandoned = 0x05,
}

impl SyncJobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SyncJobStatus::Succeeded | SyncJobStatus::Abandoned)
    }
}

/// Get current Unix timestamp in seconds
pub fn current_timestamp() -> u64 {
    vaultsync_permission::current_timestamp()
}
