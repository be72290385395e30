//! RocksDB column family definitions.

/// Integrations: integration_id → Integration
pub const CF_INTEGRATIONS: &str = "integrations";

/// Integrations by project index: (project_id, integration_id) → integration_id
pub const CF_INTEGRATIONS_BY_PROJECT: &str = "integrations_by_project";

/// Integrations by auth index: (integration_auth_id, integration_id) → integration_id
pub const CF_INTEGRATIONS_BY_AUTH: &str = "integrations_by_auth";

/// Integration auth records: integration_auth_id → IntegrationAuth
pub const CF_INTEGRATION_AUTHS: &str = "integration_auths";

/// Secret folders: (project_id, environment_slug, secret_path) → Folder
pub const CF_FOLDERS: &str = "folders";

/// Project memberships: (project_id, actor_id) → ProjectMembership
pub const CF_PROJECT_MEMBERSHIPS: &str = "project_memberships";

/// Sync jobs: job_id → SyncJob
pub const CF_SYNC_JOBS: &str = "sync_jobs";

/// Pending sync jobs by scope: (project_id, environment, secret_path) → job_id
pub const CF_SYNC_JOBS_BY_SCOPE: &str = "sync_jobs_by_scope";

/// Get all column family names
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        CF_INTEGRATIONS,
        CF_INTEGRATIONS_BY_PROJECT,
        CF_INTEGRATIONS_BY_AUTH,
        CF_INTEGRATION_AUTHS,
        CF_FOLDERS,
        CF_PROJECT_MEMBERSHIPS,
        CF_SYNC_JOBS,
        CF_SYNC_JOBS_BY_SCOPE,
    ]
}
