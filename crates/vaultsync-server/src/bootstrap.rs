//! Startup seed: folders, integration auth records and project memberships.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use uuid::Uuid;
use vaultsync_integrations::{current_timestamp, IntegrationAuth, IntegrationEnvironment, Metadata};
use vaultsync_permission::{ActorType, PermissionRule, ProjectMembership, ProjectRole};

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Seed {
    pub folders: Vec<FolderSeed>,
    pub integration_auths: Vec<IntegrationAuthSeed>,
    pub memberships: Vec<MembershipSeed>,
}

#[derive(Debug, Deserialize)]
pub struct FolderSeed {
    pub project_id: Uuid,
    pub environment: IntegrationEnvironment,
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct IntegrationAuthSeed {
    pub id: Uuid,
    pub project_id: Uuid,
    pub integration: String,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub access_id: Option<String>,
    #[serde(default)]
    pub access_expires_at: Option<u64>,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Deserialize)]
pub struct MembershipSeed {
    pub project_id: Uuid,
    pub actor_id: Uuid,
    pub actor: ActorType,
    pub actor_org_id: Uuid,
    pub role: ProjectRole,
    #[serde(default)]
    pub custom_rules: Vec<PermissionRule>,
}

/// Read a seed file
pub fn load(path: &Path) -> Result<Seed> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading bootstrap file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("parsing bootstrap file {}", path.display()))
}

/// Apply a seed; every entry is an upsert, so re-applying is harmless
pub async fn apply(state: &AppState, seed: Seed) -> Result<()> {
    let now = current_timestamp();

    for folder in &seed.folders {
        state
            .folder_store
            .create_folder(folder.project_id, folder.environment.clone(), &folder.path)
            .await?;
    }

    for auth in seed.integration_auths {
        let record = IntegrationAuth {
            id: auth.id,
            project_id: auth.project_id,
            integration: auth.integration,
            team_id: auth.team_id,
            url: auth.url,
            namespace: auth.namespace,
            access_id: auth.access_id,
            access_expires_at: auth.access_expires_at,
            metadata: auth.metadata,
            created_at: now,
            updated_at: now,
        };
        state
            .integration_service
            .integration_auths()
            .insert(&record)
            .await?;
    }

    for membership in seed.memberships {
        state
            .permission_service
            .grant_membership(ProjectMembership {
                project_id: membership.project_id,
                actor_id: membership.actor_id,
                actor: membership.actor,
                actor_org_id: membership.actor_org_id,
                role: membership.role,
                custom_rules: membership.custom_rules,
                created_at: now,
            })
            .await?;
    }

    tracing::info!(
        folders = seed.folders.len(),
        "Bootstrap seed applied"
    );
    Ok(())
}
