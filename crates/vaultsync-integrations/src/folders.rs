//! Folder store: resolution of (environment, secret path) scopes.

use crate::traits::FolderResolver;
use crate::types::{Folder, IntegrationEnvironment};
use crate::Result;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;
use vaultsync_storage::{Storage, CF_FOLDERS};

/// Canonical form of a secret path
///
/// Always rooted, no empty segments, no trailing slash (except `/`).
pub fn normalize_secret_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

/// RocksDB-backed folder registry
pub struct FolderStore<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> FolderStore<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Provision a folder for a scope, returning the existing one if present
    pub async fn create_folder(
        &self,
        project_id: Uuid,
        environment: IntegrationEnvironment,
        path: &str,
    ) -> Result<Folder> {
        let path = normalize_secret_path(path);
        let key = (project_id, environment.slug.clone(), path.clone());

        if let Some(existing) = self.storage.get::<_, Folder>(CF_FOLDERS, &key).await? {
            return Ok(existing);
        }

        let folder = Folder {
            id: Uuid::new_v4(),
            env_id: environment.id,
            environment,
            project_id,
            path,
        };
        self.storage.put(CF_FOLDERS, &key, &folder).await?;

        debug!(
            folder_id = %folder.id,
            project_id = %project_id,
            environment = %folder.environment.slug,
            path = %folder.path,
            "Folder created"
        );
        Ok(folder)
    }
}

impl<S: Storage + 'static> FolderResolver for FolderStore<S> {
    async fn find_by_secret_path(
        &self,
        project_id: Uuid,
        environment: &str,
        secret_path: &str,
    ) -> Result<Option<Folder>> {
        let key = (
            project_id,
            environment.to_string(),
            normalize_secret_path(secret_path),
        );
        Ok(self.storage.get(CF_FOLDERS, &key).await?)
    }
}
