use anyhow::Result;
use std::sync::Arc;
use vaultsync_integrations::{FolderStore, IntegrationService, LoggingExecutor, SyncQueue};
use vaultsync_permission::PermissionServiceImpl;
use vaultsync_storage::RocksDbStorage;

use crate::bootstrap;
use crate::config::Config;

/// Lifecycle service as wired in the server
pub type Integrations = IntegrationService<
    PermissionServiceImpl<RocksDbStorage>,
    FolderStore<RocksDbStorage>,
    SyncQueue<RocksDbStorage>,
    RocksDbStorage,
>;

/// Application state shared across all handlers
pub struct AppState {
    pub config: Config,
    pub permission_service: Arc<PermissionServiceImpl<RocksDbStorage>>,
    pub folder_store: Arc<FolderStore<RocksDbStorage>>,
    pub integration_service: Arc<Integrations>,
}

impl AppState {
    /// Open storage, start the sync worker and apply the bootstrap seed
    pub async fn new(config: Config) -> Result<Self> {
        let storage = Arc::new(RocksDbStorage::open(&config.database_path)?);

        let permission_service = Arc::new(PermissionServiceImpl::new(storage.clone()));
        let folder_store = Arc::new(FolderStore::new(storage.clone()));
        let sync_queue = Arc::new(
            SyncQueue::start(storage.clone(), Arc::new(LoggingExecutor), config.sync.clone())
                .await?,
        );

        let integration_service = Arc::new(IntegrationService::new(
            storage,
            permission_service.clone(),
            folder_store.clone(),
            sync_queue,
        ));

        let state = AppState {
            config,
            permission_service,
            folder_store,
            integration_service,
        };

        if let Some(path) = state.config.bootstrap_path.clone() {
            let seed = bootstrap::load(&path)?;
            bootstrap::apply(&state, seed).await?;
        }

        Ok(state)
    }
}
