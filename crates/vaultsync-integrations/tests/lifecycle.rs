//! End-to-end lifecycle tests against RocksDB with the real permission
//! service, folder store and sync queue.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;
use vaultsync_integrations::*;
use vaultsync_permission::{
    ActorAuthMethod, ActorContext, ActorType, PermissionServiceImpl, ProjectMembership,
    ProjectRole,
};
use vaultsync_storage::RocksDbStorage;

#[derive(Default)]
struct RecordingExecutor {
    synced: Mutex<Vec<(Uuid, Uuid)>>,
}

impl SyncExecutor for RecordingExecutor {
    async fn sync_integration(
        &self,
        job_id: Uuid,
        integration: &Integration,
    ) -> std::result::Result<(), String> {
        self.synced.lock().unwrap().push((job_id, integration.id));
        Ok(())
    }
}

type Service = IntegrationService<
    PermissionServiceImpl<RocksDbStorage>,
    FolderStore<RocksDbStorage>,
    SyncQueue<RocksDbStorage>,
    RocksDbStorage,
>;

struct TestEnv {
    service: Service,
    permissions: Arc<PermissionServiceImpl<RocksDbStorage>>,
    queue: Arc<SyncQueue<RocksDbStorage>>,
    executor: Arc<RecordingExecutor>,
    project_id: Uuid,
    org_id: Uuid,
    auth: IntegrationAuth,
    prod: IntegrationEnvironment,
    _temp: TempDir,
}

impl TestEnv {
    async fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let storage = Arc::new(RocksDbStorage::open(temp.path()).unwrap());

        let permissions = Arc::new(PermissionServiceImpl::new(storage.clone()));
        let folders = Arc::new(FolderStore::new(storage.clone()));
        let executor = Arc::new(RecordingExecutor::default());
        let queue = Arc::new(
            SyncQueue::start(storage.clone(), executor.clone(), SyncQueueConfig::default())
                .await
                .unwrap(),
        );
        let service = IntegrationService::new(
            storage,
            permissions.clone(),
            folders.clone(),
            queue.clone(),
        );

        let project_id = Uuid::new_v4();
        let prod = IntegrationEnvironment {
            id: Uuid::new_v4(),
            name: "Production".to_string(),
            slug: "prod".to_string(),
        };
        folders
            .create_folder(project_id, prod.clone(), "/app")
            .await
            .unwrap();

        let auth = IntegrationAuth {
            id: Uuid::new_v4(),
            project_id,
            integration: "aws-parameter-store".to_string(),
            team_id: None,
            url: None,
            namespace: None,
            access_id: Some("AKIA-TEST".to_string()),
            access_expires_at: None,
            metadata: Metadata::new(),
            created_at: current_timestamp(),
            updated_at: current_timestamp(),
        };
        service.integration_auths().insert(&auth).await.unwrap();

        Self {
            service,
            permissions,
            queue,
            executor,
            project_id,
            org_id: Uuid::new_v4(),
            auth,
            prod,
            _temp: temp,
        }
    }

    async fn member(&self, role: ProjectRole) -> ActorContext {
        let actor = ActorContext {
            actor: ActorType::User,
            actor_id: Uuid::new_v4(),
            actor_org_id: self.org_id,
            actor_auth_method: Some(ActorAuthMethod::Github),
        };
        self.permissions
            .grant_membership(ProjectMembership {
                project_id: self.project_id,
                actor_id: actor.actor_id,
                actor: actor.actor,
                actor_org_id: self.org_id,
                role,
                custom_rules: vec![],
                created_at: current_timestamp(),
            })
            .await
            .unwrap();
        actor
    }

    fn request(&self) -> CreateIntegrationRequest {
        CreateIntegrationRequest {
            integration_auth_id: self.auth.id,
            source_environment: "prod".to_string(),
            secret_path: "/app".to_string(),
            is_active: true,
            target: TargetDescriptor {
                path: Some("/acme/api/".to_string()),
                region: Some("eu-west-1".to_string()),
                ..TargetDescriptor::default()
            },
            metadata: Metadata::new(),
        }
    }

    async fn wait_until_synced(&self, integration_id: Uuid) -> Integration {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let stored = self
                    .service
                    .integrations()
                    .find_by_id(integration_id)
                    .await
                    .unwrap()
                    .unwrap();
                if stored.is_synced.is_some() {
                    return stored;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("integration was never synced")
    }
}

#[tokio::test]
async fn test_create_syncs_new_integration() {
    let env = TestEnv::new().await;
    let admin = env.member(ProjectRole::Admin).await;

    let created = env
        .service
        .create_integration(&admin, env.request())
        .await
        .unwrap();

    assert_eq!(created.integration.env_id, env.prod.id);
    assert_eq!(created.integration.integration, "aws-parameter-store");

    let synced = env.wait_until_synced(created.integration.id).await;
    assert_eq!(synced.is_synced, Some(true));

    let job_id = synced.last_sync_job_id.unwrap();
    let job = env.queue.get_job(job_id).await.unwrap().unwrap();
    assert_eq!(job.scope, SyncScope::new(env.project_id, "prod", "/app"));
    assert!(env
        .executor
        .synced
        .lock()
        .unwrap()
        .contains(&(job_id, created.integration.id)));
}

#[tokio::test]
async fn test_delete_only_integration_removes_auth() {
    let env = TestEnv::new().await;
    let admin = env.member(ProjectRole::Admin).await;

    let created = env
        .service
        .create_integration(&admin, env.request())
        .await
        .unwrap();
    let id = created.integration.id;

    let deleted = env.service.delete_integration(&admin, id).await.unwrap();
    assert!(deleted.integration_auth_deleted);

    assert!(env.service.integrations().find_by_id(id).await.unwrap().is_none());
    assert!(env
        .service
        .integration_auths()
        .find_by_id(env.auth.id)
        .await
        .unwrap()
        .is_none());

    let again = env.service.delete_integration(&admin, id).await.unwrap_err();
    assert!(again.is_not_found());
}

#[tokio::test]
async fn test_viewer_can_list_and_sync_but_not_mutate() {
    let env = TestEnv::new().await;
    let admin = env.member(ProjectRole::Admin).await;
    let viewer = env.member(ProjectRole::Viewer).await;

    let created = env
        .service
        .create_integration(&admin, env.request())
        .await
        .unwrap();

    let err = env
        .service
        .create_integration(&viewer, env.request())
        .await
        .unwrap_err();
    assert!(err.is_forbidden());

    let err = env
        .service
        .delete_integration(&viewer, created.integration.id)
        .await
        .unwrap_err();
    assert!(err.is_forbidden());

    let listed = env
        .service
        .list_integration_by_project(&viewer, env.project_id)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    let synced = env
        .service
        .sync_integration(&viewer, created.integration.id)
        .await
        .unwrap();
    assert_eq!(synced.env_id, env.prod.id);
}

#[tokio::test]
async fn test_actor_from_other_org_is_forbidden() {
    let env = TestEnv::new().await;
    let mut outsider = env.member(ProjectRole::Admin).await;
    outsider.actor_org_id = Uuid::new_v4();

    let err = env
        .service
        .list_integration_by_project(&outsider, env.project_id)
        .await
        .unwrap_err();
    assert!(err.is_forbidden());
}
