//! Router tests over a real RocksDB-backed state.

use super::*;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;
use vaultsync_integrations::SyncQueueConfig;

use crate::extractors::{ACTOR_AUTH_METHOD_HEADER, ACTOR_ID_HEADER, ACTOR_ORG_ID_HEADER, ACTOR_TYPE_HEADER};

struct TestApp {
    router: Router,
    project_id: Uuid,
    auth_id: Uuid,
    org_id: Uuid,
    admin_id: Uuid,
    viewer_id: Uuid,
    _temp: TempDir,
}

async fn test_app() -> TestApp {
    let temp = TempDir::new().unwrap();
    let project_id = Uuid::new_v4();
    let auth_id = Uuid::new_v4();
    let org_id = Uuid::new_v4();
    let admin_id = Uuid::new_v4();
    let viewer_id = Uuid::new_v4();

    let seed = json!({
        "folders": [{
            "project_id": project_id,
            "environment": { "id": Uuid::new_v4(), "name": "Production", "slug": "prod" },
            "path": "/app"
        }],
        "integration_auths": [{
            "id": auth_id,
            "project_id": project_id,
            "integration": "github",
            "namespace": "acme"
        }],
        "memberships": [
            {
                "project_id": project_id,
                "actor_id": admin_id,
                "actor": "user",
                "actor_org_id": org_id,
                "role": "admin"
            },
            {
                "project_id": project_id,
                "actor_id": viewer_id,
                "actor": "user",
                "actor_org_id": org_id,
                "role": "viewer"
            }
        ]
    });
    let seed_path = temp.path().join("seed.json");
    std::fs::write(&seed_path, seed.to_string()).unwrap();

    let config = Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_path: temp.path().join("db"),
        sync: SyncQueueConfig::default(),
        bootstrap_path: Some(seed_path),
    };
    let state = Arc::new(AppState::new(config).await.unwrap());

    TestApp {
        router: create_router(state),
        project_id,
        auth_id,
        org_id,
        admin_id,
        viewer_id,
        _temp: temp,
    }
}

impl TestApp {
    fn request(&self, method: Method, uri: &str, actor_id: Uuid, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(ACTOR_ID_HEADER, actor_id.to_string())
            .header(ACTOR_TYPE_HEADER, "user")
            .header(ACTOR_ORG_ID_HEADER, self.org_id.to_string())
            .header(ACTOR_AUTH_METHOD_HEADER, "email");

        match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn create_body(&self) -> Value {
        json!({
            "integration_auth_id": self.auth_id,
            "source_environment": "prod",
            "secret_path": "/app",
            "app": "acme/api",
            "owner": "acme",
            "metadata": { "secretSuffix": "_PROD" }
        })
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_integration_lifecycle_over_http() {
    let app = test_app().await;

    let (status, body) = app
        .send(app.request(Method::POST, "/v1/integration", app.admin_id, Some(app.create_body())))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["integration"]["environment"]["slug"], "prod");
    assert_eq!(body["integration"]["integration"], "github");
    assert_eq!(body["integration_auth"]["id"], json!(app.auth_id));
    let id = body["integration"]["id"].as_str().unwrap().to_string();

    let list_uri = format!("/v1/projects/{}/integrations", app.project_id);
    let (status, body) = app
        .send(app.request(Method::GET, &list_uri, app.viewer_id, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["integrations"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .send(app.request(
            Method::PATCH,
            &format!("/v1/integration/{}", id),
            app.admin_id,
            Some(json!({
                "environment": "prod",
                "secret_path": "/app",
                "is_active": false,
                "metadata": { "initialSyncBehavior": "overwrite-target" }
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["integration"]["is_active"], false);
    assert_eq!(body["integration"]["app"], "acme/api");
    assert_eq!(body["integration"]["metadata"]["secretSuffix"], "_PROD");
    assert_eq!(
        body["integration"]["metadata"]["initialSyncBehavior"],
        "overwrite-target"
    );

    let (status, body) = app
        .send(app.request(
            Method::POST,
            &format!("/v1/integration/{}/sync", id),
            app.viewer_id,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["integration"]["id"], json!(id));

    let delete_uri = format!("/v1/integration/{}", id);
    let (status, body) = app
        .send(app.request(Method::DELETE, &delete_uri, app.admin_id, None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["integration"]["id"], json!(id));
    assert_eq!(body["integration"]["integration_auth_deleted"], true);

    let (status, body) = app
        .send(app.request(Method::DELETE, &delete_uri, app.admin_id, None))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_viewer_cannot_create() {
    let app = test_app().await;
    let (status, body) = app
        .send(app.request(Method::POST, "/v1/integration", app.viewer_id, Some(app.create_body())))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");
    assert_eq!(body["error"]["details"]["action"], "create");
    assert_eq!(body["error"]["details"]["subject"], "integrations");
}

#[tokio::test]
async fn test_unknown_folder_is_not_found() {
    let app = test_app().await;
    let mut body = app.create_body();
    body["secret_path"] = json!("/missing");

    let (status, body) = app
        .send(app.request(Method::POST, "/v1/integration", app.admin_id, Some(body)))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Folder path not found"));
}

#[tokio::test]
async fn test_missing_actor_headers_is_unauthorized() {
    let app = test_app().await;
    let request = Request::builder()
        .uri(format!("/v1/projects/{}/integrations", app.project_id))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = test_app().await;
    let (status, body) = app
        .send(app.request(
            Method::POST,
            "/v1/integration",
            app.admin_id,
            Some(json!({ "secret_path": "/app" })),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}
