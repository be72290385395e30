use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use vaultsync_integrations::{
    CreateIntegrationRequest, CreatedIntegration, DeletedIntegration, Integration,
    IntegrationLifecycle, UpdateIntegrationRequest,
};

use crate::{error::ApiError, extractors::Actor, state::AppState};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct IntegrationResponse {
    pub integration: Integration,
}

#[derive(Debug, Serialize)]
pub struct DeleteIntegrationResponse {
    pub integration: DeletedIntegration,
}

#[derive(Debug, Serialize)]
pub struct ListIntegrationsResponse {
    pub integrations: Vec<Integration>,
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/integration
pub async fn create_integration(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    payload: Result<Json<CreateIntegrationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedIntegration>), ApiError> {
    let request = json_body(payload)?;

    let created = state
        .integration_service
        .create_integration(&actor, request)
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /v1/integration/:integration_id
pub async fn update_integration(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(integration_id): Path<Uuid>,
    payload: Result<Json<UpdateIntegrationRequest>, JsonRejection>,
) -> Result<Json<IntegrationResponse>, ApiError> {
    let request = json_body(payload)?;

    let integration = state
        .integration_service
        .update_integration(&actor, integration_id, request)
        .await?;

    Ok(Json(IntegrationResponse { integration }))
}

/// DELETE /v1/integration/:integration_id
pub async fn delete_integration(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(integration_id): Path<Uuid>,
) -> Result<Json<DeleteIntegrationResponse>, ApiError> {
    let integration = state
        .integration_service
        .delete_integration(&actor, integration_id)
        .await?;

    Ok(Json(DeleteIntegrationResponse { integration }))
}

/// POST /v1/integration/:integration_id/sync
pub async fn sync_integration(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(integration_id): Path<Uuid>,
) -> Result<(StatusCode, Json<IntegrationResponse>), ApiError> {
    let integration = state
        .integration_service
        .sync_integration(&actor, integration_id)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(IntegrationResponse { integration })))
}

/// GET /v1/projects/:project_id/integrations
pub async fn list_integrations(
    State(state): State<Arc<AppState>>,
    Actor(actor): Actor,
    Path(project_id): Path<Uuid>,
) -> Result<Json<ListIntegrationsResponse>, ApiError> {
    let integrations = state
        .integration_service
        .list_integration_by_project(&actor, project_id)
        .await?;

    Ok(Json(ListIntegrationsResponse { integrations }))
}
