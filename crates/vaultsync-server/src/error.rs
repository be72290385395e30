use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use vaultsync_integrations::Error as IntegrationError;
use vaultsync_permission::PermissionError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    /// Capability check failed; `details` names the failed check
    #[error("Forbidden: {message}")]
    Forbidden {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            ApiError::InvalidRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "INVALID_REQUEST",
                msg,
                None,
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Missing or invalid actor context".to_string(),
                None,
            ),
            ApiError::Forbidden { message, details } => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                message,
                details,
            ),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                msg,
                None,
            ),
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: ErrorDetails {
                code: code.to_string(),
                message,
                details,
            },
        });

        (status, body).into_response()
    }
}

impl From<IntegrationError> for ApiError {
    fn from(error: IntegrationError) -> Self {
        if error.is_not_found() {
            return ApiError::NotFound(error.to_string());
        }

        match error {
            IntegrationError::Permission(PermissionError::Forbidden {
                action,
                subject,
                attributes,
            }) => {
                let message = PermissionError::Forbidden {
                    action,
                    subject,
                    attributes: attributes.clone(),
                }
                .to_string();
                ApiError::Forbidden {
                    message,
                    details: Some(json!({
                        "action": action,
                        "subject": subject,
                        "attributes": attributes,
                    })),
                }
            }
            IntegrationError::Permission(err) if err.is_forbidden() => ApiError::Forbidden {
                message: err.to_string(),
                details: None,
            },
            other => ApiError::Internal(anyhow::Error::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use vaultsync_permission::{ProjectPermissionAction, ProjectPermissionSub, SecretScope};

    #[test]
    fn test_not_found_mapping() {
        let err = ApiError::from(IntegrationError::IntegrationNotFound(Uuid::new_v4()));
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_forbidden_carries_failed_check() {
        let err = ApiError::from(IntegrationError::Permission(PermissionError::Forbidden {
            action: ProjectPermissionAction::Read,
            subject: ProjectPermissionSub::Secrets,
            attributes: Some(SecretScope::new("prod", "/app")),
        }));

        match &err {
            ApiError::Forbidden { details, .. } => {
                let details = details.as_ref().unwrap();
                assert_eq!(details["action"], "read");
                assert_eq!(details["subject"], "secrets");
                assert_eq!(details["attributes"]["environment"], "prod");
            }
            other => panic!("expected Forbidden, got {other:?}"),
        }
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_membership_errors_are_forbidden() {
        let err = ApiError::from(IntegrationError::Permission(
            PermissionError::NotProjectMember {
                actor_id: Uuid::new_v4(),
                project_id: Uuid::new_v4(),
            },
        ));
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_sync_trigger_failure_is_internal() {
        let err = ApiError::from(IntegrationError::SyncTrigger("closed".to_string()));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
