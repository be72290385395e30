use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::de::DeserializeOwned;
use uuid::Uuid;
use vaultsync_permission::{ActorAuthMethod, ActorContext, ActorType};

use crate::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "X-Actor-Id";
pub const ACTOR_TYPE_HEADER: &str = "X-Actor-Type";
pub const ACTOR_ORG_ID_HEADER: &str = "X-Actor-Org-Id";
pub const ACTOR_AUTH_METHOD_HEADER: &str = "X-Actor-Auth-Method";

/// Actor context of the calling principal
///
/// The gateway in front of this service authenticates callers and forwards
/// the result in `X-Actor-*` headers. A missing header is a 401, a header
/// that does not parse is a 400.
pub struct Actor(pub ActorContext);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor_id = required_header(parts, ACTOR_ID_HEADER)?;
        let actor_type = required_header(parts, ACTOR_TYPE_HEADER)?;
        let actor_org_id = required_header(parts, ACTOR_ORG_ID_HEADER)?;

        let actor_id = parse_uuid(ACTOR_ID_HEADER, actor_id)?;
        let actor_org_id = parse_uuid(ACTOR_ORG_ID_HEADER, actor_org_id)?;
        let actor: ActorType = parse_enum(ACTOR_TYPE_HEADER, actor_type)?;

        let actor_auth_method = parts
            .headers
            .get(ACTOR_AUTH_METHOD_HEADER)
            .map(|value| {
                let value = value.to_str().map_err(|_| invalid(ACTOR_AUTH_METHOD_HEADER))?;
                parse_enum::<ActorAuthMethod>(ACTOR_AUTH_METHOD_HEADER, value)
            })
            .transpose()?;

        Ok(Actor(ActorContext {
            actor,
            actor_id,
            actor_org_id,
            actor_auth_method,
        }))
    }
}

fn required_header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, ApiError> {
    let value = parts.headers.get(name).ok_or_else(|| {
        tracing::debug!(header = name, "Missing actor header");
        ApiError::Unauthorized
    })?;
    value.to_str().map_err(|_| invalid(name))
}

fn parse_uuid(name: &str, value: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(value).map_err(|_| invalid(name))
}

/// Parse a header through the type's serde names (`user`, `universal-auth`, ...)
fn parse_enum<T: DeserializeOwned>(name: &str, value: &str) -> Result<T, ApiError> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).map_err(|_| invalid(name))
}

fn invalid(name: &str) -> ApiError {
    ApiError::InvalidRequest(format!("Invalid {} header", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<ActorContext, ApiError> {
        let (mut parts, _) = request.into_parts();
        Actor::from_request_parts(&mut parts, &()).await.map(|a| a.0)
    }

    #[tokio::test]
    async fn test_extracts_actor_context() {
        let actor_id = Uuid::new_v4();
        let org_id = Uuid::new_v4();
        let request = Request::builder()
            .header(ACTOR_ID_HEADER, actor_id.to_string())
            .header(ACTOR_TYPE_HEADER, "service")
            .header(ACTOR_ORG_ID_HEADER, org_id.to_string())
            .header(ACTOR_AUTH_METHOD_HEADER, "universal-auth")
            .body(())
            .unwrap();

        let actor = extract(request).await.unwrap();
        assert_eq!(actor.actor_id, actor_id);
        assert_eq!(actor.actor_org_id, org_id);
        assert_eq!(actor.actor, ActorType::Service);
        assert_eq!(actor.actor_auth_method, Some(ActorAuthMethod::UniversalAuth));
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthorized() {
        let request = Request::builder()
            .header(ACTOR_TYPE_HEADER, "user")
            .body(())
            .unwrap();
        assert!(matches!(extract(request).await, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_malformed_header_is_invalid() {
        let request = Request::builder()
            .header(ACTOR_ID_HEADER, "not-a-uuid")
            .header(ACTOR_TYPE_HEADER, "user")
            .header(ACTOR_ORG_ID_HEADER, Uuid::new_v4().to_string())
            .body(())
            .unwrap();
        assert!(matches!(
            extract(request).await,
            Err(ApiError::InvalidRequest(_))
        ));
    }
}
