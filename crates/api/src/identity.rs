//! Caller identity taken from headers set by the upstream authenticator.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::{Actor, Role};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The authenticated caller. A missing role header means [`Role::User`].
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let Some(user_id) = header(USER_ID_HEADER) else {
            tracing::debug!(uri = %parts.uri, "request without caller identity");
            return Err(ApiError::Unauthorized(
                "Missing X-User-Id header".to_string(),
            ));
        };

        let role = match header(USER_ROLE_HEADER) {
            Some(claim) => claim
                .parse::<Role>()
                .map_err(|e| ApiError::Unauthorized(e.to_string()))?,
            None => Role::User,
        };

        Ok(CurrentActor(Actor::new(user_id, role)))
    }
}
