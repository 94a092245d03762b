//! Caller identity for HTTP requests.
//!
//! Token verification happens in the authentication gateway in front of this
//! service, which forwards the verified identity as trusted headers. A request
//! without a resolvable identity is rejected with 401 before any handler runs.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use portal_types::Role;

use super::{api_error, ErrorResponse};
use crate::error::{PortalError, PortalResult};
use crate::models::Actor;

pub const USER_ID_HEADER: &str = "x-portal-user-id";
pub const ROLE_HEADER: &str = "x-portal-role";

pub struct ActorResolver;

impl ActorResolver {
    pub fn from_headers(headers: &HeaderMap) -> PortalResult<Actor> {
        let user_id = headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(PortalError::Unauthenticated)?;
        let role: Role = headers
            .get(ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|r| r.trim().parse().ok())
            .ok_or(PortalError::Unauthenticated)?;
        Ok(Actor::new(user_id, role))
    }
}

/// Extractor for the authenticated caller.
pub struct AuthenticatedActor(pub Actor);

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedActor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        ActorResolver::from_headers(&parts.headers)
            .map(AuthenticatedActor)
            .map_err(api_error)
    }
}
