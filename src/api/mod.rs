//! HTTP surface for the research portal
//!
//! ## Endpoints
//!
//! - `GET    /health`                          - Liveness
//! - `GET    /proposals`                       - List, filtered by caller role
//! - `GET    /proposals/pending-rc`            - Awaiting Research Council
//! - `POST   /proposals`                       - Create draft
//! - `GET    /proposals/:id`                   - Fetch one
//! - `PUT    /proposals/:id`                   - Edit draft
//! - `DELETE /proposals/:id`                   - Delete
//! - `GET    /proposals/:id/actions`           - Actions available to the caller
//! - `POST   /proposals/:id/submit`            - DRAFT → SUBMITTED
//! - `POST   /proposals/:id/bkmd-review`       - forward | return
//! - `POST   /proposals/:id/director-review`   - approve | reject
//! - `POST   /proposals/:id/rc-review`         - approve | reject
//! - `POST   /proposals/:id/convert-to-project`
//! - `GET    /verticals`, `GET /special-areas` - Reference taxonomy

use axum::{http::StatusCode, Json};
use serde::Serialize;
use tracing::error;

use crate::error::PortalError;

pub mod auth;
pub mod proposal_routes;

pub use auth::{ActorResolver, AuthenticatedActor};
pub use proposal_routes::{create_portal_router, PortalState};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn status_for(err: &PortalError) -> StatusCode {
    match err {
        PortalError::Validation(_) | PortalError::InvalidState { .. } => StatusCode::BAD_REQUEST,
        PortalError::Unauthenticated => StatusCode::UNAUTHORIZED,
        PortalError::Forbidden(_) => StatusCode::FORBIDDEN,
        PortalError::NotFound { .. } => StatusCode::NOT_FOUND,
        PortalError::Conflict(_) => StatusCode::CONFLICT,
        PortalError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map a portal error to the `{ error }` response body. Unexpected errors are
/// logged here and replaced by a generic message.
pub fn api_error(err: PortalError) -> (StatusCode, Json<ErrorResponse>) {
    if let PortalError::Unexpected(source) = &err {
        error!("Unexpected error: {:#}", source);
    }
    (
        status_for(&err),
        Json(ErrorResponse {
            error: err.public_message(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_types::ProposalStatus;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (PortalError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (
                PortalError::invalid_state("x", ProposalStatus::Submitted),
                StatusCode::BAD_REQUEST,
            ),
            (PortalError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (PortalError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (
                PortalError::NotFound {
                    entity: "Proposal",
                    id: "1".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (PortalError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                PortalError::Unexpected(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(status_for(&err), status, "{:?}", err);
        }
    }

    #[test]
    fn test_unexpected_body_is_generic() {
        let (_, Json(body)) = api_error(PortalError::Unexpected(anyhow::anyhow!("pool timed out")));
        assert_eq!(body.error, "Internal server error");
    }
}
