//! Proposal workflow routes.
//!
//! Handlers are thin: resolve the caller, parse the body, delegate to
//! `ProposalWorkflow`, and map `PortalError` through `api_error`.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use portal_types::{BkmdDecision, ProjectCategory, ProposalStatus, Verdict};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use super::auth::AuthenticatedActor;
use super::{api_error, ErrorResponse};
use crate::error::{PortalError, PortalResult};
use crate::models::{Actor, Project, Proposal, ProposalInput, SpecialArea, Vertical};
use crate::workflow::{
    parse_decision, ProposalCapability, ProposalFilter, ProposalWorkflow, TransitionOutcome,
    WorkflowStep,
};

type ApiResult<T> = Result<T, (StatusCode, Json<ErrorResponse>)>;

// ── State ────────────────────────────────────────────────────

#[derive(Clone)]
pub struct PortalState {
    pub workflow: Arc<ProposalWorkflow>,
}

impl PortalState {
    pub fn new(workflow: ProposalWorkflow) -> Self {
        Self {
            workflow: Arc::new(workflow),
        }
    }
}

// ── Request/Response Types ───────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub category: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> PortalResult<ProposalFilter> {
        let status = match self.status.filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<ProposalStatus>().map_err(|_| {
                PortalError::Validation(format!("Invalid status filter '{}'", raw))
            })?),
            None => None,
        };
        let category = match self.category.filter(|s| !s.is_empty()) {
            Some(raw) => Some(raw.parse::<ProjectCategory>().map_err(|_| {
                PortalError::Validation(format!("Invalid category filter '{}'", raw))
            })?),
            None => None,
        };
        Ok(ProposalFilter { status, category })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub action: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RcReviewRequest {
    pub action: Option<String>,
    pub rc_meeting_id: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProposalResponse {
    pub message: &'static str,
    pub proposal: Proposal,
}

impl From<TransitionOutcome> for ProposalResponse {
    fn from(outcome: TransitionOutcome) -> Self {
        Self {
            message: outcome.message,
            proposal: outcome.proposal,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub message: &'static str,
    pub project: Project,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ActionsResponse {
    pub actions: Vec<ProposalCapability>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

// ── Router ───────────────────────────────────────────────────

pub fn create_portal_router(state: PortalState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/proposals", get(list_proposals).post(create_proposal))
        .route("/proposals/pending-rc", get(list_pending_rc))
        .route(
            "/proposals/:id",
            get(get_proposal).put(update_proposal).delete(delete_proposal),
        )
        .route("/proposals/:id/actions", get(available_actions))
        .route("/proposals/:id/submit", post(submit))
        .route("/proposals/:id/bkmd-review", post(bkmd_review))
        .route("/proposals/:id/director-review", post(director_review))
        .route("/proposals/:id/rc-review", post(rc_review))
        .route("/proposals/:id/convert-to-project", post(convert_to_project))
        .route("/verticals", get(list_verticals))
        .route("/special-areas", get(list_special_areas))
        .with_state(state)
}

// ── Helpers ──────────────────────────────────────────────────

/// Unknown or malformed ids cannot name a proposal.
fn proposal_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| {
        api_error(PortalError::NotFound {
            entity: "Proposal",
            id: raw.to_string(),
        })
    })
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    body.map(|Json(value)| value).map_err(|rejection| {
        api_error(PortalError::Validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    })
}

/// Review bodies are optional; an absent body fails on the missing action.
fn optional_body<T: Default>(body: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    match body {
        Err(JsonRejection::MissingJsonContentType(_)) => Ok(T::default()),
        other => json_body(other),
    }
}

/// Parse the review action. A bad action is reported only after the
/// proposal is known to exist and the caller may act on it.
async fn review_decision<T: FromStr>(
    state: &PortalState,
    step: WorkflowStep,
    id: Uuid,
    actor: &Actor,
    raw: Option<&str>,
    expected: &str,
) -> ApiResult<T> {
    match parse_decision(raw, expected) {
        Ok(decision) => Ok(decision),
        Err(invalid) => {
            state
                .workflow
                .check_step(step, id, actor)
                .await
                .map_err(api_error)?;
            Err(api_error(invalid))
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// GET /proposals
async fn list_proposals(
    State(state): State<PortalState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Proposal>>> {
    let filter = query.into_filter().map_err(api_error)?;
    state
        .workflow
        .list_proposals(&actor, filter)
        .await
        .map(Json)
        .map_err(api_error)
}

/// GET /proposals/pending-rc
async fn list_pending_rc(
    State(state): State<PortalState>,
    AuthenticatedActor(_actor): AuthenticatedActor,
) -> ApiResult<Json<Vec<Proposal>>> {
    state
        .workflow
        .list_pending_rc()
        .await
        .map(Json)
        .map_err(api_error)
}

/// GET /proposals/:id
async fn get_proposal(
    State(state): State<PortalState>,
    AuthenticatedActor(_actor): AuthenticatedActor,
    Path(id): Path<String>,
) -> ApiResult<Json<Proposal>> {
    let id = proposal_id(&id)?;
    state
        .workflow
        .get_proposal(id)
        .await
        .map(Json)
        .map_err(api_error)
}

/// POST /proposals
async fn create_proposal(
    State(state): State<PortalState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    body: Result<Json<ProposalInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Proposal>)> {
    let input = json_body(body)?;
    let proposal = state
        .workflow
        .create_proposal(&actor, input)
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(proposal)))
}

/// PUT /proposals/:id
async fn update_proposal(
    State(state): State<PortalState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
    body: Result<Json<ProposalInput>, JsonRejection>,
) -> ApiResult<Json<Proposal>> {
    let id = proposal_id(&id)?;
    let input = json_body(body)?;
    state
        .workflow
        .update_proposal(id, &actor, input)
        .await
        .map(Json)
        .map_err(api_error)
}

/// DELETE /proposals/:id
async fn delete_proposal(
    State(state): State<PortalState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let id = proposal_id(&id)?;
    let message = state
        .workflow
        .delete_proposal(id, &actor)
        .await
        .map_err(api_error)?;
    Ok(Json(MessageResponse { message }))
}

/// GET /proposals/:id/actions
async fn available_actions(
    State(state): State<PortalState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
) -> ApiResult<Json<ActionsResponse>> {
    let id = proposal_id(&id)?;
    let actions = state
        .workflow
        .available_actions(id, &actor)
        .await
        .map_err(api_error)?;
    Ok(Json(ActionsResponse { actions }))
}

/// POST /proposals/:id/submit
async fn submit(
    State(state): State<PortalState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
) -> ApiResult<Json<ProposalResponse>> {
    let id = proposal_id(&id)?;
    state
        .workflow
        .submit(id, &actor)
        .await
        .map(|outcome| Json(outcome.into()))
        .map_err(api_error)
}

/// POST /proposals/:id/bkmd-review
async fn bkmd_review(
    State(state): State<PortalState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
    body: Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult<Json<ProposalResponse>> {
    let id = proposal_id(&id)?;
    let req: ReviewRequest = optional_body(body)?;
    let decision: BkmdDecision = review_decision(
        &state,
        WorkflowStep::BkmdReview,
        id,
        &actor,
        req.action.as_deref(),
        "forward|return",
    )
    .await?;
    state
        .workflow
        .bkmd_review(id, &actor, decision, req.comments)
        .await
        .map(|outcome| Json(outcome.into()))
        .map_err(api_error)
}

/// POST /proposals/:id/director-review
async fn director_review(
    State(state): State<PortalState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
    body: Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult<Json<ProposalResponse>> {
    let id = proposal_id(&id)?;
    let req: ReviewRequest = optional_body(body)?;
    let verdict: Verdict = review_decision(
        &state,
        WorkflowStep::DirectorReview,
        id,
        &actor,
        req.action.as_deref(),
        "approve|reject",
    )
    .await?;
    state
        .workflow
        .director_review(id, &actor, verdict, req.comments)
        .await
        .map(|outcome| Json(outcome.into()))
        .map_err(api_error)
}

/// POST /proposals/:id/rc-review
async fn rc_review(
    State(state): State<PortalState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
    body: Result<Json<RcReviewRequest>, JsonRejection>,
) -> ApiResult<Json<ProposalResponse>> {
    let id = proposal_id(&id)?;
    let req: RcReviewRequest = optional_body(body)?;
    let verdict: Verdict = review_decision(
        &state,
        WorkflowStep::RcReview,
        id,
        &actor,
        req.action.as_deref(),
        "approve|reject",
    )
    .await?;
    state
        .workflow
        .rc_review(id, &actor, verdict, req.rc_meeting_id, req.comments)
        .await
        .map(|outcome| Json(outcome.into()))
        .map_err(api_error)
}

/// POST /proposals/:id/convert-to-project
async fn convert_to_project(
    State(state): State<PortalState>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<String>,
) -> ApiResult<Json<ProjectResponse>> {
    let id = proposal_id(&id)?;
    let outcome = state
        .workflow
        .convert_to_project(id, &actor)
        .await
        .map_err(api_error)?;
    Ok(Json(ProjectResponse {
        message: outcome.message,
        project: outcome.project,
    }))
}

/// GET /verticals
async fn list_verticals(
    State(state): State<PortalState>,
    AuthenticatedActor(_actor): AuthenticatedActor,
) -> ApiResult<Json<Vec<Vertical>>> {
    state
        .workflow
        .list_verticals()
        .await
        .map(Json)
        .map_err(api_error)
}

/// GET /special-areas
async fn list_special_areas(
    State(state): State<PortalState>,
    AuthenticatedActor(_actor): AuthenticatedActor,
) -> ApiResult<Json<Vec<SpecialArea>>> {
    state
        .workflow
        .list_special_areas()
        .await
        .map(Json)
        .map_err(api_error)
}
