//! Proposal workflow engine.
//!
//! Every operation follows the same order: load (NotFound), authorize
//! (Forbidden), check state legality (InvalidState), then a conditional store
//! write. A write that loses a race to another request surfaces as
//! `PortalError::Conflict`; nothing is overwritten.

use chrono::{Datelike, NaiveDate, Utc};
use portal_types::{BkmdDecision, ProjectCategory, ProposalStatus, Verdict};
use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::codes::CodePrefix;
use super::transitions::{ProposalAction, WorkflowStep};
use crate::error::{PortalError, PortalResult};
use crate::models::{
    Actor, Project, ProjectDraft, Proposal, ProposalFields, ProposalInput, ReviewStamp,
    SpecialArea, StatusChange, Vertical,
};
use crate::rbac::policy::{authorize_delete, authorize_step, authorize_update, ActorRequirement};
use crate::rbac::VisibilityScope;
use crate::store::{ProposalQuery, ProposalStore};
use crate::taxonomy::FALLBACK_VERTICAL_CODE;

/// Statuses awaiting a Research Council decision.
pub const PENDING_RC: &[ProposalStatus] =
    &[ProposalStatus::DirectorApproved, ProposalStatus::RcPending];

pub const DELETED_MESSAGE: &str = "Proposal deleted successfully";

/// Result of a status transition.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub message: &'static str,
    pub proposal: Proposal,
}

/// Result of converting a proposal.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutcome {
    pub message: &'static str,
    pub proposal: Proposal,
    pub project: Project,
}

/// Something the caller could do to a proposal right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProposalCapability {
    Edit,
    Delete,
    Submit,
    BkmdReview,
    DirectorReview,
    RcReview,
    ConvertToProject,
}

impl From<WorkflowStep> for ProposalCapability {
    fn from(step: WorkflowStep) -> Self {
        match step {
            WorkflowStep::Submit => ProposalCapability::Submit,
            WorkflowStep::BkmdReview => ProposalCapability::BkmdReview,
            WorkflowStep::DirectorReview => ProposalCapability::DirectorReview,
            WorkflowStep::RcReview => ProposalCapability::RcReview,
            WorkflowStep::ConvertToProject => ProposalCapability::ConvertToProject,
        }
    }
}

/// Listing filters supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct ProposalFilter {
    pub status: Option<ProposalStatus>,
    pub category: Option<ProjectCategory>,
}

/// Parse a review decision such as `forward` or `approve`.
pub fn parse_decision<T: FromStr>(raw: Option<&str>, expected: &str) -> PortalResult<T> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
        PortalError::Validation(format!("Missing required field: action ({})", expected))
    })?;
    raw.parse().map_err(|_| {
        PortalError::Validation(format!("Invalid action '{}', expected {}", raw, expected))
    })
}

pub struct ProposalWorkflow {
    store: Arc<dyn ProposalStore>,
}

impl ProposalWorkflow {
    pub fn new(store: Arc<dyn ProposalStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ProposalStore> {
        &self.store
    }

    // ── Queries ──

    pub async fn list_proposals(
        &self,
        actor: &Actor,
        filter: ProposalFilter,
    ) -> PortalResult<Vec<Proposal>> {
        let query = ProposalQuery {
            scope: VisibilityScope::for_actor(actor),
            status: filter.status,
            category: filter.category,
        };
        debug!(user = %actor.user_id, role = %actor.role, ?query, "Listing proposals");
        Ok(self.store.list_proposals(&query).await?)
    }

    pub async fn list_pending_rc(&self) -> PortalResult<Vec<Proposal>> {
        Ok(self.store.list_by_status(PENDING_RC).await?)
    }

    pub async fn get_proposal(&self, id: Uuid) -> PortalResult<Proposal> {
        self.store
            .load_proposal(id)
            .await?
            .ok_or_else(|| PortalError::proposal_not_found(id))
    }

    pub async fn get_project(&self, id: Uuid) -> PortalResult<Project> {
        self.store
            .load_project(id)
            .await?
            .ok_or_else(|| PortalError::NotFound {
                entity: "Project",
                id: id.to_string(),
            })
    }

    pub async fn list_verticals(&self) -> PortalResult<Vec<Vertical>> {
        Ok(self.store.list_verticals().await?)
    }

    pub async fn list_special_areas(&self) -> PortalResult<Vec<SpecialArea>> {
        Ok(self.store.list_special_areas().await?)
    }

    /// Actions `actor` could perform on the proposal in its current status.
    pub async fn available_actions(
        &self,
        id: Uuid,
        actor: &Actor,
    ) -> PortalResult<Vec<ProposalCapability>> {
        let proposal = self.get_proposal(id).await?;
        Ok(capabilities(actor, &proposal))
    }

    /// The NotFound, Forbidden and InvalidState checks for `step`, without a
    /// write. Input errors found by the caller rank after these.
    pub async fn check_step(
        &self,
        step: WorkflowStep,
        id: Uuid,
        actor: &Actor,
    ) -> PortalResult<()> {
        self.load_for(step, id, actor).await.map(|_| ())
    }

    // ── Drafting ──

    pub async fn create_proposal(
        &self,
        actor: &Actor,
        input: ProposalInput,
    ) -> PortalResult<Proposal> {
        let fields = self.validate_fields(merge_input(None, input)?).await?;
        let proposal = Proposal::draft(fields, actor.user_id.clone());
        self.store.insert_proposal(&proposal).await?;
        info!(
            proposal_id = %proposal.id,
            user = %actor.user_id,
            "Proposal created"
        );
        Ok(proposal)
    }

    /// Partial update of a `DRAFT`. Absent fields keep their current value.
    pub async fn update_proposal(
        &self,
        id: Uuid,
        actor: &Actor,
        input: ProposalInput,
    ) -> PortalResult<Proposal> {
        let current = self.get_proposal(id).await?;
        authorize_update(actor, &current)?;
        let fields = self
            .validate_fields(merge_input(Some(current.fields()), input)?)
            .await?;
        let updated = self.store.update_draft(id, &fields).await?;
        info!(proposal_id = %id, user = %actor.user_id, "Proposal updated");
        Ok(updated)
    }

    pub async fn delete_proposal(&self, id: Uuid, actor: &Actor) -> PortalResult<&'static str> {
        let current = self.get_proposal(id).await?;
        authorize_delete(actor, &current)?;
        let guard: Option<&[ProposalStatus]> = if actor.role.is_administrator() {
            None
        } else {
            Some(&[ProposalStatus::Draft])
        };
        self.store.delete_proposal(id, guard).await?;
        info!(
            proposal_id = %id,
            status = %current.status,
            user = %actor.user_id,
            "Proposal deleted"
        );
        Ok(DELETED_MESSAGE)
    }

    // ── Transitions ──

    pub async fn submit(&self, id: Uuid, actor: &Actor) -> PortalResult<TransitionOutcome> {
        self.transition(id, actor, ProposalAction::Submit, |_| ReviewStamp::None)
            .await
    }

    pub async fn bkmd_review(
        &self,
        id: Uuid,
        actor: &Actor,
        decision: BkmdDecision,
        comments: Option<String>,
    ) -> PortalResult<TransitionOutcome> {
        self.transition(id, actor, ProposalAction::BkmdReview(decision), |actor| {
            ReviewStamp::Bkmd {
                reviewer_id: actor.user_id.clone(),
                reviewed_at: Utc::now(),
                comments,
            }
        })
        .await
    }

    pub async fn director_review(
        &self,
        id: Uuid,
        actor: &Actor,
        verdict: Verdict,
        comments: Option<String>,
    ) -> PortalResult<TransitionOutcome> {
        self.transition(id, actor, ProposalAction::DirectorReview(verdict), |actor| {
            ReviewStamp::Director {
                reviewer_id: actor.user_id.clone(),
                reviewed_at: Utc::now(),
                comments,
            }
        })
        .await
    }

    pub async fn rc_review(
        &self,
        id: Uuid,
        actor: &Actor,
        verdict: Verdict,
        meeting_id: Option<String>,
        comments: Option<String>,
    ) -> PortalResult<TransitionOutcome> {
        self.transition(id, actor, ProposalAction::RcReview(verdict), |_| {
            ReviewStamp::Council {
                meeting_id,
                comments,
            }
        })
        .await
    }

    pub async fn convert_to_project(
        &self,
        id: Uuid,
        actor: &Actor,
    ) -> PortalResult<ConversionOutcome> {
        let action = ProposalAction::ConvertToProject;
        let current = self.load_for(action.step(), id, actor).await?;

        let vertical_code = match self.store.find_vertical(&current.vertical_id).await? {
            Some(vertical) => vertical.code,
            None => FALLBACK_VERTICAL_CODE.to_string(),
        };
        let prefix = CodePrefix::new(current.category, Utc::now().year(), &vertical_code);

        let (proposal, project) = self
            .store
            .convert(id, ProjectDraft::from_proposal(&current), &prefix)
            .await?;

        info!(
            proposal_id = %id,
            project_id = %project.id,
            code = %project.code,
            user = %actor.user_id,
            "Proposal converted to project"
        );
        Ok(ConversionOutcome {
            message: action.message(),
            proposal,
            project,
        })
    }

    /// Load the proposal and run the Forbidden and InvalidState checks for
    /// `step`, in that order.
    async fn load_for(&self, step: WorkflowStep, id: Uuid, actor: &Actor) -> PortalResult<Proposal> {
        let proposal = self.get_proposal(id).await?;
        authorize_step(step, actor, &proposal)?;
        if !step.is_legal_from(proposal.status) {
            return Err(PortalError::invalid_state(
                step.invalid_state_message(),
                proposal.status,
            ));
        }
        Ok(proposal)
    }

    async fn transition<F>(
        &self,
        id: Uuid,
        actor: &Actor,
        action: ProposalAction,
        stamp: F,
    ) -> PortalResult<TransitionOutcome>
    where
        F: FnOnce(&Actor) -> ReviewStamp,
    {
        let step = action.step();
        let current = self.load_for(step, id, actor).await?;
        let change = StatusChange {
            to: action.target(),
            stamp: stamp(actor),
        };
        let proposal = self
            .store
            .apply_transition(id, step.allowed_from(), &change)
            .await?;
        info!(
            proposal_id = %id,
            from = %current.status,
            to = %proposal.status,
            step = step.name(),
            user = %actor.user_id,
            role = %actor.role,
            "Proposal transitioned"
        );
        Ok(TransitionOutcome {
            message: action.message(),
            proposal,
        })
    }

    /// Reference checks that need the store.
    async fn validate_fields(&self, fields: ProposalFields) -> PortalResult<ProposalFields> {
        if self.store.find_vertical(&fields.vertical_id).await?.is_none() {
            return Err(PortalError::Validation(format!(
                "Unknown vertical '{}'",
                fields.vertical_id
            )));
        }
        if let Some(area) = &fields.special_area_id {
            if self.store.find_special_area(area).await?.is_none() {
                return Err(PortalError::Validation(format!(
                    "Unknown special area '{}'",
                    area
                )));
            }
        }
        Ok(fields)
    }
}

/// Capabilities of `actor` on `proposal`, derived from the same policy the
/// mutating operations enforce.
pub fn capabilities(actor: &Actor, proposal: &Proposal) -> Vec<ProposalCapability> {
    let mut out = Vec::new();
    if authorize_update(actor, proposal).is_ok() {
        out.push(ProposalCapability::Edit);
    }
    if authorize_delete(actor, proposal).is_ok() {
        out.push(ProposalCapability::Delete);
    }
    out.extend(
        WorkflowStep::ALL
            .iter()
            .filter(|step| step.is_legal_from(proposal.status))
            .filter(|step| ActorRequirement::for_step(**step).is_satisfied_by(actor, proposal))
            .map(|step| ProposalCapability::from(*step)),
    );
    out
}

/// Overlay `input` on `base` (or on nothing, for create) and validate the
/// shape of the result.
fn merge_input(base: Option<ProposalFields>, input: ProposalInput) -> PortalResult<ProposalFields> {
    let title = required(input.title, || base.as_ref().map(|b| b.title.clone()))?;
    let category = match required(input.category, || None)? {
        Some(raw) => Some(ProjectCategory::from_str(&raw).map_err(|_| {
            PortalError::Validation(format!("Invalid category '{}'", raw))
        })?),
        None => base.as_ref().map(|b| b.category),
    };
    let vertical_id = required(input.vertical_id, || {
        base.as_ref().map(|b| b.vertical_id.clone())
    })?;
    let start = match required(input.proposed_start_date, || None)? {
        Some(raw) => Some(parse_date("proposedStartDate", &raw)?),
        None => base.as_ref().map(|b| b.proposed_start_date),
    };
    let end = match required(input.proposed_end_date, || None)? {
        Some(raw) => Some(parse_date("proposedEndDate", &raw)?),
        None => base.as_ref().map(|b| b.proposed_end_date),
    };

    let (Some(title), Some(category), Some(vertical_id), Some(start), Some(end)) =
        (title, category, vertical_id, start, end)
    else {
        return Err(missing_fields());
    };

    if end < start {
        return Err(PortalError::Validation(
            "proposedEndDate must not be before proposedStartDate".to_string(),
        ));
    }

    let estimated_budget = input
        .estimated_budget
        .or_else(|| base.as_ref().and_then(|b| b.estimated_budget));
    if estimated_budget.is_some_and(|b| b < Decimal::ZERO) {
        return Err(PortalError::Validation(
            "estimatedBudget must not be negative".to_string(),
        ));
    }

    // Absent keeps, null or blank clears
    let optional = |new: Option<Option<String>>, old: fn(&ProposalFields) -> Option<String>| {
        match new {
            Some(value) => non_empty(value),
            None => base.as_ref().and_then(old),
        }
    };

    Ok(ProposalFields {
        title,
        description: optional(input.description, |b| b.description.clone()),
        category,
        vertical_id,
        special_area_id: optional(input.special_area_id, |b| b.special_area_id.clone()),
        objectives: optional(input.objectives, |b| b.objectives.clone()),
        methodology: optional(input.methodology, |b| b.methodology.clone()),
        expected_outcome: optional(input.expected_outcome, |b| b.expected_outcome.clone()),
        proposed_start_date: start,
        proposed_end_date: end,
        estimated_budget,
    })
}

/// A required field that is sent must not be blank; an absent one falls back
/// to `current`.
fn required(
    value: Option<String>,
    current: impl FnOnce() -> Option<String>,
) -> PortalResult<Option<String>> {
    match value {
        Some(raw) if raw.trim().is_empty() => Err(missing_fields()),
        Some(raw) => Ok(Some(raw)),
        None => Ok(current()),
    }
}

fn missing_fields() -> PortalError {
    PortalError::Validation("Missing required fields".to_string())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp, keeping only the calendar
/// date as written.
fn parse_date(field: &str, raw: &str) -> PortalResult<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed.split_once('T').map_or(trimmed, |(date, _)| date);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| PortalError::Validation(format!("{} must be a date (YYYY-MM-DD)", field)))
}
