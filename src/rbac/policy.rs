//! Server-side authorization policy.
//!
//! This is the authoritative enforcement point. The workflow engine consults
//! it before every transition and the data-access layer applies its
//! `VisibilityScope` to every proposal listing. The presentation guards in
//! `rbac::guard` may agree or disagree; they are never trusted.

use portal_types::{ProposalStatus, Role};

use crate::error::{PortalError, PortalResult};
use crate::models::{Actor, Proposal};
use crate::workflow::transitions::WorkflowStep;

const BKMD_REVIEWERS: &[Role] = &[Role::Bkmd, Role::Admin, Role::SysAdmin];
const DIRECTOR_REVIEWERS: &[Role] = &[Role::Director, Role::Admin, Role::SysAdmin];

/// Who may perform a workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRequirement {
    /// The proposal's submitter, regardless of role
    Submitter,
    AnyOf(&'static [Role]),
}

impl ActorRequirement {
    pub fn for_step(step: WorkflowStep) -> Self {
        match step {
            WorkflowStep::Submit => ActorRequirement::Submitter,
            WorkflowStep::BkmdReview => ActorRequirement::AnyOf(BKMD_REVIEWERS),
            WorkflowStep::DirectorReview
            | WorkflowStep::RcReview
            | WorkflowStep::ConvertToProject => ActorRequirement::AnyOf(DIRECTOR_REVIEWERS),
        }
    }

    pub fn is_satisfied_by(&self, actor: &Actor, proposal: &Proposal) -> bool {
        match self {
            ActorRequirement::Submitter => proposal.is_submitted_by(actor),
            ActorRequirement::AnyOf(roles) => roles.contains(&actor.role),
        }
    }
}

/// Reject with `Forbidden` unless the actor may perform `step` on `proposal`.
pub fn authorize_step(step: WorkflowStep, actor: &Actor, proposal: &Proposal) -> PortalResult<()> {
    let requirement = ActorRequirement::for_step(step);
    if requirement.is_satisfied_by(actor, proposal) {
        return Ok(());
    }
    Err(match requirement {
        ActorRequirement::Submitter => {
            PortalError::Forbidden("Only the submitter can submit the proposal".to_string())
        }
        ActorRequirement::AnyOf(_) => PortalError::Forbidden(format!(
            "Role {} is not permitted to perform {}",
            actor.role,
            step.name()
        )),
    })
}

/// Ownership check for update; the `DRAFT` requirement applies to everyone.
pub fn authorize_update(actor: &Actor, proposal: &Proposal) -> PortalResult<()> {
    if !proposal.is_submitted_by(actor) && !actor.role.is_administrator() {
        return Err(PortalError::Forbidden(
            "Not authorized to update this proposal".to_string(),
        ));
    }
    if proposal.status != ProposalStatus::Draft {
        return Err(PortalError::invalid_state(
            "Only draft proposals can be edited",
            proposal.status,
        ));
    }
    Ok(())
}

/// Submitters may delete their own drafts; administrators may delete any
/// proposal in any status.
pub fn authorize_delete(actor: &Actor, proposal: &Proposal) -> PortalResult<()> {
    let is_admin = actor.role.is_administrator();
    if !proposal.is_submitted_by(actor) && !is_admin {
        return Err(PortalError::Forbidden(
            "Not authorized to delete this proposal".to_string(),
        ));
    }
    if proposal.status != ProposalStatus::Draft && !is_admin {
        return Err(PortalError::invalid_state(
            "Only draft proposals can be deleted",
            proposal.status,
        ));
    }
    Ok(())
}

/// Which reviewer column a scope may match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewerSlot {
    Bkmd,
    Director,
}

/// Row-level visibility of proposals for a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityScope {
    Unrestricted,
    SubmittedBy(String),
    /// Proposals in any of `statuses`, or reviewed by `user_id` in `slot`
    QueueOrReviewed {
        statuses: &'static [ProposalStatus],
        slot: ReviewerSlot,
        user_id: String,
    },
}

const BKMD_QUEUE: &[ProposalStatus] = &[ProposalStatus::Submitted, ProposalStatus::BkmdReview];
const DIRECTOR_QUEUE: &[ProposalStatus] = &[
    ProposalStatus::DirectorReview,
    ProposalStatus::DirectorApproved,
    ProposalStatus::DirectorRejected,
];

impl VisibilityScope {
    /// Roles without a review queue see only what they submitted.
    pub fn for_actor(actor: &Actor) -> Self {
        match actor.role {
            Role::Admin | Role::SysAdmin => VisibilityScope::Unrestricted,
            Role::Bkmd => VisibilityScope::QueueOrReviewed {
                statuses: BKMD_QUEUE,
                slot: ReviewerSlot::Bkmd,
                user_id: actor.user_id.clone(),
            },
            Role::Director => VisibilityScope::QueueOrReviewed {
                statuses: DIRECTOR_QUEUE,
                slot: ReviewerSlot::Director,
                user_id: actor.user_id.clone(),
            },
            Role::Employee
            | Role::ProjectHead
            | Role::Supervisor
            | Role::ExternalOwner
            | Role::RcMember => VisibilityScope::SubmittedBy(actor.user_id.clone()),
        }
    }

    pub fn permits(&self, proposal: &Proposal) -> bool {
        match self {
            VisibilityScope::Unrestricted => true,
            VisibilityScope::SubmittedBy(user_id) => &proposal.submitted_by_id == user_id,
            VisibilityScope::QueueOrReviewed {
                statuses,
                slot,
                user_id,
            } => {
                let reviewer = match slot {
                    ReviewerSlot::Bkmd => proposal.bkmd_reviewer_id.as_ref(),
                    ReviewerSlot::Director => proposal.director_reviewer_id.as_ref(),
                };
                statuses.contains(&proposal.status) || reviewer == Some(user_id)
            }
        }
    }
}
