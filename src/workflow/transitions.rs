//! Proposal transition table.
//!
//! Pure state legality: which statuses each step may leave from and which
//! status each action produces. Who may act lives in `rbac::policy`.

use portal_types::{BkmdDecision, ProposalStatus, Verdict};
use serde::Serialize;

/// A kind of workflow step, independent of its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowStep {
    Submit,
    BkmdReview,
    DirectorReview,
    RcReview,
    ConvertToProject,
}

impl WorkflowStep {
    pub const ALL: &'static [WorkflowStep] = &[
        WorkflowStep::Submit,
        WorkflowStep::BkmdReview,
        WorkflowStep::DirectorReview,
        WorkflowStep::RcReview,
        WorkflowStep::ConvertToProject,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            WorkflowStep::Submit => "submit",
            WorkflowStep::BkmdReview => "bkmd-review",
            WorkflowStep::DirectorReview => "director-review",
            WorkflowStep::RcReview => "rc-review",
            WorkflowStep::ConvertToProject => "convert-to-project",
        }
    }

    pub fn allowed_from(&self) -> &'static [ProposalStatus] {
        match self {
            WorkflowStep::Submit => &[ProposalStatus::Draft],
            WorkflowStep::BkmdReview => &[ProposalStatus::Submitted, ProposalStatus::BkmdReview],
            WorkflowStep::DirectorReview => &[ProposalStatus::DirectorReview],
            WorkflowStep::RcReview => &[ProposalStatus::DirectorApproved, ProposalStatus::RcPending],
            WorkflowStep::ConvertToProject => &[ProposalStatus::RcApproved],
        }
    }

    pub fn is_legal_from(&self, status: ProposalStatus) -> bool {
        self.allowed_from().contains(&status)
    }

    /// Message reported when the step is attempted from the wrong status.
    pub fn invalid_state_message(&self) -> &'static str {
        match self {
            WorkflowStep::Submit => "Only draft proposals can be submitted",
            WorkflowStep::BkmdReview => "Proposal is not pending BKMD review",
            WorkflowStep::DirectorReview => "Proposal is not pending Director review",
            WorkflowStep::RcReview => "Proposal is not pending RC review",
            WorkflowStep::ConvertToProject => {
                "Only RC-approved proposals can be converted to projects"
            }
        }
    }
}

/// A fully specified workflow action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProposalAction {
    Submit,
    BkmdReview(BkmdDecision),
    DirectorReview(Verdict),
    RcReview(Verdict),
    ConvertToProject,
}

impl ProposalAction {
    pub const ALL: &'static [ProposalAction] = &[
        ProposalAction::Submit,
        ProposalAction::BkmdReview(BkmdDecision::Forward),
        ProposalAction::BkmdReview(BkmdDecision::Return),
        ProposalAction::DirectorReview(Verdict::Approve),
        ProposalAction::DirectorReview(Verdict::Reject),
        ProposalAction::RcReview(Verdict::Approve),
        ProposalAction::RcReview(Verdict::Reject),
        ProposalAction::ConvertToProject,
    ];

    pub fn step(&self) -> WorkflowStep {
        match self {
            ProposalAction::Submit => WorkflowStep::Submit,
            ProposalAction::BkmdReview(_) => WorkflowStep::BkmdReview,
            ProposalAction::DirectorReview(_) => WorkflowStep::DirectorReview,
            ProposalAction::RcReview(_) => WorkflowStep::RcReview,
            ProposalAction::ConvertToProject => WorkflowStep::ConvertToProject,
        }
    }

    pub fn target(&self) -> ProposalStatus {
        match self {
            ProposalAction::Submit => ProposalStatus::Submitted,
            ProposalAction::BkmdReview(BkmdDecision::Forward) => ProposalStatus::DirectorReview,
            ProposalAction::BkmdReview(BkmdDecision::Return) => ProposalStatus::Draft,
            ProposalAction::DirectorReview(Verdict::Approve) => ProposalStatus::DirectorApproved,
            ProposalAction::DirectorReview(Verdict::Reject) => ProposalStatus::DirectorRejected,
            ProposalAction::RcReview(Verdict::Approve) => ProposalStatus::RcApproved,
            ProposalAction::RcReview(Verdict::Reject) => ProposalStatus::RcRejected,
            ProposalAction::ConvertToProject => ProposalStatus::Converted,
        }
    }

    /// Success message returned to the caller.
    pub fn message(&self) -> &'static str {
        match self {
            ProposalAction::Submit => "Proposal submitted for BKMD review",
            ProposalAction::BkmdReview(BkmdDecision::Forward) => {
                "Proposal forwarded to Director for review"
            }
            ProposalAction::BkmdReview(BkmdDecision::Return) => {
                "Proposal returned to submitter for revision"
            }
            ProposalAction::DirectorReview(Verdict::Approve) => {
                "Proposal approved by Director - pending RC approval"
            }
            ProposalAction::DirectorReview(Verdict::Reject) => "Proposal rejected by Director",
            ProposalAction::RcReview(Verdict::Approve) => "Proposal approved by Research Council",
            ProposalAction::RcReview(Verdict::Reject) => "Proposal rejected by Research Council",
            ProposalAction::ConvertToProject => "Proposal converted to project",
        }
    }
}

/// The status `action` produces from `current`, or `None` if illegal.
pub fn next_status(current: ProposalStatus, action: ProposalAction) -> Option<ProposalStatus> {
    if action.step().is_legal_from(current) {
        Some(action.target())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_happy_path() {
        let path = [
            ProposalAction::Submit,
            ProposalAction::BkmdReview(BkmdDecision::Forward),
            ProposalAction::DirectorReview(Verdict::Approve),
            ProposalAction::RcReview(Verdict::Approve),
            ProposalAction::ConvertToProject,
        ];
        let mut status = ProposalStatus::Draft;
        for action in path {
            status = next_status(status, action).unwrap();
        }
        assert_eq!(status, ProposalStatus::Converted);
    }

    #[test]
    fn test_bkmd_return_goes_to_draft() {
        assert_eq!(
            next_status(
                ProposalStatus::BkmdReview,
                ProposalAction::BkmdReview(BkmdDecision::Return)
            ),
            Some(ProposalStatus::Draft)
        );
    }

    #[test]
    fn test_submit_twice_illegal() {
        assert_eq!(
            next_status(ProposalStatus::Submitted, ProposalAction::Submit),
            None
        );
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for status in ProposalStatus::ALL.iter().filter(|s| s.is_terminal()) {
            for action in ProposalAction::ALL {
                assert_eq!(next_status(*status, *action), None, "{} {:?}", status, action);
            }
        }
    }

    #[test]
    fn test_transition_table_size() {
        // 8 rows, two of which fan in from two states
        let legal: usize = ProposalStatus::ALL
            .iter()
            .map(|s| {
                ProposalAction::ALL
                    .iter()
                    .filter(|a| next_status(*s, **a).is_some())
                    .count()
            })
            .sum();
        assert_eq!(legal, 12);
    }

    fn any_status() -> impl Strategy<Value = ProposalStatus> {
        prop::sample::select(ProposalStatus::ALL.to_vec())
    }

    fn any_action() -> impl Strategy<Value = ProposalAction> {
        prop::sample::select(ProposalAction::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_transitions_stay_in_table(
            start in any_status(),
            actions in prop::collection::vec(any_action(), 0..20),
        ) {
            let mut status = start;
            for action in actions {
                if let Some(next) = next_status(status, action) {
                    prop_assert!(action.step().allowed_from().contains(&status));
                    prop_assert_eq!(next, action.target());
                    prop_assert!(ProposalStatus::ALL.contains(&next));
                    status = next;
                }
            }
        }
    }
}
