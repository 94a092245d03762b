//! Proposal approval workflow
//!
//! - `transitions`: the fixed status table
//! - `codes`: project code sequencing
//! - `engine`: orchestration over a `ProposalStore`

pub mod codes;
pub mod engine;
pub mod transitions;

pub use codes::{next_project_code, CodePrefix};
pub use engine::{
    capabilities, parse_decision, ConversionOutcome, ProposalCapability, ProposalFilter,
    ProposalWorkflow, TransitionOutcome, PENDING_RC,
};
pub use transitions::{next_status, ProposalAction, WorkflowStep};
