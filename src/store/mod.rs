//! Persistence for proposals, projects and the reference taxonomy.
//!
//! The workflow engine operates exclusively through `ProposalStore`, so the
//! same invariants hold for the in-memory backend (tests, local runs) and the
//! Postgres backend (production).
//!
//! Every mutating method is a conditional write: it takes the set of statuses
//! the caller observed as legal and fails with `StoreError::StatusConflict`
//! instead of overwriting a record another request already moved.

use async_trait::async_trait;
use portal_types::{ProjectCategory, ProposalStatus};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Project, ProjectDraft, Proposal, ProposalFields, SpecialArea, StatusChange, Vertical,
};
use crate::rbac::VisibilityScope;
use crate::workflow::codes::CodePrefix;

pub mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "database")]
pub use postgres::PgProposalStore;

/// Listing criteria. `scope` always applies; the other filters only narrow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalQuery {
    pub scope: VisibilityScope,
    pub status: Option<ProposalStatus>,
    pub category: Option<ProjectCategory>,
}

impl ProposalQuery {
    pub fn matches(&self, proposal: &Proposal) -> bool {
        self.scope.permits(proposal)
            && self.status.map_or(true, |s| proposal.status == s)
            && self.category.map_or(true, |c| proposal.category == c)
    }
}

#[async_trait]
pub trait ProposalStore: Send + Sync {
    // ── Taxonomy ──

    async fn find_vertical(&self, id: &str) -> Result<Option<Vertical>, StoreError>;
    async fn find_special_area(&self, id: &str) -> Result<Option<SpecialArea>, StoreError>;
    async fn list_verticals(&self) -> Result<Vec<Vertical>, StoreError>;
    async fn list_special_areas(&self) -> Result<Vec<SpecialArea>, StoreError>;

    // ── Proposals ──

    async fn insert_proposal(&self, proposal: &Proposal) -> Result<(), StoreError>;
    async fn load_proposal(&self, id: Uuid) -> Result<Option<Proposal>, StoreError>;

    /// Newest first by creation time.
    async fn list_proposals(&self, query: &ProposalQuery) -> Result<Vec<Proposal>, StoreError>;

    /// Newest first by last update.
    async fn list_by_status(
        &self,
        statuses: &[ProposalStatus],
    ) -> Result<Vec<Proposal>, StoreError>;

    /// Replace editable fields only while the proposal is still `DRAFT`.
    async fn update_draft(&self, id: Uuid, fields: &ProposalFields)
        -> Result<Proposal, StoreError>;

    /// Apply `change` only if the current status is in `allowed_from`.
    async fn apply_transition(
        &self,
        id: Uuid,
        allowed_from: &[ProposalStatus],
        change: &StatusChange,
    ) -> Result<Proposal, StoreError>;

    /// Delete, optionally only if the current status is in `allowed_from`.
    async fn delete_proposal(
        &self,
        id: Uuid,
        allowed_from: Option<&[ProposalStatus]>,
    ) -> Result<(), StoreError>;

    // ── Conversion ──

    /// Atomically: assign the next code for `prefix`, create the project and
    /// mark the proposal `CONVERTED` with a link to it. Serialized per prefix;
    /// fails with `StatusConflict` if the proposal is no longer `RC_APPROVED`.
    async fn convert(
        &self,
        id: Uuid,
        draft: ProjectDraft,
        prefix: &CodePrefix,
    ) -> Result<(Proposal, Project), StoreError>;

    async fn load_project(&self, id: Uuid) -> Result<Option<Project>, StoreError>;
}
