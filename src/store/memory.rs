//! In-memory `ProposalStore`.
//!
//! All state sits behind one `RwLock`; every conditional write and the whole
//! conversion sequence run under the write guard, which gives the same
//! atomicity the Postgres backend gets from row and advisory locks.

use async_trait::async_trait;
use portal_types::ProposalStatus;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ProposalQuery, ProposalStore};
use crate::error::StoreError;
use crate::models::{
    Project, ProjectDraft, Proposal, ProposalFields, SpecialArea, StatusChange, Vertical,
};
use crate::taxonomy;
use crate::workflow::codes::{next_project_code, CodePrefix};

#[derive(Default)]
struct MemoryState {
    proposals: HashMap<Uuid, Proposal>,
    projects: HashMap<Uuid, Project>,
    verticals: BTreeMap<String, Vertical>,
    special_areas: BTreeMap<String, SpecialArea>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_taxonomy(verticals: Vec<Vertical>, special_areas: Vec<SpecialArea>) -> Self {
        let state = MemoryState {
            verticals: verticals.into_iter().map(|v| (v.id.clone(), v)).collect(),
            special_areas: special_areas
                .into_iter()
                .map(|a| (a.id.clone(), a))
                .collect(),
            ..Default::default()
        };
        Self {
            state: RwLock::new(state),
        }
    }

    /// Store seeded with the institutional taxonomy.
    pub fn seeded() -> Self {
        Self::with_taxonomy(
            taxonomy::default_verticals(),
            taxonomy::default_special_areas(),
        )
    }

    /// Insert a project directly, bypassing conversion. Used to load
    /// pre-existing projects.
    pub async fn insert_project(&self, project: Project) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.projects.values().any(|p| p.code == project.code) {
            return Err(StoreError::DuplicateCode(project.code));
        }
        state.projects.insert(project.id, project);
        Ok(())
    }

    pub async fn remove_project(&self, id: Uuid) -> Option<Project> {
        self.state.write().await.projects.remove(&id)
    }

    pub async fn project_codes(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut codes: Vec<_> = state.projects.values().map(|p| p.code.clone()).collect();
        codes.sort();
        codes
    }
}

fn check_status(
    proposal: &Proposal,
    allowed_from: &[ProposalStatus],
) -> Result<(), StoreError> {
    if allowed_from.contains(&proposal.status) {
        Ok(())
    } else {
        Err(StoreError::StatusConflict {
            expected: allowed_from.to_vec(),
            actual: proposal.status,
        })
    }
}

#[async_trait]
impl ProposalStore for MemoryStore {
    async fn find_vertical(&self, id: &str) -> Result<Option<Vertical>, StoreError> {
        Ok(self.state.read().await.verticals.get(id).cloned())
    }

    async fn find_special_area(&self, id: &str) -> Result<Option<SpecialArea>, StoreError> {
        Ok(self.state.read().await.special_areas.get(id).cloned())
    }

    async fn list_verticals(&self) -> Result<Vec<Vertical>, StoreError> {
        Ok(self.state.read().await.verticals.values().cloned().collect())
    }

    async fn list_special_areas(&self) -> Result<Vec<SpecialArea>, StoreError> {
        Ok(self
            .state
            .read()
            .await
            .special_areas
            .values()
            .cloned()
            .collect())
    }

    async fn insert_proposal(&self, proposal: &Proposal) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .proposals
            .insert(proposal.id, proposal.clone());
        Ok(())
    }

    async fn load_proposal(&self, id: Uuid) -> Result<Option<Proposal>, StoreError> {
        Ok(self.state.read().await.proposals.get(&id).cloned())
    }

    async fn list_proposals(&self, query: &ProposalQuery) -> Result<Vec<Proposal>, StoreError> {
        let state = self.state.read().await;
        let mut proposals: Vec<_> = state
            .proposals
            .values()
            .filter(|p| query.matches(p))
            .cloned()
            .collect();
        proposals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(proposals)
    }

    async fn list_by_status(
        &self,
        statuses: &[ProposalStatus],
    ) -> Result<Vec<Proposal>, StoreError> {
        let state = self.state.read().await;
        let mut proposals: Vec<_> = state
            .proposals
            .values()
            .filter(|p| statuses.contains(&p.status))
            .cloned()
            .collect();
        proposals.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(proposals)
    }

    async fn update_draft(
        &self,
        id: Uuid,
        fields: &ProposalFields,
    ) -> Result<Proposal, StoreError> {
        let mut state = self.state.write().await;
        let proposal = state.proposals.get_mut(&id).ok_or(StoreError::NotFound)?;
        check_status(proposal, &[ProposalStatus::Draft])?;
        proposal.apply_fields(fields.clone());
        Ok(proposal.clone())
    }

    async fn apply_transition(
        &self,
        id: Uuid,
        allowed_from: &[ProposalStatus],
        change: &StatusChange,
    ) -> Result<Proposal, StoreError> {
        let mut state = self.state.write().await;
        let proposal = state.proposals.get_mut(&id).ok_or(StoreError::NotFound)?;
        check_status(proposal, allowed_from)?;
        change.apply(proposal);
        Ok(proposal.clone())
    }

    async fn delete_proposal(
        &self,
        id: Uuid,
        allowed_from: Option<&[ProposalStatus]>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let proposal = state.proposals.get(&id).ok_or(StoreError::NotFound)?;
        if let Some(allowed) = allowed_from {
            check_status(proposal, allowed)?;
        }
        state.proposals.remove(&id);
        Ok(())
    }

    async fn convert(
        &self,
        id: Uuid,
        draft: ProjectDraft,
        prefix: &CodePrefix,
    ) -> Result<(Proposal, Project), StoreError> {
        let mut state = self.state.write().await;
        let current = state.proposals.get(&id).ok_or(StoreError::NotFound)?;
        check_status(current, &[ProposalStatus::RcApproved])?;

        let code = next_project_code(prefix, state.projects.values().map(|p| p.code.as_str()));
        if state.projects.values().any(|p| p.code == code) {
            return Err(StoreError::DuplicateCode(code));
        }
        let project = draft.into_project(code);

        let proposal = state.proposals.get_mut(&id).ok_or(StoreError::NotFound)?;
        proposal.status = ProposalStatus::Converted;
        proposal.converted_project_id = Some(project.id);
        proposal.updated_at = project.created_at;
        let proposal = proposal.clone();

        state.projects.insert(project.id, project.clone());
        Ok((proposal, project))
    }

    async fn load_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        Ok(self.state.read().await.projects.get(&id).cloned())
    }
}
