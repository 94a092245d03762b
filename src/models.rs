//! Portal entity models
//!
//! Wire format is camelCase JSON. Proposed dates are calendar dates
//! (`NaiveDate`), so a `2025-01-01` start date never drifts across time zones.

use chrono::{DateTime, NaiveDate, Utc};
use portal_types::{ProjectCategory, ProjectStatus, ProposalStatus, Role};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Authenticated caller. Produced by the authentication collaborator; the
/// role is the only input to authorization decisions besides the user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}

/// A project proposal moving through the approval workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: ProjectCategory,
    pub vertical_id: String,
    pub special_area_id: Option<String>,
    pub submitted_by_id: String,
    pub objectives: Option<String>,
    pub methodology: Option<String>,
    pub expected_outcome: Option<String>,
    pub proposed_start_date: NaiveDate,
    pub proposed_end_date: NaiveDate,
    pub estimated_budget: Option<Decimal>,
    pub status: ProposalStatus,

    pub bkmd_reviewer_id: Option<String>,
    pub bkmd_reviewed_at: Option<DateTime<Utc>>,
    pub bkmd_comments: Option<String>,

    pub director_reviewer_id: Option<String>,
    pub director_reviewed_at: Option<DateTime<Utc>>,
    pub director_comments: Option<String>,

    pub rc_meeting_id: Option<String>,
    pub rc_comments: Option<String>,

    pub converted_project_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Proposal {
    /// Build a fresh `DRAFT` proposal owned by `submitted_by_id`.
    pub fn draft(fields: ProposalFields, submitted_by_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: fields.title,
            description: fields.description,
            category: fields.category,
            vertical_id: fields.vertical_id,
            special_area_id: fields.special_area_id,
            submitted_by_id: submitted_by_id.into(),
            objectives: fields.objectives,
            methodology: fields.methodology,
            expected_outcome: fields.expected_outcome,
            proposed_start_date: fields.proposed_start_date,
            proposed_end_date: fields.proposed_end_date,
            estimated_budget: fields.estimated_budget,
            status: ProposalStatus::Draft,
            bkmd_reviewer_id: None,
            bkmd_reviewed_at: None,
            bkmd_comments: None,
            director_reviewer_id: None,
            director_reviewed_at: None,
            director_comments: None,
            rc_meeting_id: None,
            rc_comments: None,
            converted_project_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_submitted_by(&self, actor: &Actor) -> bool {
        self.submitted_by_id == actor.user_id
    }

    /// Replace the editable fields. Status and review fields are untouched.
    pub fn apply_fields(&mut self, fields: ProposalFields) {
        self.title = fields.title;
        self.description = fields.description;
        self.category = fields.category;
        self.vertical_id = fields.vertical_id;
        self.special_area_id = fields.special_area_id;
        self.objectives = fields.objectives;
        self.methodology = fields.methodology;
        self.expected_outcome = fields.expected_outcome;
        self.proposed_start_date = fields.proposed_start_date;
        self.proposed_end_date = fields.proposed_end_date;
        self.estimated_budget = fields.estimated_budget;
        self.updated_at = Utc::now();
    }

    pub fn fields(&self) -> ProposalFields {
        ProposalFields {
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category,
            vertical_id: self.vertical_id.clone(),
            special_area_id: self.special_area_id.clone(),
            objectives: self.objectives.clone(),
            methodology: self.methodology.clone(),
            expected_outcome: self.expected_outcome.clone(),
            proposed_start_date: self.proposed_start_date,
            proposed_end_date: self.proposed_end_date,
            estimated_budget: self.estimated_budget,
        }
    }
}

/// Validated, submitter-editable proposal content.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalFields {
    pub title: String,
    pub description: Option<String>,
    pub category: ProjectCategory,
    pub vertical_id: String,
    pub special_area_id: Option<String>,
    pub objectives: Option<String>,
    pub methodology: Option<String>,
    pub expected_outcome: Option<String>,
    pub proposed_start_date: NaiveDate,
    pub proposed_end_date: NaiveDate,
    pub estimated_budget: Option<Decimal>,
}

/// Raw create/update body. Every field is optional on the wire; the workflow
/// engine decides which are required and reports `Validation` errors.
///
/// Optional text fields are tri-state: absent keeps the current value,
/// `null` clears it, a string replaces it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalInput {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub category: Option<String>,
    pub vertical_id: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub special_area_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub objectives: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub methodology: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub expected_outcome: Option<Option<String>>,
    pub proposed_start_date: Option<String>,
    pub proposed_end_date: Option<String>,
    pub estimated_budget: Option<Decimal>,
}

/// `null` becomes `Some(None)`; an absent field stays `None` via `default`.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A tracked project, created only by converting an `RC_APPROVED` proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub category: ProjectCategory,
    pub vertical_id: String,
    pub special_area_id: Option<String>,
    pub project_head_id: String,
    pub objectives: Option<String>,
    pub methodology: Option<String>,
    pub expected_outcome: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
}

/// Project content minus the code, which is assigned inside the store's
/// per-prefix critical section.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: ProjectCategory,
    pub vertical_id: String,
    pub special_area_id: Option<String>,
    pub project_head_id: String,
    pub objectives: Option<String>,
    pub methodology: Option<String>,
    pub expected_outcome: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ProjectDraft {
    pub fn from_proposal(proposal: &Proposal) -> Self {
        Self {
            title: proposal.title.clone(),
            description: proposal.description.clone(),
            category: proposal.category,
            vertical_id: proposal.vertical_id.clone(),
            special_area_id: proposal.special_area_id.clone(),
            project_head_id: proposal.submitted_by_id.clone(),
            objectives: proposal.objectives.clone(),
            methodology: proposal.methodology.clone(),
            expected_outcome: proposal.expected_outcome.clone(),
            start_date: proposal.proposed_start_date,
            end_date: proposal.proposed_end_date,
        }
    }

    pub fn into_project(self, code: String) -> Project {
        Project {
            id: Uuid::new_v4(),
            code,
            title: self.title,
            description: self.description,
            category: self.category,
            vertical_id: self.vertical_id,
            special_area_id: self.special_area_id,
            project_head_id: self.project_head_id,
            objectives: self.objectives,
            methodology: self.methodology,
            expected_outcome: self.expected_outcome,
            start_date: self.start_date,
            end_date: self.end_date,
            status: ProjectStatus::Active,
            created_at: Utc::now(),
        }
    }
}

/// Research thrust area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vertical {
    pub id: String,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
}

/// Optional sub-area of a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialArea {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
}

/// Fields written by a reviewing transition alongside the new status.
/// Reviewer fields are only ever set, never cleared; a review without
/// comments keeps the comments of an earlier review in the same slot.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewStamp {
    None,
    Bkmd {
        reviewer_id: String,
        reviewed_at: DateTime<Utc>,
        comments: Option<String>,
    },
    Director {
        reviewer_id: String,
        reviewed_at: DateTime<Utc>,
        comments: Option<String>,
    },
    Council {
        meeting_id: Option<String>,
        comments: Option<String>,
    },
}

/// A status change plus its side-effect fields, applied by the store as one
/// conditional write.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub to: ProposalStatus,
    pub stamp: ReviewStamp,
}

impl StatusChange {
    /// Apply to an in-memory record.
    pub fn apply(&self, proposal: &mut Proposal) {
        proposal.status = self.to;
        match &self.stamp {
            ReviewStamp::None => {}
            ReviewStamp::Bkmd {
                reviewer_id,
                reviewed_at,
                comments,
            } => {
                proposal.bkmd_reviewer_id = Some(reviewer_id.clone());
                proposal.bkmd_reviewed_at = Some(*reviewed_at);
                if comments.is_some() {
                    proposal.bkmd_comments = comments.clone();
                }
            }
            ReviewStamp::Director {
                reviewer_id,
                reviewed_at,
                comments,
            } => {
                proposal.director_reviewer_id = Some(reviewer_id.clone());
                proposal.director_reviewed_at = Some(*reviewed_at);
                if comments.is_some() {
                    proposal.director_comments = comments.clone();
                }
            }
            ReviewStamp::Council {
                meeting_id,
                comments,
            } => {
                proposal.rc_meeting_id = meeting_id.clone();
                proposal.rc_comments = comments.clone();
            }
        }
        proposal.updated_at = Utc::now();
    }
}
