//! Error types for the research portal
//!
//! `PortalError` is the taxonomy every workflow operation reports. Business
//! rule violations are raised before any write; `Unexpected` wraps storage or
//! infrastructure failures and is never shown to callers verbatim.

use portal_types::ProposalStatus;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for workflow and authorization operations
#[derive(Error, Debug)]
pub enum PortalError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    #[error("{entity} not found")]
    NotFound { entity: &'static str, id: String },

    /// Role or ownership mismatch
    #[error("{0}")]
    Forbidden(String),

    /// Action is illegal for the proposal's current status
    #[error("{message}")]
    InvalidState {
        message: String,
        current: ProposalStatus,
    },

    /// Another request moved the record first
    #[error("{0}")]
    Conflict(String),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Unexpected error: {0}")]
    Unexpected(#[source] anyhow::Error),
}

impl PortalError {
    pub fn proposal_not_found(id: Uuid) -> Self {
        PortalError::NotFound {
            entity: "Proposal",
            id: id.to_string(),
        }
    }

    pub fn invalid_state(message: impl Into<String>, current: ProposalStatus) -> Self {
        PortalError::InvalidState {
            message: message.into(),
            current,
        }
    }

    /// Message that is safe to return to an HTTP caller.
    pub fn public_message(&self) -> String {
        match self {
            PortalError::Unexpected(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Errors raised by a `ProposalStore` backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    /// Compare-and-swap on status failed
    #[error("proposal status is {actual}, expected one of {expected:?}")]
    StatusConflict {
        expected: Vec<ProposalStatus>,
        actual: ProposalStatus,
    },

    #[error("project code {0} already assigned")]
    DuplicateCode(String),

    #[error("storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

#[cfg(feature = "database")]
impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Backend(other.into()),
        }
    }
}

impl From<StoreError> for PortalError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => PortalError::NotFound {
                entity: "Record",
                id: String::new(),
            },
            StoreError::StatusConflict { actual, .. } => PortalError::Conflict(format!(
                "Proposal was modified concurrently and is now {}",
                actual
            )),
            StoreError::DuplicateCode(code) => {
                PortalError::Conflict(format!("Project code {} was assigned concurrently", code))
            }
            StoreError::Backend(e) => PortalError::Unexpected(e),
        }
    }
}

pub type PortalResult<T> = Result<T, PortalError>;
