//! Research Portal - proposal approval workflow
//!
//! This crate implements the governance core of the institutional research
//! portal: the proposal state machine, project code generation and the
//! role-based access control layer that gates both.
//!
//! ## Architecture
//! Every mutation flows through the workflow engine:
//! HTTP / caller -> ProposalWorkflow -> rbac::policy -> ProposalStore (conditional write)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use research_portal::{models::{Actor, ProposalInput}, store::MemoryStore, workflow::ProposalWorkflow};
//! use portal_types::Role;
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), research_portal::PortalError> {
//! let workflow = ProposalWorkflow::new(Arc::new(MemoryStore::seeded()));
//! let scientist = Actor::new("u1", Role::Employee);
//! let proposal = workflow
//!     .create_proposal(&scientist, ProposalInput {
//!         title: Some("Bridge monitoring".into()),
//!         category: Some("GAP".into()),
//!         vertical_id: Some("SHMLE".into()),
//!         proposed_start_date: Some("2025-01-01".into()),
//!         proposed_end_date: Some("2026-01-01".into()),
//!         ..Default::default()
//!     })
//!     .await?;
//! workflow.submit(proposal.id, &scientist).await?;
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Environment configuration
pub mod config;

// Entities and reference data
pub mod models;
pub mod taxonomy;

// Authorization: static tables, presentation guards, server-side policy
pub mod rbac;

// Proposal state machine and project code generation
pub mod workflow;

// Persistence (memory always, Postgres when enabled)
pub mod store;

// REST API (when enabled)
#[cfg(feature = "server")]
pub mod api;

pub use config::{DatabaseConfig, PortalConfig};
pub use error::{PortalError, PortalResult, StoreError};
pub use models::{Actor, Project, Proposal, ProposalInput};
pub use store::{MemoryStore, ProposalStore};
pub use workflow::{ProposalAction, ProposalWorkflow, WorkflowStep};

#[cfg(feature = "database")]
pub use store::PgProposalStore;

#[cfg(feature = "server")]
pub use api::{create_portal_router, PortalState};

// Foundation types
pub use portal_types::{Action, ProjectCategory, ProposalStatus, Resource, Role};
