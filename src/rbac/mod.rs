//! Role-based access control
//!
//! - `matrix`: static role → resource → actions and role → pages tables
//! - `guard`: advisory checks at the presentation boundary
//! - `policy`: authoritative server-side checks used by the workflow engine
//!   and the data-access layer
//!
//! Keep `guard` and `policy` separate. The presentation layer is not a trust
//! boundary.

pub mod guard;
pub mod matrix;
pub mod policy;

pub use guard::{route_guard, GuardOutcome, ViewGuard, ACCESS_DENIED_PATH};
pub use matrix::{
    accessible_pages, can_access_page, has_permission, has_role, is_admin, permissions_for,
};
pub use policy::{ActorRequirement, VisibilityScope};
