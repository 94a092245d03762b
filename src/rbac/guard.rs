//! Presentation-boundary guards.
//!
//! Advisory only: these decide what a client view renders, never what the
//! server will do. Denials always produce a visible outcome (redirect or
//! fallback) unless the caller explicitly disables redirects.

use portal_types::{Action, Resource, Role};
use serde::Serialize;

use super::matrix;

/// Fixed destination for denied views.
pub const ACCESS_DENIED_PATH: &str = "/access-denied";

/// What the view layer should render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GuardOutcome {
    /// Render the protected content
    Allow,
    /// Render the caller-supplied fallback
    Fallback,
    /// Navigate to `to`, replacing the current history entry
    Redirect { to: &'static str },
    /// Render nothing
    Hide,
}

/// What a guard checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardRequirement {
    /// Page access AND the action on the same resource
    Resource { resource: Resource, action: Action },
    /// Page access only
    Page(Resource),
    /// Role membership
    Roles(Vec<Role>),
    /// ADMIN exactly
    AdminOnly,
    Unrestricted,
}

/// A configured guard for one view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewGuard {
    pub requirement: GuardRequirement,
    pub has_fallback: bool,
    pub redirect_on_denied: bool,
}

impl ViewGuard {
    /// Resource guard with `read` as the action.
    pub fn resource(resource: Resource) -> Self {
        Self::resource_action(resource, Action::Read)
    }

    pub fn resource_action(resource: Resource, action: Action) -> Self {
        Self {
            requirement: GuardRequirement::Resource { resource, action },
            has_fallback: false,
            redirect_on_denied: true,
        }
    }

    pub fn page(resource: Resource) -> Self {
        Self {
            requirement: GuardRequirement::Page(resource),
            has_fallback: false,
            redirect_on_denied: true,
        }
    }

    /// An empty role list places no restriction.
    pub fn roles(roles: &[Role]) -> Self {
        let requirement = if roles.is_empty() {
            GuardRequirement::Unrestricted
        } else {
            GuardRequirement::Roles(roles.to_vec())
        };
        Self {
            requirement,
            has_fallback: false,
            redirect_on_denied: true,
        }
    }

    /// Admin-only content hides itself instead of redirecting.
    pub fn admin_only() -> Self {
        Self {
            requirement: GuardRequirement::AdminOnly,
            has_fallback: false,
            redirect_on_denied: false,
        }
    }

    pub fn unrestricted() -> Self {
        Self {
            requirement: GuardRequirement::Unrestricted,
            has_fallback: false,
            redirect_on_denied: true,
        }
    }

    pub fn with_fallback(mut self) -> Self {
        self.has_fallback = true;
        self
    }

    pub fn without_redirect(mut self) -> Self {
        self.redirect_on_denied = false;
        self
    }

    pub fn is_authorized(&self, role: Option<Role>) -> bool {
        match &self.requirement {
            GuardRequirement::Resource { resource, action } => {
                matrix::can_access_page(role, *resource)
                    && matrix::has_permission(role, *resource, *action)
            }
            GuardRequirement::Page(resource) => matrix::can_access_page(role, *resource),
            GuardRequirement::Roles(roles) => matrix::has_role(role, roles),
            GuardRequirement::AdminOnly => matrix::is_admin(role),
            GuardRequirement::Unrestricted => true,
        }
    }

    pub fn evaluate(&self, role: Option<Role>) -> GuardOutcome {
        if self.is_authorized(role) {
            GuardOutcome::Allow
        } else if self.has_fallback {
            GuardOutcome::Fallback
        } else if self.redirect_on_denied {
            GuardOutcome::Redirect {
                to: ACCESS_DENIED_PATH,
            }
        } else {
            GuardOutcome::Hide
        }
    }
}

/// Guard for a portal UI path. Unknown paths are unrestricted here; the
/// client router sends them to the dashboard, which is itself guarded.
pub fn route_guard(path: &str) -> ViewGuard {
    let first = path.trim_start_matches('/').split('/').next().unwrap_or("");
    match first {
        "dg-dashboard" | "users" => ViewGuard::roles(&[Role::Admin, Role::Director]),
        "bulk-import" => ViewGuard::roles(&[Role::Admin, Role::Director, Role::Supervisor]),
        "proposals" | "access-denied" | "" => ViewGuard::unrestricted(),
        other => match other.parse::<Resource>() {
            Ok(resource) => ViewGuard::page(resource),
            Err(_) => ViewGuard::unrestricted(),
        },
    }
}
