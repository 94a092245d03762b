//! Portal Types - Level 1 Foundation Types
//!
//! Closed vocabularies shared by the workflow engine, the RBAC layer, the
//! storage backends and the HTTP surface. Every value that crosses a process
//! boundary as a string (roles, statuses, categories, resources, actions) is
//! parsed into one of these enums at the edge, so that every lookup inside the
//! portal is an exhaustive `match`.
//!
//! ## Critical Rules
//!
//! 1. **NO BUSINESS LOGIC** - transition rules and permission tables live in
//!    `research-portal`, not here
//! 2. **NO WORKSPACE DEPENDENCIES**
//! 3. **SERIALIZABLE** - wire names are the `as_str` spellings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a wire string does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Generates `ALL`, `as_str`, `Display` and `FromStr` for a closed enum whose
/// serde names match the listed wire spellings.
macro_rules! wire_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(ParseEnumError {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

// ============================================================================
// ROLES
// ============================================================================

/// The single role held by a portal user. Issued by the authentication
/// service and never overridden per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Director,
    Supervisor,
    ProjectHead,
    Employee,
    /// First-stage institutional reviewer
    Bkmd,
    ExternalOwner,
    SysAdmin,
    /// Research Council member
    RcMember,
}

wire_enum!(Role, "role", {
    Admin => "ADMIN",
    Director => "DIRECTOR",
    Supervisor => "SUPERVISOR",
    ProjectHead => "PROJECT_HEAD",
    Employee => "EMPLOYEE",
    Bkmd => "BKMD",
    ExternalOwner => "EXTERNAL_OWNER",
    SysAdmin => "SYS_ADMIN",
    RcMember => "RC_MEMBER",
});

impl Role {
    /// ADMIN or SYS_ADMIN
    pub fn is_administrator(&self) -> bool {
        matches!(self, Role::Admin | Role::SysAdmin)
    }
}

// ============================================================================
// PROPOSAL LIFECYCLE
// ============================================================================

/// Proposal lifecycle status, in workflow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Draft,
    Submitted,
    BkmdReview,
    DirectorReview,
    DirectorApproved,
    DirectorRejected,
    RcPending,
    RcApproved,
    RcRejected,
    Converted,
}

wire_enum!(ProposalStatus, "proposal status", {
    Draft => "DRAFT",
    Submitted => "SUBMITTED",
    BkmdReview => "BKMD_REVIEW",
    DirectorReview => "DIRECTOR_REVIEW",
    DirectorApproved => "DIRECTOR_APPROVED",
    DirectorRejected => "DIRECTOR_REJECTED",
    RcPending => "RC_PENDING",
    RcApproved => "RC_APPROVED",
    RcRejected => "RC_REJECTED",
    Converted => "CONVERTED",
});

impl ProposalStatus {
    /// No workflow action leaves these states.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalStatus::DirectorRejected
                | ProposalStatus::RcRejected
                | ProposalStatus::Converted
        )
    }
}

/// Status of a tracked project. Conversion always creates `ACTIVE`
/// projects; later project lifecycle is handled outside the proposal workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Active,
}

wire_enum!(ProjectStatus, "project status", {
    Active => "ACTIVE",
});

/// Funding / administrative project type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectCategory {
    /// Grant-in-Aid
    Gap,
    /// Consultancy
    Cnp,
    /// Other Lab
    Olp,
    /// Externally Funded
    Efp,
    /// Bilateral Mission
    Bmp,
    /// Focus Basic Research
    Fbr,
    /// Fast Track Commercialization
    Ftc,
    /// Fast Track Translation
    Ftt,
    /// Mission Mode Project
    Mmp,
    /// Niche Creating Projects
    Ncp,
    Nmitli,
    /// Multi Lab Projects
    Mlp,
    /// Sponsored Scheme Projects
    Ssp,
    /// Short Term Service
    Sts,
}

wire_enum!(ProjectCategory, "project category", {
    Gap => "GAP",
    Cnp => "CNP",
    Olp => "OLP",
    Efp => "EFP",
    Bmp => "BMP",
    Fbr => "FBR",
    Ftc => "FTC",
    Ftt => "FTT",
    Mmp => "MMP",
    Ncp => "NCP",
    Nmitli => "NMITLI",
    Mlp => "MLP",
    Ssp => "SSP",
    Sts => "STS",
});

impl ProjectCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ProjectCategory::Gap => "Grant-in-Aid",
            ProjectCategory::Cnp => "Consultancy",
            ProjectCategory::Olp => "Other Lab",
            ProjectCategory::Efp => "Externally Funded",
            ProjectCategory::Bmp => "Bilateral Mission",
            ProjectCategory::Fbr => "Focus Basic Research",
            ProjectCategory::Ftc => "Fast Track Commercialization",
            ProjectCategory::Ftt => "Fast Track Translation",
            ProjectCategory::Mmp => "Mission Mode Project",
            ProjectCategory::Ncp => "Niche Creating Projects",
            ProjectCategory::Nmitli => "NMITLI",
            ProjectCategory::Mlp => "Multi Lab Projects",
            ProjectCategory::Ssp => "Sponsored Scheme Projects",
            ProjectCategory::Sts => "Short Term Service",
        }
    }
}

/// Outcome chosen by a BKMD reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BkmdDecision {
    Forward,
    Return,
}

wire_enum!(BkmdDecision, "bkmd decision", {
    Forward => "forward",
    Return => "return",
});

/// Outcome chosen by the Director or the Research Council.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Approve,
    Reject,
}

wire_enum!(Verdict, "verdict", {
    Approve => "approve",
    Reject => "reject",
});

// ============================================================================
// RBAC VOCABULARY
// ============================================================================

/// Portal resources guarded by the permission matrix and page-access list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resource {
    Dashboard,
    DgDashboard,
    Projects,
    Finance,
    Staff,
    RcMeetings,
    Documents,
    Reports,
    Timeline,
    Settings,
    Users,
    Profile,
    BulkImport,
    Archive,
}

wire_enum!(Resource, "resource", {
    Dashboard => "dashboard",
    DgDashboard => "dg-dashboard",
    Projects => "projects",
    Finance => "finance",
    Staff => "staff",
    RcMeetings => "rc-meetings",
    Documents => "documents",
    Reports => "reports",
    Timeline => "timeline",
    Settings => "settings",
    Users => "users",
    Profile => "profile",
    BulkImport => "bulk-import",
    Archive => "archive",
});

/// Action on a resource. `Manage` grants nothing beyond itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    Manage,
}

wire_enum!(Action, "action", {
    Read => "read",
    Create => "create",
    Update => "update",
    Delete => "delete",
    Manage => "manage",
});
