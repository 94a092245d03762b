//! Static permission matrix and page-access list.
//!
//! Both tables are compiled in and keyed by `Role` through exhaustive
//! matches, so adding a role without deciding its grants does not compile.
//! Roles with an empty table are denied everything at the presentation layer.

use portal_types::{Action, Resource, Role};

use Action::{Create, Delete, Manage, Read, Update};
use Resource::*;

type Grants = &'static [(Resource, &'static [Action])];

const CRUD_MANAGE: &[Action] = &[Read, Create, Update, Delete, Manage];

const ADMIN_GRANTS: Grants = &[
    (Dashboard, &[Read, Manage]),
    (DgDashboard, &[Read, Manage]),
    (Projects, CRUD_MANAGE),
    (Finance, CRUD_MANAGE),
    (Staff, CRUD_MANAGE),
    (RcMeetings, CRUD_MANAGE),
    (Documents, CRUD_MANAGE),
    (Reports, CRUD_MANAGE),
    (Timeline, &[Read, Manage]),
    (Settings, &[Read, Update, Manage]),
    (Users, CRUD_MANAGE),
    (Profile, &[Read, Update]),
    (BulkImport, &[Read, Create, Manage]),
    (Archive, &[Read, Manage]),
];

const DIRECTOR_GRANTS: Grants = &[
    (Dashboard, &[Read]),
    (DgDashboard, &[Read, Manage]),
    (Projects, &[Read, Create, Update, Manage]),
    (Finance, &[Read, Create, Update, Manage]),
    (Staff, &[Read, Manage]),
    (RcMeetings, &[Read, Create, Update, Manage]),
    (Documents, &[Read, Create, Update]),
    (Reports, &[Read, Create, Manage]),
    (Timeline, &[Read]),
    (Settings, &[Read]),
    (Users, &[Read]),
    (Profile, &[Read, Update]),
    (BulkImport, &[Read]),
    (Archive, &[Read]),
];

const SUPERVISOR_GRANTS: Grants = &[
    (Dashboard, &[Read]),
    (Projects, &[Read, Create, Update]),
    (Finance, &[Read, Create]),
    (Staff, &[Read]),
    (RcMeetings, &[Read]),
    (Documents, &[Read, Create, Update]),
    (Reports, &[Read, Create]),
    (Timeline, &[Read]),
    (Settings, &[Read]),
    (Profile, &[Read, Update]),
    (Archive, &[Read]),
];

const PROJECT_HEAD_GRANTS: Grants = &[
    (Dashboard, &[Read]),
    (Projects, &[Read, Update]),
    (Finance, &[Read, Create]),
    (Staff, &[Read]),
    (RcMeetings, &[Read]),
    (Documents, &[Read, Create, Update]),
    (Reports, &[Read, Create]),
    (Timeline, &[Read]),
    (Profile, &[Read, Update]),
];

const EMPLOYEE_GRANTS: Grants = &[
    (Dashboard, &[Read]),
    (Projects, &[Read]),
    (Finance, &[Read]),
    (Documents, &[Read, Create]),
    (Timeline, &[Read]),
    (Profile, &[Read, Update]),
];

const EXTERNAL_OWNER_GRANTS: Grants = &[
    (Dashboard, &[Read]),
    (Projects, &[Read]),
    (Finance, &[Read]),
    (Documents, &[Read]),
    (Reports, &[Read]),
    (Timeline, &[Read]),
    (Profile, &[Read, Update]),
];

const ALL_PAGES: &[Resource] = &[
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
];

const SUPERVISOR_PAGES: &[Resource] = &[
    Dashboard, Projects, Finance, Staff, RcMeetings, Documents, Reports, Timeline, Settings,
    Profile, Archive,
];

const PROJECT_HEAD_PAGES: &[Resource] = &[
    Dashboard, Projects, Finance, Staff, RcMeetings, Documents, Reports, Timeline, Profile,
];

const EMPLOYEE_PAGES: &[Resource] = &[Dashboard, Projects, Finance, Documents, Timeline, Profile];

const EXTERNAL_OWNER_PAGES: &[Resource] = &[
    Dashboard, Projects, Finance, Documents, Reports, Timeline, Profile,
];

/// Resource → allowed actions for a role.
pub fn permissions_for(role: Role) -> Grants {
    match role {
        Role::Admin => ADMIN_GRANTS,
        Role::Director => DIRECTOR_GRANTS,
        Role::Supervisor => SUPERVISOR_GRANTS,
        Role::ProjectHead => PROJECT_HEAD_GRANTS,
        Role::Employee => EMPLOYEE_GRANTS,
        Role::ExternalOwner => EXTERNAL_OWNER_GRANTS,
        Role::Bkmd | Role::SysAdmin | Role::RcMember => &[],
    }
}

/// Pages a role may navigate to.
pub fn accessible_pages(role: Role) -> &'static [Resource] {
    match role {
        Role::Admin | Role::Director => ALL_PAGES,
        Role::Supervisor => SUPERVISOR_PAGES,
        Role::ProjectHead => PROJECT_HEAD_PAGES,
        Role::Employee => EMPLOYEE_PAGES,
        Role::ExternalOwner => EXTERNAL_OWNER_PAGES,
        Role::Bkmd | Role::SysAdmin | Role::RcMember => &[],
    }
}

/// Actions granted on one resource; empty when the resource is not listed.
pub fn actions_on(role: Role, resource: Resource) -> &'static [Action] {
    permissions_for(role)
        .iter()
        .find(|(r, _)| *r == resource)
        .map(|(_, actions)| *actions)
        .unwrap_or(&[])
}

/// False if the role has no grants, the resource is not listed for the role,
/// or the action is not listed for the resource.
pub fn has_permission(role: Option<Role>, resource: Resource, action: Action) -> bool {
    match role {
        Some(role) => actions_on(role, resource).contains(&action),
        None => false,
    }
}

pub fn can_access_page(role: Option<Role>, resource: Resource) -> bool {
    match role {
        Some(role) => accessible_pages(role).contains(&resource),
        None => false,
    }
}

pub fn has_role(role: Option<Role>, candidates: &[Role]) -> bool {
    match role {
        Some(role) => candidates.contains(&role),
        None => false,
    }
}

/// Admin-only content checks for `ADMIN` exactly; `SYS_ADMIN` carries no
/// presentation grants.
pub fn is_admin(role: Option<Role>) -> bool {
    role == Some(Role::Admin)
}
