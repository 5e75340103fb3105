//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod project;
mod scope;
mod security;
mod team;
mod user;

pub use project::{Project, ProjectChange, ProjectId, ProjectStatus};
pub use scope::{AccessScope, ProjectScope, TeamScope};
pub use security::{
    EffectiveRoles, PROJECT_MANAGER_ROLE, PermissionAction, PermissionKey, PermissionModule,
    RoleName, RoleTier, SYSTEM_ADMIN_ROLE, VIEWER_ROLE,
};
pub use team::{Team, TeamId, TeamMember};
pub use user::UserId;
