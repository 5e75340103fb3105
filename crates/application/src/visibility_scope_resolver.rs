//! Tiered project and team visibility.
//!
//! Tiers are evaluated in precedence order:
//!
//! 1. `SystemAdmin` and `Viewer` see every project and team.
//! 2. `ProjectManager` sees projects they created plus projects created by
//!    system administrators who set up one of their teams, and teams they
//!    created or actively belong to.
//! 3. Everybody else sees projects they created plus projects created by the
//!    creator of any team they actively belong to, whatever that creator's
//!    role, and only the teams they actively belong to.
//!
//! Anonymous, unknown and inactive users get the empty restricted scope.

mod projects;
mod teams;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use dubox_core::{AppError, AppResult, CurrentUser};
use dubox_domain::{EffectiveRoles, ProjectId, ProjectScope, RoleTier, TeamId, TeamScope, UserId};

use crate::{AccessReadSession, AccessRepository};
use crate::role_resolver::{actor_user_id, resolve_user_roles};

/// Everything the resolver knows about one caller, from one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibilityProfile {
    /// Resolved user, if any.
    pub user_id: Option<UserId>,
    /// Effective roles.
    pub roles: EffectiveRoles,
    /// Tier derived from the roles.
    pub tier: RoleTier,
    /// Accessible projects.
    pub projects: ProjectScope,
    /// Accessible teams.
    pub teams: TeamScope,
    /// False for read-only callers.
    pub can_modify_data: bool,
    /// True for administrators and project managers.
    pub can_create_project_or_team: bool,
}

/// Computes which projects and teams the calling user may access.
#[derive(Clone)]
pub struct VisibilityScopeResolver {
    repository: Arc<dyn AccessRepository>,
}

impl VisibilityScopeResolver {
    /// Creates a resolver reading from the provided repository.
    #[must_use]
    pub fn new(repository: Arc<dyn AccessRepository>) -> Self {
        Self { repository }
    }

    /// Resolves the projects the caller may access.
    pub async fn resolve_accessible_projects(
        &self,
        actor: &CurrentUser,
    ) -> AppResult<ProjectScope> {
        let Some(user_id) = actor_user_id(actor) else {
            return Ok(ProjectScope::none());
        };

        let mut session = self.repository.begin_read().await?;
        let scope = match load_tier(session.as_mut(), user_id).await? {
            Some(tier) => project_scope_for_tier(session.as_mut(), user_id, tier).await?,
            None => ProjectScope::none(),
        };
        session.finish().await?;

        Ok(scope)
    }

    /// Resolves the teams the caller may access.
    pub async fn resolve_accessible_teams(&self, actor: &CurrentUser) -> AppResult<TeamScope> {
        let Some(user_id) = actor_user_id(actor) else {
            return Ok(TeamScope::none());
        };

        let mut session = self.repository.begin_read().await?;
        let scope = match load_tier(session.as_mut(), user_id).await? {
            Some(tier) => team_scope_for_tier(session.as_mut(), user_id, tier).await?,
            None => TeamScope::none(),
        };
        session.finish().await?;

        Ok(scope)
    }

    /// Returns whether the caller may access the project. Unrestricted
    /// callers get `true` even for ids that do not exist.
    pub async fn can_access_project(
        &self,
        actor: &CurrentUser,
        project_id: ProjectId,
    ) -> AppResult<bool> {
        Ok(self
            .resolve_accessible_projects(actor)
            .await?
            .allows(&project_id))
    }

    /// Returns whether the caller may access the team.
    pub async fn can_access_team(&self, actor: &CurrentUser, team_id: TeamId) -> AppResult<bool> {
        Ok(self.resolve_accessible_teams(actor).await?.allows(&team_id))
    }

    /// Returns whether the caller may write at all. Viewers never may,
    /// whatever their scope.
    pub async fn can_modify_data(&self, actor: &CurrentUser) -> AppResult<bool> {
        let Some(roles) = self.resolve_roles(actor).await? else {
            return Ok(false);
        };

        Ok(roles.can_modify_data())
    }

    /// Returns whether the caller may create projects and teams.
    pub async fn can_create_project_or_team(&self, actor: &CurrentUser) -> AppResult<bool> {
        Ok(self
            .resolve_roles(actor)
            .await?
            .is_some_and(|roles| roles.can_create_projects_and_teams()))
    }

    /// Ensures the caller may write.
    pub async fn require_modify(&self, actor: &CurrentUser) -> AppResult<()> {
        let Some(roles) = self.resolve_roles(actor).await? else {
            return Err(AppError::Unauthorized(
                "request has no resolvable user identity".to_owned(),
            ));
        };

        if roles.can_modify_data() {
            return Ok(());
        }

        Err(AppError::Forbidden(
            "viewer role has read-only access and cannot modify data".to_owned(),
        ))
    }

    /// Ensures the project is inside the caller's scope.
    pub async fn require_project_access(
        &self,
        actor: &CurrentUser,
        project_id: ProjectId,
    ) -> AppResult<()> {
        if actor_user_id(actor).is_none() {
            return Err(AppError::Unauthorized(
                "request has no resolvable user identity".to_owned(),
            ));
        }

        if self.can_access_project(actor, project_id).await? {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "project '{project_id}' is outside the caller's scope"
        )))
    }

    /// Ensures the team is inside the caller's scope.
    pub async fn require_team_access(&self, actor: &CurrentUser, team_id: TeamId) -> AppResult<()> {
        if actor_user_id(actor).is_none() {
            return Err(AppError::Unauthorized(
                "request has no resolvable user identity".to_owned(),
            ));
        }

        if self.can_access_team(actor, team_id).await? {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "team '{team_id}' is outside the caller's scope"
        )))
    }

    /// Resolves roles, tier and both scopes inside one snapshot.
    pub async fn resolve_profile(&self, actor: &CurrentUser) -> AppResult<VisibilityProfile> {
        let Some(user_id) = actor_user_id(actor) else {
            return Ok(VisibilityProfile::anonymous());
        };

        let mut session = self.repository.begin_read().await?;
        if !session.is_active_user(user_id).await? {
            session.finish().await?;
            return Ok(VisibilityProfile {
                user_id: Some(user_id),
                ..VisibilityProfile::anonymous()
            });
        }

        let roles = resolve_user_roles(session.as_mut(), user_id).await?;
        let tier = roles.tier();
        let projects = project_scope_for_tier(session.as_mut(), user_id, tier).await?;
        let teams = team_scope_for_tier(session.as_mut(), user_id, tier).await?;
        session.finish().await?;

        Ok(VisibilityProfile {
            user_id: Some(user_id),
            can_modify_data: roles.can_modify_data(),
            can_create_project_or_team: roles.can_create_projects_and_teams(),
            roles,
            tier,
            projects,
            teams,
        })
    }

    async fn resolve_roles(&self, actor: &CurrentUser) -> AppResult<Option<EffectiveRoles>> {
        let Some(user_id) = actor_user_id(actor) else {
            return Ok(None);
        };

        let mut session = self.repository.begin_read().await?;
        let roles = if session.is_active_user(user_id).await? {
            Some(resolve_user_roles(session.as_mut(), user_id).await?)
        } else {
            None
        };
        session.finish().await?;

        Ok(roles)
    }
}

impl VisibilityProfile {
    fn anonymous() -> Self {
        Self {
            user_id: None,
            roles: EffectiveRoles::empty(),
            tier: RoleTier::Other,
            projects: ProjectScope::none(),
            teams: TeamScope::none(),
            can_modify_data: false,
            can_create_project_or_team: false,
        }
    }
}

/// Returns `None` for unknown or inactive users, which fail closed.
async fn load_tier(
    session: &mut dyn AccessReadSession,
    user_id: UserId,
) -> AppResult<Option<RoleTier>> {
    if !session.is_active_user(user_id).await? {
        debug!(user_id = %user_id, "visibility denied for unknown or inactive user");
        return Ok(None);
    }

    let tier = resolve_user_roles(session, user_id).await?.tier();
    debug!(user_id = %user_id, tier = ?tier, "resolved visibility tier");
    Ok(Some(tier))
}

async fn project_scope_for_tier(
    session: &mut dyn AccessReadSession,
    user_id: UserId,
    tier: RoleTier,
) -> AppResult<ProjectScope> {
    let ids = match tier {
        RoleTier::SystemAdmin | RoleTier::Viewer => return Ok(ProjectScope::Unrestricted),
        RoleTier::ProjectManager => projects::project_manager_projects(session, user_id).await?,
        RoleTier::Other => projects::team_member_projects(session, user_id).await?,
    };

    debug!(user_id = %user_id, project_count = ids.len(), "resolved project scope");
    Ok(ProjectScope::Restricted(ids))
}

async fn team_scope_for_tier(
    session: &mut dyn AccessReadSession,
    user_id: UserId,
    tier: RoleTier,
) -> AppResult<TeamScope> {
    let ids = match tier {
        RoleTier::SystemAdmin | RoleTier::Viewer => return Ok(TeamScope::Unrestricted),
        RoleTier::ProjectManager => teams::project_manager_teams(session, user_id).await?,
        RoleTier::Other => teams::team_member_teams(session, user_id).await?,
    };

    debug!(user_id = %user_id, team_count = ids.len(), "resolved team scope");
    Ok(TeamScope::Restricted(ids))
}
