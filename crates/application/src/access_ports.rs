use async_trait::async_trait;

use dubox_core::AppResult;
use dubox_domain::{ProjectId, RoleName, TeamId, UserId};

/// Permission row granted to a role, as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePermissionRow {
    /// Role carrying the grant.
    pub role_name: String,
    /// Stored module column, e.g. `Boxes`.
    pub module: String,
    /// Stored action column, e.g. `Edit`.
    pub action: String,
    /// Inactive permissions count as revoked.
    pub is_active: bool,
}

/// Active team membership of one user together with the team's creator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamMembershipLink {
    /// Team the user actively belongs to.
    pub team_id: TeamId,
    /// User that created the team, if recorded.
    pub team_created_by: Option<UserId>,
}

/// Read-only port over users, roles, groups, projects and teams.
#[async_trait]
pub trait AccessRepository: Send + Sync {
    /// Opens a read session bound to one consistent snapshot.
    async fn begin_read(&self) -> AppResult<Box<dyn AccessReadSession>>;
}

/// Reads issued inside one snapshot.
///
/// Dropping a session without calling [`AccessReadSession::finish`] releases
/// the snapshot without side effects, which is what happens when the
/// surrounding request is cancelled.
#[async_trait]
pub trait AccessReadSession: Send {
    /// Returns whether the user exists and is active.
    async fn is_active_user(&mut self, user_id: UserId) -> AppResult<bool>;

    /// Lists role names assigned directly to the user.
    async fn list_direct_role_names(&mut self, user_id: UserId) -> AppResult<Vec<String>>;

    /// Lists role names granted to any group the user belongs to.
    async fn list_group_role_names(&mut self, user_id: UserId) -> AppResult<Vec<String>>;

    /// Lists permission rows attached to any of the roles.
    async fn list_role_permissions(
        &mut self,
        role_names: &[RoleName],
    ) -> AppResult<Vec<RolePermissionRow>>;

    /// Lists projects whose stored creator is one of the users.
    async fn list_projects_created_by(&mut self, creators: &[UserId])
    -> AppResult<Vec<ProjectId>>;

    /// Lists teams created by the user.
    async fn list_teams_created_by(&mut self, user_id: UserId) -> AppResult<Vec<TeamId>>;

    /// Lists the user's active team memberships.
    async fn list_active_memberships(
        &mut self,
        user_id: UserId,
    ) -> AppResult<Vec<TeamMembershipLink>>;

    /// Ends the session and releases the snapshot.
    async fn finish(self: Box<Self>) -> AppResult<()>;
}
