use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use dubox_application::{
    AccessReadSession, AccessRepository, CatalogRepository, Paged, RolePermissionRow,
    Specification, TEAM_MEMBERS_INCLUDE, TeamMembershipLink,
};
use dubox_core::{AppError, AppResult};
use dubox_domain::{PermissionKey, Project, ProjectId, RoleName, Team, TeamId, TeamMember, UserId};

use crate::in_memory_specification::evaluate;

#[derive(Debug, Clone, Default)]
struct AccessState {
    users: BTreeMap<UserId, bool>,
    user_roles: BTreeMap<UserId, BTreeSet<String>>,
    user_groups: BTreeMap<UserId, BTreeSet<String>>,
    group_roles: BTreeMap<String, BTreeSet<String>>,
    role_permissions: Vec<RolePermissionRow>,
    projects: BTreeMap<ProjectId, Project>,
    teams: BTreeMap<TeamId, Team>,
    members: BTreeMap<(TeamId, UserId), bool>,
}

/// In-memory users, roles, groups, projects and teams.
///
/// Serves both the access and the catalogue ports. Each read session works
/// on a copy of the state taken when the session began.
#[derive(Debug, Default)]
pub struct InMemoryAccessRepository {
    state: RwLock<AccessState>,
}

impl InMemoryAccessRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or updates a user.
    pub async fn save_user(&self, user_id: UserId, is_active: bool) {
        self.state.write().await.users.insert(user_id, is_active);
    }

    /// Assigns a role directly to a user.
    pub async fn assign_role(&self, user_id: UserId, role_name: &RoleName) -> AppResult<()> {
        let mut state = self.state.write().await;
        ensure_user(&state, user_id)?;
        state
            .user_roles
            .entry(user_id)
            .or_default()
            .insert(role_name.as_str().to_owned());
        Ok(())
    }

    /// Adds a user to a group.
    pub async fn add_group_member(&self, user_id: UserId, group_name: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        ensure_user(&state, user_id)?;
        state
            .user_groups
            .entry(user_id)
            .or_default()
            .insert(group_name.to_owned());
        Ok(())
    }

    /// Grants a role to every member of a group.
    pub async fn grant_group_role(&self, group_name: &str, role_name: &RoleName) {
        self.state
            .write()
            .await
            .group_roles
            .entry(group_name.to_owned())
            .or_default()
            .insert(role_name.as_str().to_owned());
    }

    /// Attaches a permission to a role, replacing an earlier grant of the
    /// same permission.
    pub async fn grant_permission(
        &self,
        role_name: &RoleName,
        permission: PermissionKey,
        is_active: bool,
    ) {
        let module = permission.module().as_str().to_owned();
        let action = permission.action().as_str().to_owned();
        let mut state = self.state.write().await;
        state.role_permissions.retain(|row| {
            !(row.role_name == role_name.as_str() && row.module == module && row.action == action)
        });
        state.role_permissions.push(RolePermissionRow {
            role_name: role_name.as_str().to_owned(),
            module,
            action,
            is_active,
        });
    }

    /// Adds or replaces a project.
    pub async fn save_project(&self, project: Project) {
        self.state
            .write()
            .await
            .projects
            .insert(project.id(), project);
    }

    /// Adds or replaces a team. Members are managed separately.
    pub async fn save_team(&self, team: Team) {
        self.state.write().await.teams.insert(team.id(), team);
    }

    /// Adds a membership or flips its active flag.
    pub async fn save_membership(&self, member: TeamMember) -> AppResult<()> {
        let mut state = self.state.write().await;
        ensure_user(&state, member.user_id)?;
        if !state.teams.contains_key(&member.team_id) {
            return Err(AppError::NotFound(format!(
                "team '{}' does not exist",
                member.team_id
            )));
        }

        state
            .members
            .insert((member.team_id, member.user_id), member.is_active);
        Ok(())
    }
}

fn ensure_user(state: &AccessState, user_id: UserId) -> AppResult<()> {
    if state.users.contains_key(&user_id) {
        return Ok(());
    }

    Err(AppError::NotFound(format!("user '{user_id}' does not exist")))
}

#[async_trait]
impl AccessRepository for InMemoryAccessRepository {
    async fn begin_read(&self) -> AppResult<Box<dyn AccessReadSession>> {
        let snapshot = self.state.read().await.clone();
        Ok(Box::new(InMemoryAccessSession { snapshot }))
    }
}

struct InMemoryAccessSession {
    snapshot: AccessState,
}

#[async_trait]
impl AccessReadSession for InMemoryAccessSession {
    async fn is_active_user(&mut self, user_id: UserId) -> AppResult<bool> {
        Ok(self.snapshot.users.get(&user_id).copied().unwrap_or(false))
    }

    async fn list_direct_role_names(&mut self, user_id: UserId) -> AppResult<Vec<String>> {
        Ok(self
            .snapshot
            .user_roles
            .get(&user_id)
            .map(|roles| roles.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn list_group_role_names(&mut self, user_id: UserId) -> AppResult<Vec<String>> {
        let Some(groups) = self.snapshot.user_groups.get(&user_id) else {
            return Ok(Vec::new());
        };

        Ok(groups
            .iter()
            .filter_map(|group_name| self.snapshot.group_roles.get(group_name))
            .flat_map(|roles| roles.iter().cloned())
            .collect())
    }

    async fn list_role_permissions(
        &mut self,
        role_names: &[RoleName],
    ) -> AppResult<Vec<RolePermissionRow>> {
        Ok(self
            .snapshot
            .role_permissions
            .iter()
            .filter(|row| {
                role_names
                    .iter()
                    .any(|role_name| role_name.as_str() == row.role_name)
            })
            .cloned()
            .collect())
    }

    async fn list_projects_created_by(
        &mut self,
        creators: &[UserId],
    ) -> AppResult<Vec<ProjectId>> {
        Ok(self
            .snapshot
            .projects
            .values()
            .filter(|project| {
                project
                    .created_by()
                    .is_some_and(|creator| creators.contains(&creator))
            })
            .map(Project::id)
            .collect())
    }

    async fn list_teams_created_by(&mut self, user_id: UserId) -> AppResult<Vec<TeamId>> {
        Ok(self
            .snapshot
            .teams
            .values()
            .filter(|team| team.created_by() == Some(user_id))
            .map(Team::id)
            .collect())
    }

    async fn list_active_memberships(
        &mut self,
        user_id: UserId,
    ) -> AppResult<Vec<TeamMembershipLink>> {
        Ok(self
            .snapshot
            .members
            .iter()
            .filter(|((_, member_id), is_active)| *member_id == user_id && **is_active)
            .filter_map(|((team_id, _), _)| self.snapshot.teams.get(team_id))
            .map(|team| TeamMembershipLink {
                team_id: team.id(),
                team_created_by: team.created_by(),
            })
            .collect())
    }

    async fn finish(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryAccessRepository {
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<Project>> {
        Ok(self.state.read().await.projects.get(&project_id).cloned())
    }

    async fn list_projects(
        &self,
        specification: &Specification<Project>,
    ) -> AppResult<Paged<Project>> {
        let state = self.state.read().await;
        Ok(evaluate(state.projects.values().cloned(), specification))
    }

    async fn list_teams(&self, specification: &Specification<Team>) -> AppResult<Paged<Team>> {
        let state = self.state.read().await;
        let page = evaluate(state.teams.values().cloned(), specification);
        if !specification.has_include(TEAM_MEMBERS_INCLUDE) {
            return Ok(page);
        }

        Ok(page.map(|team| {
            let members = state
                .members
                .iter()
                .filter(|((team_id, _), _)| *team_id == team.id())
                .map(|((team_id, user_id), is_active)| TeamMember {
                    team_id: *team_id,
                    user_id: *user_id,
                    is_active: *is_active,
                })
                .collect();
            team.with_members(members)
        }))
    }
}
