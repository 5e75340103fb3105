use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use dubox_core::AppResult;
use dubox_domain::{PermissionKey, ProjectId, RoleName, TeamId, UserId};

use crate::{AccessReadSession, AccessRepository, RolePermissionRow, TeamMembershipLink};

#[derive(Debug, Clone, Default)]
struct Fixture {
    active_users: BTreeSet<UserId>,
    direct_roles: Vec<(UserId, String)>,
    group_members: Vec<(UserId, String)>,
    group_roles: Vec<(String, String)>,
    role_permissions: Vec<RolePermissionRow>,
    projects: Vec<(ProjectId, Option<UserId>)>,
    teams: Vec<(TeamId, Option<UserId>)>,
    memberships: Vec<(TeamId, UserId, bool)>,
}

/// Mutable fixture handing out snapshot sessions, one clone per `begin_read`.
#[derive(Clone, Default)]
pub(crate) struct FakeAccessRepository {
    fixture: Arc<Mutex<Fixture>>,
}

impl FakeAccessRepository {
    pub(crate) async fn add_user(&self) -> UserId {
        let user_id = UserId::new();
        self.fixture.lock().await.active_users.insert(user_id);
        user_id
    }

    pub(crate) async fn add_user_with_role(&self, role_name: &str) -> UserId {
        let user_id = self.add_user().await;
        self.assign_role(user_id, role_name).await;
        user_id
    }

    pub(crate) async fn deactivate_user(&self, user_id: UserId) {
        self.fixture.lock().await.active_users.remove(&user_id);
    }

    pub(crate) async fn assign_role(&self, user_id: UserId, role_name: &str) {
        self.fixture
            .lock()
            .await
            .direct_roles
            .push((user_id, role_name.to_owned()));
    }

    pub(crate) async fn add_to_group(&self, user_id: UserId, group_name: &str) {
        self.fixture
            .lock()
            .await
            .group_members
            .push((user_id, group_name.to_owned()));
    }

    pub(crate) async fn grant_group_role(&self, group_name: &str, role_name: &str) {
        self.fixture
            .lock()
            .await
            .group_roles
            .push((group_name.to_owned(), role_name.to_owned()));
    }

    pub(crate) async fn grant_permission(
        &self,
        role_name: &str,
        key: PermissionKey,
        is_active: bool,
    ) {
        self.fixture
            .lock()
            .await
            .role_permissions
            .push(RolePermissionRow {
                role_name: role_name.to_owned(),
                module: key.module().as_str().to_owned(),
                action: key.action().as_str().to_owned(),
                is_active,
            });
    }

    pub(crate) async fn grant_raw_permission(&self, role_name: &str, module: &str, action: &str) {
        self.fixture
            .lock()
            .await
            .role_permissions
            .push(RolePermissionRow {
                role_name: role_name.to_owned(),
                module: module.to_owned(),
                action: action.to_owned(),
                is_active: true,
            });
    }

    pub(crate) async fn add_project(&self, created_by: Option<UserId>) -> ProjectId {
        let project_id = ProjectId::new();
        self.fixture
            .lock()
            .await
            .projects
            .push((project_id, created_by));
        project_id
    }

    pub(crate) async fn add_team(&self, created_by: Option<UserId>) -> TeamId {
        let team_id = TeamId::new();
        self.fixture.lock().await.teams.push((team_id, created_by));
        team_id
    }

    pub(crate) async fn set_membership(&self, team_id: TeamId, user_id: UserId, is_active: bool) {
        let mut fixture = self.fixture.lock().await;
        fixture
            .memberships
            .retain(|(stored_team, stored_user, _)| {
                !(stored_team == &team_id && stored_user == &user_id)
            });
        fixture.memberships.push((team_id, user_id, is_active));
    }
}

#[async_trait]
impl AccessRepository for FakeAccessRepository {
    async fn begin_read(&self) -> AppResult<Box<dyn AccessReadSession>> {
        let snapshot = self.fixture.lock().await.clone();
        Ok(Box::new(FakeAccessSession { snapshot }))
    }
}

struct FakeAccessSession {
    snapshot: Fixture,
}

#[async_trait]
impl AccessReadSession for FakeAccessSession {
    async fn is_active_user(&mut self, user_id: UserId) -> AppResult<bool> {
        Ok(self.snapshot.active_users.contains(&user_id))
    }

    async fn list_direct_role_names(&mut self, user_id: UserId) -> AppResult<Vec<String>> {
        Ok(self
            .snapshot
            .direct_roles
            .iter()
            .filter(|(stored_user, _)| stored_user == &user_id)
            .map(|(_, role_name)| role_name.clone())
            .collect())
    }

    async fn list_group_role_names(&mut self, user_id: UserId) -> AppResult<Vec<String>> {
        let groups: Vec<&String> = self
            .snapshot
            .group_members
            .iter()
            .filter(|(stored_user, _)| stored_user == &user_id)
            .map(|(_, group_name)| group_name)
            .collect();

        Ok(self
            .snapshot
            .group_roles
            .iter()
            .filter(|(group_name, _)| groups.contains(&group_name))
            .map(|(_, role_name)| role_name.clone())
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
            .iter()
            .filter(|(_, created_by)| created_by.is_some_and(|creator| creators.contains(&creator)))
            .map(|(project_id, _)| *project_id)
            .collect())
    }

    async fn list_teams_created_by(&mut self, user_id: UserId) -> AppResult<Vec<TeamId>> {
        Ok(self
            .snapshot
            .teams
            .iter()
            .filter(|(_, created_by)| created_by == &Some(user_id))
            .map(|(team_id, _)| *team_id)
            .collect())
    }

    async fn list_active_memberships(
        &mut self,
        user_id: UserId,
    ) -> AppResult<Vec<TeamMembershipLink>> {
        Ok(self
            .snapshot
            .memberships
            .iter()
            .filter(|(_, stored_user, is_active)| stored_user == &user_id && *is_active)
            .filter_map(|(team_id, _, _)| {
                self.snapshot
                    .teams
                    .iter()
                    .find(|(stored_team, _)| stored_team == team_id)
                    .map(|(_, created_by)| TeamMembershipLink {
                        team_id: *team_id,
                        team_created_by: *created_by,
                    })
            })
            .collect())
    }

    async fn finish(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}
