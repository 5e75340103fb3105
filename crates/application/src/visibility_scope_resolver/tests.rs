use std::sync::Arc;

use dubox_core::{AppError, AppResult, CurrentUser};
use dubox_domain::{
    PROJECT_MANAGER_ROLE, ProjectId, ProjectScope, RoleTier, SYSTEM_ADMIN_ROLE, TeamId, TeamScope,
    UserId, VIEWER_ROLE,
};

use crate::test_support::FakeAccessRepository;

use super::VisibilityScopeResolver;

fn actor(user_id: UserId) -> CurrentUser {
    CurrentUser::authenticated(user_id.to_string())
}

fn resolver(repository: &FakeAccessRepository) -> VisibilityScopeResolver {
    VisibilityScopeResolver::new(Arc::new(repository.clone()))
}

#[tokio::test]
async fn admins_and_viewers_are_unrestricted_even_for_unknown_ids() -> AppResult<()> {
    let repository = FakeAccessRepository::default();
    let admin = repository.add_user_with_role(SYSTEM_ADMIN_ROLE).await;
    let viewer = repository.add_user().await;
    repository.add_to_group(viewer, "Auditors").await;
    repository.grant_group_role("Auditors", VIEWER_ROLE).await;
    let resolver = resolver(&repository);

    for user in [admin, viewer] {
        assert_eq!(
            resolver.resolve_accessible_projects(&actor(user)).await?,
            ProjectScope::Unrestricted
        );
        assert_eq!(
            resolver.resolve_accessible_teams(&actor(user)).await?,
            TeamScope::Unrestricted
        );
        assert!(
            resolver
                .can_access_project(&actor(user), ProjectId::new())
                .await?
        );
        assert!(resolver.can_access_team(&actor(user), TeamId::new()).await?);
    }
    Ok(())
}

#[tokio::test]
async fn viewer_is_unrestricted_but_cannot_modify() -> AppResult<()> {
    let repository = FakeAccessRepository::default();
    let viewer = repository.add_user_with_role(VIEWER_ROLE).await;
    repository.assign_role(viewer, PROJECT_MANAGER_ROLE).await;
    let resolver = resolver(&repository);

    assert!(!resolver.can_modify_data(&actor(viewer)).await?);
    assert!(matches!(
        resolver.require_modify(&actor(viewer)).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(
        resolver
            .resolve_accessible_projects(&actor(viewer))
            .await?
            .is_unrestricted()
    );
    Ok(())
}

#[tokio::test]
async fn user_without_teams_or_projects_gets_empty_restricted_scope() -> AppResult<()> {
    let repository = FakeAccessRepository::default();
    let engineer = repository.add_user_with_role("SiteEngineer").await;
    let manager = repository.add_user_with_role(PROJECT_MANAGER_ROLE).await;
    let resolver = resolver(&repository);

    for user in [engineer, manager] {
        let scope = resolver.resolve_accessible_projects(&actor(user)).await?;
        assert_eq!(scope, ProjectScope::none());
        assert!(!scope.is_unrestricted());
    }
    Ok(())
}

#[tokio::test]
async fn anonymous_and_unknown_callers_fail_closed() -> AppResult<()> {
    let repository = FakeAccessRepository::default();
    repository.add_project(None).await;
    let resolver = resolver(&repository);

    for caller in [
        CurrentUser::anonymous(),
        CurrentUser::authenticated("garbage"),
        actor(UserId::new()),
    ] {
        assert_eq!(
            resolver.resolve_accessible_projects(&caller).await?,
            ProjectScope::none()
        );
        assert_eq!(
            resolver.resolve_accessible_teams(&caller).await?,
            TeamScope::none()
        );
        assert!(!resolver.can_modify_data(&caller).await?);
        assert!(!resolver.can_create_project_or_team(&caller).await?);
    }

    assert!(matches!(
        resolver.require_modify(&CurrentUser::anonymous()).await,
        Err(AppError::Unauthorized(_))
    ));
    Ok(())
}

#[tokio::test]
async fn project_manager_always_sees_own_projects() -> AppResult<()> {
    let repository = FakeAccessRepository::default();
    let manager = repository.add_user_with_role(PROJECT_MANAGER_ROLE).await;
    let own = repository.add_project(Some(manager)).await;
    let resolver = resolver(&repository);

    assert_eq!(
        resolver.resolve_accessible_projects(&actor(manager)).await?,
        ProjectScope::restricted([own])
    );
    Ok(())
}

#[tokio::test]
async fn project_manager_sees_projects_of_admin_who_created_their_team() -> AppResult<()> {
    let repository = FakeAccessRepository::default();
    let manager = repository.add_user_with_role(PROJECT_MANAGER_ROLE).await;
    let admin = repository.add_user_with_role(SYSTEM_ADMIN_ROLE).await;
    let p100 = repository.add_project(Some(manager)).await;
    let t1 = repository.add_team(Some(admin)).await;
    let p200 = repository.add_project(Some(admin)).await;
    repository.set_membership(t1, manager, true).await;
    let resolver = resolver(&repository);

    assert_eq!(
        resolver.resolve_accessible_projects(&actor(manager)).await?,
        ProjectScope::restricted([p100, p200])
    );
    Ok(())
}

#[tokio::test]
async fn project_manager_ignores_teams_created_by_non_admins() -> AppResult<()> {
    let repository = FakeAccessRepository::default();
    let manager = repository.add_user_with_role(PROJECT_MANAGER_ROLE).await;
    let other_manager = repository.add_user_with_role(PROJECT_MANAGER_ROLE).await;
    let team = repository.add_team(Some(other_manager)).await;
    repository.add_project(Some(other_manager)).await;
    repository.set_membership(team, manager, true).await;
    let resolver = resolver(&repository);

    assert_eq!(
        resolver.resolve_accessible_projects(&actor(manager)).await?,
        ProjectScope::none()
    );
    assert_eq!(
        resolver.resolve_accessible_teams(&actor(manager)).await?,
        TeamScope::restricted([team])
    );
    Ok(())
}

#[tokio::test]
async fn project_manager_admin_chain_honours_group_inherited_admin_role() -> AppResult<()> {
    let repository = FakeAccessRepository::default();
    let manager = repository.add_user_with_role(PROJECT_MANAGER_ROLE).await;
    let admin = repository.add_user().await;
    repository.add_to_group(admin, "IT").await;
    repository.grant_group_role("IT", SYSTEM_ADMIN_ROLE).await;
    let team = repository.add_team(Some(admin)).await;
    let project = repository.add_project(Some(admin)).await;
    repository.set_membership(team, manager, true).await;
    let resolver = resolver(&repository);

    assert!(resolver.can_access_project(&actor(manager), project).await?);
    Ok(())
}

#[tokio::test]
async fn project_manager_teams_are_created_or_joined() -> AppResult<()> {
    let repository = FakeAccessRepository::default();
    let manager = repository.add_user_with_role(PROJECT_MANAGER_ROLE).await;
    let admin = repository.add_user_with_role(SYSTEM_ADMIN_ROLE).await;
    let created = repository.add_team(Some(manager)).await;
    let joined = repository.add_team(Some(admin)).await;
    let left = repository.add_team(Some(admin)).await;
    repository.add_team(Some(admin)).await;
    repository.set_membership(joined, manager, true).await;
    repository.set_membership(left, manager, false).await;
    let resolver = resolver(&repository);

    assert_eq!(
        resolver.resolve_accessible_teams(&actor(manager)).await?,
        TeamScope::restricted([created, joined])
    );
    Ok(())
}

#[tokio::test]
async fn other_tier_sees_projects_of_any_team_creator() -> AppResult<()> {
    let repository = FakeAccessRepository::default();
    let member = repository.add_user().await;
    let manager = repository.add_user_with_role(PROJECT_MANAGER_ROLE).await;
    let t2 = repository.add_team(Some(manager)).await;
    let p300 = repository.add_project(Some(manager)).await;
    repository.add_project(Some(UserId::new())).await;
    repository.set_membership(t2, member, true).await;
    let resolver = resolver(&repository);

    let scope = resolver.resolve_accessible_projects(&actor(member)).await?;
    assert!(scope.allows(&p300));
    assert_eq!(scope, ProjectScope::restricted([p300]));
    Ok(())
}

#[tokio::test]
async fn other_tier_includes_own_projects_and_only_joined_teams() -> AppResult<()> {
    let repository = FakeAccessRepository::default();
    let engineer = repository.add_user_with_role("SiteEngineer").await;
    let own_project = repository.add_project(Some(engineer)).await;
    let own_team = repository.add_team(Some(engineer)).await;
    let foreman = repository.add_user_with_role("Foreman").await;
    let joined = repository.add_team(Some(foreman)).await;
    let foreman_project = repository.add_project(Some(foreman)).await;
    repository.set_membership(joined, engineer, true).await;
    let resolver = resolver(&repository);

    assert_eq!(
        resolver.resolve_accessible_projects(&actor(engineer)).await?,
        ProjectScope::restricted([own_project, foreman_project])
    );
    let teams = resolver.resolve_accessible_teams(&actor(engineer)).await?;
    assert_eq!(teams, TeamScope::restricted([joined]));
    assert!(!teams.allows(&own_team));
    Ok(())
}

#[tokio::test]
async fn deactivating_membership_removes_chained_projects_on_next_resolution() -> AppResult<()> {
    let repository = FakeAccessRepository::default();
    let member = repository.add_user().await;
    let creator = repository.add_user_with_role(PROJECT_MANAGER_ROLE).await;
    let team = repository.add_team(Some(creator)).await;
    let project = repository.add_project(Some(creator)).await;
    repository.set_membership(team, member, true).await;
    let resolver = resolver(&repository);

    assert!(resolver.can_access_project(&actor(member), project).await?);

    repository.set_membership(team, member, false).await;

    assert!(!resolver.can_access_project(&actor(member), project).await?);
    assert!(!resolver.can_access_team(&actor(member), team).await?);
    Ok(())
}

#[tokio::test]
async fn teams_without_creator_contribute_no_projects() -> AppResult<()> {
    let repository = FakeAccessRepository::default();
    let member = repository.add_user().await;
    let team = repository.add_team(None).await;
    repository.add_project(None).await;
    repository.set_membership(team, member, true).await;
    let resolver = resolver(&repository);

    assert_eq!(
        resolver.resolve_accessible_projects(&actor(member)).await?,
        ProjectScope::none()
    );
    assert_eq!(
        resolver.resolve_accessible_teams(&actor(member)).await?,
        TeamScope::restricted([team])
    );
    Ok(())
}

#[tokio::test]
async fn only_admins_and_managers_can_create_projects_or_teams() -> AppResult<()> {
    let repository = FakeAccessRepository::default();
    let admin = repository.add_user_with_role(SYSTEM_ADMIN_ROLE).await;
    let manager = repository.add_user_with_role(PROJECT_MANAGER_ROLE).await;
    let foreman = repository.add_user_with_role("Foreman").await;
    let resolver = resolver(&repository);

    assert!(resolver.can_create_project_or_team(&actor(admin)).await?);
    assert!(resolver.can_create_project_or_team(&actor(manager)).await?);
    assert!(!resolver.can_create_project_or_team(&actor(foreman)).await?);
    Ok(())
}

#[tokio::test]
async fn require_project_access_distinguishes_anonymous_from_out_of_scope() -> AppResult<()> {
    let repository = FakeAccessRepository::default();
    let foreman = repository.add_user_with_role("Foreman").await;
    let foreign = repository.add_project(Some(UserId::new())).await;
    let resolver = resolver(&repository);

    assert!(matches!(
        resolver
            .require_project_access(&CurrentUser::anonymous(), foreign)
            .await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        resolver.require_project_access(&actor(foreman), foreign).await,
        Err(AppError::Forbidden(_))
    ));
    Ok(())
}

#[tokio::test]
async fn require_team_access_distinguishes_anonymous_from_out_of_scope() -> AppResult<()> {
    let repository = FakeAccessRepository::default();
    let foreman = repository.add_user_with_role("Foreman").await;
    let joined = repository.add_team(Some(UserId::new())).await;
    let foreign = repository.add_team(Some(UserId::new())).await;
    repository.set_membership(joined, foreman, true).await;
    let resolver = resolver(&repository);

    assert!(matches!(
        resolver
            .require_team_access(&CurrentUser::anonymous(), joined)
            .await,
        Err(AppError::Unauthorized(_))
    ));
    assert!(matches!(
        resolver.require_team_access(&actor(foreman), foreign).await,
        Err(AppError::Forbidden(_))
    ));
    resolver.require_team_access(&actor(foreman), joined).await?;
    Ok(())
}

#[tokio::test]
async fn profile_reports_tier_scopes_and_capabilities_together() -> AppResult<()> {
    let repository = FakeAccessRepository::default();
    let manager = repository.add_user_with_role(PROJECT_MANAGER_ROLE).await;
    let project = repository.add_project(Some(manager)).await;
    let team = repository.add_team(Some(manager)).await;
    let resolver = resolver(&repository);

    let profile = resolver.resolve_profile(&actor(manager)).await?;

    assert_eq!(profile.user_id, Some(manager));
    assert_eq!(profile.tier, RoleTier::ProjectManager);
    assert_eq!(profile.projects, ProjectScope::restricted([project]));
    assert_eq!(profile.teams, TeamScope::restricted([team]));
    assert!(profile.can_modify_data);
    assert!(profile.can_create_project_or_team);
    Ok(())
}
