use std::sync::Arc;

use dubox_core::{AppResult, CurrentUser};
use dubox_domain::{EffectiveRoles, RoleName, UserId};
use tracing::{debug, warn};

use crate::{AccessReadSession, AccessRepository};

/// Resolves the effective role set of the calling user.
#[derive(Clone)]
pub struct RoleResolver {
    repository: Arc<dyn AccessRepository>,
}

impl RoleResolver {
    /// Creates a resolver reading from the provided repository.
    #[must_use]
    pub fn new(repository: Arc<dyn AccessRepository>) -> Self {
        Self { repository }
    }

    /// Returns direct roles united with every role of every group the user
    /// belongs to. Anonymous, unknown and inactive users have no roles.
    pub async fn resolve_roles(&self, actor: &CurrentUser) -> AppResult<EffectiveRoles> {
        let Some(user_id) = actor_user_id(actor) else {
            return Ok(EffectiveRoles::empty());
        };

        let mut session = self.repository.begin_read().await?;
        let roles = resolve_user_roles(session.as_mut(), user_id).await?;
        session.finish().await?;

        Ok(roles)
    }

    /// Returns whether the calling user holds the named role.
    pub async fn has_role(&self, actor: &CurrentUser, role_name: &str) -> AppResult<bool> {
        Ok(self.resolve_roles(actor).await?.contains(role_name))
    }

    /// Returns whether the calling user holds at least one of the named roles.
    pub async fn has_any_role(&self, actor: &CurrentUser, role_names: &[&str]) -> AppResult<bool> {
        Ok(self.resolve_roles(actor).await?.contains_any(role_names))
    }
}

/// Extracts a usable user id from the request context.
pub(crate) fn actor_user_id(actor: &CurrentUser) -> Option<UserId> {
    if !actor.is_authenticated() {
        return None;
    }

    let raw = actor.user_id()?;
    match UserId::parse(raw) {
        Ok(user_id) => Some(user_id),
        Err(error) => {
            debug!(error = %error, "treating unparsable user id claim as anonymous");
            None
        }
    }
}

pub(crate) async fn resolve_user_roles(
    session: &mut dyn AccessReadSession,
    user_id: UserId,
) -> AppResult<EffectiveRoles> {
    if !session.is_active_user(user_id).await? {
        debug!(user_id = %user_id, "user is unknown or inactive; no roles granted");
        return Ok(EffectiveRoles::empty());
    }

    let direct = session.list_direct_role_names(user_id).await?;
    let inherited = session.list_group_role_names(user_id).await?;

    let roles = EffectiveRoles::from_names(direct.into_iter().chain(inherited).filter_map(
        |name| match RoleName::new(name) {
            Ok(role_name) => Some(role_name),
            Err(error) => {
                warn!(user_id = %user_id, error = %error, "skipping blank role name");
                None
            }
        },
    ));

    debug!(user_id = %user_id, role_count = roles.len(), "resolved effective roles");
    Ok(roles)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use dubox_core::{AppResult, CurrentUser};
    use dubox_domain::{PROJECT_MANAGER_ROLE, SYSTEM_ADMIN_ROLE, UserId, VIEWER_ROLE};

    use crate::test_support::FakeAccessRepository;

    use super::RoleResolver;

    #[tokio::test]
    async fn direct_and_group_roles_are_united() -> AppResult<()> {
        let repository = FakeAccessRepository::default();
        let user = repository.add_user().await;
        repository.assign_role(user, "SiteEngineer").await;
        repository.add_to_group(user, "QC Crew").await;
        repository.grant_group_role("QC Crew", "QCInspector").await;
        let resolver = RoleResolver::new(Arc::new(repository));

        let roles = resolver
            .resolve_roles(&CurrentUser::authenticated(user.to_string()))
            .await?;

        let names: Vec<&str> = roles.iter().map(|role| role.as_str()).collect();
        assert_eq!(names, vec!["QCInspector", "SiteEngineer"]);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_grants_collapse_into_one_role() -> AppResult<()> {
        let repository = FakeAccessRepository::default();
        let user = repository.add_user().await;
        repository.assign_role(user, PROJECT_MANAGER_ROLE).await;
        repository.add_to_group(user, "Managers").await;
        repository.add_to_group(user, "Planners").await;
        repository
            .grant_group_role("Managers", PROJECT_MANAGER_ROLE)
            .await;
        repository
            .grant_group_role("Planners", PROJECT_MANAGER_ROLE)
            .await;
        repository
            .grant_group_role("Planners", PROJECT_MANAGER_ROLE)
            .await;
        let resolver = RoleResolver::new(Arc::new(repository));
        let actor = CurrentUser::authenticated(user.to_string());

        let first = resolver.resolve_roles(&actor).await?;
        let second = resolver.resolve_roles(&actor).await?;

        assert_eq!(first.len(), 1);
        assert_eq!(first, second);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_inactive_and_anonymous_users_have_no_roles() -> AppResult<()> {
        let repository = FakeAccessRepository::default();
        let inactive = repository.add_user().await;
        repository.assign_role(inactive, SYSTEM_ADMIN_ROLE).await;
        repository.deactivate_user(inactive).await;
        let resolver = RoleResolver::new(Arc::new(repository));

        for actor in [
            CurrentUser::authenticated(inactive.to_string()),
            CurrentUser::authenticated(UserId::new().to_string()),
            CurrentUser::authenticated("not-a-uuid"),
            CurrentUser::from_claims(Some(inactive.to_string()), false),
            CurrentUser::anonymous(),
        ] {
            assert!(resolver.resolve_roles(&actor).await?.is_empty());
        }
        Ok(())
    }

    #[tokio::test]
    async fn has_any_role_checks_group_inherited_roles() -> AppResult<()> {
        let repository = FakeAccessRepository::default();
        let user = repository.add_user().await;
        repository.add_to_group(user, "Auditors").await;
        repository.grant_group_role("Auditors", VIEWER_ROLE).await;
        let resolver = RoleResolver::new(Arc::new(repository));
        let actor = CurrentUser::authenticated(user.to_string());

        assert!(
            resolver
                .has_any_role(&actor, &[SYSTEM_ADMIN_ROLE, VIEWER_ROLE])
                .await?
        );
        assert!(!resolver.has_role(&actor, PROJECT_MANAGER_ROLE).await?);
        Ok(())
    }
}
