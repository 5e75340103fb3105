use std::collections::BTreeSet;
use std::sync::Arc;

use dubox_core::{AppError, AppResult, CurrentUser};
use dubox_domain::{EffectiveRoles, PermissionKey, RoleName, UserId};
use tracing::warn;

use crate::role_resolver::{actor_user_id, resolve_user_roles};
use crate::{AccessReadSession, AccessRepository};

/// Answers `(module, action)` capability questions for the calling user.
///
/// Checks are side-effect free and recomputed on every call.
#[derive(Clone)]
pub struct PermissionChecker {
    repository: Arc<dyn AccessRepository>,
}

impl PermissionChecker {
    /// Creates a checker reading from the provided repository.
    #[must_use]
    pub fn new(repository: Arc<dyn AccessRepository>) -> Self {
        Self { repository }
    }

    /// Returns whether any resolved role grants the permission.
    pub async fn has_permission(
        &self,
        actor: &CurrentUser,
        permission: PermissionKey,
    ) -> AppResult<bool> {
        Ok(self.effective_permissions(actor).await?.contains(&permission))
    }

    /// Ensures the calling user holds the permission before a write.
    pub async fn require_permission(
        &self,
        actor: &CurrentUser,
        permission: PermissionKey,
    ) -> AppResult<()> {
        let Some(user_id) = actor_user_id(actor) else {
            return Err(AppError::Unauthorized(
                "request has no resolvable user identity".to_owned(),
            ));
        };

        if self.has_permission(actor, permission).await? {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "user '{user_id}' is missing permission '{permission}'"
        )))
    }

    /// Lists every active permission granted by the user's resolved roles.
    pub async fn effective_permissions(
        &self,
        actor: &CurrentUser,
    ) -> AppResult<BTreeSet<PermissionKey>> {
        let Some(user_id) = actor_user_id(actor) else {
            return Ok(BTreeSet::new());
        };

        let mut session = self.repository.begin_read().await?;
        let roles = resolve_user_roles(session.as_mut(), user_id).await?;
        let permissions = resolve_role_permissions(session.as_mut(), user_id, &roles).await?;
        session.finish().await?;

        Ok(permissions)
    }
}

pub(crate) async fn resolve_role_permissions(
    session: &mut dyn AccessReadSession,
    user_id: UserId,
    roles: &EffectiveRoles,
) -> AppResult<BTreeSet<PermissionKey>> {
    if roles.is_empty() {
        return Ok(BTreeSet::new());
    }

    let role_names: Vec<RoleName> = roles.iter().cloned().collect();
    let rows = session.list_role_permissions(&role_names).await?;

    Ok(rows
        .into_iter()
        .filter(|row| row.is_active)
        .filter_map(|row| {
            match PermissionKey::from_parts(row.module.as_str(), row.action.as_str()) {
                Ok(key) => Some(key),
                Err(error) => {
                    warn!(
                        user_id = %user_id,
                        role_name = %row.role_name,
                        error = %error,
                        "skipping undecodable permission row"
                    );
                    None
                }
            }
        })
        .collect())
}
