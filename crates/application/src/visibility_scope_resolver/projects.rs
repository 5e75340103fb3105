use std::collections::BTreeSet;

use dubox_core::AppResult;
use dubox_domain::{ProjectId, SYSTEM_ADMIN_ROLE, UserId};

use crate::AccessReadSession;
use crate::role_resolver::resolve_user_roles;

// The two traversals below differ only in which team creators count.
// Keep them separate.

/// Own projects plus projects created by system administrators who created
/// a team the manager actively belongs to.
pub(super) async fn project_manager_projects(
    session: &mut dyn AccessReadSession,
    user_id: UserId,
) -> AppResult<BTreeSet<ProjectId>> {
    let mut creators = vec![user_id];

    for creator in distinct_team_creators(session, user_id).await? {
        if creator == user_id {
            continue;
        }

        // Inactive creators resolve to no roles and therefore never qualify.
        if resolve_user_roles(session, creator)
            .await?
            .contains(SYSTEM_ADMIN_ROLE)
        {
            creators.push(creator);
        }
    }

    Ok(session
        .list_projects_created_by(&creators)
        .await?
        .into_iter()
        .collect())
}

/// Own projects plus projects created by whoever created a team the user
/// actively belongs to, regardless of that creator's role.
pub(super) async fn team_member_projects(
    session: &mut dyn AccessReadSession,
    user_id: UserId,
) -> AppResult<BTreeSet<ProjectId>> {
    let mut creators = vec![user_id];
    creators.extend(
        distinct_team_creators(session, user_id)
            .await?
            .into_iter()
            .filter(|creator| creator != &user_id),
    );

    Ok(session
        .list_projects_created_by(&creators)
        .await?
        .into_iter()
        .collect())
}

async fn distinct_team_creators(
    session: &mut dyn AccessReadSession,
    user_id: UserId,
) -> AppResult<BTreeSet<UserId>> {
    Ok(session
        .list_active_memberships(user_id)
        .await?
        .into_iter()
        .filter_map(|membership| membership.team_created_by)
        .collect())
}
