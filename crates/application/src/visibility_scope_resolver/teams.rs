use std::collections::BTreeSet;

use dubox_core::AppResult;
use dubox_domain::{TeamId, UserId};

use crate::AccessReadSession;

/// Teams the manager created plus teams they actively belong to.
pub(super) async fn project_manager_teams(
    session: &mut dyn AccessReadSession,
    user_id: UserId,
) -> AppResult<BTreeSet<TeamId>> {
    let mut team_ids: BTreeSet<TeamId> = session
        .list_teams_created_by(user_id)
        .await?
        .into_iter()
        .collect();
    team_ids.extend(team_member_teams(session, user_id).await?);

    Ok(team_ids)
}

/// Teams the user actively belongs to. Creating a team grants nothing here.
pub(super) async fn team_member_teams(
    session: &mut dyn AccessReadSession,
    user_id: UserId,
) -> AppResult<BTreeSet<TeamId>> {
    Ok(session
        .list_active_memberships(user_id)
        .await?
        .into_iter()
        .map(|membership| membership.team_id)
        .collect())
}
