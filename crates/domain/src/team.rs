//! Teams and their memberships.

use std::fmt::{Display, Formatter};

use dubox_core::{AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::UserId;

/// Unique identifier for a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(Uuid);

impl TeamId {
    /// Creates a new random team identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a team identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TeamId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TeamId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Membership row linking a user to a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    /// Team the user belongs to.
    pub team_id: TeamId,
    /// Member user.
    pub user_id: UserId,
    /// Inactive memberships never count toward visibility.
    pub is_active: bool,
}

/// Team read model used by scoped listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    id: TeamId,
    code: NonEmptyString,
    name: NonEmptyString,
    is_active: bool,
    created_by: Option<UserId>,
    members: Option<Vec<TeamMember>>,
}

impl Team {
    /// Creates a validated team read model without loaded members.
    pub fn new(
        id: TeamId,
        code: impl Into<String>,
        name: impl Into<String>,
        is_active: bool,
        created_by: Option<UserId>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            code: NonEmptyString::new(code)?,
            name: NonEmptyString::new(name)?,
            is_active,
            created_by,
            members: None,
        })
    }

    /// Returns a copy of the team with its member collection loaded.
    #[must_use]
    pub fn with_members(mut self, members: Vec<TeamMember>) -> Self {
        self.members = Some(members);
        self
    }

    /// Returns the team identifier.
    #[must_use]
    pub fn id(&self) -> TeamId {
        self.id
    }

    /// Returns the human-facing team code.
    #[must_use]
    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    /// Returns the team display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns whether the team is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the user that set up the team, if recorded.
    #[must_use]
    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    /// Returns the member rows; `None` when the members include was not requested.
    #[must_use]
    pub fn members(&self) -> Option<&[TeamMember]> {
        self.members.as_deref()
    }
}
