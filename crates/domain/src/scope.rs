//! Visibility scopes computed for one user.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{ProjectId, TeamId};

/// Set of records a user may see.
///
/// `Unrestricted` and an empty `Restricted` set are opposite answers: the
/// first allows every record, the second allows none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "kind",
    content = "ids",
    rename_all = "snake_case",
    bound(deserialize = "Id: Deserialize<'de> + Ord")
)]
pub enum AccessScope<Id> {
    /// Every record, including ones that do not exist yet.
    Unrestricted,
    /// Only the listed records.
    Restricted(BTreeSet<Id>),
}

/// Projects visible to one user.
pub type ProjectScope = AccessScope<ProjectId>;

/// Teams visible to one user.
pub type TeamScope = AccessScope<TeamId>;

impl<Id: Ord> AccessScope<Id> {
    /// Returns the fail-closed scope that allows nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::Restricted(BTreeSet::new())
    }

    /// Builds a restricted scope; duplicates collapse.
    #[must_use]
    pub fn restricted(ids: impl IntoIterator<Item = Id>) -> Self {
        Self::Restricted(ids.into_iter().collect())
    }

    /// Returns whether the scope admits the record.
    #[must_use]
    pub fn allows(&self, id: &Id) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::Restricted(ids) => ids.contains(id),
        }
    }

    /// Returns whether the scope is unrestricted.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }

    /// Returns whether the scope admits no record at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Unrestricted => false,
            Self::Restricted(ids) => ids.is_empty(),
        }
    }

    /// Returns the explicit id set, or `None` when unrestricted.
    #[must_use]
    pub fn restricted_ids(&self) -> Option<&BTreeSet<Id>> {
        match self {
            Self::Unrestricted => None,
            Self::Restricted(ids) => Some(ids),
        }
    }
}
