//! Project aggregate as seen by the access layer.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use dubox_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::UserId;

/// Unique identifier for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectId(Uuid);

impl ProjectId {
    /// Creates a new random project identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a project identifier from an existing UUID value.
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

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ProjectId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Work is in progress.
    Active,
    /// Work is paused; only status transitions are accepted.
    OnHold,
    /// All work finished.
    Completed,
    /// Formally closed; only status transitions are accepted.
    Closed,
    /// Frozen for reference; no changes at all.
    Archived,
}

/// Kind of change a caller wants to apply to a project or its records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectChange {
    /// Any edit of the project or its boxes, activities, issues.
    General,
    /// A transition of the project status itself.
    StatusTransition,
}

impl ProjectStatus {
    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
            Self::Closed => "closed",
            Self::Archived => "archived",
        }
    }

    /// Returns whether the status accepts the requested kind of change.
    #[must_use]
    pub fn permits(&self, change: ProjectChange) -> bool {
        match (self, change) {
            (Self::Archived, _) => false,
            (Self::OnHold | Self::Closed, ProjectChange::General) => false,
            (Self::OnHold | Self::Closed, ProjectChange::StatusTransition) => true,
            (Self::Active | Self::Completed, _) => true,
        }
    }
}

impl FromStr for ProjectStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "active" => Ok(Self::Active),
            "on_hold" => Ok(Self::OnHold),
            "completed" => Ok(Self::Completed),
            "closed" => Ok(Self::Closed),
            "archived" => Ok(Self::Archived),
            _ => Err(AppError::Validation(format!(
                "unknown project status '{value}'"
            ))),
        }
    }
}

/// Project read model used by scoped listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    id: ProjectId,
    code: NonEmptyString,
    name: NonEmptyString,
    status: ProjectStatus,
    is_active: bool,
    created_by: Option<UserId>,
}

impl Project {
    /// Creates a validated project read model.
    pub fn new(
        id: ProjectId,
        code: impl Into<String>,
        name: impl Into<String>,
        status: ProjectStatus,
        is_active: bool,
        created_by: Option<UserId>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            code: NonEmptyString::new(code)?,
            name: NonEmptyString::new(name)?,
            status,
            is_active,
            created_by,
        })
    }

    /// Returns the project identifier.
    #[must_use]
    pub fn id(&self) -> ProjectId {
        self.id
    }

    /// Returns the human-facing project code, e.g. `P-100`.
    #[must_use]
    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    /// Returns the project display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> ProjectStatus {
        self.status
    }

    /// Returns `false` for soft-deleted projects.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Returns the creator, when the stored value is a valid user id.
    #[must_use]
    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }
}
