use async_trait::async_trait;

use dubox_core::AppResult;
use dubox_domain::{Project, ProjectId, ProjectStatus, Team};

use crate::{FilterValue, Paged, QueryEntity, QueryRecord, Specification};

/// Collection include that loads team members.
pub const TEAM_MEMBERS_INCLUDE: &str = "Members";

/// Queryable project fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectField {
    /// Project id.
    Id,
    /// Short project code.
    Code,
    /// Display name.
    Name,
    /// Lifecycle status, compared as its stable string.
    Status,
    /// Active flag.
    IsActive,
    /// Creator id.
    CreatedBy,
}

/// Queryable team fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamField {
    /// Team id.
    Id,
    /// Short team code.
    Code,
    /// Display name.
    Name,
    /// Active flag.
    IsActive,
    /// Creator id.
    CreatedBy,
}

impl QueryEntity for Project {
    type Field = ProjectField;

    fn key_field() -> Self::Field {
        ProjectField::Id
    }
}

impl QueryRecord for Project {
    fn field_value(&self, field: Self::Field) -> Option<FilterValue> {
        match field {
            ProjectField::Id => Some(self.id().into()),
            ProjectField::Code => Some(self.code().into()),
            ProjectField::Name => Some(self.name().into()),
            ProjectField::Status => Some(self.status().as_str().into()),
            ProjectField::IsActive => Some(self.is_active().into()),
            ProjectField::CreatedBy => self.created_by().map(FilterValue::from),
        }
    }
}

impl QueryEntity for Team {
    type Field = TeamField;

    fn key_field() -> Self::Field {
        TeamField::Id
    }
}

impl QueryRecord for Team {
    fn field_value(&self, field: Self::Field) -> Option<FilterValue> {
        match field {
            TeamField::Id => Some(self.id().into()),
            TeamField::Code => Some(self.code().into()),
            TeamField::Name => Some(self.name().into()),
            TeamField::IsActive => Some(self.is_active().into()),
            TeamField::CreatedBy => self.created_by().map(FilterValue::from),
        }
    }
}

/// Storage port executing catalogue specifications.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Loads one project regardless of visibility.
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<Project>>;

    /// Executes a project specification.
    async fn list_projects(&self, specification: &Specification<Project>)
    -> AppResult<Paged<Project>>;

    /// Executes a team specification, honouring the members include.
    async fn list_teams(&self, specification: &Specification<Team>) -> AppResult<Paged<Team>>;
}

/// Ad-hoc project list filters from a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectListQuery {
    /// Case-insensitive search across code and name.
    pub search: Option<String>,
    /// Exact status filter.
    pub status: Option<ProjectStatus>,
    /// Include deactivated projects.
    pub include_inactive: bool,
    /// Raw page number; normalized before use.
    pub page: i64,
    /// Raw page size; normalized before use.
    pub page_size: i64,
}

/// Ad-hoc team list filters from a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamListQuery {
    /// Case-insensitive search across code and name.
    pub search: Option<String>,
    /// Exact active flag filter.
    pub is_active: Option<bool>,
    /// Load team members with each team.
    pub include_members: bool,
    /// Raw page number; normalized before use.
    pub page: i64,
    /// Raw page size; normalized before use.
    pub page_size: i64,
}
