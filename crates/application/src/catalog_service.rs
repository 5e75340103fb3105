//! Scoped project and team listings.
//!
//! Every listing folds the caller's visibility scope into the specification
//! before any request filter, so storage never sees an unscoped query for a
//! restricted caller.


use std::sync::Arc;

use tracing::debug;

use dubox_core::{AppError, AppResult, CurrentUser};
use dubox_domain::{Project, ProjectChange, ProjectId, ProjectScope, Team, TeamScope};

use crate::{
    CatalogRepository, Condition, IncludePath, Page, Paged, PagingConfig, ProjectField,
    ProjectListQuery, Specification, TEAM_MEMBERS_INCLUDE, TeamField, TeamListQuery,
    VisibilityScopeResolver,
};

/// Application service for visibility-scoped catalogue reads.
#[derive(Clone)]
pub struct CatalogService {
    visibility: VisibilityScopeResolver,
    repository: Arc<dyn CatalogRepository>,
    paging: PagingConfig,
}

impl CatalogService {
    /// Creates a new catalogue service.
    #[must_use]
    pub fn new(
        visibility: VisibilityScopeResolver,
        repository: Arc<dyn CatalogRepository>,
        paging: PagingConfig,
    ) -> Self {
        Self {
            visibility,
            repository,
            paging,
        }
    }

    /// Lists the projects visible to the caller.
    pub async fn list_projects(
        &self,
        actor: &CurrentUser,
        query: ProjectListQuery,
    ) -> AppResult<Paged<Project>> {
        let page = self.paging.normalize(query.page, query.page_size);
        let scope = self.visibility.resolve_accessible_projects(actor).await?;
        if scope.is_empty() {
            debug!("project listing skipped for empty scope");
            return Ok(Paged::empty(page));
        }

        let specification = Self::project_specification(&scope, &query, page);
        self.repository.list_projects(&specification).await
    }

    /// Lists the teams visible to the caller.
    pub async fn list_teams(
        &self,
        actor: &CurrentUser,
        query: TeamListQuery,
    ) -> AppResult<Paged<Team>> {
        let page = self.paging.normalize(query.page, query.page_size);
        let scope = self.visibility.resolve_accessible_teams(actor).await?;
        if scope.is_empty() {
            debug!("team listing skipped for empty scope");
            return Ok(Paged::empty(page));
        }

        let specification = Self::team_specification(&scope, &query, page)?;
        self.repository.list_teams(&specification).await
    }

    /// Loads one project the caller may see.
    pub async fn find_project(
        &self,
        actor: &CurrentUser,
        project_id: ProjectId,
    ) -> AppResult<Project> {
        let scope = self.visibility.resolve_accessible_projects(actor).await?;
        let project = self
            .repository
            .find_project(project_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("project '{project_id}' does not exist")))?;

        if !scope.allows(&project_id) {
            return Err(AppError::Forbidden(format!(
                "project '{project_id}' is outside the caller's scope"
            )));
        }

        Ok(project)
    }

    /// Ensures the caller may apply `change` to the project: writes must be
    /// allowed at all, the project must be in scope and its status must
    /// accept the change.
    pub async fn ensure_project_writable(
        &self,
        actor: &CurrentUser,
        project_id: ProjectId,
        change: ProjectChange,
    ) -> AppResult<Project> {
        self.visibility.require_modify(actor).await?;
        let project = self.find_project(actor, project_id).await?;

        if !project.status().permits(change) {
            return Err(AppError::Conflict(format!(
                "project '{}' is {} and does not accept this change",
                project.code(),
                project.status().as_str()
            )));
        }

        Ok(project)
    }

    /// Builds the project listing specification: scope, request filters,
    /// ordering by code and the normalized page.
    #[must_use]
    pub fn project_specification(
        scope: &ProjectScope,
        query: &ProjectListQuery,
        page: Page,
    ) -> Specification<Project> {
        let mut specification =
            Specification::<Project>::new().restrict_to(ProjectField::Id, scope);

        if let Some(search) = normalized_search(query.search.as_deref()) {
            specification = specification.any_of([
                Condition::contains_text(ProjectField::Code, search),
                Condition::contains_text(ProjectField::Name, search),
            ]);
        }

        if let Some(status) = query.status {
            specification =
                specification.filter(Condition::equals(ProjectField::Status, status.as_str()));
        }

        if !query.include_inactive {
            specification = specification.filter(Condition::equals(ProjectField::IsActive, true));
        }

        specification.order_by(ProjectField::Code).paginate(page)
    }

    /// Builds the team listing specification, ordered by name.
    pub fn team_specification(
        scope: &TeamScope,
        query: &TeamListQuery,
        page: Page,
    ) -> AppResult<Specification<Team>> {
        let mut specification = Specification::<Team>::new().restrict_to(TeamField::Id, scope);

        if let Some(search) = normalized_search(query.search.as_deref()) {
            specification = specification.any_of([
                Condition::contains_text(TeamField::Code, search),
                Condition::contains_text(TeamField::Name, search),
            ]);
        }

        if let Some(is_active) = query.is_active {
            specification = specification.filter(Condition::equals(TeamField::IsActive, is_active));
        }

        if query.include_members {
            specification = specification.include(IncludePath::collection(TEAM_MEMBERS_INCLUDE)?);
        }

        Ok(specification.order_by(TeamField::Name).paginate(page))
    }
}

fn normalized_search(search: Option<&str>) -> Option<&str> {
    search.map(str::trim).filter(|value| !value.is_empty())
}
