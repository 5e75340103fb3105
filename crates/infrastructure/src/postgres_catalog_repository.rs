use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use tracing::warn;

use dubox_application::{
    CatalogRepository, Paged, ProjectField, QueryExecution, Specification, TEAM_MEMBERS_INCLUDE,
    TeamField,
};
use dubox_core::{AppError, AppResult};
use dubox_domain::{Project, ProjectId, ProjectStatus, Team, TeamId, TeamMember, UserId};

use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::postgres_specification::{SqlColumn, SqlEntity, push_order_by, push_page, push_where};

/// PostgreSQL-backed catalogue repository executing specifications.
#[derive(Clone)]
pub struct PostgresCatalogRepository {
    pool: PgPool,
}

impl PostgresCatalogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl SqlEntity for Project {
    fn column(field: Self::Field) -> SqlColumn {
        match field {
            ProjectField::Id => SqlColumn::native("projects.id"),
            ProjectField::Code => SqlColumn::text("projects.code"),
            ProjectField::Name => SqlColumn::text("projects.name"),
            ProjectField::Status => SqlColumn::text("projects.status"),
            ProjectField::IsActive => SqlColumn::native("projects.is_active"),
            ProjectField::CreatedBy => {
                SqlColumn::uuid_text("NULLIF(LOWER(TRIM(projects.created_by)), '')")
            }
        }
    }
}

impl SqlEntity for Team {
    fn column(field: Self::Field) -> SqlColumn {
        match field {
            TeamField::Id => SqlColumn::native("teams.id"),
            TeamField::Code => SqlColumn::text("teams.code"),
            TeamField::Name => SqlColumn::text("teams.name"),
            TeamField::IsActive => SqlColumn::native("teams.is_active"),
            TeamField::CreatedBy => SqlColumn::native("teams.created_by"),
        }
    }
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: Uuid,
    code: String,
    name: String,
    status: String,
    is_active: bool,
    created_by: Option<String>,
}

#[derive(Debug, FromRow)]
struct TeamRow {
    id: Uuid,
    code: String,
    name: String,
    is_active: bool,
    created_by: Option<Uuid>,
    #[sqlx(default)]
    member_user_ids: Vec<Uuid>,
    #[sqlx(default)]
    member_is_active: Vec<bool>,
}

#[derive(Debug, FromRow)]
struct TeamMemberRow {
    team_id: Uuid,
    user_id: Uuid,
    is_active: bool,
}

const PROJECT_COLUMNS: &str = "SELECT projects.id, projects.code, projects.name, projects.status, \
     projects.is_active, projects.created_by FROM projects";

const TEAM_COLUMNS: &str =
    "SELECT teams.id, teams.code, teams.name, teams.is_active, teams.created_by";

// Member arrays share one ORDER BY so positions line up.
const TEAM_MEMBER_ARRAYS: &str = ", ARRAY(SELECT team_members.user_id FROM team_members \
     WHERE team_members.team_id = teams.id ORDER BY team_members.user_id) AS member_user_ids, \
     ARRAY(SELECT team_members.is_active FROM team_members \
     WHERE team_members.team_id = teams.id ORDER BY team_members.user_id) AS member_is_active";

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn find_project(&self, project_id: ProjectId) -> AppResult<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(
            r#"
            SELECT id, code, name, status, is_active, created_by
            FROM projects
            WHERE id = $1
            "#,
        )
        .bind(project_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load project '{project_id}': {error}"))
        })?;

        row.map(project_from_row).transpose()
    }

    async fn list_projects(
        &self,
        specification: &Specification<Project>,
    ) -> AppResult<Paged<Project>> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(PROJECT_COLUMNS);
        push_where::<Project>(&mut builder, specification.criteria());
        push_order_by::<Project>(&mut builder, &specification.ordering());
        if let Some(page) = specification.page() {
            push_page(&mut builder, page)?;
        }

        let rows = builder
            .build_query_as::<ProjectRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to list projects: {error}")))?;
        let projects = rows
            .into_iter()
            .map(project_from_row)
            .collect::<AppResult<Vec<_>>>()?;

        let Some(page) = specification.page() else {
            return Ok(Paged::unpaged(projects));
        };

        let total_count = self
            .count("projects", |builder| {
                push_where::<Project>(builder, specification.criteria());
            })
            .await?;
        Ok(Paged::new(projects, page, total_count))
    }

    async fn list_teams(&self, specification: &Specification<Team>) -> AppResult<Paged<Team>> {
        let include_members = specification.has_include(TEAM_MEMBERS_INCLUDE);
        let joined_members =
            include_members && specification.execution() == QueryExecution::SingleQuery;

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(TEAM_COLUMNS);
        if joined_members {
            builder.push(TEAM_MEMBER_ARRAYS);
        }
        builder.push(" FROM teams");
        push_where::<Team>(&mut builder, specification.criteria());
        push_order_by::<Team>(&mut builder, &specification.ordering());
        if let Some(page) = specification.page() {
            push_page(&mut builder, page)?;
        }

        let rows = builder
            .build_query_as::<TeamRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to list teams: {error}")))?;

        let mut split_members = if include_members && !joined_members {
            let team_ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
            self.load_members(team_ids).await?
        } else {
            BTreeMap::new()
        };

        let teams = rows
            .into_iter()
            .map(|row| {
                let members = if joined_members {
                    Some(joined_team_members(&row))
                } else if include_members {
                    Some(split_members.remove(&row.id).unwrap_or_default())
                } else {
                    None
                };
                team_from_row(row, members)
            })
            .collect::<AppResult<Vec<_>>>()?;

        let Some(page) = specification.page() else {
            return Ok(Paged::unpaged(teams));
        };

        let total_count = self
            .count("teams", |builder| {
                push_where::<Team>(builder, specification.criteria());
            })
            .await?;
        Ok(Paged::new(teams, page, total_count))
    }
}

impl PostgresCatalogRepository {
    async fn count(
        &self,
        table: &'static str,
        push_criteria: impl FnOnce(&mut QueryBuilder<'_, Postgres>),
    ) -> AppResult<u64> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM ");
        builder.push(table);
        push_criteria(&mut builder);

        let total = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to count {table}: {error}")))?;

        u64::try_from(total)
            .map_err(|error| AppError::Internal(format!("invalid {table} count: {error}")))
    }

    async fn load_members(
        &self,
        team_ids: Vec<Uuid>,
    ) -> AppResult<BTreeMap<Uuid, Vec<TeamMember>>> {
        if team_ids.is_empty() {
            return Ok(BTreeMap::new());
        }

        let rows = sqlx::query_as::<_, TeamMemberRow>(
            r#"
            SELECT team_id, user_id, is_active
            FROM team_members
            WHERE team_id = ANY($1)
            ORDER BY team_id, user_id
            "#,
        )
        .bind(team_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load team members: {error}")))?;

        let mut members: BTreeMap<Uuid, Vec<TeamMember>> = BTreeMap::new();
        for row in rows {
            members.entry(row.team_id).or_default().push(TeamMember {
                team_id: TeamId::from_uuid(row.team_id),
                user_id: UserId::from_uuid(row.user_id),
                is_active: row.is_active,
            });
        }

        Ok(members)
    }
}

fn project_from_row(row: ProjectRow) -> AppResult<Project> {
    let status = ProjectStatus::from_str(row.status.as_str()).map_err(|error| {
        AppError::Internal(format!(
            "failed to decode status of project '{}': {error}",
            row.id
        ))
    })?;

    Project::new(
        ProjectId::from_uuid(row.id),
        row.code,
        row.name,
        status,
        row.is_active,
        decode_creator(row.id, row.created_by.as_deref()),
    )
}

// Scope queries match creators on the trimmed, lowercased hyphenated form,
// so only that form counts here too.
fn decode_creator(project_id: Uuid, created_by: Option<&str>) -> Option<UserId> {
    let raw = created_by.map(str::trim).filter(|value| !value.is_empty())?;
    match UserId::parse(raw) {
        Ok(user_id) if user_id.to_string() == raw.to_ascii_lowercase() => Some(user_id),
        Ok(_) => {
            warn!(project_id = %project_id, "ignoring project creator not in hyphenated form");
            None
        }
        Err(error) => {
            warn!(project_id = %project_id, error = %error, "ignoring unparsable project creator");
            None
        }
    }
}

fn joined_team_members(row: &TeamRow) -> Vec<TeamMember> {
    row.member_user_ids
        .iter()
        .zip(row.member_is_active.iter())
        .map(|(user_id, is_active)| TeamMember {
            team_id: TeamId::from_uuid(row.id),
            user_id: UserId::from_uuid(*user_id),
            is_active: *is_active,
        })
        .collect()
}

fn team_from_row(row: TeamRow, members: Option<Vec<TeamMember>>) -> AppResult<Team> {
    let team = Team::new(
        TeamId::from_uuid(row.id),
        row.code,
        row.name,
        row.is_active,
        row.created_by.map(UserId::from_uuid),
    )?;

    Ok(match members {
        Some(members) => team.with_members(members),
        None => team,
    })
}
