use async_trait::async_trait;

use dubox_application::{
    AccessReadSession, AccessRepository, RolePermissionRow, TeamMembershipLink,
};
use dubox_core::{AppError, AppResult};
use dubox_domain::{ProjectId, RoleName, TeamId, UserId};

use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;


/// PostgreSQL-backed access repository.
///
/// Every session runs in its own read-only `REPEATABLE READ` transaction, so
/// all reads of one resolution see the same snapshot.
#[derive(Clone)]
pub struct PostgresAccessRepository {
    pool: PgPool,
}

impl PostgresAccessRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessRepository for PostgresAccessRepository {
    async fn begin_read(&self) -> AppResult<Box<dyn AccessReadSession>> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to configure read snapshot: {error}"))
            })?;

        Ok(Box::new(PostgresAccessSession { transaction }))
    }
}

struct PostgresAccessSession {
    transaction: Transaction<'static, Postgres>,
}

#[derive(Debug, FromRow)]
struct RolePermissionSqlRow {
    role_name: String,
    module: String,
    action: String,
    is_active: bool,
}

#[derive(Debug, FromRow)]
struct MembershipRow {
    team_id: Uuid,
    created_by: Option<Uuid>,
}

#[async_trait]
impl AccessReadSession for PostgresAccessSession {
    async fn is_active_user(&mut self, user_id: UserId) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM users
                WHERE id = $1 AND is_active
            )
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_one(&mut *self.transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load user '{user_id}': {error}"))
        })
    }

    async fn list_direct_role_names(&mut self, user_id: UserId) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT roles.name
            FROM user_roles
            INNER JOIN roles ON roles.id = user_roles.role_id
            WHERE user_roles.user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list direct roles for user '{user_id}': {error}"
            ))
        })
    }

    async fn list_group_role_names(&mut self, user_id: UserId) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT roles.name
            FROM user_groups
            INNER JOIN group_roles ON group_roles.group_id = user_groups.group_id
            INNER JOIN roles ON roles.id = group_roles.role_id
            WHERE user_groups.user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list group roles for user '{user_id}': {error}"
            ))
        })
    }

    async fn list_role_permissions(
        &mut self,
        role_names: &[RoleName],
    ) -> AppResult<Vec<RolePermissionRow>> {
        let names: Vec<String> = role_names
            .iter()
            .map(|role_name| role_name.as_str().to_owned())
            .collect();

        let rows = sqlx::query_as::<_, RolePermissionSqlRow>(
            r#"
            SELECT roles.name AS role_name, permissions.module, permissions.action,
                permissions.is_active
            FROM role_permissions
            INNER JOIN roles ON roles.id = role_permissions.role_id
            INNER JOIN permissions ON permissions.id = role_permissions.permission_id
            WHERE roles.name = ANY($1)
            "#,
        )
        .bind(names)
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list role permissions: {error}"))
        })?;

        Ok(rows
            .into_iter()
            .map(|row| RolePermissionRow {
                role_name: row.role_name,
                module: row.module,
                action: row.action,
                is_active: row.is_active,
            })
            .collect())
    }

    async fn list_projects_created_by(
        &mut self,
        creators: &[UserId],
    ) -> AppResult<Vec<ProjectId>> {
        if creators.is_empty() {
            return Ok(Vec::new());
        }

        let creators: Vec<String> = creators.iter().map(ToString::to_string).collect();
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM projects
            WHERE LOWER(TRIM(created_by)) = ANY($1)
            "#,
        )
        .bind(creators)
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list projects by creator: {error}"))
        })?;

        Ok(ids.into_iter().map(ProjectId::from_uuid).collect())
    }

    async fn list_teams_created_by(&mut self, user_id: UserId) -> AppResult<Vec<TeamId>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id
            FROM teams
            WHERE created_by = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list teams created by user '{user_id}': {error}"
            ))
        })?;

        Ok(ids.into_iter().map(TeamId::from_uuid).collect())
    }

    async fn list_active_memberships(
        &mut self,
        user_id: UserId,
    ) -> AppResult<Vec<TeamMembershipLink>> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT teams.id AS team_id, teams.created_by
            FROM team_members
            INNER JOIN teams ON teams.id = team_members.team_id
            WHERE team_members.user_id = $1 AND team_members.is_active
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to list team memberships for user '{user_id}': {error}"
            ))
        })?;

        Ok(rows
            .into_iter()
            .map(|row| TeamMembershipLink {
                team_id: TeamId::from_uuid(row.team_id),
                team_created_by: row.created_by.map(UserId::from_uuid),
            })
            .collect())
    }

    async fn finish(self: Box<Self>) -> AppResult<()> {
        self.transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to close read snapshot: {error}"))
        })
    }
}
