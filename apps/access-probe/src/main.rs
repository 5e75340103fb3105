//! Dubox access probe.
//!
//! Resolves one user's roles, permissions and visibility scopes against a
//! live database and prints the result as JSON.

#![forbid(unsafe_code)]

mod probe_config;

use std::sync::Arc;

use clap::Parser;
use dubox_application::{
    CatalogService, Paged, PermissionChecker, ProjectListQuery, VisibilityProfile,
    VisibilityScopeResolver,
};
use dubox_core::{AppError, CurrentUser};
use dubox_domain::{Project, ProjectId, TeamId};
use dubox_infrastructure::{PostgresAccessRepository, PostgresCatalogRepository, run_migrations};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use uuid::Uuid;

use crate::probe_config::{ProbeConfig, init_tracing};

#[derive(Debug, Parser)]
#[command(name = "dubox-access-probe", about = "Inspect what a user may see and do")]
struct Args {
    /// User id to resolve.
    user_id: String,

    /// Project id to check access for. May be repeated.
    #[arg(long = "project")]
    projects: Vec<Uuid>,

    /// Team id to check access for. May be repeated.
    #[arg(long = "team")]
    teams: Vec<Uuid>,

    /// Include the first page of visible projects.
    #[arg(long)]
    list_projects: bool,

    /// Apply database migrations before probing.
    #[arg(long)]
    migrate: bool,
}

#[derive(Debug, Serialize)]
struct AccessCheck {
    id: Uuid,
    accessible: bool,
}

#[derive(Debug, Serialize)]
struct ProbeReport {
    profile: VisibilityProfile,
    permissions: Vec<String>,
    project_checks: Vec<AccessCheck>,
    team_checks: Vec<AccessCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    visible_projects: Option<Paged<Project>>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let config = ProbeConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    if args.migrate {
        run_migrations(&pool).await?;
        info!("database migrations applied successfully");
    }

    let access_repository = Arc::new(PostgresAccessRepository::new(pool.clone()));
    let visibility = VisibilityScopeResolver::new(access_repository.clone());
    let permissions = PermissionChecker::new(access_repository);
    let catalog = CatalogService::new(
        visibility.clone(),
        Arc::new(PostgresCatalogRepository::new(pool)),
        config.paging,
    );

    let actor = CurrentUser::authenticated(args.user_id);
    let profile = visibility.resolve_profile(&actor).await?;
    info!(tier = ?profile.tier, "resolved visibility profile");

    let project_checks = args
        .projects
        .into_iter()
        .map(|id| AccessCheck {
            id,
            accessible: profile.projects.allows(&ProjectId::from_uuid(id)),
        })
        .collect();
    let team_checks = args
        .teams
        .into_iter()
        .map(|id| AccessCheck {
            id,
            accessible: profile.teams.allows(&TeamId::from_uuid(id)),
        })
        .collect();

    let visible_projects = if args.list_projects {
        Some(
            catalog
                .list_projects(&actor, ProjectListQuery::default())
                .await?,
        )
    } else {
        None
    };

    let report = ProbeReport {
        permissions: permissions
            .effective_permissions(&actor)
            .await?
            .into_iter()
            .map(|permission| permission.to_string())
            .collect(),
        profile,
        project_checks,
        team_checks,
        visible_projects,
    };

    let rendered = serde_json::to_string_pretty(&report)
        .map_err(|error| AppError::Internal(format!("failed to render report: {error}")))?;
    println!("{rendered}");
    Ok(())
}
