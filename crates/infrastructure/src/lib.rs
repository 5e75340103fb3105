//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_access_repository;
mod in_memory_specification;
mod postgres_access_repository;
mod postgres_catalog_repository;
mod postgres_specification;

pub use in_memory_access_repository::InMemoryAccessRepository;
pub use in_memory_specification::evaluate as evaluate_in_memory;
pub use postgres_access_repository::PostgresAccessRepository;
pub use postgres_catalog_repository::PostgresCatalogRepository;

use dubox_core::{AppError, AppResult};
use sqlx::PgPool;

/// Applies the bundled schema migrations.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))
}
