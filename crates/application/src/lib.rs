//! Application services and ports.

#![forbid(unsafe_code)]

mod access_ports;
mod catalog_ports;
mod catalog_service;
mod permission_checker;
mod role_resolver;
mod specification;
mod visibility_scope_resolver;

#[cfg(test)]
mod test_support;

pub use access_ports::{AccessReadSession, AccessRepository, RolePermissionRow, TeamMembershipLink};
pub use catalog_ports::{
    CatalogRepository, ProjectField, ProjectListQuery, TEAM_MEMBERS_INCLUDE, TeamField,
    TeamListQuery,
};
pub use catalog_service::CatalogService;
pub use permission_checker::PermissionChecker;
pub use role_resolver::RoleResolver;
pub use specification::{
    Comparison, Condition, Criterion, DEFAULT_PAGE_SIZE, FilterValue, IncludePath, MAX_PAGE_SIZE,
    Page, Paged, PagingConfig, QueryEntity, QueryExecution, QueryRecord, SortDirection, SortKey,
    Specification,
};
pub use visibility_scope_resolver::{VisibilityProfile, VisibilityScopeResolver};
