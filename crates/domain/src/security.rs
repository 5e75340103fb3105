use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use dubox_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Role name granting full administration and unrestricted visibility.
pub const SYSTEM_ADMIN_ROLE: &str = "SystemAdmin";
/// Role name for users who create and run their own projects and teams.
pub const PROJECT_MANAGER_ROLE: &str = "ProjectManager";
/// Role name for read-only users with unrestricted visibility.
pub const VIEWER_ROLE: &str = "Viewer";

/// Functional area a permission applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionModule {
    /// Construction projects.
    Projects,
    /// Prefabricated boxes.
    Boxes,
    /// Box activities.
    Activities,
    /// Work teams.
    Teams,
    /// Materials and stock.
    Materials,
    /// Work inspection requests.
    Wir,
    /// Quality issues.
    QualityIssues,
    /// Reports.
    Reports,
    /// User administration.
    Users,
    /// Role administration.
    Roles,
    /// Group administration.
    Groups,
    /// Departments.
    Departments,
    /// Factory and site locations.
    Locations,
    /// Dashboards.
    Dashboard,
    /// Audit logs.
    AuditLogs,
    /// Progress updates.
    ProgressUpdates,
    /// Permission administration.
    Permissions,
}

impl PermissionModule {
    /// Returns a stable storage value for this module.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Boxes => "boxes",
            Self::Activities => "activities",
            Self::Teams => "teams",
            Self::Materials => "materials",
            Self::Wir => "wir",
            Self::QualityIssues => "quality-issues",
            Self::Reports => "reports",
            Self::Users => "users",
            Self::Roles => "roles",
            Self::Groups => "groups",
            Self::Departments => "departments",
            Self::Locations => "locations",
            Self::Dashboard => "dashboard",
            Self::AuditLogs => "audit-logs",
            Self::ProgressUpdates => "progress-updates",
            Self::Permissions => "permissions",
        }
    }
}

impl FromStr for PermissionModule {
    type Err = AppError;

    /// Accepts the storage value (`quality-issues`) as well as the display
    /// name used by administrators (`QualityIssues`).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "projects" => Ok(Self::Projects),
            "boxes" => Ok(Self::Boxes),
            "activities" => Ok(Self::Activities),
            "teams" => Ok(Self::Teams),
            "materials" => Ok(Self::Materials),
            "wir" => Ok(Self::Wir),
            "qualityissues" => Ok(Self::QualityIssues),
            "reports" => Ok(Self::Reports),
            "users" => Ok(Self::Users),
            "roles" => Ok(Self::Roles),
            "groups" => Ok(Self::Groups),
            "departments" => Ok(Self::Departments),
            "locations" => Ok(Self::Locations),
            "dashboard" => Ok(Self::Dashboard),
            "auditlogs" => Ok(Self::AuditLogs),
            "progressupdates" => Ok(Self::ProgressUpdates),
            "permissions" => Ok(Self::Permissions),
            _ => Err(AppError::Validation(format!(
                "unknown permission module '{value}'"
            ))),
        }
    }
}

/// Operation a permission allows inside a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    /// Read lists and details.
    View,
    /// Create new records.
    Create,
    /// Edit existing records.
    Edit,
    /// Delete records.
    Delete,
    /// Export data.
    Export,
    /// Import data.
    Import,
    /// Full management of the module.
    Manage,
    /// Change a record status.
    UpdateStatus,
    /// Assign a team to an activity.
    AssignTeam,
    /// Record progress.
    UpdateProgress,
    /// Add or remove team members.
    ManageMembers,
    /// Restock materials.
    Restock,
    /// Approve an inspection.
    Approve,
    /// Reject an inspection.
    Reject,
    /// Review an inspection.
    Review,
    /// Resolve a quality issue.
    Resolve,
    /// Assign roles to users.
    AssignRoles,
    /// Assign users to groups.
    AssignGroups,
    /// Assign permissions to roles.
    AssignPermissions,
}

impl PermissionAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
            Self::Export => "export",
            Self::Import => "import",
            Self::Manage => "manage",
            Self::UpdateStatus => "update-status",
            Self::AssignTeam => "assign-team",
            Self::UpdateProgress => "update-progress",
            Self::ManageMembers => "manage-members",
            Self::Restock => "restock",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Review => "review",
            Self::Resolve => "resolve",
            Self::AssignRoles => "assign-roles",
            Self::AssignGroups => "assign-groups",
            Self::AssignPermissions => "assign-permissions",
        }
    }
}

impl FromStr for PermissionAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match normalize_token(value).as_str() {
            "view" => Ok(Self::View),
            "create" => Ok(Self::Create),
            "edit" => Ok(Self::Edit),
            "delete" => Ok(Self::Delete),
            "export" => Ok(Self::Export),
            "import" => Ok(Self::Import),
            "manage" => Ok(Self::Manage),
            "updatestatus" => Ok(Self::UpdateStatus),
            "assignteam" => Ok(Self::AssignTeam),
            "updateprogress" => Ok(Self::UpdateProgress),
            "managemembers" => Ok(Self::ManageMembers),
            "restock" => Ok(Self::Restock),
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "review" => Ok(Self::Review),
            "resolve" => Ok(Self::Resolve),
            "assignroles" => Ok(Self::AssignRoles),
            "assigngroups" => Ok(Self::AssignGroups),
            "assignpermissions" => Ok(Self::AssignPermissions),
            _ => Err(AppError::Validation(format!(
                "unknown permission action '{value}'"
            ))),
        }
    }
}

fn normalize_token(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|character| !matches!(character, '-' | '_' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Capability key: one action inside one module, e.g. `boxes.edit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PermissionKey {
    module: PermissionModule,
    action: PermissionAction,
}

impl PermissionKey {
    /// Creates a permission key.
    #[must_use]
    pub fn new(module: PermissionModule, action: PermissionAction) -> Self {
        Self { module, action }
    }

    /// Parses a key from separately stored module and action columns.
    pub fn from_parts(module: &str, action: &str) -> AppResult<Self> {
        Ok(Self {
            module: PermissionModule::from_str(module)?,
            action: PermissionAction::from_str(action)?,
        })
    }

    /// Returns the module.
    #[must_use]
    pub fn module(&self) -> PermissionModule {
        self.module
    }

    /// Returns the action.
    #[must_use]
    pub fn action(&self) -> PermissionAction {
        self.action
    }
}

impl Display for PermissionKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}.{}", self.module.as_str(), self.action.as_str())
    }
}

impl FromStr for PermissionKey {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let Some((module, action)) = value.split_once('.') else {
            return Err(AppError::Validation(format!(
                "permission key '{value}' must look like 'module.action'"
            )));
        };

        Self::from_parts(module, action)
    }
}

/// Validated role name. Names are compared exactly, including case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleName(String);

impl RoleName {
    /// Creates a validated role name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "role name must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Borrow<str> for RoleName {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for RoleName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Coarse role category selecting the visibility algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleTier {
    /// Full administration, sees everything.
    SystemAdmin,
    /// Read-only, sees everything.
    Viewer,
    /// Sees own work plus admin-coordinated work of their teams.
    ProjectManager,
    /// Every other user, e.g. site engineers and foremen.
    Other,
}

impl RoleTier {
    /// Returns whether the tier bypasses project and team scoping.
    #[must_use]
    pub fn has_unrestricted_scope(&self) -> bool {
        matches!(self, Self::SystemAdmin | Self::Viewer)
    }
}

/// Effective role set of one user: direct roles united with group roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveRoles(BTreeSet<RoleName>);

impl EffectiveRoles {
    /// Returns an empty role set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a role set; duplicates collapse.
    #[must_use]
    pub fn from_names(names: impl IntoIterator<Item = RoleName>) -> Self {
        Self(names.into_iter().collect())
    }

    /// Returns whether the set contains the named role.
    #[must_use]
    pub fn contains(&self, role_name: &str) -> bool {
        self.0.contains(role_name)
    }

    /// Returns whether the set contains at least one of the named roles.
    #[must_use]
    pub fn contains_any(&self, role_names: &[&str]) -> bool {
        role_names.iter().any(|role_name| self.contains(role_name))
    }

    /// Classifies the set. SystemAdmin wins over Viewer, Viewer over ProjectManager.
    #[must_use]
    pub fn tier(&self) -> RoleTier {
        if self.contains(SYSTEM_ADMIN_ROLE) {
            RoleTier::SystemAdmin
        } else if self.contains(VIEWER_ROLE) {
            RoleTier::Viewer
        } else if self.contains(PROJECT_MANAGER_ROLE) {
            RoleTier::ProjectManager
        } else {
            RoleTier::Other
        }
    }

    /// Returns whether the user may create, update or delete data.
    #[must_use]
    pub fn can_modify_data(&self) -> bool {
        !self.contains(VIEWER_ROLE)
    }

    /// Returns whether the user may create projects and teams.
    #[must_use]
    pub fn can_create_projects_and_teams(&self) -> bool {
        self.contains_any(&[SYSTEM_ADMIN_ROLE, PROJECT_MANAGER_ROLE])
    }

    /// Iterates role names in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &RoleName> {
        self.0.iter()
    }

    /// Returns the number of distinct roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the user holds no role at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
