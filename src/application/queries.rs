use crate::domain::permission::{Permission, PermissionCategory};
use crate::domain::role::Role;
use serde::{Deserialize, Serialize};

/// Query for a user's resolved permission set
#[derive(Debug, Clone)]
pub struct GetEffectivePermissionsQuery {
    pub user_id: String,
}

/// Query for a single permission decision
#[derive(Debug, Clone)]
pub struct CheckPermissionQuery {
    pub user_id: String,
    pub permission_id: String,
}

/// Query to list the directory. `None` filters match everything.
#[derive(Debug, Clone, Default)]
pub struct ListUsersQuery {
    pub search: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
}

/// Query for the departments present in the directory
#[derive(Debug, Clone, Default)]
pub struct ListDepartmentsQuery;

/// Query for all roles with their member counts
#[derive(Debug, Clone, Default)]
pub struct ListRolesQuery;

/// Query for the role editor's permission grid
#[derive(Debug, Clone)]
pub struct GetRolePermissionMatrixQuery {
    pub role_id: String,
}

/// Query for the catalog grouped by category
#[derive(Debug, Clone, Default)]
pub struct ListPermissionsQuery;

#[derive(Debug, Clone)]
pub struct GetUserQuery {
    pub user_id: String,
}

#[derive(Debug, Clone)]
pub struct GetRoleQuery {
    pub role_id: String,
}

/// Query for the org chart, optionally narrowed by a search term
#[derive(Debug, Clone, Default)]
pub struct GetHierarchyQuery {
    pub search: Option<String>,
}

/// Query for the role editor's unsaved-changes state
#[derive(Debug, Clone, Default)]
pub struct GetRoleChangesQuery;

// ============================================================================
// READ MODELS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroupReadModel {
    pub category: PermissionCategory,
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePermissionsReadModel {
    pub user_id: String,
    pub role_id: String,
    pub role_resolved: bool,
    pub permissions: Vec<String>,
    pub groups: Vec<PermissionGroupReadModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSummaryReadModel {
    pub role: Role,
    pub user_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixEntryReadModel {
    pub permission: Permission,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixCategoryReadModel {
    pub category: PermissionCategory,
    pub enabled: usize,
    pub total: usize,
    pub entries: Vec<MatrixEntryReadModel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePermissionMatrixReadModel {
    pub role_id: String,
    pub role_name: String,
    pub is_custom: bool,
    pub categories: Vec<MatrixCategoryReadModel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleChangesReadModel {
    pub has_unsaved_changes: bool,
    pub save_delay_ms: u64,
}
