// Interface layer: HTTP API, DTOs

use crate::application::queries::{
    EffectivePermissionsReadModel, MatrixCategoryReadModel, PermissionGroupReadModel,
    RoleChangesReadModel, RolePermissionMatrixReadModel, RoleSummaryReadModel,
};
use crate::domain::hierarchy::HierarchyNode;
use crate::domain::navigation::Navigation;
use crate::domain::permission::Permission;
use crate::domain::role::Role;
use crate::domain::user::{User, UserStatus};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

// ============================================================================
// REQUESTS
// ============================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub role: String,
    pub department: String,
    #[serde(default)]
    pub manager: Option<String>,
    #[serde(default)]
    pub custom_permissions: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub role: String,
    pub department: String,
    #[serde(default)]
    pub manager: Option<String>,
    /// Defaults to whether the role is the administrator role.
    #[serde(default)]
    pub is_admin: Option<bool>,
}

#[derive(Deserialize, ToSchema)]
pub struct CustomPermissionsRequest {
    pub permissions: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateRoleRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersParams {
    pub search: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HierarchyParams {
    pub search: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NavigationParams {
    pub path: String,
}

// ============================================================================
// RESPONSES
// ============================================================================

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub department: String,
    pub manager: Option<String>,
    pub is_admin: bool,
    pub custom_permissions: Vec<String>,
    pub status: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let status = match user.status {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        };
        Self {
            custom_permissions: user.custom_permissions().to_vec(),
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            department: user.department,
            manager: user.manager,
            is_admin: user.is_admin,
            status: status.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub landing: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct NavigationResponse {
    pub path: String,
    /// `render` or `redirect`
    pub outcome: String,
    pub view: Option<String>,
    pub param: Option<String>,
    pub redirect_to: Option<String>,
}

impl NavigationResponse {
    pub fn new(path: String, navigation: Navigation) -> Self {
        match navigation {
            Navigation::Render { route } => Self {
                path,
                outcome: "render".to_string(),
                view: Some(route.view().to_string()),
                param: route.param().map(str::to_string),
                redirect_to: None,
            },
            Navigation::Redirect { to } => Self {
                path,
                outcome: "redirect".to_string(),
                view: None,
                param: None,
                redirect_to: Some(to),
            },
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PermissionResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
}

impl From<Permission> for PermissionResponse {
    fn from(permission: Permission) -> Self {
        Self {
            id: permission.id,
            name: permission.name,
            description: permission.description,
            category: permission.category.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PermissionGroupResponse {
    pub category: String,
    pub permissions: Vec<PermissionResponse>,
}

impl From<PermissionGroupReadModel> for PermissionGroupResponse {
    fn from(group: PermissionGroupReadModel) -> Self {
        Self {
            category: group.category.to_string(),
            permissions: group.permissions.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PermissionsListResponse {
    pub groups: Vec<PermissionGroupResponse>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct EffectivePermissionsResponse {
    pub user_id: String,
    pub role_id: String,
    pub role_resolved: bool,
    pub permissions: Vec<String>,
    pub groups: Vec<PermissionGroupResponse>,
}

impl From<EffectivePermissionsReadModel> for EffectivePermissionsResponse {
    fn from(model: EffectivePermissionsReadModel) -> Self {
        Self {
            user_id: model.user_id,
            role_id: model.role_id,
            role_resolved: model.role_resolved,
            permissions: model.permissions,
            groups: model.groups.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct PermissionCheckResponse {
    pub user_id: String,
    pub permission_id: String,
    pub allowed: bool,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DepartmentsResponse {
    pub departments: Vec<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RoleResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
    pub is_custom: bool,
    pub user_count: Option<usize>,
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self {
            id: role.id,
            name: role.name,
            description: role.description,
            permissions: role.permissions,
            is_custom: role.is_custom,
            user_count: None,
        }
    }
}

impl From<RoleSummaryReadModel> for RoleResponse {
    fn from(summary: RoleSummaryReadModel) -> Self {
        Self {
            user_count: Some(summary.user_count),
            ..RoleResponse::from(summary.role)
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RolesListResponse {
    pub roles: Vec<RoleResponse>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RoleDeletedResponse {
    pub role_id: String,
    pub orphaned_users: usize,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RolePermissionToggleResponse {
    pub role_id: String,
    pub permission_id: String,
    pub granted: bool,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MatrixEntryResponse {
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MatrixCategoryResponse {
    pub category: String,
    pub enabled: usize,
    pub total: usize,
    pub permissions: Vec<MatrixEntryResponse>,
}

impl From<MatrixCategoryReadModel> for MatrixCategoryResponse {
    fn from(model: MatrixCategoryReadModel) -> Self {
        Self {
            category: model.category.to_string(),
            enabled: model.enabled,
            total: model.total,
            permissions: model
                .entries
                .into_iter()
                .map(|e| MatrixEntryResponse {
                    id: e.permission.id,
                    name: e.permission.name,
                    description: e.permission.description,
                    enabled: e.enabled,
                })
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RoleMatrixResponse {
    pub role_id: String,
    pub role_name: String,
    pub is_custom: bool,
    pub categories: Vec<MatrixCategoryResponse>,
}

impl From<RolePermissionMatrixReadModel> for RoleMatrixResponse {
    fn from(model: RolePermissionMatrixReadModel) -> Self {
        Self {
            role_id: model.role_id,
            role_name: model.role_name,
            is_custom: model.is_custom,
            categories: model.categories.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct RoleChangesResponse {
    pub has_unsaved_changes: bool,
    pub save_delay_ms: u64,
}

impl From<RoleChangesReadModel> for RoleChangesResponse {
    fn from(model: RoleChangesReadModel) -> Self {
        Self {
            has_unsaved_changes: model.has_unsaved_changes,
            save_delay_ms: model.save_delay_ms,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SaveRoleChangesResponse {
    pub saved: bool,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HierarchyNodeResponse {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub department: String,
    pub direct_reports: usize,
    #[schema(no_recursion)]
    pub children: Vec<HierarchyNodeResponse>,
}

impl From<HierarchyNode> for HierarchyNodeResponse {
    fn from(node: HierarchyNode) -> Self {
        Self {
            user_id: node.user_id,
            name: node.name,
            email: node.email,
            role: node.role,
            department: node.department,
            direct_reports: node.direct_reports,
            children: node.children.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HierarchyResponse {
    pub roots: Vec<HierarchyNodeResponse>,
}

pub mod app_state;
pub mod http_handlers;

pub use app_state::AppState;
