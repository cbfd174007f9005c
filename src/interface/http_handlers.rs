use crate::application::commands::{
    CreateRoleCommand, CreateUserCommand, DeleteRoleCommand, DeleteUserCommand,
    DuplicateRoleCommand, DuplicateUserCommand, LoginCommand, SaveRoleChangesCommand,
    SetCustomPermissionsCommand, ToggleRolePermissionCommand, ToggleUserStatusCommand,
    UpdateUserCommand,
};
use crate::application::command_handlers::LoginOutcome;
use crate::application::queries::{
    CheckPermissionQuery, EffectivePermissionsReadModel, GetEffectivePermissionsQuery,
    GetHierarchyQuery, GetRoleChangesQuery, GetRolePermissionMatrixQuery, GetRoleQuery,
    GetUserQuery, ListDepartmentsQuery, ListPermissionsQuery, ListRolesQuery, ListUsersQuery,
    PermissionGroupReadModel, RoleChangesReadModel, RolePermissionMatrixReadModel,
    RoleSummaryReadModel,
};
use crate::application::services::ServiceError;
use crate::domain::hierarchy::HierarchyNode;
use crate::domain::navigation::navigate;
use crate::domain::role::Role;
use crate::domain::user::{ADMIN_ROLE_ID, User};
use crate::infrastructure::RepositoryError;
use crate::interface::app_state::AppState;
use crate::interface::{
    CreateRoleRequest, CreateUserRequest, CustomPermissionsRequest, DepartmentsResponse,
    EffectivePermissionsResponse, ErrorResponse, HierarchyParams, HierarchyResponse,
    ListUsersParams, LoginRequest, LoginResponse, NavigationParams, NavigationResponse,
    PermissionCheckResponse, PermissionsListResponse, RoleChangesResponse, RoleDeletedResponse,
    RoleMatrixResponse, RolePermissionToggleResponse, RoleResponse, RolesListResponse,
    SaveRoleChangesResponse, UpdateUserRequest, UserListResponse, UserResponse,
};
use axum::Json;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::{StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

const MANAGE_USERS: &str = "manage_users";
const MANAGE_ROLES: &str = "manage_roles";
const ACCESS_ADMIN_PANEL: &str = "access_admin_panel";
const USER_ID_HEADER: &str = "x-user-id";

/// Error half of every handler: a service error rendered as `{ "error": ... }`.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        ApiError(error)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::UserNotFound(_) | ServiceError::RoleNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Repository(RepositoryError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::RoleAlreadyExists(_)
            | ServiceError::EmailAlreadyExists(_)
            | ServiceError::Repository(RepositoryError::Conflict { .. }) => StatusCode::CONFLICT,
            ServiceError::SystemRoleImmutable(_)
            | ServiceError::PermissionDenied(_)
            | ServiceError::AccountInactive => StatusCode::FORBIDDEN,
            ServiceError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ServiceError::SaveFailed(_) | ServiceError::Dispatch(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// The caller named by the `x-user-id` header. Missing header is a 401.
pub struct RequireCaller {
    pub user_id: String,
}

impl<S> FromRequestParts<S> for RequireCaller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .ok_or(ApiError(ServiceError::Unauthenticated))?;
        Ok(RequireCaller { user_id })
    }
}

/// Like [`RequireCaller`] for routes that also serve anonymous visitors.
pub struct OptionalCaller {
    pub user_id: Option<String>,
}

impl<S> FromRequestParts<S> for OptionalCaller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user_id = RequireCaller::from_request_parts(parts, state)
            .await
            .ok()
            .map(|caller| caller.user_id);
        Ok(OptionalCaller { user_id })
    }
}

// --- SESSION HANDLERS ---

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/v1/session/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = LoginResponse),
        (status = 403, description = "Account inactive", body = ErrorResponse),
        (status = 404, description = "No user with that email", body = ErrorResponse),
    ),
    tags = ["Session"],
    description = "Sign in with a directory email and receive the landing route."
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let outcome: LoginOutcome = state
        .command_bus
        .dispatch(LoginCommand {
            email: payload.email,
        })
        .await?;
    Ok(Json(LoginResponse {
        user: outcome.user.into(),
        landing: outcome.landing,
    }))
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/navigation",
    params(NavigationParams),
    responses(
        (status = 200, description = "Render or redirect decision", body = NavigationResponse),
    ),
    tags = ["Session"],
    description = "Resolve a front-end path for the caller, or for an anonymous visitor."
)]
pub async fn navigation_handler(
    State(state): State<Arc<AppState>>,
    OptionalCaller { user_id }: OptionalCaller,
    Query(params): Query<NavigationParams>,
) -> ApiResult<Json<NavigationResponse>> {
    // Unknown or inactive callers navigate as anonymous visitors.
    let session = match user_id {
        Some(id) => state.authz_service.caller(&id).await.ok(),
        None => None,
    };
    let navigation = navigate(session.as_ref(), &params.path);
    Ok(Json(NavigationResponse::new(params.path, navigation)))
}

// --- PERMISSION HANDLERS ---

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/permissions",
    responses(
        (status = 200, description = "Permission catalog grouped by category", body = PermissionsListResponse),
    ),
    tags = ["Permissions"],
    description = "List the permission catalog."
)]
pub async fn list_permissions_handler(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<PermissionsListResponse>> {
    let groups: Vec<PermissionGroupReadModel> =
        state.query_bus.dispatch(ListPermissionsQuery).await?;
    Ok(Json(PermissionsListResponse {
        groups: groups.into_iter().map(Into::into).collect(),
    }))
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/me/permissions",
    responses(
        (status = 200, description = "Caller's effective permissions", body = EffectivePermissionsResponse),
        (status = 401, description = "Caller unknown", body = ErrorResponse),
    ),
    tags = ["Permissions"],
    description = "Effective permissions of the signed-in caller."
)]
pub async fn my_permissions_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id }: RequireCaller,
) -> ApiResult<Json<EffectivePermissionsResponse>> {
    let caller = state.authz_service.caller(&user_id).await?;
    let model: EffectivePermissionsReadModel = state
        .query_bus
        .dispatch(GetEffectivePermissionsQuery { user_id: caller.id })
        .await?;
    Ok(Json(model.into()))
}

// --- USER HANDLERS ---

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/users",
    params(ListUsersParams),
    responses(
        (status = 200, description = "Matching users", body = UserListResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse),
    ),
    tags = ["Users"],
    description = "List the directory filtered by search term, department and role."
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id }: RequireCaller,
    Query(params): Query<ListUsersParams>,
) -> ApiResult<Json<UserListResponse>> {
    state.authz_service.authorize(&user_id, ACCESS_ADMIN_PANEL).await?;
    let users: Vec<User> = state
        .query_bus
        .dispatch(ListUsersQuery {
            search: params.search,
            department: params.department,
            role: params.role,
        })
        .await?;
    Ok(Json(UserListResponse {
        users: users.into_iter().map(Into::into).collect(),
    }))
}

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid user", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse),
    ),
    tags = ["Users"],
    description = "Add a user. Requires manage_users."
)]
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id }: RequireCaller,
    Json(payload): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    state.authz_service.authorize(&user_id, MANAGE_USERS).await?;
    let user: User = state
        .command_bus
        .dispatch(CreateUserCommand {
            name: payload.name,
            email: payload.email,
            role: payload.role,
            department: payload.department,
            manager: payload.manager,
            custom_permissions: payload.custom_permissions,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/users/{user_id}",
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tags = ["Users"],
    description = "Fetch one user."
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id: caller_id }: RequireCaller,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    state
        .authz_service
        .authorize(&caller_id, ACCESS_ADMIN_PANEL)
        .await?;
    let user: User = state.query_bus.dispatch(GetUserQuery { user_id }).await?;
    Ok(Json(user.into()))
}

#[axum::debug_handler]
#[utoipa::path(
    put,
    path = "/v1/users/{user_id}",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid user", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Email already in use", body = ErrorResponse),
    ),
    tags = ["Users"],
    description = "Replace the editable fields of a user. Requires manage_users."
)]
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id: caller_id }: RequireCaller,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> ApiResult<Json<UserResponse>> {
    state.authz_service.authorize(&caller_id, MANAGE_USERS).await?;
    let is_admin = payload
        .is_admin
        .unwrap_or(payload.role == ADMIN_ROLE_ID);
    let user: User = state
        .command_bus
        .dispatch(UpdateUserCommand {
            user_id,
            name: payload.name,
            email: payload.email,
            role: payload.role,
            department: payload.department,
            manager: payload.manager,
            is_admin,
        })
        .await?;
    Ok(Json(user.into()))
}

#[axum::debug_handler]
#[utoipa::path(
    delete,
    path = "/v1/users/{user_id}",
    responses(
        (status = 204, description = "User deleted"),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tags = ["Users"],
    description = "Remove a user. Requires manage_users."
)]
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id: caller_id }: RequireCaller,
    Path(user_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.authz_service.authorize(&caller_id, MANAGE_USERS).await?;
    state
        .command_bus
        .dispatch::<_, ()>(DeleteUserCommand { user_id })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/v1/users/{user_id}/duplicate",
    responses(
        (status = 201, description = "Copy created", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tags = ["Users"],
    description = "Copy a user under a fresh id and a `copy.` email. Requires manage_users."
)]
pub async fn duplicate_user_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id: caller_id }: RequireCaller,
    Path(user_id): Path<String>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    state.authz_service.authorize(&caller_id, MANAGE_USERS).await?;
    let copy: User = state
        .command_bus
        .dispatch(DuplicateUserCommand { user_id })
        .await?;
    Ok((StatusCode::CREATED, Json(copy.into())))
}

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/v1/users/{user_id}/toggle-status",
    responses(
        (status = 200, description = "Status flipped", body = UserResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tags = ["Users"],
    description = "Flip a user between active and inactive. Requires manage_users."
)]
pub async fn toggle_user_status_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id: caller_id }: RequireCaller,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserResponse>> {
    state.authz_service.authorize(&caller_id, MANAGE_USERS).await?;
    let user: User = state
        .command_bus
        .dispatch(ToggleUserStatusCommand { user_id })
        .await?;
    Ok(Json(user.into()))
}

#[axum::debug_handler]
#[utoipa::path(
    put,
    path = "/v1/users/{user_id}/custom-permissions",
    request_body = CustomPermissionsRequest,
    responses(
        (status = 200, description = "Custom permissions replaced", body = UserResponse),
        (status = 400, description = "Unknown permission", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tags = ["Users"],
    description = "Replace the permissions granted to a user individually. Requires manage_users."
)]
pub async fn set_custom_permissions_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id: caller_id }: RequireCaller,
    Path(user_id): Path<String>,
    Json(payload): Json<CustomPermissionsRequest>,
) -> ApiResult<Json<UserResponse>> {
    state.authz_service.authorize(&caller_id, MANAGE_USERS).await?;
    let user: User = state
        .command_bus
        .dispatch(SetCustomPermissionsCommand {
            user_id,
            permissions: payload.permissions,
        })
        .await?;
    Ok(Json(user.into()))
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/users/{user_id}/effective-permissions",
    responses(
        (status = 200, description = "Effective permissions", body = EffectivePermissionsResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tags = ["Users"],
    description = "Role permissions united with custom grants, grouped by category."
)]
pub async fn effective_permissions_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id: caller_id }: RequireCaller,
    Path(user_id): Path<String>,
) -> ApiResult<Json<EffectivePermissionsResponse>> {
    state
        .authz_service
        .authorize(&caller_id, ACCESS_ADMIN_PANEL)
        .await?;
    let model: EffectivePermissionsReadModel = state
        .query_bus
        .dispatch(GetEffectivePermissionsQuery { user_id })
        .await?;
    Ok(Json(model.into()))
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/users/{user_id}/permissions/{permission_id}",
    responses(
        (status = 200, description = "Permission decision", body = PermissionCheckResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    ),
    tags = ["Users"],
    description = "Whether a user holds a permission."
)]
pub async fn check_permission_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id: caller_id }: RequireCaller,
    Path((user_id, permission_id)): Path<(String, String)>,
) -> ApiResult<Json<PermissionCheckResponse>> {
    state
        .authz_service
        .authorize(&caller_id, ACCESS_ADMIN_PANEL)
        .await?;
    let allowed: bool = state
        .query_bus
        .dispatch(CheckPermissionQuery {
            user_id: user_id.clone(),
            permission_id: permission_id.clone(),
        })
        .await?;
    Ok(Json(PermissionCheckResponse {
        user_id,
        permission_id,
        allowed,
    }))
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/departments",
    responses(
        (status = 200, description = "Departments in first-seen order", body = DepartmentsResponse),
    ),
    tags = ["Users"],
    description = "Distinct departments of the directory."
)]
pub async fn list_departments_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id }: RequireCaller,
) -> ApiResult<Json<DepartmentsResponse>> {
    state.authz_service.authorize(&user_id, ACCESS_ADMIN_PANEL).await?;
    let departments: Vec<String> = state.query_bus.dispatch(ListDepartmentsQuery).await?;
    Ok(Json(DepartmentsResponse { departments }))
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/hierarchy",
    params(HierarchyParams),
    responses(
        (status = 200, description = "Reporting forest", body = HierarchyResponse),
    ),
    tags = ["Users"],
    description = "Org chart built from manager names."
)]
pub async fn hierarchy_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id }: RequireCaller,
    Query(params): Query<HierarchyParams>,
) -> ApiResult<Json<HierarchyResponse>> {
    state.authz_service.authorize(&user_id, ACCESS_ADMIN_PANEL).await?;
    let roots: Vec<HierarchyNode> = state
        .query_bus
        .dispatch(GetHierarchyQuery {
            search: params.search,
        })
        .await?;
    Ok(Json(HierarchyResponse {
        roots: roots.into_iter().map(Into::into).collect(),
    }))
}

// --- ROLE HANDLERS ---

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/roles",
    responses(
        (status = 200, description = "Roles with member counts", body = RolesListResponse),
    ),
    tags = ["Roles"],
    description = "List all roles."
)]
pub async fn list_roles_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id }: RequireCaller,
) -> ApiResult<Json<RolesListResponse>> {
    state.authz_service.authorize(&user_id, ACCESS_ADMIN_PANEL).await?;
    let roles: Vec<RoleSummaryReadModel> = state.query_bus.dispatch(ListRolesQuery).await?;
    Ok(Json(RolesListResponse {
        roles: roles.into_iter().map(Into::into).collect(),
    }))
}

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/v1/roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = RoleResponse),
        (status = 400, description = "Invalid role", body = ErrorResponse),
        (status = 409, description = "Role already exists", body = ErrorResponse),
    ),
    tags = ["Roles"],
    description = "Create a custom role. Requires manage_roles."
)]
pub async fn create_role_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id }: RequireCaller,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    state.authz_service.authorize(&user_id, MANAGE_ROLES).await?;
    let role: Role = state
        .command_bus
        .dispatch(CreateRoleCommand {
            name: payload.name,
            description: payload.description,
            permissions: payload.permissions,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(role.into())))
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/roles/{role_id}",
    responses(
        (status = 200, description = "Role", body = RoleResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
    ),
    tags = ["Roles"],
    description = "Fetch one role."
)]
pub async fn get_role_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id }: RequireCaller,
    Path(role_id): Path<String>,
) -> ApiResult<Json<RoleResponse>> {
    state.authz_service.authorize(&user_id, ACCESS_ADMIN_PANEL).await?;
    let role: Role = state.query_bus.dispatch(GetRoleQuery { role_id }).await?;
    Ok(Json(role.into()))
}

#[axum::debug_handler]
#[utoipa::path(
    delete,
    path = "/v1/roles/{role_id}",
    responses(
        (status = 200, description = "Role deleted", body = RoleDeletedResponse),
        (status = 403, description = "System role", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
    ),
    tags = ["Roles"],
    description = "Delete a custom role. Users keep the dangling role id. Requires manage_roles."
)]
pub async fn delete_role_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id }: RequireCaller,
    Path(role_id): Path<String>,
) -> ApiResult<Json<RoleDeletedResponse>> {
    state.authz_service.authorize(&user_id, MANAGE_ROLES).await?;
    let orphaned_users: usize = state
        .command_bus
        .dispatch(DeleteRoleCommand {
            role_id: role_id.clone(),
        })
        .await?;
    Ok(Json(RoleDeletedResponse {
        role_id,
        orphaned_users,
    }))
}

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/v1/roles/{role_id}/duplicate",
    responses(
        (status = 201, description = "Copy created", body = RoleResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
    ),
    tags = ["Roles"],
    description = "Copy a role into a new custom role. Requires manage_roles."
)]
pub async fn duplicate_role_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id }: RequireCaller,
    Path(role_id): Path<String>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    state.authz_service.authorize(&user_id, MANAGE_ROLES).await?;
    let copy: Role = state
        .command_bus
        .dispatch(DuplicateRoleCommand { role_id })
        .await?;
    Ok((StatusCode::CREATED, Json(copy.into())))
}

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/v1/roles/{role_id}/permissions/{permission_id}/toggle",
    responses(
        (status = 200, description = "Permission toggled", body = RolePermissionToggleResponse),
        (status = 400, description = "Unknown permission", body = ErrorResponse),
        (status = 403, description = "System role", body = ErrorResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
    ),
    tags = ["Roles"],
    description = "Grant or revoke one permission on a custom role. Requires manage_roles."
)]
pub async fn toggle_role_permission_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id }: RequireCaller,
    Path((role_id, permission_id)): Path<(String, String)>,
) -> ApiResult<Json<RolePermissionToggleResponse>> {
    state.authz_service.authorize(&user_id, MANAGE_ROLES).await?;
    let granted: bool = state
        .command_bus
        .dispatch(ToggleRolePermissionCommand {
            role_id: role_id.clone(),
            permission_id: permission_id.clone(),
        })
        .await?;
    Ok(Json(RolePermissionToggleResponse {
        role_id,
        permission_id,
        granted,
    }))
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/roles/{role_id}/matrix",
    responses(
        (status = 200, description = "Permission grid", body = RoleMatrixResponse),
        (status = 404, description = "Role not found", body = ErrorResponse),
    ),
    tags = ["Roles"],
    description = "Every catalog permission per category with the role's enabled flags."
)]
pub async fn role_matrix_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id }: RequireCaller,
    Path(role_id): Path<String>,
) -> ApiResult<Json<RoleMatrixResponse>> {
    state.authz_service.authorize(&user_id, ACCESS_ADMIN_PANEL).await?;
    let matrix: RolePermissionMatrixReadModel = state
        .query_bus
        .dispatch(GetRolePermissionMatrixQuery { role_id })
        .await?;
    Ok(Json(matrix.into()))
}

#[axum::debug_handler]
#[utoipa::path(
    get,
    path = "/v1/role-changes",
    responses(
        (status = 200, description = "Unsaved-changes state", body = RoleChangesResponse),
    ),
    tags = ["Roles"],
    description = "Whether the role editor holds unsaved edits."
)]
pub async fn role_changes_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id }: RequireCaller,
) -> ApiResult<Json<RoleChangesResponse>> {
    state.authz_service.authorize(&user_id, ACCESS_ADMIN_PANEL).await?;
    let changes: RoleChangesReadModel = state.query_bus.dispatch(GetRoleChangesQuery).await?;
    Ok(Json(changes.into()))
}

#[axum::debug_handler]
#[utoipa::path(
    post,
    path = "/v1/role-changes/save",
    responses(
        (status = 200, description = "Changes saved", body = SaveRoleChangesResponse),
    ),
    tags = ["Roles"],
    description = "Save pending role edits after the configured delay. Requires manage_roles."
)]
pub async fn save_role_changes_handler(
    State(state): State<Arc<AppState>>,
    RequireCaller { user_id }: RequireCaller,
) -> ApiResult<Json<SaveRoleChangesResponse>> {
    state.authz_service.authorize(&user_id, MANAGE_ROLES).await?;
    let saved: bool = state.command_bus.dispatch(SaveRoleChangesCommand).await?;
    Ok(Json(SaveRoleChangesResponse { saved }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::validators::ValidationError;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (ServiceError::UserNotFound("9".into()), StatusCode::NOT_FOUND),
            (ServiceError::RoleNotFound("x".into()), StatusCode::NOT_FOUND),
            (
                ServiceError::Validation(ValidationError::UnknownPermission("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (ServiceError::EmailAlreadyExists("a@b.c".into()), StatusCode::CONFLICT),
            (ServiceError::RoleAlreadyExists("qa".into()), StatusCode::CONFLICT),
            (ServiceError::SystemRoleImmutable("it_admin".into()), StatusCode::FORBIDDEN),
            (ServiceError::PermissionDenied("manage_users".into()), StatusCode::FORBIDDEN),
            (ServiceError::AccountInactive, StatusCode::FORBIDDEN),
            (ServiceError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ServiceError::Dispatch("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError(error).status(), status);
        }
    }
}
