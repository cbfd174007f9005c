use axum::Router;
use dotenvy::dotenv;
use helpdesk_iam::interface::{
    CreateRoleRequest, CreateUserRequest, CustomPermissionsRequest, DepartmentsResponse,
    EffectivePermissionsResponse, ErrorResponse, HierarchyNodeResponse, HierarchyResponse,
    LoginRequest, LoginResponse, MatrixCategoryResponse, MatrixEntryResponse, NavigationResponse,
    PermissionCheckResponse, PermissionGroupResponse, PermissionResponse, PermissionsListResponse,
    RoleChangesResponse, RoleDeletedResponse, RoleMatrixResponse, RolePermissionToggleResponse,
    RoleResponse, RolesListResponse, SaveRoleChangesResponse, UpdateUserRequest, UserListResponse,
    UserResponse,
};
use helpdesk_iam::{AppConfig, AppError, AppStateBuilder, create_router};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(utoipa::OpenApi)]
#[openapi(
    paths(
        helpdesk_iam::interface::http_handlers::login_handler,
        helpdesk_iam::interface::http_handlers::navigation_handler,
        helpdesk_iam::interface::http_handlers::list_permissions_handler,
        helpdesk_iam::interface::http_handlers::my_permissions_handler,
        helpdesk_iam::interface::http_handlers::list_users_handler,
        helpdesk_iam::interface::http_handlers::create_user_handler,
        helpdesk_iam::interface::http_handlers::get_user_handler,
        helpdesk_iam::interface::http_handlers::update_user_handler,
        helpdesk_iam::interface::http_handlers::delete_user_handler,
        helpdesk_iam::interface::http_handlers::duplicate_user_handler,
        helpdesk_iam::interface::http_handlers::toggle_user_status_handler,
        helpdesk_iam::interface::http_handlers::set_custom_permissions_handler,
        helpdesk_iam::interface::http_handlers::effective_permissions_handler,
        helpdesk_iam::interface::http_handlers::check_permission_handler,
        helpdesk_iam::interface::http_handlers::list_departments_handler,
        helpdesk_iam::interface::http_handlers::hierarchy_handler,
        helpdesk_iam::interface::http_handlers::list_roles_handler,
        helpdesk_iam::interface::http_handlers::create_role_handler,
        helpdesk_iam::interface::http_handlers::get_role_handler,
        helpdesk_iam::interface::http_handlers::delete_role_handler,
        helpdesk_iam::interface::http_handlers::duplicate_role_handler,
        helpdesk_iam::interface::http_handlers::toggle_role_permission_handler,
        helpdesk_iam::interface::http_handlers::role_matrix_handler,
        helpdesk_iam::interface::http_handlers::role_changes_handler,
        helpdesk_iam::interface::http_handlers::save_role_changes_handler,
    ),
    components(schemas(
        LoginRequest, LoginResponse, NavigationResponse, ErrorResponse,
        CreateUserRequest, UpdateUserRequest, CustomPermissionsRequest, UserResponse, UserListResponse,
        PermissionResponse, PermissionGroupResponse, PermissionsListResponse, EffectivePermissionsResponse,
        PermissionCheckResponse, DepartmentsResponse, HierarchyNodeResponse, HierarchyResponse,
        CreateRoleRequest, RoleResponse, RolesListResponse, RoleDeletedResponse, RolePermissionToggleResponse,
        MatrixEntryResponse, MatrixCategoryResponse, RoleMatrixResponse, RoleChangesResponse, SaveRoleChangesResponse
    )),
    tags(
        (name = "Session", description = "Sign-in and front-end navigation"),
        (name = "Permissions", description = "Permission catalog and effective permissions"),
        (name = "Users", description = "Directory administration"),
        (name = "Roles", description = "Role administration")
    ),
    modifiers(&CallerHeaderAddon)
)]
pub struct ApiDoc;

// Documents the caller header as an api key scheme
pub struct CallerHeaderAddon;

impl utoipa::Modify for CallerHeaderAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "callerId",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-user-id"))),
            );
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let app_state = AppStateBuilder::new()
        .with_config(config.clone())
        .build()
        .await?;

    let http_addr = config.http_address();
    let openapi = ApiDoc::openapi();

    let app = Router::new()
        .merge(create_router(app_state))
        .merge(SwaggerUi::new("/swagger").url("/openapi.json", openapi));

    let listener = TcpListener::bind(&http_addr)
        .await
        .map_err(|e| AppError::Initialization(format!("failed to bind {http_addr}: {e}")))?;
    info!("HTTP server running at http://{http_addr}");
    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Initialization(e.to_string()))
}
