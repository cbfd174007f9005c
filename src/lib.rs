pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod interface;
pub mod test_utils;

use application::{
    command_bus::CommandBus,
    command_handlers::{
        CreateRoleCommandHandler, CreateUserCommandHandler, DeleteRoleCommandHandler,
        DeleteUserCommandHandler, DuplicateRoleCommandHandler, DuplicateUserCommandHandler,
        LoginCommandHandler, SaveRoleChangesCommandHandler, SetCustomPermissionsCommandHandler,
        ToggleRolePermissionCommandHandler, ToggleUserStatusCommandHandler,
        UpdateUserCommandHandler,
    },
    commands::{
        CreateRoleCommand, CreateUserCommand, DeleteRoleCommand, DeleteUserCommand,
        DuplicateRoleCommand, DuplicateUserCommand, LoginCommand, SaveRoleChangesCommand,
        SetCustomPermissionsCommand, ToggleRolePermissionCommand, ToggleUserStatusCommand,
        UpdateUserCommand,
    },
    events::{EventStore, InMemoryEventStore},
    queries::{
        CheckPermissionQuery, GetEffectivePermissionsQuery, GetHierarchyQuery,
        GetRoleChangesQuery, GetRolePermissionMatrixQuery, GetRoleQuery, GetUserQuery,
        ListDepartmentsQuery, ListPermissionsQuery, ListRolesQuery, ListUsersQuery,
    },
    query_bus::QueryBus,
    query_handlers::{
        CheckPermissionQueryHandler, GetEffectivePermissionsQueryHandler,
        GetHierarchyQueryHandler, GetRoleChangesQueryHandler,
        GetRolePermissionMatrixQueryHandler, GetRoleQueryHandler, GetUserQueryHandler,
        ListDepartmentsQueryHandler, ListPermissionsQueryHandler, ListRolesQueryHandler,
        ListUsersQueryHandler,
    },
    resolver::PermissionResolver,
    services::{AuthZService, RoleChangeTracker},
};
use axum::Router;
use axum::routing::{get, post, put};
use infrastructure::{
    InMemoryPermissionRepository, InMemoryRoleRepository, InMemoryUserRepository,
    PermissionRepository, RoleRepository, UserRepository, seed,
};
use interface::AppState;
use interface::http_handlers::*;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Application configuration read from the environment
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub http_host: String,
    pub http_port: String,
    pub seed_demo_data: bool,
    pub save_delay_ms: u64,
    pub strict_role_references: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_host: "127.0.0.1".to_string(),
            http_port: "8080".to_string(),
            seed_demo_data: true,
            save_delay_ms: 0,
            strict_role_references: false,
        }
    }
}

impl AppConfig {
    /// Creates a new AppConfig from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Missing keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let http_host = lookup("HTTP_HOST").unwrap_or(defaults.http_host);
        let http_port = match lookup("HTTP_PORT") {
            Some(port) => {
                port.parse::<u16>().map_err(|_| {
                    ConfigError::Invalid(format!("HTTP_PORT must be a port number, got {port:?}"))
                })?;
                port
            }
            None => defaults.http_port,
        };
        let seed_demo_data = match lookup("SEED_DEMO_DATA") {
            Some(value) => parse_flag("SEED_DEMO_DATA", &value)?,
            None => defaults.seed_demo_data,
        };
        let save_delay_ms = match lookup("SAVE_DELAY_MS") {
            Some(value) => value.parse::<u64>().map_err(|_| {
                ConfigError::Invalid(format!("SAVE_DELAY_MS must be milliseconds, got {value:?}"))
            })?,
            None => defaults.save_delay_ms,
        };
        let strict_role_references = match lookup("STRICT_ROLE_REFERENCES") {
            Some(value) => parse_flag("STRICT_ROLE_REFERENCES", &value)?,
            None => defaults.strict_role_references,
        };

        Ok(AppConfig {
            http_host,
            http_port,
            seed_demo_data,
            save_delay_ms,
            strict_role_references,
        })
    }

    /// Creates an AppConfig with custom values (useful for testing)
    pub fn new(
        http_host: String,
        http_port: String,
        seed_demo_data: bool,
        save_delay_ms: u64,
        strict_role_references: bool,
    ) -> Self {
        Self {
            http_host,
            http_port,
            seed_demo_data,
            save_delay_ms,
            strict_role_references,
        }
    }

    /// Creates the HTTP address string from host and port
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    pub fn save_delay(&self) -> Duration {
        Duration::from_millis(self.save_delay_ms)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid(format!(
            "{key} must be a boolean, got {value:?}"
        ))),
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// APPLICATION BUILDER
// ============================================================================

/// Builder for creating application state with better testability
#[derive(Debug, Default)]
pub struct AppStateBuilder {
    config: Option<AppConfig>,
}

impl AppStateBuilder {
    /// Creates a new AppStateBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the application state. Without a config the defaults apply.
    pub async fn build(self) -> Result<Arc<AppState>, AppError> {
        let config = self.config.unwrap_or_default();

        let users = if config.seed_demo_data {
            seed::demo_users()
        } else {
            Vec::new()
        };
        info!(
            users = users.len(),
            strict_role_references = config.strict_role_references,
            "Loading directory"
        );

        // Create repositories
        let user_repo = Arc::new(InMemoryUserRepository::new(users)) as Arc<dyn UserRepository>;
        let role_repo =
            Arc::new(InMemoryRoleRepository::new(seed::system_roles())) as Arc<dyn RoleRepository>;
        let permission_repo =
            Arc::new(InMemoryPermissionRepository::seeded()) as Arc<dyn PermissionRepository>;
        let event_store = Arc::new(InMemoryEventStore::new()) as Arc<dyn EventStore>;

        // Create services
        let resolver = PermissionResolver::new();
        let role_changes = RoleChangeTracker::new(config.save_delay());
        let authz_service = Arc::new(AuthZService::new(
            user_repo.clone(),
            role_repo.clone(),
            resolver,
        ));

        // Create CQRS buses
        let command_bus = Arc::new(CommandBus::new());
        let query_bus = Arc::new(QueryBus::new());

        let repos = Repositories {
            user_repo: user_repo.clone(),
            role_repo: role_repo.clone(),
            permission_repo: permission_repo.clone(),
            event_store: event_store.clone(),
        };

        Self::register_command_handlers(
            &command_bus,
            &repos,
            &role_changes,
            config.strict_role_references,
        )
        .await;
        Self::register_query_handlers(&query_bus, &repos, &role_changes, resolver).await;

        Ok(Arc::new(AppState {
            user_repo,
            role_repo,
            permission_repo,
            event_store,
            resolver,
            authz_service,
            role_changes,
            command_bus,
            query_bus,
        }))
    }

    /// Registers all command handlers
    async fn register_command_handlers(
        command_bus: &Arc<CommandBus>,
        repos: &Repositories,
        role_changes: &RoleChangeTracker,
        strict_role_references: bool,
    ) {
        command_bus
            .register_handler::<LoginCommand, _>(LoginCommandHandler::new(
                repos.user_repo.clone(),
                repos.event_store.clone(),
            ))
            .await;

        command_bus
            .register_handler::<CreateRoleCommand, _>(CreateRoleCommandHandler::new(
                repos.role_repo.clone(),
                repos.permission_repo.clone(),
                role_changes.clone(),
                repos.event_store.clone(),
            ))
            .await;

        command_bus
            .register_handler::<DuplicateRoleCommand, _>(DuplicateRoleCommandHandler::new(
                repos.role_repo.clone(),
                role_changes.clone(),
                repos.event_store.clone(),
            ))
            .await;

        command_bus
            .register_handler::<DeleteRoleCommand, _>(DeleteRoleCommandHandler::new(
                repos.role_repo.clone(),
                repos.user_repo.clone(),
                role_changes.clone(),
                repos.event_store.clone(),
            ))
            .await;

        command_bus
            .register_handler::<ToggleRolePermissionCommand, _>(
                ToggleRolePermissionCommandHandler::new(
                    repos.role_repo.clone(),
                    repos.permission_repo.clone(),
                    role_changes.clone(),
                    repos.event_store.clone(),
                ),
            )
            .await;

        command_bus
            .register_handler::<SaveRoleChangesCommand, _>(SaveRoleChangesCommandHandler::new(
                repos.role_repo.clone(),
                role_changes.clone(),
                repos.event_store.clone(),
            ))
            .await;

        command_bus
            .register_handler::<CreateUserCommand, _>(CreateUserCommandHandler::new(
                repos.user_repo.clone(),
                repos.role_repo.clone(),
                repos.permission_repo.clone(),
                strict_role_references,
                repos.event_store.clone(),
            ))
            .await;

        command_bus
            .register_handler::<UpdateUserCommand, _>(UpdateUserCommandHandler::new(
                repos.user_repo.clone(),
                repos.role_repo.clone(),
                strict_role_references,
                repos.event_store.clone(),
            ))
            .await;

        command_bus
            .register_handler::<DuplicateUserCommand, _>(DuplicateUserCommandHandler::new(
                repos.user_repo.clone(),
                repos.event_store.clone(),
            ))
            .await;

        command_bus
            .register_handler::<DeleteUserCommand, _>(DeleteUserCommandHandler::new(
                repos.user_repo.clone(),
                repos.event_store.clone(),
            ))
            .await;

        command_bus
            .register_handler::<ToggleUserStatusCommand, _>(ToggleUserStatusCommandHandler::new(
                repos.user_repo.clone(),
                repos.event_store.clone(),
            ))
            .await;

        command_bus
            .register_handler::<SetCustomPermissionsCommand, _>(
                SetCustomPermissionsCommandHandler::new(
                    repos.user_repo.clone(),
                    repos.permission_repo.clone(),
                    repos.event_store.clone(),
                ),
            )
            .await;
    }

    /// Registers all query handlers
    async fn register_query_handlers(
        query_bus: &Arc<QueryBus>,
        repos: &Repositories,
        role_changes: &RoleChangeTracker,
        resolver: PermissionResolver,
    ) {
        query_bus
            .register_handler::<GetEffectivePermissionsQuery, _>(
                GetEffectivePermissionsQueryHandler::new(
                    repos.user_repo.clone(),
                    repos.role_repo.clone(),
                    repos.permission_repo.clone(),
                    resolver,
                ),
            )
            .await;

        query_bus
            .register_handler::<CheckPermissionQuery, _>(CheckPermissionQueryHandler::new(
                repos.user_repo.clone(),
                repos.role_repo.clone(),
                resolver,
            ))
            .await;

        query_bus
            .register_handler::<ListUsersQuery, _>(ListUsersQueryHandler::new(
                repos.user_repo.clone(),
            ))
            .await;

        query_bus
            .register_handler::<ListDepartmentsQuery, _>(ListDepartmentsQueryHandler::new(
                repos.user_repo.clone(),
            ))
            .await;

        query_bus
            .register_handler::<ListRolesQuery, _>(ListRolesQueryHandler::new(
                repos.role_repo.clone(),
                repos.user_repo.clone(),
            ))
            .await;

        query_bus
            .register_handler::<GetRolePermissionMatrixQuery, _>(
                GetRolePermissionMatrixQueryHandler::new(
                    repos.role_repo.clone(),
                    repos.permission_repo.clone(),
                ),
            )
            .await;

        query_bus
            .register_handler::<ListPermissionsQuery, _>(ListPermissionsQueryHandler::new(
                repos.permission_repo.clone(),
                resolver,
            ))
            .await;

        query_bus
            .register_handler::<GetUserQuery, _>(GetUserQueryHandler::new(repos.user_repo.clone()))
            .await;

        query_bus
            .register_handler::<GetRoleQuery, _>(GetRoleQueryHandler::new(repos.role_repo.clone()))
            .await;

        query_bus
            .register_handler::<GetHierarchyQuery, _>(GetHierarchyQueryHandler::new(
                repos.user_repo.clone(),
            ))
            .await;

        query_bus
            .register_handler::<GetRoleChangesQuery, _>(GetRoleChangesQueryHandler::new(
                role_changes.clone(),
            ))
            .await;
    }
}

struct Repositories {
    user_repo: Arc<dyn UserRepository>,
    role_repo: Arc<dyn RoleRepository>,
    permission_repo: Arc<dyn PermissionRepository>,
    event_store: Arc<dyn EventStore>,
}

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Initialization error: {0}")]
    Initialization(String),
}

// ============================================================================
// ROUTER
// ============================================================================

/// The `/v1` API with state attached.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let v1_routes = Router::new()
        .route("/session/login", post(login_handler))
        .route("/navigation", get(navigation_handler))
        .route("/permissions", get(list_permissions_handler))
        .route("/me/permissions", get(my_permissions_handler))
        .route("/users", get(list_users_handler).post(create_user_handler))
        .route(
            "/users/{user_id}",
            get(get_user_handler)
                .put(update_user_handler)
                .delete(delete_user_handler),
        )
        .route("/users/{user_id}/duplicate", post(duplicate_user_handler))
        .route(
            "/users/{user_id}/toggle-status",
            post(toggle_user_status_handler),
        )
        .route(
            "/users/{user_id}/custom-permissions",
            put(set_custom_permissions_handler),
        )
        .route(
            "/users/{user_id}/effective-permissions",
            get(effective_permissions_handler),
        )
        .route(
            "/users/{user_id}/permissions/{permission_id}",
            get(check_permission_handler),
        )
        .route("/departments", get(list_departments_handler))
        .route("/hierarchy", get(hierarchy_handler))
        .route("/roles", get(list_roles_handler).post(create_role_handler))
        .route("/role-changes", get(role_changes_handler))
        .route("/role-changes/save", post(save_role_changes_handler))
        .route(
            "/roles/{role_id}",
            get(get_role_handler).delete(delete_role_handler),
        )
        .route("/roles/{role_id}/duplicate", post(duplicate_role_handler))
        .route(
            "/roles/{role_id}/permissions/{permission_id}/toggle",
            post(toggle_role_permission_handler),
        )
        .route("/roles/{role_id}/matrix", get(role_matrix_handler));

    Router::new().nest("/v1", v1_routes).with_state(app_state)
}

// ============================================================================
// TESTING UTILITIES
// ============================================================================
