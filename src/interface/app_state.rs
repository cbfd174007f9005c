use crate::application::command_bus::CommandBus;
use crate::application::events::EventStore;
use crate::application::query_bus::QueryBus;
use crate::application::resolver::PermissionResolver;
use crate::application::services::{AuthZService, RoleChangeTracker};
use crate::infrastructure::{PermissionRepository, RoleRepository, UserRepository};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub user_repo: Arc<dyn UserRepository>,
    pub role_repo: Arc<dyn RoleRepository>,
    pub permission_repo: Arc<dyn PermissionRepository>,
    pub event_store: Arc<dyn EventStore>,
    pub resolver: PermissionResolver,
    pub authz_service: Arc<AuthZService>,
    pub role_changes: RoleChangeTracker,
    pub command_bus: Arc<CommandBus>,
    pub query_bus: Arc<QueryBus>,
}
