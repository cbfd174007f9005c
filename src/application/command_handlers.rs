use super::command_bus::CommandHandler;
use super::commands::{
    CreateRoleCommand, CreateUserCommand, DeleteRoleCommand, DeleteUserCommand,
    DuplicateRoleCommand, DuplicateUserCommand, LoginCommand, SaveRoleChangesCommand,
    SetCustomPermissionsCommand, ToggleRolePermissionCommand, ToggleUserStatusCommand,
    UpdateUserCommand,
};
use super::events::{EventFactory, EventStore};
use super::services::{RoleChangeTracker, ServiceError};
use super::validators::{
    CommandValidator, CreateRoleCommandValidator, CreateUserCommandValidator,
    PermissionCatalogValidator, UpdateUserCommandValidator,
};
use crate::domain::navigation::landing_path;
use crate::domain::role::Role;
use crate::domain::user::User;
use crate::infrastructure::{PermissionRepository, RoleRepository, UserRepository};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

// ============================================================================
// SESSION
// ============================================================================

/// Result of a successful sign-in
#[derive(Debug, Clone, Serialize)]
pub struct LoginOutcome {
    pub user: User,
    pub landing: String,
}

/// Login command handler
pub struct LoginCommandHandler {
    user_repo: Arc<dyn UserRepository>,
    event_store: Arc<dyn EventStore>,
}

impl LoginCommandHandler {
    pub fn new(user_repo: Arc<dyn UserRepository>, event_store: Arc<dyn EventStore>) -> Self {
        Self {
            user_repo,
            event_store,
        }
    }
}

#[async_trait]
impl CommandHandler<LoginCommand> for LoginCommandHandler {
    type Result = LoginOutcome;
    type Error = ServiceError;

    #[instrument(name = "login_command_handler", skip(self, command))]
    async fn handle(&self, command: LoginCommand) -> Result<Self::Result, Self::Error> {
        let email = command.email.trim();
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or_else(|| ServiceError::UserNotFound(email.to_string()))?;

        if !user.is_active() {
            info!(user_id = %user.id, "Sign-in refused for inactive account");
            return Err(ServiceError::AccountInactive);
        }

        self.event_store
            .store_event(&EventFactory::user_logged_in(
                user.id.clone(),
                user.email.clone(),
            ))
            .await;

        let landing = landing_path(Some(&user)).to_string();
        Ok(LoginOutcome { user, landing })
    }
}

// ============================================================================
// ROLE ADMINISTRATION
// ============================================================================

/// Loads a role that an administrator may edit.
async fn find_custom_role(
    role_repo: &Arc<dyn RoleRepository>,
    role_id: &str,
) -> Result<Role, ServiceError> {
    let role = role_repo
        .find_by_id(role_id)
        .await?
        .ok_or_else(|| ServiceError::RoleNotFound(role_id.to_string()))?;
    if role.is_system() {
        return Err(ServiceError::SystemRoleImmutable(role.id));
    }
    Ok(role)
}

/// Create role command handler
pub struct CreateRoleCommandHandler {
    role_repo: Arc<dyn RoleRepository>,
    validator: CreateRoleCommandValidator,
    changes: RoleChangeTracker,
    event_store: Arc<dyn EventStore>,
}

impl CreateRoleCommandHandler {
    pub fn new(
        role_repo: Arc<dyn RoleRepository>,
        permission_repo: Arc<dyn PermissionRepository>,
        changes: RoleChangeTracker,
        event_store: Arc<dyn EventStore>,
    ) -> Self {
        let validator = CreateRoleCommandValidator::new(role_repo.clone(), permission_repo);
        Self {
            role_repo,
            validator,
            changes,
            event_store,
        }
    }
}

#[async_trait]
impl CommandHandler<CreateRoleCommand> for CreateRoleCommandHandler {
    type Result = Role;
    type Error = ServiceError;

    #[instrument(name = "create_role_command_handler", skip(self, command), fields(name = %command.name))]
    async fn handle(&self, command: CreateRoleCommand) -> Result<Self::Result, Self::Error> {
        self.validator.validate(&command).await?;

        let role = Role::new_custom(&command.name, &command.description, command.permissions);
        let role = self.role_repo.insert_role(role).await?;
        self.changes.mark_dirty();

        self.event_store
            .store_event(&EventFactory::role_created(role.id.clone(), role.name.clone()))
            .await;
        Ok(role)
    }
}

/// Duplicate role command handler
pub struct DuplicateRoleCommandHandler {
    role_repo: Arc<dyn RoleRepository>,
    changes: RoleChangeTracker,
    event_store: Arc<dyn EventStore>,
}

impl DuplicateRoleCommandHandler {
    pub fn new(
        role_repo: Arc<dyn RoleRepository>,
        changes: RoleChangeTracker,
        event_store: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            role_repo,
            changes,
            event_store,
        }
    }
}

#[async_trait]
impl CommandHandler<DuplicateRoleCommand> for DuplicateRoleCommandHandler {
    type Result = Role;
    type Error = ServiceError;

    #[instrument(name = "duplicate_role_command_handler", skip(self, command), fields(role_id = %command.role_id))]
    async fn handle(&self, command: DuplicateRoleCommand) -> Result<Self::Result, Self::Error> {
        let source = self
            .role_repo
            .find_by_id(&command.role_id)
            .await?
            .ok_or_else(|| ServiceError::RoleNotFound(command.role_id.clone()))?;

        // Copies made within the same millisecond get a counter appended.
        let stamp = chrono::Utc::now().timestamp_millis().to_string();
        let mut copy = source.duplicate(&stamp);
        let mut attempt = 1;
        while self.role_repo.find_by_id(&copy.id).await?.is_some() {
            attempt += 1;
            copy = source.duplicate(&format!("{stamp}_{attempt}"));
        }

        let copy = self.role_repo.insert_role(copy).await?;
        self.changes.mark_dirty();

        self.event_store
            .store_event(&EventFactory::role_duplicated(copy.id.clone(), source.id))
            .await;
        Ok(copy)
    }
}

/// Delete role command handler. Returns the number of users left without a role.
pub struct DeleteRoleCommandHandler {
    role_repo: Arc<dyn RoleRepository>,
    user_repo: Arc<dyn UserRepository>,
    changes: RoleChangeTracker,
    event_store: Arc<dyn EventStore>,
}

impl DeleteRoleCommandHandler {
    pub fn new(
        role_repo: Arc<dyn RoleRepository>,
        user_repo: Arc<dyn UserRepository>,
        changes: RoleChangeTracker,
        event_store: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            role_repo,
            user_repo,
            changes,
            event_store,
        }
    }
}

#[async_trait]
impl CommandHandler<DeleteRoleCommand> for DeleteRoleCommandHandler {
    type Result = usize;
    type Error = ServiceError;

    #[instrument(name = "delete_role_command_handler", skip(self, command), fields(role_id = %command.role_id))]
    async fn handle(&self, command: DeleteRoleCommand) -> Result<Self::Result, Self::Error> {
        let role = find_custom_role(&self.role_repo, &command.role_id).await?;
        self.role_repo.delete_role(&role.id).await?;
        self.changes.mark_dirty();

        let orphaned = self
            .user_repo
            .list_users()
            .await?
            .iter()
            .filter(|u| u.role == role.id)
            .count();
        if orphaned > 0 {
            warn!(
                role_id = %role.id,
                orphaned_users = orphaned,
                "Deleted role is still assigned; those users keep only custom permissions"
            );
        }

        self.event_store
            .store_event(&EventFactory::role_deleted(role.id, orphaned))
            .await;
        Ok(orphaned)
    }
}

/// Toggle role permission command handler. Returns whether the permission is now granted.
pub struct ToggleRolePermissionCommandHandler {
    role_repo: Arc<dyn RoleRepository>,
    permissions: PermissionCatalogValidator,
    changes: RoleChangeTracker,
    event_store: Arc<dyn EventStore>,
}

impl ToggleRolePermissionCommandHandler {
    pub fn new(
        role_repo: Arc<dyn RoleRepository>,
        permission_repo: Arc<dyn PermissionRepository>,
        changes: RoleChangeTracker,
        event_store: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            role_repo,
            permissions: PermissionCatalogValidator::new(permission_repo),
            changes,
            event_store,
        }
    }
}

#[async_trait]
impl CommandHandler<ToggleRolePermissionCommand> for ToggleRolePermissionCommandHandler {
    type Result = bool;
    type Error = ServiceError;

    #[instrument(name = "toggle_role_permission_command_handler", skip(self, command), fields(role_id = %command.role_id, permission_id = %command.permission_id))]
    async fn handle(
        &self,
        command: ToggleRolePermissionCommand,
    ) -> Result<Self::Result, Self::Error> {
        let mut role = find_custom_role(&self.role_repo, &command.role_id).await?;
        self.permissions.validate_id(&command.permission_id).await?;

        let granted = role.toggle_permission(&command.permission_id);
        self.role_repo.update_role(&role).await?;
        self.changes.mark_dirty();

        self.event_store
            .store_event(&EventFactory::role_permission_toggled(
                role.id,
                command.permission_id,
                granted,
            ))
            .await;
        Ok(granted)
    }
}

/// Save role changes command handler. Returns whether anything was pending.
pub struct SaveRoleChangesCommandHandler {
    role_repo: Arc<dyn RoleRepository>,
    changes: RoleChangeTracker,
    event_store: Arc<dyn EventStore>,
}

impl SaveRoleChangesCommandHandler {
    pub fn new(
        role_repo: Arc<dyn RoleRepository>,
        changes: RoleChangeTracker,
        event_store: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            role_repo,
            changes,
            event_store,
        }
    }
}

#[async_trait]
impl CommandHandler<SaveRoleChangesCommand> for SaveRoleChangesCommandHandler {
    type Result = bool;
    type Error = ServiceError;

    #[instrument(name = "save_role_changes_command_handler", skip(self, _command))]
    async fn handle(&self, _command: SaveRoleChangesCommand) -> Result<Self::Result, Self::Error> {
        let saved = self.changes.save().await?;
        if saved {
            let role_count = self.role_repo.list_roles().await?.len();
            self.event_store
                .store_event(&EventFactory::role_changes_saved(role_count))
                .await;
        }
        Ok(saved)
    }
}

// ============================================================================
// USER ADMINISTRATION
// ============================================================================

async fn find_user(
    user_repo: &Arc<dyn UserRepository>,
    user_id: &str,
) -> Result<User, ServiceError> {
    user_repo
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ServiceError::UserNotFound(user_id.to_string()))
}

/// `copy.<email>`, with the prefix repeated until no user holds it.
fn unique_copy_email(users: &[User], email: &str) -> String {
    let mut candidate = format!("copy.{email}");
    while users.iter().any(|u| u.email_matches(&candidate)) {
        candidate = format!("copy.{candidate}");
    }
    candidate
}

/// Create user command handler
pub struct CreateUserCommandHandler {
    user_repo: Arc<dyn UserRepository>,
    validator: CreateUserCommandValidator,
    event_store: Arc<dyn EventStore>,
}

impl CreateUserCommandHandler {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        role_repo: Arc<dyn RoleRepository>,
        permission_repo: Arc<dyn PermissionRepository>,
        strict_role_references: bool,
        event_store: Arc<dyn EventStore>,
    ) -> Self {
        let validator = CreateUserCommandValidator::new(
            user_repo.clone(),
            role_repo,
            permission_repo,
            strict_role_references,
        );
        Self {
            user_repo,
            validator,
            event_store,
        }
    }
}

#[async_trait]
impl CommandHandler<CreateUserCommand> for CreateUserCommandHandler {
    type Result = User;
    type Error = ServiceError;

    #[instrument(name = "create_user_command_handler", skip(self, command), fields(email = %command.email))]
    async fn handle(&self, command: CreateUserCommand) -> Result<Self::Result, Self::Error> {
        self.validator.validate(&command).await?;

        let user = User::new(
            command.name.trim().to_string(),
            command.email.trim().to_string(),
            command.role,
            command.department.trim().to_string(),
            command.manager,
            command.custom_permissions,
        );
        let user = self.user_repo.insert_user(user).await?;

        self.event_store
            .store_event(&EventFactory::user_created(user.id.clone(), user.email.clone()))
            .await;
        Ok(user)
    }
}

/// Update user command handler
pub struct UpdateUserCommandHandler {
    user_repo: Arc<dyn UserRepository>,
    validator: UpdateUserCommandValidator,
    event_store: Arc<dyn EventStore>,
}

impl UpdateUserCommandHandler {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        role_repo: Arc<dyn RoleRepository>,
        strict_role_references: bool,
        event_store: Arc<dyn EventStore>,
    ) -> Self {
        let validator =
            UpdateUserCommandValidator::new(user_repo.clone(), role_repo, strict_role_references);
        Self {
            user_repo,
            validator,
            event_store,
        }
    }
}

#[async_trait]
impl CommandHandler<UpdateUserCommand> for UpdateUserCommandHandler {
    type Result = User;
    type Error = ServiceError;

    #[instrument(name = "update_user_command_handler", skip(self, command), fields(user_id = %command.user_id))]
    async fn handle(&self, command: UpdateUserCommand) -> Result<Self::Result, Self::Error> {
        self.validator.validate(&command).await?;

        let mut user = find_user(&self.user_repo, &command.user_id).await?;
        user.name = command.name.trim().to_string();
        user.email = command.email.trim().to_string();
        user.role = command.role;
        user.department = command.department.trim().to_string();
        user.manager = command.manager.filter(|m| !m.trim().is_empty());
        user.is_admin = command.is_admin;
        self.user_repo.update_user(&user).await?;

        self.event_store
            .store_event(&EventFactory::user_updated(
                user.id.clone(),
                user.email.clone(),
                user.role.clone(),
            ))
            .await;
        Ok(user)
    }
}

/// Duplicate user command handler
pub struct DuplicateUserCommandHandler {
    user_repo: Arc<dyn UserRepository>,
    event_store: Arc<dyn EventStore>,
}

impl DuplicateUserCommandHandler {
    pub fn new(user_repo: Arc<dyn UserRepository>, event_store: Arc<dyn EventStore>) -> Self {
        Self {
            user_repo,
            event_store,
        }
    }
}

#[async_trait]
impl CommandHandler<DuplicateUserCommand> for DuplicateUserCommandHandler {
    type Result = User;
    type Error = ServiceError;

    #[instrument(name = "duplicate_user_command_handler", skip(self, command), fields(user_id = %command.user_id))]
    async fn handle(&self, command: DuplicateUserCommand) -> Result<Self::Result, Self::Error> {
        let source = find_user(&self.user_repo, &command.user_id).await?;
        let users = self.user_repo.list_users().await?;
        let copy = source.duplicate(unique_copy_email(&users, &source.email));
        let copy = self.user_repo.insert_user(copy).await?;

        self.event_store
            .store_event(&EventFactory::user_duplicated(
                copy.id.clone(),
                source.id,
                copy.email.clone(),
            ))
            .await;
        Ok(copy)
    }
}

/// Delete user command handler
pub struct DeleteUserCommandHandler {
    user_repo: Arc<dyn UserRepository>,
    event_store: Arc<dyn EventStore>,
}

impl DeleteUserCommandHandler {
    pub fn new(user_repo: Arc<dyn UserRepository>, event_store: Arc<dyn EventStore>) -> Self {
        Self {
            user_repo,
            event_store,
        }
    }
}

#[async_trait]
impl CommandHandler<DeleteUserCommand> for DeleteUserCommandHandler {
    type Result = ();
    type Error = ServiceError;

    #[instrument(name = "delete_user_command_handler", skip(self, command), fields(user_id = %command.user_id))]
    async fn handle(&self, command: DeleteUserCommand) -> Result<Self::Result, Self::Error> {
        let user = find_user(&self.user_repo, &command.user_id).await?;
        self.user_repo.delete_user(&user.id).await?;

        self.event_store
            .store_event(&EventFactory::user_deleted(user.id))
            .await;
        Ok(())
    }
}

/// Toggle user status command handler
pub struct ToggleUserStatusCommandHandler {
    user_repo: Arc<dyn UserRepository>,
    event_store: Arc<dyn EventStore>,
}

impl ToggleUserStatusCommandHandler {
    pub fn new(user_repo: Arc<dyn UserRepository>, event_store: Arc<dyn EventStore>) -> Self {
        Self {
            user_repo,
            event_store,
        }
    }
}

#[async_trait]
impl CommandHandler<ToggleUserStatusCommand> for ToggleUserStatusCommandHandler {
    type Result = User;
    type Error = ServiceError;

    #[instrument(name = "toggle_user_status_command_handler", skip(self, command), fields(user_id = %command.user_id))]
    async fn handle(&self, command: ToggleUserStatusCommand) -> Result<Self::Result, Self::Error> {
        let mut user = find_user(&self.user_repo, &command.user_id).await?;
        let status = user.toggle_status();
        self.user_repo.update_user(&user).await?;

        self.event_store
            .store_event(&EventFactory::user_status_toggled(user.id.clone(), status))
            .await;
        Ok(user)
    }
}

/// Set custom permissions command handler
pub struct SetCustomPermissionsCommandHandler {
    user_repo: Arc<dyn UserRepository>,
    permissions: PermissionCatalogValidator,
    event_store: Arc<dyn EventStore>,
}

impl SetCustomPermissionsCommandHandler {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        permission_repo: Arc<dyn PermissionRepository>,
        event_store: Arc<dyn EventStore>,
    ) -> Self {
        Self {
            user_repo,
            permissions: PermissionCatalogValidator::new(permission_repo),
            event_store,
        }
    }
}

#[async_trait]
impl CommandHandler<SetCustomPermissionsCommand> for SetCustomPermissionsCommandHandler {
    type Result = User;
    type Error = ServiceError;

    #[instrument(name = "set_custom_permissions_command_handler", skip(self, command), fields(user_id = %command.user_id))]
    async fn handle(
        &self,
        command: SetCustomPermissionsCommand,
    ) -> Result<Self::Result, Self::Error> {
        let mut user = find_user(&self.user_repo, &command.user_id).await?;
        self.permissions.validate_ids(&command.permissions).await?;

        user.set_custom_permissions(command.permissions);
        self.user_repo.update_user(&user).await?;

        self.event_store
            .store_event(&EventFactory::user_custom_permissions_set(
                user.id.clone(),
                user.custom_permissions().to_vec(),
            ))
            .await;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::InMemoryEventStore;
    use crate::application::validators::ValidationError;
    use crate::infrastructure::seed::{demo_users, system_roles};
    use crate::infrastructure::{
        InMemoryPermissionRepository, InMemoryRoleRepository, InMemoryUserRepository,
    };

    struct Fixture {
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        permissions: Arc<dyn PermissionRepository>,
        changes: RoleChangeTracker,
        events: Arc<InMemoryEventStore>,
    }

    fn fixture() -> Fixture {
        Fixture {
            users: Arc::new(InMemoryUserRepository::new(demo_users())),
            roles: Arc::new(InMemoryRoleRepository::new(system_roles())),
            permissions: Arc::new(InMemoryPermissionRepository::seeded()),
            changes: RoleChangeTracker::default(),
            events: Arc::new(InMemoryEventStore::new()),
        }
    }

    #[tokio::test]
    async fn test_login_lands_admin_and_employee() {
        let f = fixture();
        let handler = LoginCommandHandler::new(f.users.clone(), f.events.clone());

        let admin = handler
            .handle(LoginCommand {
                email: "Harish@Resolv.ai ".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(admin.landing, "/admin");

        let dev = handler
            .handle(LoginCommand {
                email: "dhina@resolv.ai".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(dev.landing, "/dashboard");
        assert_eq!(f.events.get_events_for_aggregate(&dev.user.id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_login_refuses_unknown_and_inactive() {
        let f = fixture();
        let handler = LoginCommandHandler::new(f.users.clone(), f.events.clone());
        assert!(matches!(
            handler
                .handle(LoginCommand {
                    email: "ghost@resolv.ai".to_string()
                })
                .await,
            Err(ServiceError::UserNotFound(_))
        ));

        ToggleUserStatusCommandHandler::new(f.users.clone(), f.events.clone())
            .handle(ToggleUserStatusCommand {
                user_id: "7".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(
            handler
                .handle(LoginCommand {
                    email: "dhina@resolv.ai".to_string()
                })
                .await,
            Err(ServiceError::AccountInactive)
        ));
    }

    #[tokio::test]
    async fn test_create_role_derives_id_and_marks_changes() {
        let f = fixture();
        let handler = CreateRoleCommandHandler::new(
            f.roles.clone(),
            f.permissions.clone(),
            f.changes.clone(),
            f.events.clone(),
        );
        let role = handler
            .handle(CreateRoleCommand {
                name: "QA   Lead".to_string(),
                description: "Owns release testing".to_string(),
                permissions: vec!["view_all_tickets".to_string()],
            })
            .await
            .unwrap();

        assert_eq!(role.id, "qa_lead");
        assert!(role.is_custom);
        assert!(f.changes.has_unsaved_changes());
        assert!(f.roles.find_by_id("qa_lead").await.unwrap().is_some());
        assert_eq!(f.events.all_events().await[0].event_type, "RoleCreated");
    }

    #[tokio::test]
    async fn test_system_roles_are_immutable() {
        let f = fixture();
        let toggle = ToggleRolePermissionCommandHandler::new(
            f.roles.clone(),
            f.permissions.clone(),
            f.changes.clone(),
            f.events.clone(),
        );
        let result = toggle
            .handle(ToggleRolePermissionCommand {
                role_id: "junior_developer".to_string(),
                permission_id: "approve_tickets".to_string(),
            })
            .await;
        assert!(matches!(result, Err(ServiceError::SystemRoleImmutable(_))));

        let delete = DeleteRoleCommandHandler::new(
            f.roles.clone(),
            f.users.clone(),
            f.changes.clone(),
            f.events.clone(),
        );
        let result = delete
            .handle(DeleteRoleCommand {
                role_id: "it_admin".to_string(),
            })
            .await;
        assert!(matches!(result, Err(ServiceError::SystemRoleImmutable(_))));
        assert!(!f.changes.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_duplicate_then_toggle_copy() {
        let f = fixture();
        let handler =
            DuplicateRoleCommandHandler::new(f.roles.clone(), f.changes.clone(), f.events.clone());
        let copy = handler
            .handle(DuplicateRoleCommand {
                role_id: "junior_developer".to_string(),
            })
            .await
            .unwrap();
        assert!(copy.id.starts_with("junior_developer_copy_"));
        assert_eq!(copy.name, "Junior Developer (Copy)");

        let second = handler
            .handle(DuplicateRoleCommand {
                role_id: "junior_developer".to_string(),
            })
            .await
            .unwrap();
        assert_ne!(copy.id, second.id);

        let toggle = ToggleRolePermissionCommandHandler::new(
            f.roles.clone(),
            f.permissions.clone(),
            f.changes.clone(),
            f.events.clone(),
        );
        let granted = toggle
            .handle(ToggleRolePermissionCommand {
                role_id: copy.id.clone(),
                permission_id: "approve_tickets".to_string(),
            })
            .await
            .unwrap();
        assert!(granted);

        let unknown = toggle
            .handle(ToggleRolePermissionCommand {
                role_id: copy.id.clone(),
                permission_id: "fly_drones".to_string(),
            })
            .await;
        assert!(matches!(
            unknown,
            Err(ServiceError::Validation(ValidationError::UnknownPermission(_)))
        ));
    }

    #[tokio::test]
    async fn test_delete_role_reports_orphaned_users() {
        let f = fixture();
        let role = CreateRoleCommandHandler::new(
            f.roles.clone(),
            f.permissions.clone(),
            f.changes.clone(),
            f.events.clone(),
        )
        .handle(CreateRoleCommand {
            name: "Release Manager".to_string(),
            description: String::new(),
            permissions: vec!["approve_tickets".to_string()],
        })
        .await
        .unwrap();

        let mut user = f.users.find_by_id("2").await.unwrap().unwrap();
        user.role = role.id.clone();
        f.users.update_user(&user).await.unwrap();

        let orphaned = DeleteRoleCommandHandler::new(
            f.roles.clone(),
            f.users.clone(),
            f.changes.clone(),
            f.events.clone(),
        )
        .handle(DeleteRoleCommand {
            role_id: role.id.clone(),
        })
        .await
        .unwrap();
        assert_eq!(orphaned, 1);

        // The user keeps pointing at the deleted role.
        let user = f.users.find_by_id("2").await.unwrap().unwrap();
        assert_eq!(user.role, "release_manager");
    }

    #[tokio::test]
    async fn test_save_role_changes_only_reports_pending_work() {
        let f = fixture();
        let save =
            SaveRoleChangesCommandHandler::new(f.roles.clone(), f.changes.clone(), f.events.clone());
        assert!(!save.handle(SaveRoleChangesCommand).await.unwrap());

        f.changes.mark_dirty();
        assert!(save.handle(SaveRoleChangesCommand).await.unwrap());
        assert!(!f.changes.has_unsaved_changes());
        assert_eq!(f.events.get_events_for_aggregate("roles").await.len(), 1);
    }

    #[tokio::test]
    async fn test_create_user_normalizes_fields() {
        let f = fixture();
        let handler = CreateUserCommandHandler::new(
            f.users.clone(),
            f.roles.clone(),
            f.permissions.clone(),
            false,
            f.events.clone(),
        );
        let user = handler
            .handle(CreateUserCommand {
                name: " Priya ".to_string(),
                email: "priya@resolv.ai".to_string(),
                role: "it_admin".to_string(),
                department: "IT Administration".to_string(),
                manager: Some(String::new()),
                custom_permissions: vec![],
            })
            .await
            .unwrap();
        assert_eq!(user.name, "Priya");
        assert!(user.is_admin);
        assert!(user.is_active());
        assert_eq!(user.manager, None);
        assert_eq!(user.custom_permissions, None);
        assert_eq!(f.users.list_users().await.unwrap().len(), 15);
    }

    #[tokio::test]
    async fn test_update_user_replaces_fields() {
        let f = fixture();
        let handler =
            UpdateUserCommandHandler::new(f.users.clone(), f.roles.clone(), false, f.events.clone());
        let user = handler
            .handle(UpdateUserCommand {
                user_id: "9".to_string(),
                name: "Barani".to_string(),
                email: "barani@resolv.ai".to_string(),
                role: "senior_developer".to_string(),
                department: "Quality Assurance".to_string(),
                manager: Some("Ranjithkumar".to_string()),
                is_admin: false,
            })
            .await
            .unwrap();
        assert_eq!(user.role, "senior_developer");
        assert_eq!(user.manager.as_deref(), Some("Ranjithkumar"));

        let missing = handler
            .handle(UpdateUserCommand {
                user_id: "404".to_string(),
                name: "Nobody".to_string(),
                email: "nobody@resolv.ai".to_string(),
                role: "junior_developer".to_string(),
                department: "Engineering".to_string(),
                manager: None,
                is_admin: false,
            })
            .await;
        assert!(matches!(missing, Err(ServiceError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_user_picks_unused_email() {
        let f = fixture();
        let handler = DuplicateUserCommandHandler::new(f.users.clone(), f.events.clone());
        let first = handler
            .handle(DuplicateUserCommand {
                user_id: "4".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(first.email, "copy.kevin.s@resolv.ai");
        assert_eq!(first.name, "Kevin S (Copy)");
        assert_ne!(first.id, "4");

        let second = handler
            .handle(DuplicateUserCommand {
                user_id: "4".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(second.email, "copy.copy.kevin.s@resolv.ai");
    }

    #[tokio::test]
    async fn test_delete_and_toggle_unknown_user() {
        let f = fixture();
        let delete = DeleteUserCommandHandler::new(f.users.clone(), f.events.clone());
        delete
            .handle(DeleteUserCommand {
                user_id: "3".to_string(),
            })
            .await
            .unwrap();
        assert!(matches!(
            delete
                .handle(DeleteUserCommand {
                    user_id: "3".to_string()
                })
                .await,
            Err(ServiceError::UserNotFound(_))
        ));
        assert!(matches!(
            ToggleUserStatusCommandHandler::new(f.users.clone(), f.events.clone())
                .handle(ToggleUserStatusCommand {
                    user_id: "3".to_string()
                })
                .await,
            Err(ServiceError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_set_custom_permissions_replaces_and_clears() {
        let f = fixture();
        let handler = SetCustomPermissionsCommandHandler::new(
            f.users.clone(),
            f.permissions.clone(),
            f.events.clone(),
        );
        let user = handler
            .handle(SetCustomPermissionsCommand {
                user_id: "2".to_string(),
                permissions: vec!["approve_tickets".to_string(), "approve_tickets".to_string()],
            })
            .await
            .unwrap();
        assert_eq!(user.custom_permissions(), ["approve_tickets".to_string()]);

        let user = handler
            .handle(SetCustomPermissionsCommand {
                user_id: "2".to_string(),
                permissions: vec![],
            })
            .await
            .unwrap();
        assert_eq!(user.custom_permissions, None);
    }
}
