use super::commands::{CreateRoleCommand, CreateUserCommand, UpdateUserCommand};
use super::services::ServiceError;
use crate::domain::hierarchy::would_create_cycle;
use crate::domain::role::Role;
use crate::infrastructure::{PermissionRepository, RoleRepository, UserRepository};
use async_trait::async_trait;
use std::sync::Arc;

/// Validation error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field validation failed: {field} - {message}")]
    FieldValidation { field: String, message: String },
    #[error("Invalid email format: {0}")]
    InvalidEmail(String),
    #[error("Unknown permission: {0}")]
    UnknownPermission(String),
    #[error("Unknown role: {0}")]
    UnknownRole(String),
    #[error("{manager} cannot manage {user}: reporting line would loop")]
    ManagerCycle { user: String, manager: String },
}

/// Base trait for command validation
#[async_trait]
pub trait CommandValidator<C>: Send + Sync {
    async fn validate(&self, command: &C) -> Result<(), ServiceError>;
}

/// Field rules shared by user commands
pub struct UserCommandValidator;

impl UserCommandValidator {
    /// Rejects blank values
    pub fn validate_required(field: &str, value: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::FieldValidation {
                field: field.to_string(),
                message: format!("{field} is required"),
            });
        }
        Ok(())
    }

    /// Validates email format
    pub fn validate_email(email: &str) -> Result<(), ValidationError> {
        let email = email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(ValidationError::InvalidEmail(email.to_string())),
        }
    }

    fn validate_fields(
        name: &str,
        email: &str,
        role: &str,
        department: &str,
    ) -> Result<(), ValidationError> {
        Self::validate_required("name", name)?;
        Self::validate_required("email", email)?;
        Self::validate_required("role", role)?;
        Self::validate_required("department", department)?;
        Self::validate_email(email)
    }
}

/// Checks permission ids against the catalog
#[derive(Clone)]
pub struct PermissionCatalogValidator {
    permission_repo: Arc<dyn PermissionRepository>,
}

impl PermissionCatalogValidator {
    pub fn new(permission_repo: Arc<dyn PermissionRepository>) -> Self {
        Self { permission_repo }
    }

    pub async fn validate_ids(&self, permission_ids: &[String]) -> Result<(), ServiceError> {
        for permission_id in permission_ids {
            self.validate_id(permission_id).await?;
        }
        Ok(())
    }

    pub async fn validate_id(&self, permission_id: &str) -> Result<(), ServiceError> {
        if self.permission_repo.find_by_id(permission_id).await?.is_none() {
            return Err(ValidationError::UnknownPermission(permission_id.to_string()).into());
        }
        Ok(())
    }
}

/// Role reference check, only enforced in strict mode
async fn validate_role_reference(
    role_repo: &Arc<dyn RoleRepository>,
    strict: bool,
    role_id: &str,
) -> Result<(), ServiceError> {
    if strict && role_repo.find_by_id(role_id).await?.is_none() {
        return Err(ValidationError::UnknownRole(role_id.to_string()).into());
    }
    Ok(())
}

/// Create user command validation
pub struct CreateUserCommandValidator {
    user_repo: Arc<dyn UserRepository>,
    role_repo: Arc<dyn RoleRepository>,
    permissions: PermissionCatalogValidator,
    strict_role_references: bool,
}

impl CreateUserCommandValidator {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        role_repo: Arc<dyn RoleRepository>,
        permission_repo: Arc<dyn PermissionRepository>,
        strict_role_references: bool,
    ) -> Self {
        Self {
            user_repo,
            role_repo,
            permissions: PermissionCatalogValidator::new(permission_repo),
            strict_role_references,
        }
    }
}

#[async_trait]
impl CommandValidator<CreateUserCommand> for CreateUserCommandValidator {
    async fn validate(&self, command: &CreateUserCommand) -> Result<(), ServiceError> {
        UserCommandValidator::validate_fields(
            &command.name,
            &command.email,
            &command.role,
            &command.department,
        )?;

        if self.user_repo.find_by_email(&command.email).await?.is_some() {
            return Err(ServiceError::EmailAlreadyExists(command.email.trim().to_string()));
        }

        validate_role_reference(&self.role_repo, self.strict_role_references, &command.role)
            .await?;
        self.permissions
            .validate_ids(&command.custom_permissions)
            .await
    }
}

/// Update user command validation
pub struct UpdateUserCommandValidator {
    user_repo: Arc<dyn UserRepository>,
    role_repo: Arc<dyn RoleRepository>,
    strict_role_references: bool,
}

impl UpdateUserCommandValidator {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        role_repo: Arc<dyn RoleRepository>,
        strict_role_references: bool,
    ) -> Self {
        Self {
            user_repo,
            role_repo,
            strict_role_references,
        }
    }
}

#[async_trait]
impl CommandValidator<UpdateUserCommand> for UpdateUserCommandValidator {
    async fn validate(&self, command: &UpdateUserCommand) -> Result<(), ServiceError> {
        UserCommandValidator::validate_fields(
            &command.name,
            &command.email,
            &command.role,
            &command.department,
        )?;

        let mut users = self.user_repo.list_users().await?;
        if !users.iter().any(|u| u.id == command.user_id) {
            return Err(ServiceError::UserNotFound(command.user_id.clone()));
        }
        if users
            .iter()
            .any(|u| u.id != command.user_id && u.email_matches(&command.email))
        {
            return Err(ServiceError::EmailAlreadyExists(command.email.trim().to_string()));
        }

        validate_role_reference(&self.role_repo, self.strict_role_references, &command.role)
            .await?;

        if let Some(manager) = command.manager.as_deref().filter(|m| !m.trim().is_empty()) {
            // Check the directory as it would look after the update.
            for user in users.iter_mut().filter(|u| u.id == command.user_id) {
                user.name = command.name.clone();
                user.manager = Some(manager.to_string());
            }
            if would_create_cycle(&users, &command.name, manager) {
                return Err(ValidationError::ManagerCycle {
                    user: command.name.clone(),
                    manager: manager.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Create role command validation
pub struct CreateRoleCommandValidator {
    role_repo: Arc<dyn RoleRepository>,
    permissions: PermissionCatalogValidator,
}

impl CreateRoleCommandValidator {
    pub fn new(
        role_repo: Arc<dyn RoleRepository>,
        permission_repo: Arc<dyn PermissionRepository>,
    ) -> Self {
        Self {
            role_repo,
            permissions: PermissionCatalogValidator::new(permission_repo),
        }
    }
}

#[async_trait]
impl CommandValidator<CreateRoleCommand> for CreateRoleCommandValidator {
    async fn validate(&self, command: &CreateRoleCommand) -> Result<(), ServiceError> {
        UserCommandValidator::validate_required("name", &command.name)?;

        let role_id = Role::id_from_name(&command.name);
        if self.role_repo.find_by_id(&role_id).await?.is_some() {
            return Err(ServiceError::RoleAlreadyExists(role_id));
        }
        self.permissions.validate_ids(&command.permissions).await
    }
}
