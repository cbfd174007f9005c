use super::delayed_task::{DelayedTask, DelayedTaskError};
use super::resolver::PermissionResolver;
use super::validators::ValidationError;
use crate::domain::user::User;
use crate::infrastructure::user_repository::EMAIL_ENTITY;
use crate::infrastructure::{RepositoryError, RoleRepository, UserRepository};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, instrument};

/// Errors returned by command and query handlers
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("User not found: {0}")]
    UserNotFound(String),
    #[error("Role not found: {0}")]
    RoleNotFound(String),
    #[error("System role {0} cannot be modified")]
    SystemRoleImmutable(String),
    #[error("Role already exists: {0}")]
    RoleAlreadyExists(String),
    #[error("Email already in use: {0}")]
    EmailAlreadyExists(String),
    #[error("Account is inactive")]
    AccountInactive,
    #[error("Caller is not signed in")]
    Unauthenticated,
    #[error("Missing permission: {0}")]
    PermissionDenied(String),
    #[error("Saving role changes failed: {0}")]
    SaveFailed(#[from] DelayedTaskError),
    #[error("Dispatch failed: {0}")]
    Dispatch(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for ServiceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict { entity, id } if entity == EMAIL_ENTITY => {
                ServiceError::EmailAlreadyExists(id)
            }
            other => ServiceError::Repository(other),
        }
    }
}

/// Answers "may this caller do that" for the admin surface
#[derive(Clone)]
pub struct AuthZService {
    user_repo: Arc<dyn UserRepository>,
    role_repo: Arc<dyn RoleRepository>,
    resolver: PermissionResolver,
}

impl AuthZService {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        role_repo: Arc<dyn RoleRepository>,
        resolver: PermissionResolver,
    ) -> Self {
        Self {
            user_repo,
            role_repo,
            resolver,
        }
    }

    /// Looks up the signed-in caller. Unknown and inactive callers are refused.
    pub async fn caller(&self, caller_id: &str) -> Result<User, ServiceError> {
        let user = self
            .user_repo
            .find_by_id(caller_id)
            .await?
            .ok_or(ServiceError::Unauthenticated)?;
        if !user.is_active() {
            return Err(ServiceError::AccountInactive);
        }
        Ok(user)
    }

    /// Returns the caller when they hold `permission_id`.
    #[instrument(name = "authorize", skip(self))]
    pub async fn authorize(
        &self,
        caller_id: &str,
        permission_id: &str,
    ) -> Result<User, ServiceError> {
        let caller = self.caller(caller_id).await?;
        let roles = self.role_repo.list_roles().await?;
        if !self.resolver.has_permission(&caller, permission_id, &roles) {
            info!(caller_id, permission_id, "Permission denied");
            return Err(ServiceError::PermissionDenied(permission_id.to_string()));
        }
        Ok(caller)
    }
}

/// Tracks whether the role editor holds edits that were not saved yet.
///
/// Role mutations apply to the store immediately; "save" only acknowledges
/// them after a configurable delay that stands in for backend latency.
#[derive(Debug, Clone)]
pub struct RoleChangeTracker {
    dirty: Arc<AtomicBool>,
    save_delay: Duration,
}

impl RoleChangeTracker {
    pub fn new(save_delay: Duration) -> Self {
        Self {
            dirty: Arc::new(AtomicBool::new(false)),
            save_delay,
        }
    }

    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn save_delay(&self) -> Duration {
        self.save_delay
    }

    /// Schedules the save. The flag clears when the task completes.
    pub fn schedule_save(&self) -> DelayedTask<bool> {
        let dirty = self.dirty.clone();
        DelayedTask::schedule(self.save_delay, move || dirty.swap(false, Ordering::SeqCst))
    }

    /// Saves and waits. Returns whether there was anything to save.
    pub async fn save(&self) -> Result<bool, ServiceError> {
        Ok(self.schedule_save().wait().await?)
    }
}

impl Default for RoleChangeTracker {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::seed::{demo_users, system_roles};
    use crate::infrastructure::{InMemoryRoleRepository, InMemoryUserRepository};

    fn authz(users: Vec<User>) -> AuthZService {
        AuthZService::new(
            Arc::new(InMemoryUserRepository::new(users)),
            Arc::new(InMemoryRoleRepository::new(system_roles())),
            PermissionResolver::new(),
        )
    }

    #[test]
    fn test_email_conflict_maps_to_email_already_exists() {
        let error: ServiceError = RepositoryError::Conflict {
            entity: EMAIL_ENTITY,
            id: "dhina@resolv.ai".to_string(),
        }
        .into();
        assert!(matches!(error, ServiceError::EmailAlreadyExists(e) if e == "dhina@resolv.ai"));

        let error: ServiceError = RepositoryError::Conflict {
            entity: "user",
            id: "7".to_string(),
        }
        .into();
        assert!(matches!(error, ServiceError::Repository(_)));
    }

    #[tokio::test]
    async fn test_admin_is_authorized_for_role_management() {
        let service = authz(demo_users());
        let caller = service.authorize("1", "manage_roles").await.unwrap();
        assert_eq!(caller.name, "Harish Rohith S");
    }

    #[tokio::test]
    async fn test_developer_is_denied_admin_permissions() {
        let service = authz(demo_users());
        let result = service.authorize("2", "manage_users").await;
        assert!(matches!(result, Err(ServiceError::PermissionDenied(p)) if p == "manage_users"));
    }

    #[tokio::test]
    async fn test_custom_grant_authorizes() {
        let mut users = demo_users();
        users[1].set_custom_permissions(vec!["access_admin_panel".to_string()]);
        let service = authz(users);
        assert!(service.authorize("2", "access_admin_panel").await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_and_inactive_callers_are_refused() {
        let mut users = demo_users();
        users[0].toggle_status();
        let service = authz(users);
        assert!(matches!(
            service.caller("99").await,
            Err(ServiceError::Unauthenticated)
        ));
        assert!(matches!(
            service.authorize("1", "manage_roles").await,
            Err(ServiceError::AccountInactive)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_clears_flag_after_delay() {
        let tracker = RoleChangeTracker::new(Duration::from_millis(1500));
        tracker.mark_dirty();

        let task = tracker.schedule_save();
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(1000)).await;
        tokio::task::yield_now().await;
        assert!(tracker.has_unsaved_changes());

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(task.wait().await, Ok(true));
        assert!(!tracker.has_unsaved_changes());
    }

    #[tokio::test]
    async fn test_save_without_changes_reports_nothing_saved() {
        let tracker = RoleChangeTracker::default();
        assert!(!tracker.save().await.unwrap());
    }
}
