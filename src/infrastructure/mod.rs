use crate::domain::permission::Permission;
use crate::domain::role::Role;
use crate::domain::user::User;
use async_trait::async_trait;

// Infrastructure layer: in-memory stores and seed data
pub mod permission_repository;
pub mod role_repository;
pub mod seed;
pub mod user_repository;

pub use permission_repository::InMemoryPermissionRepository;
pub use role_repository::InMemoryRoleRepository;
pub use user_repository::InMemoryUserRepository;

pub type RepoResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} already exists: {id}")]
    Conflict { entity: &'static str, id: String },
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list_users(&self) -> RepoResult<Vec<User>>;
    async fn find_by_id(&self, user_id: &str) -> RepoResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn insert_user(&self, user: User) -> RepoResult<User>;
    async fn update_user(&self, user: &User) -> RepoResult<()>;
    async fn delete_user(&self, user_id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn list_roles(&self) -> RepoResult<Vec<Role>>;
    async fn find_by_id(&self, role_id: &str) -> RepoResult<Option<Role>>;
    async fn insert_role(&self, role: Role) -> RepoResult<Role>;
    async fn update_role(&self, role: &Role) -> RepoResult<()>;
    async fn delete_role(&self, role_id: &str) -> RepoResult<()>;
}

/// Read-only access to the static permission catalog.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn list_permissions(&self) -> RepoResult<Vec<Permission>>;
    async fn find_by_id(&self, permission_id: &str) -> RepoResult<Option<Permission>>;
}
