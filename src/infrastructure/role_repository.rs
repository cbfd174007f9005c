use super::{RepoResult, RepositoryError, RoleRepository};
use crate::domain::role::Role;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::instrument;

pub struct InMemoryRoleRepository {
    roles: RwLock<Vec<Role>>,
}

impl InMemoryRoleRepository {
    pub fn new(roles: Vec<Role>) -> Self {
        Self {
            roles: RwLock::new(roles),
        }
    }
}

impl Default for InMemoryRoleRepository {
    fn default() -> Self {
        Self::new(vec![])
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn list_roles(&self) -> RepoResult<Vec<Role>> {
        Ok(self.roles.read().await.clone())
    }

    async fn find_by_id(&self, role_id: &str) -> RepoResult<Option<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .iter()
            .find(|r| r.id == role_id)
            .cloned())
    }

    #[instrument(skip(self, role), fields(role_id = %role.id))]
    async fn insert_role(&self, role: Role) -> RepoResult<Role> {
        let mut roles = self.roles.write().await;
        if roles.iter().any(|r| r.id == role.id) {
            return Err(RepositoryError::Conflict {
                entity: "role",
                id: role.id,
            });
        }
        roles.push(role.clone());
        Ok(role)
    }

    #[instrument(skip(self, role), fields(role_id = %role.id))]
    async fn update_role(&self, role: &Role) -> RepoResult<()> {
        let mut roles = self.roles.write().await;
        let slot = roles
            .iter_mut()
            .find(|r| r.id == role.id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "role",
                id: role.id.clone(),
            })?;
        *slot = role.clone();
        Ok(())
    }

    /// Removes the role only. Users that reference it are left as they are.
    #[instrument(skip(self))]
    async fn delete_role(&self, role_id: &str) -> RepoResult<()> {
        let mut roles = self.roles.write().await;
        let before = roles.len();
        roles.retain(|r| r.id != role_id);
        if roles.len() == before {
            return Err(RepositoryError::NotFound {
                entity: "role",
                id: role_id.to_string(),
            });
        }
        Ok(())
    }
}
