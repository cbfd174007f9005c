use super::{PermissionRepository, RepoResult};
use crate::domain::permission::Permission;
use async_trait::async_trait;
use std::sync::Arc;

/// Serves a fixed catalog. There is no write path: the catalog never changes
/// after start-up.
#[derive(Clone)]
pub struct InMemoryPermissionRepository {
    permissions: Arc<[Permission]>,
}

impl InMemoryPermissionRepository {
    pub fn new(permissions: Vec<Permission>) -> Self {
        Self {
            permissions: permissions.into(),
        }
    }

    /// Repository over the seeded product catalog.
    pub fn seeded() -> Self {
        Self::new(super::seed::permission_catalog().to_vec())
    }
}

#[async_trait]
impl PermissionRepository for InMemoryPermissionRepository {
    async fn list_permissions(&self) -> RepoResult<Vec<Permission>> {
        Ok(self.permissions.to_vec())
    }

    async fn find_by_id(&self, permission_id: &str) -> RepoResult<Option<Permission>> {
        Ok(self
            .permissions
            .iter()
            .find(|p| p.id == permission_id)
            .cloned())
    }
}
