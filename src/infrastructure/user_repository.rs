use super::{RepoResult, RepositoryError, UserRepository};
use crate::domain::user::User;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::instrument;

/// Entity name carried by a [`RepositoryError::Conflict`] on a taken email.
pub const EMAIL_ENTITY: &str = "email";

/// Directory held in process memory. Insertion order is listing order.
pub struct InMemoryUserRepository {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserRepository {
    pub fn new(users: Vec<User>) -> Self {
        Self {
            users: RwLock::new(users),
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new(vec![])
    }
}

/// Email uniqueness is checked under the same write lock as the mutation.
fn ensure_email_free(users: &[User], user: &User) -> RepoResult<()> {
    if users
        .iter()
        .any(|u| u.id != user.id && u.email_matches(&user.email))
    {
        return Err(RepositoryError::Conflict {
            entity: EMAIL_ENTITY,
            id: user.email.clone(),
        });
    }
    Ok(())
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn list_users(&self) -> RepoResult<Vec<User>> {
        Ok(self.users.read().await.clone())
    }

    async fn find_by_id(&self, user_id: &str) -> RepoResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.id == user_id)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .find(|u| u.email_matches(email))
            .cloned())
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn insert_user(&self, user: User) -> RepoResult<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.id == user.id) {
            return Err(RepositoryError::Conflict {
                entity: "user",
                id: user.id,
            });
        }
        ensure_email_free(&users, &user)?;
        users.push(user.clone());
        Ok(user)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id))]
    async fn update_user(&self, user: &User) -> RepoResult<()> {
        let mut users = self.users.write().await;
        ensure_email_free(&users, user)?;
        let slot = users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "user",
                id: user.id.clone(),
            })?;
        *slot = user.clone();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, user_id: &str) -> RepoResult<()> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != user_id);
        if users.len() == before {
            return Err(RepositoryError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, email: &str) -> User {
        User::new(
            name.to_string(),
            email.to_string(),
            "junior_developer".to_string(),
            "Engineering".to_string(),
            None,
            vec![],
        )
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let repo = InMemoryUserRepository::default();
        let created = repo.insert_user(user("Dhina", "dhina@resolv.ai")).await.unwrap();

        let by_id = repo.find_by_id(&created.id).await.unwrap();
        assert_eq!(by_id, Some(created.clone()));
        let by_email = repo.find_by_email("Dhina@Resolv.ai").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(created.id));
    }

    #[tokio::test]
    async fn test_insert_duplicate_id_conflicts() {
        let repo = InMemoryUserRepository::default();
        let created = repo.insert_user(user("Dhina", "dhina@resolv.ai")).await.unwrap();
        let result = repo.insert_user(created).await;
        assert!(matches!(result, Err(RepositoryError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_insert_taken_email_conflicts() {
        let repo = InMemoryUserRepository::default();
        repo.insert_user(user("Dhina", "dhina@resolv.ai")).await.unwrap();
        let result = repo.insert_user(user("Dhina S", "DHINA@resolv.ai")).await;
        assert!(matches!(
            result,
            Err(RepositoryError::Conflict { entity, .. }) if entity == EMAIL_ENTITY
        ));
        assert_eq!(repo.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_onto_taken_email_conflicts() {
        let repo = InMemoryUserRepository::new(vec![
            user("Dhina", "dhina@resolv.ai"),
            user("Sathya", "sathya@resolv.ai"),
        ]);
        let mut sathya = repo.find_by_email("sathya@resolv.ai").await.unwrap().unwrap();
        sathya.email = "dhina@resolv.ai".to_string();
        assert!(matches!(
            repo.update_user(&sathya).await,
            Err(RepositoryError::Conflict { .. })
        ));

        // Keeping one's own email is not a conflict.
        sathya.email = "sathya@resolv.ai".to_string();
        sathya.department = "QA".to_string();
        assert!(repo.update_user(&sathya).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = InMemoryUserRepository::new(vec![user("Dhina", "dhina@resolv.ai")]);
        let mut stored = repo.list_users().await.unwrap().remove(0);
        stored.department = "Frontend".to_string();
        repo.update_user(&stored).await.unwrap();
        assert_eq!(
            repo.find_by_id(&stored.id).await.unwrap().unwrap().department,
            "Frontend"
        );

        repo.delete_user(&stored.id).await.unwrap();
        assert!(repo.list_users().await.unwrap().is_empty());
        assert!(matches!(
            repo.delete_user(&stored.id).await,
            Err(RepositoryError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let repo = InMemoryUserRepository::default();
        let ghost = user("Ghost", "ghost@resolv.ai");
        assert!(matches!(
            repo.update_user(&ghost).await,
            Err(RepositoryError::NotFound { .. })
        ));
    }
}
