use serde::{Deserialize, Serialize};

/// Role id whose holders are flagged as administrators on creation.
pub const ADMIN_ROLE_ID: &str = "it_admin";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
}

impl UserStatus {
    pub fn toggled(self) -> Self {
        match self {
            UserStatus::Active => UserStatus::Inactive,
            UserStatus::Inactive => UserStatus::Active,
        }
    }
}

/// User aggregate: an employee in the helpdesk directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String, // role ID
    pub department: String,
    pub manager: Option<String>, // manager display name
    pub is_admin: bool,
    pub custom_permissions: Option<Vec<String>>,
    pub status: UserStatus,
}

impl User {
    /// Creates an active user. Admin flag follows the role.
    pub fn new(
        name: String,
        email: String,
        role: String,
        department: String,
        manager: Option<String>,
        custom_permissions: Vec<String>,
    ) -> Self {
        let mut user = Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            is_admin: role == ADMIN_ROLE_ID,
            role,
            department,
            manager: manager.filter(|m| !m.trim().is_empty()),
            custom_permissions: None,
            status: UserStatus::Active,
        };
        user.set_custom_permissions(custom_permissions);
        user
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Flips the active flag and returns the new status.
    pub fn toggle_status(&mut self) -> UserStatus {
        self.status = self.status.toggled();
        self.status
    }

    /// Individually granted permissions, empty when none were granted.
    pub fn custom_permissions(&self) -> &[String] {
        self.custom_permissions.as_deref().unwrap_or(&[])
    }

    /// Replaces the granted permissions. An empty list clears them.
    pub fn set_custom_permissions(&mut self, permissions: Vec<String>) {
        let mut deduped: Vec<String> = Vec::with_capacity(permissions.len());
        for permission in permissions {
            if !deduped.contains(&permission) {
                deduped.push(permission);
            }
        }
        self.custom_permissions = if deduped.is_empty() {
            None
        } else {
            Some(deduped)
        };
    }

    /// Case-insensitive over full Unicode lowercase mapping, not only ASCII.
    pub fn email_matches(&self, email: &str) -> bool {
        self.email.to_lowercase() == email.trim().to_lowercase()
    }

    /// Builds a copy under a fresh id. The caller picks a unique email.
    pub fn duplicate(&self, email: String) -> User {
        User {
            id: uuid::Uuid::new_v4().to_string(),
            name: format!("{} (Copy)", self.name),
            email,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_user() -> User {
        User::new(
            "Dhina".to_string(),
            "dhina@resolv.ai".to_string(),
            "junior_developer".to_string(),
            "Engineering".to_string(),
            Some("Karthikeyan".to_string()),
            vec![],
        )
    }

    #[test]
    fn test_user_creation() {
        let user = create_test_user();

        assert!(!user.id.is_empty());
        assert!(!user.is_admin);
        assert!(user.is_active());
        assert_eq!(user.custom_permissions, None);
        assert_eq!(user.manager.as_deref(), Some("Karthikeyan"));
    }

    #[test]
    fn test_admin_flag_follows_role() {
        let admin = User::new(
            "Root".to_string(),
            "root@resolv.ai".to_string(),
            ADMIN_ROLE_ID.to_string(),
            "IT Administration".to_string(),
            Some("  ".to_string()),
            vec![],
        );
        assert!(admin.is_admin);
        assert_eq!(admin.manager, None);
    }

    #[test]
    fn test_email_matches_ignores_case_beyond_ascii() {
        let mut user = create_test_user();
        user.email = "élise@résolv.ai".to_string();
        assert!(user.email_matches("ÉLISE@RÉSOLV.AI"));
        assert!(!user.email_matches("elise@resolv.ai"));
    }

    #[test]
    fn test_toggle_status() {
        let mut user = create_test_user();
        assert_eq!(user.toggle_status(), UserStatus::Inactive);
        assert!(!user.is_active());
        assert_eq!(user.toggle_status(), UserStatus::Active);
    }

    #[test]
    fn test_custom_permissions_normalization() {
        let mut user = create_test_user();
        user.set_custom_permissions(vec![
            "approve_tickets".to_string(),
            "approve_tickets".to_string(),
        ]);
        assert_eq!(user.custom_permissions(), ["approve_tickets".to_string()]);

        user.set_custom_permissions(vec![]);
        assert_eq!(user.custom_permissions, None);
        assert!(user.custom_permissions().is_empty());
    }

    #[test]
    fn test_duplicate_keeps_role_and_department() {
        let user = create_test_user();
        let copy = user.duplicate("copy.dhina@resolv.ai".to_string());

        assert_ne!(copy.id, user.id);
        assert_eq!(copy.name, "Dhina (Copy)");
        assert_eq!(copy.email, "copy.dhina@resolv.ai");
        assert_eq!(copy.role, user.role);
        assert_eq!(copy.department, user.department);
    }

    #[test]
    fn test_email_matches_ignores_case() {
        let user = create_test_user();
        assert!(user.email_matches("DHINA@resolv.ai "));
        assert!(!user.email_matches("dhina@resolv.io"));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&UserStatus::Inactive).unwrap(),
            "\"inactive\""
        );
    }
}
