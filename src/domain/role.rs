use serde::{Deserialize, Serialize};

/// Role entity: a named bundle of permission ids.
///
/// System roles (`is_custom == false`) ship with the product and are never
/// mutated; custom roles are created by an administrator at runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>, // permission IDs
    pub is_custom: bool,
}

impl Role {
    /// Creates a custom role, deriving its id from the display name.
    pub fn new_custom(name: &str, description: &str, permissions: Vec<String>) -> Self {
        let mut role = Self {
            id: Self::id_from_name(name),
            name: name.trim().to_string(),
            description: description.to_string(),
            permissions: Vec::with_capacity(permissions.len()),
            is_custom: true,
        };
        for permission_id in permissions {
            role.add_permission(permission_id);
        }
        role
    }

    /// Derives a role id: lowercase, with every whitespace run collapsed to `_`.
    pub fn id_from_name(name: &str) -> String {
        name.trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Returns true for the seeded, immutable roles.
    pub fn is_system(&self) -> bool {
        !self.is_custom
    }

    pub fn has_permission(&self, permission_id: &str) -> bool {
        self.permissions.iter().any(|p| p == permission_id)
    }

    /// Adds a permission to the role (if not already present).
    pub fn add_permission(&mut self, permission_id: String) {
        if !self.has_permission(&permission_id) {
            self.permissions.push(permission_id);
        }
    }

    /// Removes a permission from the role.
    pub fn remove_permission(&mut self, permission_id: &str) {
        self.permissions.retain(|p| p != permission_id);
    }

    /// Flips a permission on or off. Returns whether it is now granted.
    pub fn toggle_permission(&mut self, permission_id: &str) -> bool {
        if self.has_permission(permission_id) {
            self.remove_permission(permission_id);
            false
        } else {
            self.add_permission(permission_id.to_string());
            true
        }
    }

    /// Builds an editable copy. The copy is always custom, even for system roles.
    pub fn duplicate(&self, suffix: &str) -> Role {
        Role {
            id: format!("{}_copy_{}", self.id, suffix),
            name: format!("{} (Copy)", self.name),
            description: self.description.clone(),
            permissions: self.permissions.clone(),
            is_custom: true,
        }
    }
}
