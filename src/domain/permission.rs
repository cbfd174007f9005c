use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display group a permission belongs to. Declaration order is display order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PermissionCategory {
    Tickets,
    Access,
    System,
    AI,
    Hardware,
    Admin,
}

impl PermissionCategory {
    pub const ALL: [PermissionCategory; 6] = [
        PermissionCategory::Tickets,
        PermissionCategory::Access,
        PermissionCategory::System,
        PermissionCategory::AI,
        PermissionCategory::Hardware,
        PermissionCategory::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionCategory::Tickets => "Tickets",
            PermissionCategory::Access => "Access",
            PermissionCategory::System => "System",
            PermissionCategory::AI => "AI",
            PermissionCategory::Hardware => "Hardware",
            PermissionCategory::Admin => "Admin",
        }
    }
}

impl fmt::Display for PermissionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown permission category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for PermissionCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PermissionCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Permission value object: an atomic capability gating a UI action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: PermissionCategory,
}

impl Permission {
    /// Creates a new Permission value object.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        category: PermissionCategory,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_new() {
        let perm = Permission::new(
            "create_ticket",
            "Create Tickets",
            "Can create support tickets",
            PermissionCategory::Tickets,
        );
        assert_eq!(perm.id, "create_ticket");
        assert_eq!(perm.name, "Create Tickets");
        assert_eq!(perm.category, PermissionCategory::Tickets);
    }

    #[test]
    fn test_category_parse_and_display() {
        for category in PermissionCategory::ALL {
            assert_eq!(category.as_str().parse::<PermissionCategory>(), Ok(category));
            assert_eq!(category.to_string(), category.as_str());
        }
        assert!("tickets".parse::<PermissionCategory>().is_err());
        assert!("Billing".parse::<PermissionCategory>().is_err());
    }

    #[test]
    fn test_category_order_follows_declaration() {
        let mut shuffled = vec![
            PermissionCategory::Admin,
            PermissionCategory::Tickets,
            PermissionCategory::AI,
            PermissionCategory::Access,
        ];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![
                PermissionCategory::Tickets,
                PermissionCategory::Access,
                PermissionCategory::AI,
                PermissionCategory::Admin,
            ]
        );
    }

    #[test]
    fn test_category_serializes_as_plain_string() {
        let json = serde_json::to_string(&PermissionCategory::AI).unwrap();
        assert_eq!(json, "\"AI\"");
    }
}
