//! Effective-permission resolution.
//!
//! A user's effective permissions are the union of their role's permissions and
//! the permissions granted to them individually. Custom grants only ever add.
//! Resolution is pure: it works on snapshots of the user, role and catalog
//! state taken by the caller.

use crate::domain::permission::{Permission, PermissionCategory};
use crate::domain::role::Role;
use crate::domain::user::User;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::warn;

/// Outcome of looking up a user's role. Callers must handle the missing case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleLookup<'a> {
    Found(&'a Role),
    NotFound { role_id: &'a str },
}

impl<'a> RoleLookup<'a> {
    pub fn role(&self) -> Option<&'a Role> {
        match self {
            RoleLookup::Found(role) => Some(role),
            RoleLookup::NotFound { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, RoleLookup::Found(_))
    }
}

/// The resolved permission set plus how the role half of it was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectivePermissions {
    pub role_id: String,
    pub role_resolved: bool,
    pub permissions: BTreeSet<String>,
}

impl EffectivePermissions {
    pub fn contains(&self, permission_id: &str) -> bool {
        self.permissions.contains(permission_id)
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.permissions.iter()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PermissionResolver;

impl PermissionResolver {
    pub fn new() -> Self {
        Self
    }

    /// Finds the role the user is assigned to.
    pub fn resolve_role<'a>(&self, user: &'a User, roles: &'a [Role]) -> RoleLookup<'a> {
        match roles.iter().find(|r| r.id == user.role) {
            Some(role) => RoleLookup::Found(role),
            None => RoleLookup::NotFound { role_id: &user.role },
        }
    }

    /// Role permissions united with the user's custom grants.
    ///
    /// The catalog is informational: ids that are not in it still resolve.
    pub fn effective_permissions(
        &self,
        user: &User,
        roles: &[Role],
        _catalog: &[Permission],
    ) -> EffectivePermissions {
        let lookup = self.resolve_role(user, roles);
        if let RoleLookup::NotFound { role_id } = lookup {
            warn!(
                user_id = %user.id,
                role_id = %role_id,
                "User role does not resolve; role grants no permissions"
            );
        }

        let permissions: BTreeSet<String> = lookup
            .role()
            .map(|r| r.permissions.as_slice())
            .unwrap_or_default()
            .iter()
            .chain(user.custom_permissions())
            .cloned()
            .collect();

        EffectivePermissions {
            role_id: user.role.clone(),
            role_resolved: lookup.is_found(),
            permissions,
        }
    }

    /// Membership test on the effective permission set.
    pub fn has_permission(&self, user: &User, permission_id: &str, roles: &[Role]) -> bool {
        self.effective_permissions(user, roles, &[])
            .contains(permission_id)
    }

    /// Partitions permission ids into display groups.
    ///
    /// Groups follow category order, members follow catalog order. Ids missing
    /// from the catalog are skipped.
    pub fn group_by_category<'a, I>(
        &self,
        permission_ids: I,
        catalog: &[Permission],
    ) -> BTreeMap<PermissionCategory, Vec<Permission>>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let wanted: HashSet<&str> = permission_ids.into_iter().map(String::as_str).collect();
        let mut groups: BTreeMap<PermissionCategory, Vec<Permission>> = BTreeMap::new();
        for permission in catalog.iter().filter(|p| wanted.contains(p.id.as_str())) {
            groups
                .entry(permission.category)
                .or_default()
                .push(permission.clone());
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::seed::{permission_catalog, system_roles};

    fn user_with(role: &str, custom: &[&str]) -> User {
        User::new(
            "Subhaharini".to_string(),
            "subhaharini@resolv.ai".to_string(),
            role.to_string(),
            "Engineering".to_string(),
            Some("Karthikeyan".to_string()),
            custom.iter().map(|p| p.to_string()).collect(),
        )
    }

    fn role_permissions(roles: &[Role], role_id: &str) -> BTreeSet<String> {
        roles
            .iter()
            .find(|r| r.id == role_id)
            .map(|r| r.permissions.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_role_permissions_are_subset_of_effective() {
        let roles = system_roles();
        let resolver = PermissionResolver::new();
        for role in &roles {
            let user = user_with(&role.id, &["manage_hardware"]);
            let effective = resolver.effective_permissions(&user, &roles, permission_catalog());
            assert!(effective.role_resolved);
            assert!(role_permissions(&roles, &role.id).is_subset(&effective.permissions));
        }
    }

    #[test]
    fn test_custom_permissions_are_subset_of_effective() {
        let roles = system_roles();
        let user = user_with("junior_developer", &["approve_tickets", "view_analytics"]);
        let effective =
            PermissionResolver::new().effective_permissions(&user, &roles, permission_catalog());
        for custom in user.custom_permissions() {
            assert!(effective.contains(custom));
        }
    }

    #[test]
    fn test_without_custom_permissions_equals_role_set() {
        let roles = system_roles();
        let resolver = PermissionResolver::new();
        for role in &roles {
            let user = user_with(&role.id, &[]);
            let effective = resolver.effective_permissions(&user, &roles, permission_catalog());
            assert_eq!(effective.permissions, role_permissions(&roles, &role.id));
        }
    }

    #[test]
    fn test_has_permission_agrees_with_effective_set() {
        let roles = system_roles();
        let resolver = PermissionResolver::new();
        let user = user_with("senior_developer", &["view_analytics"]);
        let effective = resolver.effective_permissions(&user, &roles, permission_catalog());
        for permission in permission_catalog() {
            assert_eq!(
                resolver.has_permission(&user, &permission.id, &roles),
                effective.contains(&permission.id),
                "{}",
                permission.id
            );
        }
    }

    #[test]
    fn test_junior_developer_scenario() {
        let roles = system_roles();
        let resolver = PermissionResolver::new();
        let user = user_with("junior_developer", &[]);
        assert!(!resolver.has_permission(&user, "approve_tickets", &roles));
        assert!(resolver.has_permission(&user, "create_ticket", &roles));

        let granted = user_with("junior_developer", &["approve_tickets"]);
        assert!(resolver.has_permission(&granted, "approve_tickets", &roles));
        let before = resolver.effective_permissions(&user, &roles, permission_catalog());
        let after = resolver.effective_permissions(&granted, &roles, permission_catalog());
        assert!(before.permissions.is_subset(&after.permissions));
        assert_eq!(after.len(), before.len() + 1);
    }

    #[test]
    fn test_duplicate_grants_collapse() {
        let roles = system_roles();
        let user = user_with("junior_developer", &["create_ticket"]);
        let effective =
            PermissionResolver::new().effective_permissions(&user, &roles, permission_catalog());
        assert_eq!(effective.len(), 7);
    }

    #[test]
    fn test_unresolved_role_grants_only_custom_permissions() {
        let mut roles = system_roles();
        roles.push(Role::new_custom("Release Manager", "", vec!["approve_tickets".to_string()]));
        let user = user_with("release_manager", &["chat_with_ai"]);
        let resolver = PermissionResolver::new();
        assert!(resolver.resolve_role(&user, &roles).is_found());

        roles.retain(|r| r.id != "release_manager");
        let lookup = resolver.resolve_role(&user, &roles);
        assert_eq!(lookup, RoleLookup::NotFound { role_id: "release_manager" });

        let effective = resolver.effective_permissions(&user, &roles, permission_catalog());
        assert!(!effective.role_resolved);
        assert_eq!(effective.permissions, BTreeSet::from(["chat_with_ai".to_string()]));
        assert!(!resolver.has_permission(&user, "approve_tickets", &roles));
    }

    #[test]
    fn test_catalog_does_not_filter_effective_permissions() {
        let roles = system_roles();
        let user = user_with("junior_developer", &["legacy_vpn_access"]);
        let effective = PermissionResolver::new().effective_permissions(&user, &roles, &[]);
        assert!(effective.contains("legacy_vpn_access"));
    }

    #[test]
    fn test_group_by_category_follows_catalog_order() {
        let ids: Vec<String> = [
            "view_analytics",
            "chat_with_ai",
            "approve_tickets",
            "create_ticket",
            "ghost",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let groups = PermissionResolver::new().group_by_category(&ids, permission_catalog());

        let categories: Vec<PermissionCategory> = groups.keys().copied().collect();
        assert_eq!(
            categories,
            vec![PermissionCategory::Tickets, PermissionCategory::AI, PermissionCategory::Admin]
        );
        let tickets: Vec<&str> = groups[&PermissionCategory::Tickets]
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(tickets, vec!["create_ticket", "approve_tickets"]);
        assert_eq!(groups.values().map(Vec::len).sum::<usize>(), 4);
    }

    #[test]
    fn test_group_by_category_of_whole_catalog() {
        let ids: Vec<String> = permission_catalog().iter().map(|p| p.id.clone()).collect();
        let groups = PermissionResolver::new().group_by_category(&ids, permission_catalog());
        assert_eq!(groups.len(), PermissionCategory::ALL.len());
        assert_eq!(groups[&PermissionCategory::Tickets].len(), 4);
        assert_eq!(groups[&PermissionCategory::Hardware].len(), 2);
    }
}
