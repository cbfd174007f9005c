//! Seed data loaded at process start.
//!
//! The permission catalog is static for the lifetime of the process. Roles and
//! users are only the initial contents of their stores and may be changed at
//! runtime by an administrator.

use crate::domain::permission::{Permission, PermissionCategory};
use crate::domain::role::Role;
use crate::domain::user::{User, UserStatus};
use once_cell::sync::Lazy;

static PERMISSION_CATALOG: Lazy<Vec<Permission>> = Lazy::new(|| {
    use PermissionCategory::*;
    [
        // Ticket management
        ("create_ticket", "Create Tickets", "Can create support tickets", Tickets),
        ("view_own_tickets", "View Own Tickets", "Can view their own tickets", Tickets),
        ("view_all_tickets", "View All Tickets", "Can view tickets from all users", Tickets),
        ("approve_tickets", "Approve Tickets", "Can approve tickets requiring approval", Tickets),
        // Access management
        (
            "request_database_access",
            "Request Database Access",
            "Can request access to databases",
            Access,
        ),
        (
            "self_approve_basic",
            "Self-Approve Basic Requests",
            "Can approve their own basic access requests",
            Access,
        ),
        (
            "approve_access_requests",
            "Approve Access Requests",
            "Can approve access requests from team members",
            Access,
        ),
        // System management
        ("view_system_status", "View System Status", "Can view system health and status", System),
        (
            "manage_infrastructure",
            "Manage Infrastructure",
            "Can manage cloud infrastructure",
            System,
        ),
        ("access_admin_panel", "Access Admin Panel", "Can access administrative functions", System),
        // AI features
        ("chat_with_ai", "Chat with AI Guardian", "Can interact with AI assistant", AI),
        (
            "view_proactive_alerts",
            "View Proactive Alerts",
            "Can see AI-generated proactive alerts",
            AI,
        ),
        // Hardware management
        ("request_hardware", "Request Hardware", "Can request hardware replacements", Hardware),
        ("manage_hardware", "Manage Hardware", "Can manage hardware inventory", Hardware),
        // User management
        ("manage_users", "Manage Users", "Can add, edit, and delete users", Admin),
        ("manage_roles", "Manage Roles", "Can create and modify roles", Admin),
        ("view_analytics", "View Analytics", "Can access system analytics and reports", Admin),
    ]
    .into_iter()
    .map(|(id, name, description, category)| Permission::new(id, name, description, category))
    .collect()
});

/// The global permission catalog, in display order.
pub fn permission_catalog() -> &'static [Permission] {
    &PERMISSION_CATALOG
}

fn ids(permissions: &[&str]) -> Vec<String> {
    permissions.iter().map(|p| p.to_string()).collect()
}

fn system_role(id: &str, name: &str, description: &str, permissions: Vec<String>) -> Role {
    Role {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        permissions,
        is_custom: false,
    }
}

/// The roles shipped with the product. All are system roles.
pub fn system_roles() -> Vec<Role> {
    vec![
        system_role(
            "junior_developer",
            "Junior Developer",
            "Entry-level developer with guided access",
            ids(&[
                "create_ticket",
                "view_own_tickets",
                "request_database_access",
                "view_system_status",
                "chat_with_ai",
                "view_proactive_alerts",
                "request_hardware",
            ]),
        ),
        system_role(
            "senior_developer",
            "Senior Developer",
            "Experienced developer with broader access",
            ids(&[
                "create_ticket",
                "view_own_tickets",
                "view_all_tickets",
                "request_database_access",
                "self_approve_basic",
                "approve_tickets",
                "view_system_status",
                "manage_infrastructure",
                "chat_with_ai",
                "view_proactive_alerts",
                "request_hardware",
            ]),
        ),
        system_role(
            "solutions_architect",
            "Solutions Architect",
            "Senior technical role with advanced system access",
            ids(&[
                "create_ticket",
                "view_own_tickets",
                "view_all_tickets",
                "approve_tickets",
                "request_database_access",
                "self_approve_basic",
                "approve_access_requests",
                "view_system_status",
                "manage_infrastructure",
                "chat_with_ai",
                "view_proactive_alerts",
                "request_hardware",
            ]),
        ),
        system_role(
            "it_admin",
            "IT Administrator",
            "Full administrative access to all systems",
            permission_catalog().iter().map(|p| p.id.clone()).collect(),
        ),
    ]
}

fn seed_user(
    id: &str,
    name: &str,
    email: &str,
    role: &str,
    department: &str,
    manager: Option<&str>,
) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        email: email.to_string(),
        role: role.to_string(),
        department: department.to_string(),
        manager: manager.map(str::to_string),
        is_admin: role == crate::domain::user::ADMIN_ROLE_ID,
        custom_permissions: None,
        status: UserStatus::Active,
    }
}

/// Demo directory: one administrator and an engineering organisation.
pub fn demo_users() -> Vec<User> {
    vec![
        seed_user(
            "1",
            "Harish Rohith S",
            "harish@resolv.ai",
            "it_admin",
            "IT Administration",
            None,
        ),
        seed_user(
            "2",
            "Subhaharini",
            "subhaharini@resolv.ai",
            "junior_developer",
            "Engineering",
            Some("Karthikeyan"),
        ),
        seed_user(
            "3",
            "Hairni",
            "hairni@resolv.ai",
            "junior_developer",
            "Engineering",
            Some("Karthikeyan"),
        ),
        seed_user(
            "4",
            "Kevin S",
            "kevin.s@resolv.ai",
            "senior_developer",
            "Engineering",
            Some("Karthikeyan"),
        ),
        seed_user(
            "5",
            "Karthikeyan",
            "karthikeyan@resolv.ai",
            "solutions_architect",
            "Engineering",
            None,
        ),
        seed_user(
            "6",
            "Kevin R",
            "kevin.r@resolv.ai",
            "senior_developer",
            "Engineering",
            Some("Karthikeyan"),
        ),
        seed_user(
            "7",
            "Dhina",
            "dhina@resolv.ai",
            "junior_developer",
            "Engineering",
            Some("Karthikeyan"),
        ),
        seed_user(
            "8",
            "Sathya",
            "sathya@resolv.ai",
            "senior_developer",
            "Engineering",
            Some("Karthikeyan"),
        ),
        seed_user(
            "9",
            "Barani",
            "barani@resolv.ai",
            "junior_developer",
            "Quality Assurance",
            Some("Naveen"),
        ),
        seed_user(
            "10",
            "Chiranjeevi",
            "chiranjeevi@resolv.ai",
            "senior_developer",
            "DevOps",
            Some("Ranjithkumar"),
        ),
        seed_user(
            "11",
            "Bhubana",
            "bhubana@resolv.ai",
            "junior_developer",
            "Frontend",
            Some("Naveen"),
        ),
        seed_user(
            "12",
            "Amrin",
            "amrin@resolv.ai",
            "senior_developer",
            "Backend",
            Some("Ranjithkumar"),
        ),
        seed_user(
            "13",
            "Naveen",
            "naveen@resolv.ai",
            "solutions_architect",
            "Product Engineering",
            None,
        ),
        seed_user(
            "14",
            "Ranjithkumar",
            "ranjithkumar@resolv.ai",
            "solutions_architect",
            "Infrastructure",
            None,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_ids_are_unique() {
        let ids: HashSet<&str> = permission_catalog().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids.len(), permission_catalog().len());
        assert_eq!(ids.len(), 17);
    }

    #[test]
    fn test_catalog_is_grouped_in_category_order() {
        let categories: Vec<PermissionCategory> =
            permission_catalog().iter().map(|p| p.category).collect();
        let mut sorted = categories.clone();
        sorted.sort();
        assert_eq!(categories, sorted);
    }

    #[test]
    fn test_every_role_permission_is_in_catalog() {
        let catalog: HashSet<&str> = permission_catalog().iter().map(|p| p.id.as_str()).collect();
        for role in system_roles() {
            assert!(role.is_system());
            for permission in &role.permissions {
                assert!(catalog.contains(permission.as_str()), "{} holds {}", role.id, permission);
            }
        }
    }

    #[test]
    fn test_admin_role_holds_whole_catalog() {
        let admin = system_roles().into_iter().find(|r| r.id == "it_admin").unwrap();
        assert_eq!(admin.permissions.len(), permission_catalog().len());
    }

    #[test]
    fn test_demo_users_reference_seed_roles_and_unique_emails() {
        let roles: HashSet<String> = system_roles().into_iter().map(|r| r.id).collect();
        let users = demo_users();
        let emails: HashSet<&str> = users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails.len(), users.len());
        assert!(users.iter().all(|u| roles.contains(&u.role)));
        assert_eq!(users.iter().filter(|u| u.is_admin).count(), 1);
    }
}
