use super::queries::{
    CheckPermissionQuery, EffectivePermissionsReadModel, GetEffectivePermissionsQuery,
    GetHierarchyQuery, GetRoleChangesQuery, GetRolePermissionMatrixQuery, GetRoleQuery,
    GetUserQuery, ListDepartmentsQuery, ListPermissionsQuery, ListRolesQuery, ListUsersQuery,
    MatrixCategoryReadModel, MatrixEntryReadModel, PermissionGroupReadModel,
    RoleChangesReadModel, RolePermissionMatrixReadModel, RoleSummaryReadModel,
};
use super::query_bus::QueryHandler;
use super::resolver::PermissionResolver;
use super::services::{RoleChangeTracker, ServiceError};
use crate::domain::hierarchy::{HierarchyNode, build_hierarchy};
use crate::domain::permission::{Permission, PermissionCategory};
use crate::domain::role::Role;
use crate::domain::user::User;
use crate::infrastructure::{PermissionRepository, RoleRepository, UserRepository};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;

// ============================================================================
// QUERY HANDLERS
// ============================================================================

fn into_groups(
    groups: BTreeMap<PermissionCategory, Vec<Permission>>,
) -> Vec<PermissionGroupReadModel> {
    groups
        .into_iter()
        .map(|(category, permissions)| PermissionGroupReadModel {
            category,
            permissions,
        })
        .collect()
}

async fn find_user(
    user_repo: &Arc<dyn UserRepository>,
    user_id: &str,
) -> Result<User, ServiceError> {
    user_repo
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ServiceError::UserNotFound(user_id.to_string()))
}

async fn find_role(
    role_repo: &Arc<dyn RoleRepository>,
    role_id: &str,
) -> Result<Role, ServiceError> {
    role_repo
        .find_by_id(role_id)
        .await?
        .ok_or_else(|| ServiceError::RoleNotFound(role_id.to_string()))
}

/// Get effective permissions query handler
pub struct GetEffectivePermissionsQueryHandler {
    user_repo: Arc<dyn UserRepository>,
    role_repo: Arc<dyn RoleRepository>,
    permission_repo: Arc<dyn PermissionRepository>,
    resolver: PermissionResolver,
}

impl GetEffectivePermissionsQueryHandler {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        role_repo: Arc<dyn RoleRepository>,
        permission_repo: Arc<dyn PermissionRepository>,
        resolver: PermissionResolver,
    ) -> Self {
        Self {
            user_repo,
            role_repo,
            permission_repo,
            resolver,
        }
    }
}

#[async_trait]
impl QueryHandler<GetEffectivePermissionsQuery> for GetEffectivePermissionsQueryHandler {
    type Result = EffectivePermissionsReadModel;
    type Error = ServiceError;

    #[instrument(name = "get_effective_permissions_query_handler", skip(self, query), fields(user_id = %query.user_id))]
    async fn handle(
        &self,
        query: GetEffectivePermissionsQuery,
    ) -> Result<Self::Result, Self::Error> {
        let user = find_user(&self.user_repo, &query.user_id).await?;
        let roles = self.role_repo.list_roles().await?;
        let catalog = self.permission_repo.list_permissions().await?;

        let effective = self.resolver.effective_permissions(&user, &roles, &catalog);
        let groups = self.resolver.group_by_category(effective.iter(), &catalog);

        Ok(EffectivePermissionsReadModel {
            user_id: user.id,
            role_id: effective.role_id.clone(),
            role_resolved: effective.role_resolved,
            groups: into_groups(groups),
            permissions: effective.permissions.into_iter().collect(),
        })
    }
}

/// Check permission query handler
pub struct CheckPermissionQueryHandler {
    user_repo: Arc<dyn UserRepository>,
    role_repo: Arc<dyn RoleRepository>,
    resolver: PermissionResolver,
}

impl CheckPermissionQueryHandler {
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
}

#[async_trait]
impl QueryHandler<CheckPermissionQuery> for CheckPermissionQueryHandler {
    type Result = bool;
    type Error = ServiceError;

    #[instrument(name = "check_permission_query_handler", skip(self, query), fields(user_id = %query.user_id, permission_id = %query.permission_id))]
    async fn handle(&self, query: CheckPermissionQuery) -> Result<Self::Result, Self::Error> {
        let user = find_user(&self.user_repo, &query.user_id).await?;
        let roles = self.role_repo.list_roles().await?;
        Ok(self
            .resolver
            .has_permission(&user, &query.permission_id, &roles))
    }
}

/// List users query handler
pub struct ListUsersQueryHandler {
    user_repo: Arc<dyn UserRepository>,
}

impl ListUsersQueryHandler {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }
}

fn user_matches(user: &User, query: &ListUsersQuery) -> bool {
    let search_ok = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .is_none_or(|needle| {
            user.name.to_lowercase().contains(&needle)
                || user.email.to_lowercase().contains(&needle)
        });
    let department_ok = query
        .department
        .as_deref()
        .is_none_or(|d| user.department == d);
    let role_ok = query.role.as_deref().is_none_or(|r| user.role == r);
    search_ok && department_ok && role_ok
}

#[async_trait]
impl QueryHandler<ListUsersQuery> for ListUsersQueryHandler {
    type Result = Vec<User>;
    type Error = ServiceError;

    #[instrument(name = "list_users_query_handler", skip(self))]
    async fn handle(&self, query: ListUsersQuery) -> Result<Self::Result, Self::Error> {
        let users = self.user_repo.list_users().await?;
        Ok(users
            .into_iter()
            .filter(|u| user_matches(u, &query))
            .collect())
    }
}

/// List departments query handler
pub struct ListDepartmentsQueryHandler {
    user_repo: Arc<dyn UserRepository>,
}

impl ListDepartmentsQueryHandler {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }
}

#[async_trait]
impl QueryHandler<ListDepartmentsQuery> for ListDepartmentsQueryHandler {
    type Result = Vec<String>;
    type Error = ServiceError;

    #[instrument(name = "list_departments_query_handler", skip(self, _query))]
    async fn handle(&self, _query: ListDepartmentsQuery) -> Result<Self::Result, Self::Error> {
        let mut departments: Vec<String> = Vec::new();
        for user in self.user_repo.list_users().await? {
            if !user.department.trim().is_empty() && !departments.contains(&user.department) {
                departments.push(user.department);
            }
        }
        Ok(departments)
    }
}

/// List roles query handler
pub struct ListRolesQueryHandler {
    role_repo: Arc<dyn RoleRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl ListRolesQueryHandler {
    pub fn new(role_repo: Arc<dyn RoleRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self {
            role_repo,
            user_repo,
        }
    }
}

#[async_trait]
impl QueryHandler<ListRolesQuery> for ListRolesQueryHandler {
    type Result = Vec<RoleSummaryReadModel>;
    type Error = ServiceError;

    #[instrument(name = "list_roles_query_handler", skip(self, _query))]
    async fn handle(&self, _query: ListRolesQuery) -> Result<Self::Result, Self::Error> {
        let users = self.user_repo.list_users().await?;
        let roles = self.role_repo.list_roles().await?;
        Ok(roles
            .into_iter()
            .map(|role| RoleSummaryReadModel {
                user_count: users.iter().filter(|u| u.role == role.id).count(),
                role,
            })
            .collect())
    }
}

/// Role permission matrix query handler
pub struct GetRolePermissionMatrixQueryHandler {
    role_repo: Arc<dyn RoleRepository>,
    permission_repo: Arc<dyn PermissionRepository>,
}

impl GetRolePermissionMatrixQueryHandler {
    pub fn new(
        role_repo: Arc<dyn RoleRepository>,
        permission_repo: Arc<dyn PermissionRepository>,
    ) -> Self {
        Self {
            role_repo,
            permission_repo,
        }
    }
}

#[async_trait]
impl QueryHandler<GetRolePermissionMatrixQuery> for GetRolePermissionMatrixQueryHandler {
    type Result = RolePermissionMatrixReadModel;
    type Error = ServiceError;

    #[instrument(name = "get_role_permission_matrix_query_handler", skip(self, query), fields(role_id = %query.role_id))]
    async fn handle(
        &self,
        query: GetRolePermissionMatrixQuery,
    ) -> Result<Self::Result, Self::Error> {
        let role = find_role(&self.role_repo, &query.role_id).await?;
        let catalog = self.permission_repo.list_permissions().await?;

        let categories = PermissionCategory::ALL
            .into_iter()
            .map(|category| {
                let entries: Vec<MatrixEntryReadModel> = catalog
                    .iter()
                    .filter(|p| p.category == category)
                    .map(|p| MatrixEntryReadModel {
                        enabled: role.has_permission(&p.id),
                        permission: p.clone(),
                    })
                    .collect();
                MatrixCategoryReadModel {
                    category,
                    enabled: entries.iter().filter(|e| e.enabled).count(),
                    total: entries.len(),
                    entries,
                }
            })
            .filter(|c| c.total > 0)
            .collect();

        Ok(RolePermissionMatrixReadModel {
            role_id: role.id,
            role_name: role.name,
            is_custom: role.is_custom,
            categories,
        })
    }
}

/// List permissions query handler
pub struct ListPermissionsQueryHandler {
    permission_repo: Arc<dyn PermissionRepository>,
    resolver: PermissionResolver,
}

impl ListPermissionsQueryHandler {
    pub fn new(
        permission_repo: Arc<dyn PermissionRepository>,
        resolver: PermissionResolver,
    ) -> Self {
        Self {
            permission_repo,
            resolver,
        }
    }
}

#[async_trait]
impl QueryHandler<ListPermissionsQuery> for ListPermissionsQueryHandler {
    type Result = Vec<PermissionGroupReadModel>;
    type Error = ServiceError;

    #[instrument(name = "list_permissions_query_handler", skip(self, _query))]
    async fn handle(&self, _query: ListPermissionsQuery) -> Result<Self::Result, Self::Error> {
        let catalog = self.permission_repo.list_permissions().await?;
        let ids: Vec<String> = catalog.iter().map(|p| p.id.clone()).collect();
        Ok(into_groups(self.resolver.group_by_category(&ids, &catalog)))
    }
}

/// Get user query handler
pub struct GetUserQueryHandler {
    user_repo: Arc<dyn UserRepository>,
}

impl GetUserQueryHandler {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }
}

#[async_trait]
impl QueryHandler<GetUserQuery> for GetUserQueryHandler {
    type Result = User;
    type Error = ServiceError;

    #[instrument(name = "get_user_query_handler", skip(self, query), fields(user_id = %query.user_id))]
    async fn handle(&self, query: GetUserQuery) -> Result<Self::Result, Self::Error> {
        find_user(&self.user_repo, &query.user_id).await
    }
}

/// Get role query handler
pub struct GetRoleQueryHandler {
    role_repo: Arc<dyn RoleRepository>,
}

impl GetRoleQueryHandler {
    pub fn new(role_repo: Arc<dyn RoleRepository>) -> Self {
        Self { role_repo }
    }
}

#[async_trait]
impl QueryHandler<GetRoleQuery> for GetRoleQueryHandler {
    type Result = Role;
    type Error = ServiceError;

    #[instrument(name = "get_role_query_handler", skip(self, query), fields(role_id = %query.role_id))]
    async fn handle(&self, query: GetRoleQuery) -> Result<Self::Result, Self::Error> {
        find_role(&self.role_repo, &query.role_id).await
    }
}

/// Org hierarchy query handler
pub struct GetHierarchyQueryHandler {
    user_repo: Arc<dyn UserRepository>,
}

impl GetHierarchyQueryHandler {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }
}

#[async_trait]
impl QueryHandler<GetHierarchyQuery> for GetHierarchyQueryHandler {
    type Result = Vec<HierarchyNode>;
    type Error = ServiceError;

    #[instrument(name = "get_hierarchy_query_handler", skip(self))]
    async fn handle(&self, query: GetHierarchyQuery) -> Result<Self::Result, Self::Error> {
        let users = self.user_repo.list_users().await?;
        Ok(build_hierarchy(&users, query.search.as_deref()))
    }
}

/// Role editor unsaved-changes query handler
pub struct GetRoleChangesQueryHandler {
    changes: RoleChangeTracker,
}

impl GetRoleChangesQueryHandler {
    pub fn new(changes: RoleChangeTracker) -> Self {
        Self { changes }
    }
}

#[async_trait]
impl QueryHandler<GetRoleChangesQuery> for GetRoleChangesQueryHandler {
    type Result = RoleChangesReadModel;
    type Error = ServiceError;

    async fn handle(&self, _query: GetRoleChangesQuery) -> Result<Self::Result, Self::Error> {
        Ok(RoleChangesReadModel {
            has_unsaved_changes: self.changes.has_unsaved_changes(),
            save_delay_ms: self.changes.save_delay().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::seed::{demo_users, system_roles};
    use crate::infrastructure::{
        InMemoryPermissionRepository, InMemoryRoleRepository, InMemoryUserRepository,
    };

    fn users() -> Arc<dyn UserRepository> {
        Arc::new(InMemoryUserRepository::new(demo_users()))
    }

    fn roles() -> Arc<dyn RoleRepository> {
        Arc::new(InMemoryRoleRepository::new(system_roles()))
    }

    fn permissions() -> Arc<dyn PermissionRepository> {
        Arc::new(InMemoryPermissionRepository::seeded())
    }

    #[tokio::test]
    async fn test_effective_permissions_read_model() {
        let handler = GetEffectivePermissionsQueryHandler::new(
            users(),
            roles(),
            permissions(),
            PermissionResolver::new(),
        );
        let model = handler
            .handle(GetEffectivePermissionsQuery {
                user_id: "2".to_string(),
            })
            .await
            .unwrap();
        assert!(model.role_resolved);
        assert_eq!(model.permissions.len(), 7);
        assert_eq!(model.groups.iter().map(|g| g.permissions.len()).sum::<usize>(), 7);
        assert_eq!(model.groups[0].category, PermissionCategory::Tickets);

        let missing = handler
            .handle(GetEffectivePermissionsQuery {
                user_id: "404".to_string(),
            })
            .await;
        assert!(matches!(missing, Err(ServiceError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_check_permission() {
        let handler = CheckPermissionQueryHandler::new(users(), roles(), PermissionResolver::new());
        let check = |user_id: &str, permission_id: &str| CheckPermissionQuery {
            user_id: user_id.to_string(),
            permission_id: permission_id.to_string(),
        };
        assert!(!handler.handle(check("2", "approve_tickets")).await.unwrap());
        assert!(handler.handle(check("4", "approve_tickets")).await.unwrap());
        assert!(handler.handle(check("1", "manage_roles")).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_users_filters_combine() {
        let handler = ListUsersQueryHandler::new(users());
        let all = handler.handle(ListUsersQuery::default()).await.unwrap();
        assert_eq!(all.len(), 14);

        let kevins = handler
            .handle(ListUsersQuery {
                search: Some("KEVIN".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(kevins.len(), 2);

        let seniors_in_engineering = handler
            .handle(ListUsersQuery {
                search: None,
                department: Some("Engineering".to_string()),
                role: Some("senior_developer".to_string()),
            })
            .await
            .unwrap();
        let names: Vec<&str> = seniors_in_engineering.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Kevin S", "Kevin R", "Sathya"]);
    }

    #[tokio::test]
    async fn test_list_departments_in_first_seen_order() {
        let departments = ListDepartmentsQueryHandler::new(users())
            .handle(ListDepartmentsQuery)
            .await
            .unwrap();
        assert_eq!(
            departments,
            vec![
                "IT Administration",
                "Engineering",
                "Quality Assurance",
                "DevOps",
                "Frontend",
                "Backend",
                "Product Engineering",
                "Infrastructure",
            ]
        );
    }

    #[tokio::test]
    async fn test_list_roles_counts_members() {
        let summaries = ListRolesQueryHandler::new(roles(), users())
            .handle(ListRolesQuery)
            .await
            .unwrap();
        let counts: Vec<(&str, usize)> = summaries
            .iter()
            .map(|s| (s.role.id.as_str(), s.user_count))
            .collect();
        assert_eq!(
            counts,
            vec![
                ("junior_developer", 5),
                ("senior_developer", 5),
                ("solutions_architect", 3),
                ("it_admin", 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_role_matrix_counts() {
        let handler = GetRolePermissionMatrixQueryHandler::new(roles(), permissions());
        let matrix = handler
            .handle(GetRolePermissionMatrixQuery {
                role_id: "junior_developer".to_string(),
            })
            .await
            .unwrap();
        assert!(!matrix.is_custom);
        assert_eq!(matrix.categories.len(), 6);
        let tickets = &matrix.categories[0];
        assert_eq!((tickets.enabled, tickets.total), (2, 4));
        let admin = &matrix.categories[5];
        assert_eq!((admin.enabled, admin.total), (0, 3));

        let missing = handler
            .handle(GetRolePermissionMatrixQuery {
                role_id: "ghost".to_string(),
            })
            .await;
        assert!(matches!(missing, Err(ServiceError::RoleNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_permissions_grouped() {
        let groups = ListPermissionsQueryHandler::new(permissions(), PermissionResolver::new())
            .handle(ListPermissionsQuery)
            .await
            .unwrap();
        assert_eq!(groups.len(), 6);
        assert_eq!(groups.iter().map(|g| g.permissions.len()).sum::<usize>(), 17);
    }

    #[tokio::test]
    async fn test_hierarchy_roots() {
        let forest = GetHierarchyQueryHandler::new(users())
            .handle(GetHierarchyQuery::default())
            .await
            .unwrap();
        let roots: Vec<&str> = forest.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(roots, vec!["Harish Rohith S", "Karthikeyan", "Naveen", "Ranjithkumar"]);
        assert_eq!(forest[1].direct_reports, 6);
        assert_eq!(forest.iter().map(HierarchyNode::size).sum::<usize>(), 14);
    }

    #[tokio::test]
    async fn test_role_changes_state() {
        let tracker = RoleChangeTracker::new(std::time::Duration::from_millis(250));
        let handler = GetRoleChangesQueryHandler::new(tracker.clone());
        assert!(!handler.handle(GetRoleChangesQuery).await.unwrap().has_unsaved_changes);
        tracker.mark_dirty();
        let state = handler.handle(GetRoleChangesQuery).await.unwrap();
        assert!(state.has_unsaved_changes);
        assert_eq!(state.save_delay_ms, 250);
    }
}
