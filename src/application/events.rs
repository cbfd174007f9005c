use crate::domain::user::UserStatus;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Base trait for all domain events
pub trait DomainEvent: Send + Sync {
    fn event_id(&self) -> &str;
    fn aggregate_id(&self) -> &str;
    fn occurred_at(&self) -> DateTime<Utc>;
    fn event_type(&self) -> &str;
}

/// User-related domain events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreatedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserUpdatedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub user_id: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDuplicatedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub user_id: String,
    pub source_user_id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDeletedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatusToggledEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub user_id: String,
    pub status: UserStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCustomPermissionsSetEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub user_id: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLoggedInEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub user_id: String,
    pub email: String,
}

/// Role-related domain events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleCreatedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub role_id: String,
    pub role_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDuplicatedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub role_id: String,
    pub source_role_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDeletedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub role_id: String,
    pub orphaned_users: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePermissionToggledEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub role_id: String,
    pub permission_id: String,
    pub granted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleChangesSavedEvent {
    pub event_id: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
    pub role_count: usize,
}

/// Event factory functions
pub struct EventFactory;

impl EventFactory {
    pub fn user_created(user_id: String, email: String) -> UserCreatedEvent {
        UserCreatedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: user_id.clone(),
            occurred_at: Utc::now(),
            user_id,
            email,
        }
    }

    pub fn user_updated(user_id: String, email: String, role: String) -> UserUpdatedEvent {
        UserUpdatedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: user_id.clone(),
            occurred_at: Utc::now(),
            user_id,
            email,
            role,
        }
    }

    pub fn user_duplicated(
        user_id: String,
        source_user_id: String,
        email: String,
    ) -> UserDuplicatedEvent {
        UserDuplicatedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: user_id.clone(),
            occurred_at: Utc::now(),
            user_id,
            source_user_id,
            email,
        }
    }

    pub fn user_deleted(user_id: String) -> UserDeletedEvent {
        UserDeletedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: user_id.clone(),
            occurred_at: Utc::now(),
            user_id,
        }
    }

    pub fn user_status_toggled(user_id: String, status: UserStatus) -> UserStatusToggledEvent {
        UserStatusToggledEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: user_id.clone(),
            occurred_at: Utc::now(),
            user_id,
            status,
        }
    }

    pub fn user_custom_permissions_set(
        user_id: String,
        permissions: Vec<String>,
    ) -> UserCustomPermissionsSetEvent {
        UserCustomPermissionsSetEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: user_id.clone(),
            occurred_at: Utc::now(),
            user_id,
            permissions,
        }
    }

    pub fn user_logged_in(user_id: String, email: String) -> UserLoggedInEvent {
        UserLoggedInEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: user_id.clone(),
            occurred_at: Utc::now(),
            user_id,
            email,
        }
    }

    pub fn role_created(role_id: String, role_name: String) -> RoleCreatedEvent {
        RoleCreatedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: role_id.clone(),
            occurred_at: Utc::now(),
            role_id,
            role_name,
        }
    }

    pub fn role_duplicated(role_id: String, source_role_id: String) -> RoleDuplicatedEvent {
        RoleDuplicatedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: role_id.clone(),
            occurred_at: Utc::now(),
            role_id,
            source_role_id,
        }
    }

    pub fn role_deleted(role_id: String, orphaned_users: usize) -> RoleDeletedEvent {
        RoleDeletedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: role_id.clone(),
            occurred_at: Utc::now(),
            role_id,
            orphaned_users,
        }
    }

    pub fn role_permission_toggled(
        role_id: String,
        permission_id: String,
        granted: bool,
    ) -> RolePermissionToggledEvent {
        RolePermissionToggledEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: role_id.clone(),
            occurred_at: Utc::now(),
            role_id,
            permission_id,
            granted,
        }
    }

    pub fn role_changes_saved(role_count: usize) -> RoleChangesSavedEvent {
        RoleChangesSavedEvent {
            event_id: Uuid::new_v4().to_string(),
            aggregate_id: "roles".to_string(),
            occurred_at: Utc::now(),
            role_count,
        }
    }
}

impl DomainEvent for UserCreatedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "UserCreated"
    }
}

impl DomainEvent for UserUpdatedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "UserUpdated"
    }
}

impl DomainEvent for UserDuplicatedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "UserDuplicated"
    }
}

impl DomainEvent for UserDeletedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "UserDeleted"
    }
}

impl DomainEvent for UserStatusToggledEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "UserStatusToggled"
    }
}

impl DomainEvent for UserCustomPermissionsSetEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "UserCustomPermissionsSet"
    }
}

impl DomainEvent for UserLoggedInEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "UserLoggedIn"
    }
}

impl DomainEvent for RoleCreatedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "RoleCreated"
    }
}

impl DomainEvent for RoleDuplicatedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "RoleDuplicated"
    }
}

impl DomainEvent for RoleDeletedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "RoleDeleted"
    }
}

impl DomainEvent for RolePermissionToggledEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "RolePermissionToggled"
    }
}

impl DomainEvent for RoleChangesSavedEvent {
    fn event_id(&self) -> &str {
        &self.event_id
    }
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
    fn event_type(&self) -> &str {
        "RoleChangesSaved"
    }
}

/// Flattened view of a published event, as kept by an event store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: String,
    pub event_type: String,
    pub aggregate_id: String,
    pub occurred_at: DateTime<Utc>,
}

impl EventRecord {
    pub fn from_event(event: &dyn DomainEvent) -> Self {
        Self {
            event_id: event.event_id().to_string(),
            event_type: event.event_type().to_string(),
            aggregate_id: event.aggregate_id().to_string(),
            occurred_at: event.occurred_at(),
        }
    }
}

/// Event store trait for persisting events
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn store_event(&self, event: &dyn DomainEvent);
    async fn get_events_for_aggregate(&self, aggregate_id: &str) -> Vec<EventRecord>;
    async fn all_events(&self) -> Vec<EventRecord>;
}

/// Events kept by [`InMemoryEventStore::new`] before the oldest are dropped.
pub const DEFAULT_EVENT_CAPACITY: usize = 10_000;

/// Event log held in memory. Keeps the most recent `capacity` events.
pub struct InMemoryEventStore {
    events: RwLock<VecDeque<EventRecord>>,
    capacity: usize,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn store_event(&self, event: &dyn DomainEvent) {
        tracing::info!(
            event_id = %event.event_id(),
            event_type = %event.event_type(),
            aggregate_id = %event.aggregate_id(),
            "Domain event published"
        );
        let mut events = self.events.write().await;
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(EventRecord::from_event(event));
    }

    async fn get_events_for_aggregate(&self, aggregate_id: &str) -> Vec<EventRecord> {
        self.events
            .read()
            .await
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect()
    }

    async fn all_events(&self) -> Vec<EventRecord> {
        self.events.read().await.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_created_event() {
        let event = EventFactory::user_created("user1".to_string(), "test@resolv.ai".to_string());

        assert_eq!(event.event_type(), "UserCreated");
        assert_eq!(event.aggregate_id(), "user1");
        assert_eq!(event.email, "test@resolv.ai");
        assert!(!event.event_id.is_empty());
    }

    #[test]
    fn test_role_changes_saved_event_targets_role_collection() {
        let event = EventFactory::role_changes_saved(5);
        assert_eq!(event.event_type(), "RoleChangesSaved");
        assert_eq!(event.aggregate_id(), "roles");
        assert_eq!(event.role_count, 5);
    }

    #[tokio::test]
    async fn test_event_store_filters_by_aggregate() {
        let store = InMemoryEventStore::new();
        store
            .store_event(&EventFactory::role_permission_toggled(
                "qa_lead".to_string(),
                "view_analytics".to_string(),
                true,
            ))
            .await;
        store
            .store_event(&EventFactory::user_deleted("7".to_string()))
            .await;

        let role_events = store.get_events_for_aggregate("qa_lead").await;
        assert_eq!(role_events.len(), 1);
        assert_eq!(role_events[0].event_type, "RolePermissionToggled");
        assert_eq!(store.all_events().await.len(), 2);
    }

    #[tokio::test]
    async fn test_event_store_drops_oldest_past_capacity() {
        let store = InMemoryEventStore::with_capacity(2);
        for user_id in ["1", "2", "3"] {
            store
                .store_event(&EventFactory::user_deleted(user_id.to_string()))
                .await;
        }

        let kept: Vec<String> = store
            .all_events()
            .await
            .into_iter()
            .map(|e| e.aggregate_id)
            .collect();
        assert_eq!(kept, vec!["2".to_string(), "3".to_string()]);
        assert!(store.get_events_for_aggregate("1").await.is_empty());
    }
}
