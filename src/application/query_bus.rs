use super::services::ServiceError;
use async_trait::async_trait;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Query handler trait
#[async_trait]
pub trait QueryHandler<Q>: Send + Sync {
    type Result: Send + Sync;
    type Error: std::error::Error + Send + Sync;

    async fn handle(&self, query: Q) -> Result<Self::Result, Self::Error>;
}

type BoxedResult = Result<Box<dyn Any + Send + Sync>, Box<dyn std::error::Error + Send + Sync>>;

/// Query bus for handling queries
pub struct QueryBus {
    handlers: Arc<RwLock<HashMap<TypeId, Box<dyn QueryHandlerBox + Send + Sync>>>>,
}

/// Boxed query handler for type erasure
#[async_trait]
trait QueryHandlerBox: Send + Sync {
    async fn handle(&self, query: Box<dyn Any + Send + Sync>) -> BoxedResult;
}

impl Default for QueryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a query handler
    pub async fn register_handler<Q, H>(&self, handler: H)
    where
        Q: 'static + Send + Sync,
        H: QueryHandler<Q> + 'static + Send + Sync,
    {
        let boxed_handler = Box::new(QueryHandlerWrapper::new(handler));
        let type_id = TypeId::of::<Q>();

        let mut handlers = self.handlers.write().await;
        handlers.insert(type_id, boxed_handler);
    }

    /// Execute a query
    pub async fn execute<Q>(&self, query: Q) -> BoxedResult
    where
        Q: 'static + Send + Sync,
    {
        let type_id = TypeId::of::<Q>();
        let handlers = self.handlers.read().await;

        if let Some(handler) = handlers.get(&type_id) {
            let boxed_query = Box::new(query);
            handler.handle(boxed_query).await
        } else {
            Err(format!(
                "No handler registered for query type: {}",
                std::any::type_name::<Q>()
            )
            .into())
        }
    }

    /// Execute a query and recover the handler's typed result.
    pub async fn dispatch<Q, R>(&self, query: Q) -> Result<R, ServiceError>
    where
        Q: 'static + Send + Sync,
        R: 'static,
    {
        match self.execute(query).await {
            Ok(result) => result.downcast::<R>().map(|r| *r).map_err(|_| {
                ServiceError::Dispatch(format!(
                    "unexpected result type for {}",
                    std::any::type_name::<Q>()
                ))
            }),
            Err(error) => Err(match error.downcast::<ServiceError>() {
                Ok(service_error) => *service_error,
                Err(other) => ServiceError::Dispatch(other.to_string()),
            }),
        }
    }
}

/// Wrapper for query handlers to enable type erasure
struct QueryHandlerWrapper<Q, H> {
    handler: H,
    _phantom: std::marker::PhantomData<fn(Q)>,
}

impl<Q, H> QueryHandlerWrapper<Q, H> {
    fn new(handler: H) -> Self {
        Self {
            handler,
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<Q, H> QueryHandlerBox for QueryHandlerWrapper<Q, H>
where
    Q: 'static + Send + Sync,
    H: QueryHandler<Q> + Send + Sync,
    <H as QueryHandler<Q>>::Result: 'static,
    <H as QueryHandler<Q>>::Error: 'static,
{
    async fn handle(&self, query: Box<dyn Any + Send + Sync>) -> BoxedResult {
        let query = query
            .downcast::<Q>()
            .map_err(|_| "Failed to downcast query")?;

        let result = self
            .handler
            .handle(*query)
            .await
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;

        Ok(Box::new(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::queries::{ListDepartmentsQuery, ListPermissionsQuery};

    struct StaticDepartmentsHandler;

    #[async_trait]
    impl QueryHandler<ListDepartmentsQuery> for StaticDepartmentsHandler {
        type Result = Vec<String>;
        type Error = ServiceError;

        async fn handle(&self, _query: ListDepartmentsQuery) -> Result<Self::Result, Self::Error> {
            Ok(vec!["Engineering".to_string(), "DevOps".to_string()])
        }
    }

    #[tokio::test]
    async fn test_query_bus_dispatch() {
        let query_bus = QueryBus::new();
        query_bus.register_handler(StaticDepartmentsHandler).await;

        let departments: Vec<String> = query_bus.dispatch(ListDepartmentsQuery).await.unwrap();
        assert_eq!(departments, vec!["Engineering", "DevOps"]);
    }

    #[tokio::test]
    async fn test_query_bus_no_handler() {
        let query_bus = QueryBus::new();
        let result = query_bus.execute(ListPermissionsQuery).await;
        assert!(result.is_err());
    }
}
