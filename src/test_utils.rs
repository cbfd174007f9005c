use crate::domain::role::Role;
use crate::domain::user::User;
use crate::interface::app_state::AppState;
use crate::{AppConfig, AppStateBuilder, create_router};
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use serde_json::Value;
use std::sync::Arc;

/// Seeded administrator (Harish, `it_admin`)
pub const ADMIN_ID: &str = "1";
/// Seeded junior developer reporting to Karthikeyan
pub const JUNIOR_ID: &str = "2";
/// Seeded senior developer reporting to Karthikeyan
pub const SENIOR_ID: &str = "4";
/// Seeded solutions architect (Karthikeyan)
pub const ARCHITECT_ID: &str = "5";

/// Creates a user outside the seed, with no manager and no custom grants
pub fn create_test_user(name: &str, email: &str, role: &str) -> User {
    User::new(
        name.to_string(),
        email.to_string(),
        role.to_string(),
        "Engineering".to_string(),
        None,
        vec![],
    )
}

/// Creates a custom role holding the given permissions
pub fn create_test_role(name: &str, permissions: &[&str]) -> Role {
    Role::new_custom(
        name,
        &format!("{name} test role"),
        permissions.iter().map(|p| p.to_string()).collect(),
    )
}

/// Config used by tests: seeded, no save latency, permissive role references
pub fn create_test_config() -> AppConfig {
    AppConfig::new("127.0.0.1".to_string(), "0".to_string(), true, 0, false)
}

/// Builds app state for a config. Panics when the build fails; tests only.
pub async fn create_test_app_state_with_config(config: AppConfig) -> Arc<AppState> {
    match AppStateBuilder::new().with_config(config).build().await {
        Ok(state) => state,
        Err(e) => panic!("failed to build test app state: {e}"),
    }
}

/// Seeded application state
pub async fn create_test_app_state() -> Arc<AppState> {
    create_test_app_state_with_config(create_test_config()).await
}

/// Seeded `/v1` router together with its state, for driving with `oneshot`
pub async fn create_test_app() -> (Router, Arc<AppState>) {
    let state = create_test_app_state().await;
    (create_router(state.clone()), state)
}

/// Builds a request, optionally signed by a caller and carrying a JSON body
pub fn api_request(
    method: Method,
    uri: &str,
    caller: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(caller) = caller {
        builder = builder.header("x-user-id", caller);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    match builder.body(body) {
        Ok(request) => request,
        Err(e) => panic!("invalid test request for {uri}: {e}"),
    }
}

/// Reads a response body as JSON. Empty bodies read as `Value::Null`.
pub async fn read_json(response: Response<Body>) -> Value {
    let bytes = match axum::body::to_bytes(response.into_body(), usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => panic!("failed to read response body: {e}"),
    };
    if bytes.is_empty() {
        return Value::Null;
    }
    match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => panic!("response body is not JSON: {e}"),
    }
}
