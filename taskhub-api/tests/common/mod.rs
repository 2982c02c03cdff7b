/// Common test utilities for integration tests
///
/// Every test gets a fresh in-memory store behind the real router, so the
/// suite runs without PostgreSQL.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use taskhub_api::app::{build_router, AppState};
use taskhub_api::config::Config;
use taskhub_shared::auth::jwt::{create_token, Claims};
use taskhub_shared::models::{CreateUser, Role, User, UserStatus};
use taskhub_shared::store::{memory::MemoryStore, EntityStore};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context containing the router and its backing store
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: Router,
    pub config: Config,
}

/// A seeded account and a valid token for it
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> uuid::Uuid {
        self.user.id
    }
}

impl TestContext {
    pub fn new() -> Self {
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("memory".to_string()),
            "JWT_SECRET" => Some(JWT_SECRET.to_string()),
            _ => None,
        })
        .expect("test config");

        let store = Arc::new(MemoryStore::new());
        let app = build_router(AppState::new(store.clone(), config.clone()));

        Self { store, app, config }
    }

    /// Inserts a user directly, skipping password hashing
    pub async fn seed_user(&self, email: &str, role: Role) -> TestUser {
        self.seed_user_with_status(email, role, UserStatus::Active).await
    }

    pub async fn seed_user_with_status(
        &self,
        email: &str,
        role: Role,
        status: UserStatus,
    ) -> TestUser {
        let user = self
            .store
            .create_user(CreateUser {
                name: email.split('@').next().unwrap_or(email).to_string(),
                username: None,
                email: email.to_string(),
                password_hash: "not-a-real-hash".to_string(),
                role,
                status,
            })
            .await
            .expect("seed user");

        let token = create_token(&Claims::new(user.id), JWT_SECRET).expect("token");

        TestUser { user, token }
    }

    /// Sends a request and returns the status with the parsed JSON body
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.expect("response");
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON body ({}): {}", status, String::from_utf8_lossy(&bytes))
            })
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, as_user: &TestUser) -> (StatusCode, Value) {
        self.send("GET", uri, Some(&as_user.token), None).await
    }

    pub async fn post(&self, uri: &str, as_user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(&as_user.token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, as_user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send("PATCH", uri, Some(&as_user.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, as_user: &TestUser) -> (StatusCode, Value) {
        self.send("DELETE", uri, Some(&as_user.token), None).await
    }

    /// Creates a project through the API and returns its id
    pub async fn create_project(&self, owner: &TestUser, name: &str) -> String {
        let (status, body) = self
            .post("/api/projects", owner, serde_json::json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().expect("project id").to_string()
    }

    /// Creates a task through the API and returns its id
    pub async fn create_task(&self, owner: &TestUser, project_id: &str, title: &str) -> String {
        let (status, body) = self
            .post(
                "/api/tasks",
                owner,
                serde_json::json!({ "projectId": project_id, "title": title }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().expect("task id").to_string()
    }
}
