// Shared harness for driving the router in-process
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use orkut_server::{app::build_router, config::Settings, db::Database, state::AppState};

pub struct TestApp {
    pub router: Router,
    pub db: Database,
    // keeps the uploads directory alive for the test's duration
    pub uploads: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(|_| {})
    }

    pub fn with_settings(tweak: impl FnOnce(&mut Settings)) -> Self {
        let uploads = tempfile::tempdir().expect("Failed to create uploads dir");
        let mut settings = Settings::default_settings().expect("default settings");
        settings.database.path = ":memory:".to_string();
        settings.uploads.dir = uploads.path().to_string_lossy().into_owned();
        tweak(&mut settings);

        let db = Database::in_memory().expect("Failed to create test database");
        let router = build_router(AppState::new(db.clone(), settings));
        Self { router, db, uploads }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Router should not fail");

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Register an account and return (user id, token)
    pub async fn register(&self, username: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/api/register",
                None,
                serde_json::json!({
                    "username": username,
                    "email": format!("{}@orkut.com", username),
                    "password": "orkut123",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {}: {}", username, body);
        (
            body["user"]["id"].as_str().expect("user id").to_string(),
            body["token"].as_str().expect("token").to_string(),
        )
    }
}
