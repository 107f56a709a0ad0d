//! Test harness: the full router over an in-memory store, driven through
//! `tower::ServiceExt::oneshot` so no socket or database is needed.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use dealflow_api::app::{build_router, AppState};
use dealflow_api::config::{AnalyticsConfig, ApiConfig, Config, DatabaseConfig, JwtConfig};
use dealflow_shared::store::MemoryStore;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub struct TestContext {
    pub app: Router,
}

impl TestContext {
    pub fn new() -> Self {
        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            database: DatabaseConfig {
                url: "postgresql://unused/test".to_string(),
                max_connections: 1,
            },
            jwt: JwtConfig {
                secret: "integration-test-secret-at-least-32-bytes".to_string(),
                access_ttl_minutes: 30,
                refresh_ttl_days: 7,
            },
            analytics: AnalyticsConfig {
                cache_ttl_seconds: 30,
                cache_capacity: 16,
            },
        };
        let state = AppState::new(Arc::new(MemoryStore::new()), config);
        Self {
            app: build_router(state),
        }
    }

    /// Sends one request and returns (status, parsed JSON body). An empty
    /// body parses as `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        org: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(org) = org {
            builder = builder.header("X-Organization-Id", org.to_string());
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).expect("serialize")))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, json)
    }

    /// Registers a user and logs them in, returning (user_id, access_token).
    pub async fn register_and_login(&self, email: &str) -> (Uuid, String) {
        let (status, _) = self
            .request(
                Method::POST,
                "/api/v1/auth/register",
                None,
                None,
                Some(serde_json::json!({
                    "email": email,
                    "password": "long-enough-password",
                    "full_name": "Test User",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                None,
                Some(serde_json::json!({
                    "email": email,
                    "password": "long-enough-password",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let user_id = body["user"]["id"]
            .as_str()
            .expect("user id")
            .parse()
            .expect("uuid");
        let token = body["access_token"].as_str().expect("token").to_string();
        (user_id, token)
    }

    /// Creates an organization as `token` and returns its id.
    pub async fn create_org(&self, token: &str, name: &str) -> Uuid {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/organizations",
                Some(token),
                None,
                Some(serde_json::json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().expect("org id").parse().expect("uuid")
    }
}
