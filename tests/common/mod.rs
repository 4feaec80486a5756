#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use forum_backend::{
    AppConfig, AppState, create_router, db,
    models::UserSnapshot,
    repository::{RepositoryState, SqliteRepository},
    token::TokenService,
};
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::util::ServiceExt;

pub const SECRET: &str = "integration-test-secret";

pub const ADMIN_ID: i64 = 1;
pub const ALICE_ID: i64 = 2;
pub const BOB_ID: i64 = 3;

/// A fresh in-memory database with three accounts: admin (1), alice (2), bob (3).
/// The placeholder hashes are never verified; tests that log in register first.
pub struct TestContext {
    pub pool: SqlitePool,
    pub state: AppState,
}

impl TestContext {
    pub async fn new() -> Self {
        let pool = db::connect("sqlite::memory:")
            .await
            .expect("in-memory database");

        sqlx::query(
            "INSERT INTO users (id, username, password_hash, isAdmin) VALUES \
             (1, 'admin', 'unused', 1), (2, 'alice', 'unused', 0), (3, 'bob', 'unused', 0)",
        )
        .execute(&pool)
        .await
        .expect("seed users");

        let repo = Arc::new(SqliteRepository::new(pool.clone())) as RepositoryState;
        let tokens = TokenService::new(SECRET).expect("token service");
        let state = AppState::new(repo, tokens, AppConfig::default());

        Self { pool, state }
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub fn token_for(&self, id: i64, username: &str, is_admin: bool) -> String {
        self.state
            .tokens
            .issue(&UserSnapshot {
                id,
                username: username.to_string(),
                is_admin,
            })
            .expect("issue token")
            .token
    }

    pub fn admin(&self) -> String {
        self.token_for(ADMIN_ID, "admin", true)
    }

    pub fn alice(&self) -> String {
        self.token_for(ALICE_ID, "alice", false)
    }

    pub fn bob(&self) -> String {
        self.token_for(BOB_ID, "bob", false)
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .expect("count rows")
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Sends one request through the router, with the credential (if any) in the `jwt` cookie.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("jwt={token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    let response = app.clone().oneshot(request).await.expect("router is infallible");

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    TestResponse {
        status,
        headers,
        body,
    }
}
