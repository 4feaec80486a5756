mod common;

use async_trait::async_trait;
use axum::{
    Router,
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, header},
    middleware,
    routing::get,
};
use common::{ALICE_ID, SECRET, TestContext, send};
use forum_backend::{
    ApiError,
    auth::{AuthUser, OwnerGuard, require_owner_or_admin},
    ownership::{OwnershipResolver, PathIds, ResolveError},
    repository::StoreError,
    token::TokenService,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn sign(claims: serde_json::Value, secret: &str) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}

async fn extract(ctx: &TestContext, cookie: Option<String>, bearer: Option<String>) -> Result<AuthUser, ApiError> {
    let mut builder = Request::builder().uri("/");
    if let Some(token) = cookie {
        builder = builder.header(header::COOKIE, format!("jwt={token}"));
    }
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let (mut parts, _) = builder.body(()).unwrap().into_parts();
    AuthUser::from_request_parts(&mut parts, &ctx.state).await
}

// --- AuthUser extractor ---

#[tokio::test]
async fn test_valid_cookie_yields_claims_identity() {
    let ctx = TestContext::new().await;
    let user = extract(&ctx, Some(ctx.alice()), None).await.unwrap();

    assert_eq!(user.id, ALICE_ID);
    assert_eq!(user.username, "alice");
    assert!(!user.is_admin);
}

#[tokio::test]
async fn test_bearer_header_is_accepted_and_cookie_wins() {
    let ctx = TestContext::new().await;

    let user = extract(&ctx, None, Some(ctx.admin())).await.unwrap();
    assert!(user.is_admin);

    let user = extract(&ctx, Some(ctx.bob()), Some(ctx.admin())).await.unwrap();
    assert_eq!(user.username, "bob");
}

#[tokio::test]
async fn test_credential_with_only_user_data_and_expiry_is_accepted() {
    let ctx = TestContext::new().await;
    let token = sign(
        json!({
            "userData": {"id": 2, "username": "alice", "isAdmin": 0},
            "exp": now() + 3600,
        }),
        SECRET,
    );

    let user = extract(&ctx, Some(token), None).await.unwrap();
    assert_eq!(user.id, ALICE_ID);
    assert_eq!(user.username, "alice");
    assert!(!user.is_admin);
}

#[tokio::test]
async fn test_missing_credential_is_authentication_missing() {
    let ctx = TestContext::new().await;
    assert!(matches!(
        extract(&ctx, None, None).await,
        Err(ApiError::AuthenticationMissing)
    ));
}

#[tokio::test]
async fn test_expired_credential_is_rejected() {
    let ctx = TestContext::new().await;
    let token = sign(
        json!({
            "userData": {"id": 2, "username": "alice", "isAdmin": 0},
            "exp": now() - 60,
            "iat": now() - 3600,
            "jti": uuid::Uuid::new_v4(),
        }),
        SECRET,
    );

    assert!(matches!(
        extract(&ctx, Some(token), None).await,
        Err(ApiError::AuthenticationMissing)
    ));
}

#[tokio::test]
async fn test_malformed_claims_fail_closed() {
    let ctx = TestContext::new().await;
    let future = now() + 3600;

    let cases = [
        // Admin flag outside 0/1.
        json!({"userData": {"id": 2, "username": "alice", "isAdmin": 2}, "exp": future, "iat": now(), "jti": uuid::Uuid::new_v4()}),
        // Admin flag of the wrong type.
        json!({"userData": {"id": 2, "username": "alice", "isAdmin": "yes"}, "exp": future, "iat": now(), "jti": uuid::Uuid::new_v4()}),
        // No user snapshot at all.
        json!({"exp": future, "iat": now(), "jti": uuid::Uuid::new_v4()}),
        // No expiry.
        json!({"userData": {"id": 2, "username": "alice", "isAdmin": 0}, "iat": now(), "jti": uuid::Uuid::new_v4()}),
    ];

    for claims in cases {
        let token = sign(claims.clone(), SECRET);
        assert!(
            matches!(
                extract(&ctx, Some(token), None).await,
                Err(ApiError::AuthenticationMissing)
            ),
            "claims should be rejected: {claims}"
        );
    }
}

#[tokio::test]
async fn test_foreign_signature_is_rejected() {
    let ctx = TestContext::new().await;
    let forged = sign(
        json!({
            "userData": {"id": 1, "username": "admin", "isAdmin": 1},
            "exp": now() + 3600,
            "iat": now(),
            "jti": uuid::Uuid::new_v4(),
        }),
        "some-other-secret",
    );

    assert!(extract(&ctx, Some(forged), None).await.is_err());
}

// --- Owner guard ---

/// Always fails, as a storage error would.
struct FailingResolver;

#[async_trait]
impl OwnershipResolver for FailingResolver {
    async fn resolve(&self, _ids: &PathIds) -> Result<i64, ResolveError> {
        Err(ResolveError::Store(StoreError::Database(sqlx::Error::PoolTimedOut)))
    }
}

/// Reports a fixed owner and counts how often it was asked.
struct CountingResolver {
    owner: i64,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl OwnershipResolver for CountingResolver {
    async fn resolve(&self, ids: &PathIds) -> Result<i64, ResolveError> {
        ids.id("item_id")?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.owner)
    }
}

fn guarded(resolver: Arc<dyn OwnershipResolver>) -> Router {
    let guard = OwnerGuard::new(TokenService::new(SECRET).unwrap(), resolver);
    Router::new()
        .route("/items/{item_id}", get(|| async { "reached" }))
        .route_layer(middleware::from_fn_with_state(guard, require_owner_or_admin))
}

#[tokio::test]
async fn test_resolver_failure_denies_non_admin_but_admits_admin() {
    let ctx = TestContext::new().await;
    let app = guarded(Arc::new(FailingResolver));

    let res = send(&app, Method::GET, "/items/1", Some(&ctx.alice()), None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = send(&app, Method::GET, "/items/1", Some(&ctx.admin()), None).await;
    assert_eq!(res.status, StatusCode::OK);
}

#[tokio::test]
async fn test_owner_is_resolved_on_every_request() {
    let ctx = TestContext::new().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let app = guarded(Arc::new(CountingResolver {
        owner: ALICE_ID,
        calls: calls.clone(),
    }));

    for _ in 0..3 {
        let res = send(&app, Method::GET, "/items/7", Some(&ctx.alice()), None).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body, json!("reached"));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let res = send(&app, Method::GET, "/items/7", Some(&ctx.bob()), None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    // Non-numeric id: the resolver fails before counting, the guard fails closed.
    let res = send(&app, Method::GET, "/items/abc", Some(&ctx.alice()), None).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_guard_without_credential_is_unauthorized() {
    let app = guarded(Arc::new(FailingResolver));

    let res = send(&app, Method::GET, "/items/1", None, None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body, json!({"error": "authentication required"}));
}
