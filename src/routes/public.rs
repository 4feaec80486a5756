use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a credential: reads over posts, comments, users and
/// topics, plus registration, login and logout.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for monitoring and load balancers.
        .route("/health", get(|| async { "ok" }))
        // --- Accounts & Session ---
        .route("/api/create_account", post(handlers::create_account))
        // Sets the `jwt` cookie on success.
        .route("/api/login", post(handlers::login))
        // Clears the cookie only; the credential stays valid until it expires.
        .route("/api/logout", get(handlers::logout))
        .route("/api/users/{user_id}", get(handlers::get_username))
        // --- Reads ---
        // GET /api/posts?topic=...
        .route("/api/posts", get(handlers::list_posts))
        .route("/api/posts/{post_id}", get(handlers::get_post))
        // Top-level comments only; replies are fetched per parent.
        .route("/api/posts/{post_id}/comments", get(handlers::list_comments))
        .route(
            "/api/posts/{post_id}/comments/{comment_id}",
            get(handlers::get_comment),
        )
        .route(
            "/api/posts/{post_id}/comments/{comment_id}/subcomments",
            get(handlers::list_subcomments),
        )
        .route("/api/topics", get(handlers::list_topics))
}
