//! Owner Router Module
//!
//! Mutations of one existing resource. Each router is wrapped in an owner-or-admin
//! layer whose resolver matches the resource kind of its paths.

use crate::{AppState, handlers};
use axum::{Router, routing::patch};

/// Guarded by the post ownership resolver.
pub fn post_owner_routes() -> Router<AppState> {
    Router::new().route(
        "/api/posts/{post_id}",
        patch(handlers::update_post).delete(handlers::delete_post),
    )
}

/// Guarded by the comment ownership resolver, which reads both path ids.
pub fn comment_owner_routes() -> Router<AppState> {
    Router::new().route(
        "/api/posts/{post_id}/comments/{comment_id}",
        patch(handlers::update_comment).delete(handlers::delete_comment),
    )
}
