use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Creation endpoints. Every handler here takes the author from the `AuthUser`
/// extractor, never from the request body.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /api/protected
        // Returns the caller's sanitized user snapshot.
        .route("/api/protected", get(handlers::protected))
        .route("/api/posts", post(handlers::create_post))
        // POST /api/posts/{post_id}/comments
        // 404 if the post does not exist.
        .route(
            "/api/posts/{post_id}/comments",
            post(handlers::create_comment),
        )
        // POST /api/posts/{post_id}/comments/{comment_id}
        // Reply; the parent must belong to the same post.
        .route(
            "/api/posts/{post_id}/comments/{comment_id}",
            post(handlers::create_subcomment),
        )
}
