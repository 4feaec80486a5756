use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, post},
};

/// Admin Router Module
///
/// Topic management. Wrapped in the admin-only layer: 401 without a credential,
/// 403 for a non-admin one.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /api/topics
        // Rejects empty names and the reserved "All Posts" label.
        .route("/api/topics", post(handlers::create_topic))
        // DELETE /api/topics/{topic_name}
        // Cascades to every tagged post and its comments in one transaction.
        .route("/api/topics/{topic_name}", delete(handlers::delete_topic))
}
