use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod cascade;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod ownership;
pub mod password;
pub mod repository;
pub mod token;

// Module for routing segregation (Public, Authenticated, Owner, Admin).
pub mod routes;
use auth::OwnerGuard;
use ownership::{CommentOwnership, PostOwnership};
use routes::{admin, authenticated, owner, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::ApiError;
pub use repository::{RepositoryState, SqliteRepository};
pub use token::TokenService;

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::create_account, handlers::login, handlers::logout, handlers::protected,
        handlers::get_username, handlers::list_posts, handlers::get_post, handlers::create_post,
        handlers::update_post, handlers::delete_post, handlers::list_comments,
        handlers::get_comment, handlers::list_subcomments, handlers::create_comment,
        handlers::create_subcomment, handlers::update_comment, handlers::delete_comment,
        handlers::list_topics, handlers::create_topic, handlers::delete_topic
    ),
    components(
        schemas(
            models::UserSnapshot, models::Post, models::Comment, models::Topic,
            models::Credentials, models::CreatePostRequest, models::UpdatePostRequest,
            models::CommentRequest, models::TopicRequest, models::MessageResponse,
            models::UsernameResponse, models::CascadeReport, models::DeleteResponse,
        )
    ),
    tags(
        (name = "forum", description = "Discussion Forum API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single, immutable container of process-wide services, built once at startup
/// and shared across all requests.
#[derive(Clone)]
pub struct AppState {
    /// Persistence, behind the `Repository` trait.
    pub repo: RepositoryState,
    /// Signing key holder; issues and verifies credentials.
    pub tokens: TokenService,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, tokens: TokenService, config: AppConfig) -> Self {
        Self {
            repo,
            tokens,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

// `AuthUser` reads the token service from whichever state its router carries.
impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

/// cors_layer
///
/// One credentialed browser origin. An unparseable origin falls back to the local
/// frontend rather than opening CORS up.
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origin = HeaderValue::from_str(&config.cors_origin).unwrap_or_else(|_| {
        tracing::warn!(origin = %config.cors_origin, "invalid CORS origin, using default");
        HeaderValue::from_static("http://localhost:3000")
    });

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(300))
}

/// create_router
///
/// Assembles the routing tiers, attaches each tier's guard as a `route_layer`,
/// and wraps everything in the request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    let post_guard = OwnerGuard::new(
        state.tokens.clone(),
        Arc::new(PostOwnership::new(state.repo.clone())),
    );
    let comment_guard = OwnerGuard::new(
        state.tokens.clone(),
        Arc::new(CommentOwnership::new(state.repo.clone())),
    );

    let base_router = Router::new()
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require_authenticated,
            )),
        )
        // Owner-or-admin: each router carries the resolver for its resource kind.
        .merge(
            owner::post_owner_routes().route_layer(middleware::from_fn_with_state(
                post_guard,
                auth::require_owner_or_admin,
            )),
        )
        .merge(
            owner::comment_owner_routes().route_layer(middleware::from_fn_with_state(
                comment_guard,
                auth::require_owner_or_admin,
            )),
        )
        .merge(
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth::require_admin,
            )),
        )
        .with_state(state);

    // Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for `TraceLayer`, carrying the `x-request-id` so every log line of one
/// request is correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
