use forum_backend::{
    AppState,
    config::{AppConfig, Env},
    create_router, db, password,
    repository::{RepositoryState, SqliteRepository},
    token::TokenService,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Startup is strictly ordered: configuration, logging, storage and migrations,
/// signing key, admin seed, then the HTTP server. Any failure before serving aborts
/// the process.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production secrets)
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    // 2. Logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "forum_backend=debug,tower_http=info,axum=trace".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 3. Storage
    let pool = db::connect(&config.db_url)
        .await
        .expect("FATAL: Failed to open the database. Check DATABASE_URL.");
    let repo = Arc::new(SqliteRepository::new(pool)) as RepositoryState;

    // 4. Signing key
    let tokens = TokenService::new(&config.jwt_secret)
        .expect("FATAL: Failed to initialize the token service. Check JWT_SECRET.");

    // 5. Bootstrap administrator
    if let Some((username, plain)) = config.admin_credentials() {
        let hash = password::hash_password(plain)
            .expect("FATAL: Failed to hash the bootstrap admin password.");
        repo.ensure_admin(username, &hash)
            .await
            .expect("FATAL: Failed to seed the bootstrap admin.");
        tracing::info!(username = %username, "bootstrap admin ensured");
    } else {
        tracing::warn!("No bootstrap admin configured");
    }

    // 6. Router and Server Startup
    let bind_addr = config.bind_addr.clone();
    let app = create_router(AppState::new(repo, tokens, config));

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: Failed to bind the HTTP listener. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);
    tracing::info!("API Documentation (Swagger UI) available at: http://{}/swagger-ui", bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server terminated");
    }
}
