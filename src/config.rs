use std::env;

/// Fallback signing secret for local development only.
const LOCAL_JWT_SECRET: &str = "forum-local-development-signing-key";

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// immutable afterwards; the router reads it through `AppState::config`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // SQLite connection string (e.g. `sqlite://forum.db?mode=rwc`, or `sqlite::memory:` in tests).
    pub db_url: String,
    // Runtime environment marker. Controls log format and which secrets are mandatory.
    pub env: Env,
    // HMAC key used to sign and verify the `jwt` credential.
    pub jwt_secret: String,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // The single browser origin allowed to make credentialed requests.
    pub cors_origin: String,
    // Bootstrap administrator account. Seeded at startup when present.
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

/// Env
///
/// Runtime context. `Local` gives human-readable logs and development fallbacks,
/// `Production` demands every secret explicitly and logs JSON.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking configuration used to scaffold state in tests.
    fn default() -> Self {
        Self {
            db_url: "sqlite::memory:".to_string(),
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            cors_origin: "http://localhost:3000".to_string(),
            admin_username: None,
            admin_password: None,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from environment variables and implements the **fail-fast**
    /// principle: the process must not start serving with an incomplete or insecure setup.
    ///
    /// # Panics
    /// Panics in `Env::Production` if `DATABASE_URL` or `JWT_SECRET` is missing.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let cors_origin =
            env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        match env {
            Env::Local => Self {
                env: Env::Local,
                db_url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://forum.db?mode=rwc".to_string()),
                jwt_secret: env::var("JWT_SECRET")
                    .unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
                bind_addr,
                cors_origin,
                // Well-known debugging account for local development.
                admin_username: Some(
                    env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin123".to_string()),
                ),
                admin_password: Some(
                    env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string()),
                ),
            },
            Env::Production => Self {
                env: Env::Production,
                db_url: env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
                jwt_secret: env::var("JWT_SECRET")
                    .expect("FATAL: JWT_SECRET must be set in production."),
                bind_addr,
                cors_origin,
                // Both or nothing: a half-configured admin is skipped, never defaulted.
                admin_username: env::var("ADMIN_USERNAME").ok(),
                admin_password: env::var("ADMIN_PASSWORD").ok(),
            },
        }
    }

    /// Returns the bootstrap admin credentials if both halves are configured.
    pub fn admin_credentials(&self) -> Option<(&str, &str)> {
        match (&self.admin_username, &self.admin_password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                Some((user.as_str(), pass.as_str()))
            }
            _ => None,
        }
    }
}
