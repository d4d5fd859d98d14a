use std::time::Duration;

use agency_core::undo::DEFAULT_CAPACITY;
use agency_sync::rest::RestConfig;
use agency_sync::writer::{WRITE_BACKOFF_MS, WRITE_MAX_ATTEMPTS};
use agency_sync::RetryPolicy;

use crate::auth::jwt::JwtConfig;

/// Where the collections read and write their rows.
#[derive(Debug, Clone)]
pub enum DatastoreConfig {
    /// Direct connection to Postgres; migrations run at startup.
    Postgres { database_url: String },
    /// Hosted PostgREST gateway.
    Rest(RestConfig),
    /// Process-local tables. Nothing survives a restart.
    Memory,
}

/// Account created at startup when the user table is empty.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Time allowed for queued writes to drain on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub datastore: DatastoreConfig,
    /// Retry behaviour of the background write queues.
    pub retry: RetryPolicy,
    /// Actions kept per user undo stack (default: `10`).
    pub undo_capacity: usize,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `DATASTORE_BACKEND`    | `postgres`                 |
    /// | `WRITE_MAX_ATTEMPTS`   | `3`                        |
    /// | `WRITE_BACKOFF_MS`     | `200`                      |
    /// | `UNDO_CAPACITY`        | `10`                       |
    ///
    /// # Panics
    ///
    /// Panics on malformed values and when the selected backend's settings
    /// are missing.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let max_attempts: u32 = std::env::var("WRITE_MAX_ATTEMPTS")
            .unwrap_or_else(|_| WRITE_MAX_ATTEMPTS.to_string())
            .parse()
            .expect("WRITE_MAX_ATTEMPTS must be a valid u32");

        let backoff_ms: u64 = std::env::var("WRITE_BACKOFF_MS")
            .unwrap_or_else(|_| WRITE_BACKOFF_MS.to_string())
            .parse()
            .expect("WRITE_BACKOFF_MS must be a valid u64");

        let undo_capacity: usize = std::env::var("UNDO_CAPACITY")
            .unwrap_or_else(|_| DEFAULT_CAPACITY.to_string())
            .parse()
            .expect("UNDO_CAPACITY must be a valid usize");

        let retry = RetryPolicy {
            max_attempts: max_attempts.max(1),
            initial_backoff: Duration::from_millis(backoff_ms),
            ..RetryPolicy::default()
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            datastore: datastore_from_env(),
            retry,
            undo_capacity: undo_capacity.max(1),
            bootstrap_admin: bootstrap_admin_from_env(),
        }
    }
}

/// | Env Var             | Required when           |
/// |---------------------|-------------------------|
/// | `DATASTORE_BACKEND` | never (`postgres`)      |
/// | `DATABASE_URL`      | backend is `postgres`   |
/// | `SUPABASE_URL`      | backend is `rest`       |
/// | `SUPABASE_KEY`      | backend is `rest`       |
fn datastore_from_env() -> DatastoreConfig {
    let backend = std::env::var("DATASTORE_BACKEND").unwrap_or_else(|_| "postgres".into());
    match backend.trim().to_ascii_lowercase().as_str() {
        "postgres" => DatastoreConfig::Postgres {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
        },
        "rest" => DatastoreConfig::Rest(RestConfig {
            base_url: std::env::var("SUPABASE_URL").expect("SUPABASE_URL must be set"),
            api_key: std::env::var("SUPABASE_KEY").expect("SUPABASE_KEY must be set"),
            timeout: Duration::from_secs(10),
        }),
        "memory" => DatastoreConfig::Memory,
        other => panic!("DATASTORE_BACKEND must be postgres, rest or memory, got '{other}'"),
    }
}

/// `ADMIN_USERNAME` and `ADMIN_PASSWORD` must both be set to enable the
/// bootstrap account; `ADMIN_EMAIL` defaults to `admin@agency.local`.
fn bootstrap_admin_from_env() -> Option<BootstrapAdmin> {
    let username = std::env::var("ADMIN_USERNAME").ok()?;
    let password = std::env::var("ADMIN_PASSWORD").ok()?;
    let email = std::env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@agency.local".into());
    Some(BootstrapAdmin {
        username,
        email,
        password,
    })
}
