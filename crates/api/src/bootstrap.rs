//! Startup helpers: open the configured datastore and make sure an admin
//! account exists.

use agency_core::audit::action_types;
use agency_core::records::user::role_group;
use agency_core::records::UserAccount;
use agency_core::roles::ROLE_ADMIN;
use agency_sync::memory::MemorySource;
use agency_sync::postgres::PgSource;
use agency_sync::rest::RestSource;
use agency_sync::{AuditEvent, SyncError, TableSource, Workspace};
use chrono::Utc;
use serde_json::json;

use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::config::{BootstrapAdmin, DatastoreConfig};

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Could not create admin account: {0}")]
    Admin(String),
}

/// Connect to the configured backend. For Postgres this also checks the
/// connection and applies migrations.
pub async fn open_source(config: &DatastoreConfig) -> Result<Box<dyn TableSource>, BootstrapError> {
    match config {
        DatastoreConfig::Postgres { database_url } => {
            let pool = agency_db::create_pool(database_url).await?;
            tracing::info!("Database connection pool created");

            agency_db::health_check(&pool).await?;
            tracing::info!("Database health check passed");

            agency_db::run_migrations(&pool).await?;
            tracing::info!("Database migrations applied");

            Ok(Box::new(PgSource::new(pool)))
        }
        DatastoreConfig::Rest(rest) => {
            tracing::info!(base_url = %rest.base_url, "Using REST datastore");
            Ok(Box::new(RestSource::new(rest.clone())?))
        }
        DatastoreConfig::Memory => {
            tracing::warn!("Using the in-memory datastore; nothing will be persisted");
            Ok(Box::new(MemorySource::new()))
        }
    }
}

/// Create `admin` when the loaded user table is empty. Returns whether an
/// account was created.
pub async fn ensure_admin(
    workspace: &Workspace,
    admin: &BootstrapAdmin,
) -> Result<bool, BootstrapError> {
    if !workspace.users.is_empty() {
        return Ok(false);
    }

    validate_password_strength(&admin.password, MIN_PASSWORD_LENGTH)
        .map_err(BootstrapError::Admin)?;
    let password_hash =
        hash_password(&admin.password).map_err(|e| BootstrapError::Admin(e.to_string()))?;

    let account = UserAccount {
        id: String::new(),
        username: admin.username.trim().to_string(),
        email: admin.email.clone(),
        full_name: None,
        role: ROLE_ADMIN.to_string(),
        password_hash,
        is_active: true,
        failed_login_count: 0,
        locked_until: None,
        last_login_at: None,
        created_at: Some(Utc::now()),
    };
    let placed = workspace
        .users
        .add(role_group(ROLE_ADMIN), account)
        .map_err(|e| BootstrapError::Admin(e.to_string()))?;
    workspace.users.flush().await;

    workspace.audit.record(
        AuditEvent::new(action_types::USER_ADMIN)
            .entity("user", &placed.item.id)
            .details(json!({
                "operation": "bootstrap",
                "username": placed.item.username,
            })),
    );
    tracing::info!(username = %placed.item.username, "Created bootstrap admin account");

    Ok(true)
}
