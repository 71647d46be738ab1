use std::sync::Arc;

use sqlx::Row;
use thiserror::Error;
use tracing::{info, warn};

use shiftbot_chat::Dispatcher;
use shiftbot_core::config::{AppConfig, ConfigError, LoadOptions};
use shiftbot_core::domain::admin::SYSTEM_GRANTOR;
use shiftbot_db::repositories::{
    SqlAdminRepository, SqlClaimRepository, SqlSlotRepository, SqlUserRepository,
};
use shiftbot_db::{connect_with_settings, migrations, DbPool};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub dispatcher: Arc<Dispatcher>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("bootstrap check failed: {0}")]
    Check(#[source] sqlx::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    // Admin grants chain back to a seeded super-admin row; without one,
    // every admin intent will be rejected.
    let super_admins = sqlx::query("SELECT COUNT(*) AS count FROM admins WHERE added_by = ?")
        .bind(SYSTEM_GRANTOR)
        .fetch_one(&db_pool)
        .await
        .map_err(BootstrapError::Check)?
        .get::<i64, _>("count");
    if super_admins == 0 {
        warn!(
            event_name = "system.bootstrap.no_super_admin",
            "no system super-admin row found; admin intents will all be denied"
        );
    }

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::new(SqlUserRepository::new(db_pool.clone())),
        Arc::new(SqlAdminRepository::new(db_pool.clone())),
        Arc::new(SqlSlotRepository::new(db_pool.clone())),
        Arc::new(SqlClaimRepository::new(db_pool.clone())),
        &config.admission,
    ));

    Ok(Application { config, db_pool, dispatcher })
}
