use axum::Router;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;
use vendorhub_core::config::{AppConfig, ConfigError};
use vendorhub_db::{connect_with_settings, migrations, DbPool, ProcurementService};

use crate::{api, health};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: ProcurementService,
}

impl Application {
    /// API and health routes behind a request tracing layer.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(api::router(self.service.clone()))
            .merge(health::router(self.db_pool.clone()))
            .layer(TraceLayer::new_for_http())
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

#[cfg(test)]
pub async fn bootstrap(
    options: vendorhub_core::config::LoadOptions,
) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        max_connections = config.database.max_connections,
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let service = ProcurementService::sqlite(db_pool.clone());
    Ok(Application { config, db_pool, service })
}
