use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::MySqlPool;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::database::LifecycleError;

/// Build the bounded connection pool against the target database.
///
/// Pool bounds come from configuration (defaults: max 5, min 0, acquire 30s,
/// idle 10s). The returned handle is the process's only session; it is
/// constructed at bootstrap and closed at shutdown, never stored globally.
pub async fn connect(config: &DatabaseConfig) -> Result<MySqlPool, LifecycleError> {
    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database);

    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .connect_with(options)
        .await
        .map_err(LifecycleError::Authentication)?;

    info!("Created database pool for: {}", config.database);
    Ok(pool)
}

/// Ping the pool to prove credentials and reachability before any schema work.
pub async fn authenticate(pool: &MySqlPool) -> Result<(), LifecycleError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(LifecycleError::Authentication)?;
    Ok(())
}
