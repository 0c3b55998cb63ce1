use sqlx::MySqlPool;
use tracing::info;

use crate::config::AppConfig;
use crate::database::{pool, provision, schema, seed, LifecycleError, SyncMode};

/// All-or-nothing service startup sequence:
/// provision -> connect -> authenticate -> synchronize(additive) -> seed.
///
/// Each step strictly follows the previous one's successful completion; the
/// first failure propagates and the caller must exit without binding a
/// listener. On success the returned pool is the process's session handle,
/// closed at shutdown.
pub async fn initialize(config: &AppConfig) -> Result<MySqlPool, LifecycleError> {
    provision::ensure_database_exists(&config.database).await?;

    let db = pool::connect(&config.database).await?;
    pool::authenticate(&db).await?;
    info!("Database connection established");

    schema::synchronize(&db, SyncMode::Additive).await?;
    info!("Database models synchronized");

    let accounts = seed::ensure_default_accounts(&db).await?;
    let slas = seed::ensure_default_slas(&db).await?;
    info!("Seed check complete ({} accounts, {} SLAs created)", accounts, slas);

    Ok(db)
}
