use sqlx::mysql::MySqlConnectOptions;
use sqlx::{Connection, ConnectOptions, MySqlConnection};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::database::LifecycleError;

/// Ensure the target database exists before any pool is opened.
///
/// Opens a short-lived administrative connection scoped to no particular
/// database, issues `CREATE DATABASE IF NOT EXISTS`, and closes the
/// connection on every path. Failures are fatal to the caller; there is no
/// retry.
pub async fn ensure_database_exists(config: &DatabaseConfig) -> Result<(), LifecycleError> {
    if !is_valid_db_name(&config.database) {
        return Err(LifecycleError::InvalidDatabaseName(config.database.clone()));
    }

    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password);

    let mut conn: MySqlConnection = options
        .connect()
        .await
        .map_err(LifecycleError::Provisioning)?;

    let statement = format!(
        "CREATE DATABASE IF NOT EXISTS {}",
        quote_identifier(&config.database)
    );
    let outcome = sqlx::query(&statement).execute(&mut conn).await;

    // Release the administrative connection whether or not the create worked.
    if let Err(e) = conn.close().await {
        warn!("Failed to close administrative connection: {}", e);
    }

    outcome.map_err(LifecycleError::Provisioning)?;
    info!("Database '{}' ensured to exist", config.database);
    Ok(())
}

/// Quote a MySQL identifier with backticks.
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Database names are interpolated into DDL, so restrict them to [A-Za-z0-9_].
fn is_valid_db_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
