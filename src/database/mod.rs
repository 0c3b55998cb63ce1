use thiserror::Error;

pub mod models;
pub mod pool;
pub mod provision;
pub mod schema;
pub mod seed;

pub use schema::SyncMode;

/// Failures from the database lifecycle steps. Each step maps its sqlx errors
/// into its own variant. Nothing here retries or recovers locally; the first
/// failure aborts the calling workflow.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Provisioning failed: {0}")]
    Provisioning(#[source] sqlx::Error),

    #[error("Authentication failed: {0}")]
    Authentication(#[source] sqlx::Error),

    #[error("Schema synchronization failed: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("Seeding failed: {0}")]
    Seed(#[source] sqlx::Error),

    #[error("Invalid database name: {0}")]
    InvalidDatabaseName(String),
}
