//! Database reset utility - clear all data and reinitialize.
//!
//! Drops every table, recreates the schema from scratch, and inserts the
//! default accounts and SLA policies. Destructive and non-idempotent by
//! design; intended for manual invocation, never for production traffic.
//!
//! Usage: cargo run --bin reset_db

use anyhow::Context;

use helpdesk_api::config::AppConfig;
use helpdesk_api::database::{pool, provision, schema, seed, SyncMode};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "helpdesk_api=info".into()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("[ERROR] Error resetting database: {}", e);
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
    std::process::exit(0);
}

async fn run() -> anyhow::Result<()> {
    println!("[RESET] Starting database reset...");

    let config = AppConfig::from_env();

    provision::ensure_database_exists(&config.database)
        .await
        .context("ensuring database exists")?;
    println!("[DB] Ensured database exists");

    let db = pool::connect(&config.database).await.context("connecting")?;
    pool::authenticate(&db).await.context("authenticating")?;
    println!("[OK] Database connection authenticated");

    println!("[DB] Dropping existing tables...");
    schema::truncate_and_drop_all(&db)
        .await
        .context("dropping tables")?;
    println!("[OK] Tables dropped");

    println!("[DB] Creating tables...");
    schema::synchronize(&db, SyncMode::Destructive)
        .await
        .context("creating tables")?;
    println!("[OK] Tables created");

    // Unconditional inserts: the destructive synchronize above guarantees an
    // empty schema, so no existence checks are needed here.
    println!("[USERS] Creating default users...");
    seed::insert_default_accounts(&db)
        .await
        .context("creating default users")?;

    println!("[SLA] Creating default SLAs...");
    seed::insert_default_slas(&db)
        .await
        .context("creating default SLAs")?;

    println!();
    println!("[SUCCESS] Database reset completed successfully!");
    println!();
    println!("{}", seed::credential_summary());

    db.close().await;
    Ok(())
}
