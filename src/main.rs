use axum::{routing::get, Router};
use sqlx::MySqlPool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use helpdesk_api::bootstrap;
use helpdesk_api::config::AppConfig;
use helpdesk_api::database::seed;
use helpdesk_api::handlers;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DB_HOST, DB_NAME, PORT, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "helpdesk_api=info,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env();

    // Fail fast: no listener is bound unless every lifecycle step succeeded.
    let db = match bootstrap::initialize(&config).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Unable to initialize the database: {}", e);
            std::process::exit(1);
        }
    };

    let app = app(db.clone());

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };

    println!("[SERVER] Helpdesk API listening on http://{}", bind_addr);
    println!("[DATABASE] {}", config.database.database);
    println!();
    println!("{}", seed::credential_summary());

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
    db.close().await;
}

fn app(db: MySqlPool) -> Router {
    // CRUD routers (tickets, auth, admin, notifications) are external to this
    // core; the shell serves the info and health surface.
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(db)
}
