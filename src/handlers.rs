use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::{json, Value};
use sqlx::MySqlPool;

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Helpdesk API",
            "version": version,
            "description": "Helpdesk ticketing backend",
            "endpoints": {
                "health": "/api/health (public)",
            }
        }
    }))
}

pub async fn health(State(db): State<MySqlPool>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();

    match sqlx::query("SELECT 1").execute(&db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            // Log the real error; the response body stays generic
            tracing::error!("Health check database ping failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
    use std::time::Duration;

    #[tokio::test]
    async fn degraded_health_hides_database_detail() {
        // Lazy pool against a port nothing listens on; the ping fails fast.
        let options = MySqlConnectOptions::new()
            .host("127.0.0.1")
            .port(1)
            .username("nobody");
        let pool = MySqlPoolOptions::new()
            .acquire_timeout(Duration::from_millis(500))
            .connect_lazy_with(options);

        let (status, Json(body)) = health(State(pool)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "database unavailable");
        assert_eq!(body["data"]["status"], "degraded");
        assert!(body["data"].get("database_error").is_none());
    }

    #[tokio::test]
    async fn root_reports_service_identity() {
        let Json(body) = root().await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["name"], "Helpdesk API");
    }
}
