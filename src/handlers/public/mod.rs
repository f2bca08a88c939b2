// handlers/public/mod.rs - endpoints that need no token

use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::app::AppState;

pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Kiwi Progress API",
            "version": version,
            "description": "Per-user learning progress and series certificates",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "languages": "/api/v1/languages/progress (protected)",
                "progress": "/api/v1/languages/:language[/series/:series[/sections/:section[/lessons/:lesson]]]/progress (protected)",
                "complete": "/api/v1/languages/:language/series/:series/sections/:section/lessons/:lesson/progress/complete (protected)",
                "certificates": "/api/v1/certificates[/:id] (protected)",
            }
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
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
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "database_error": e.to_string()
                    }
                })),
            )
        }
    }
}
