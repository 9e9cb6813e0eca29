// handlers/public/mod.rs - Public handlers (no authentication required)

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "profile-sync",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "fetch": format!("GET {} (bearer)", crate::routes::FETCH_USER),
            "update": format!("PUT {} (bearer)", crate::routes::UPDATE_USER),
            "create": format!("POST {} (bearer)", crate::routes::CREATE_USER),
            "health": "GET /health",
        }
    }))
}

/// GET /health - liveness plus a store connectivity probe
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.profiles.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "store": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "error": "store unavailable"
                })),
            )
        }
    }
}
