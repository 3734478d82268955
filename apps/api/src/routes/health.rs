use axum::Json;
use serde_json::{json, Value};

/// GET /
/// Static greeting.
pub async fn greeting_handler() -> Json<Value> {
    Json(json!({
        "name": "CareerHub",
        "Greetings": "Welcome!"
    }))
}

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "careerhub-api"
    }))
}
