use axum::Json;
use serde_json::{Value, json};

/// Handler: GET|HEAD / (axum answers HEAD from the GET route without a body).
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
