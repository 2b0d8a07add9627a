use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};

use crate::app_state::SharedState;
use crate::response::ApiResponse;

async fn health() -> ApiResponse<Value> {
    ApiResponse::ok(json!({ "status": "ok" }))
}

pub fn health_routes() -> Router<SharedState> {
    Router::new()
        .route("/health", get(health))
        .route("/", get(|| async { "Estato admin API" }))
}
