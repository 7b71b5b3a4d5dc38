use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::state::AppState;

pub fn system_routes() -> Router<AppState> {
    Router::new()
        .route("/test", get(test_route))
        .route("/health", get(|| async { "ok" }))
}

pub async fn test_route() -> Json<Value> {
    Json(json!({ "Hi": "Hello gaes!" }))
}
