//! HTTP status API.

use crate::node::{Node, NodeStatus};
use axum::{extract::State, response::Json, routing::get, Router};
use std::sync::Arc;

async fn status_handler(State(node): State<Arc<Node>>) -> Json<NodeStatus> {
    Json(node.status().await)
}

/// Build the HTTP API router over a running node.
pub fn build_router(node: Arc<Node>) -> Router {
    Router::new()
        .route("/api/v1/status", get(status_handler))
        .with_state(node)
}
