//! Projection API Module
//!
//! 看板读模型，每次读取时重新计算 (短 TTL 缓存)。

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/projections", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/status-counts", get(handler::status_counts))
        .route("/tables", get(handler::tables))
        .route("/queue", get(handler::queue))
        .route("/series", get(handler::series))
}
