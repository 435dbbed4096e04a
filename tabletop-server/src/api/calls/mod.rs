//! Call-Waiter API
//!
//! 三个接口都是即发即忘，返回 202。

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/calls", post(handler::call))
        .route("/api/calls/{table_id}/accept", post(handler::accept))
        .route("/api/calls/{table_id}/clear", post(handler::clear))
}
