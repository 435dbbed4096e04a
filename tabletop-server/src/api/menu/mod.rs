//! Menu API (price / availability only)

mod handler;

use axum::{Router, routing::patch};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/menu/items/{id}", patch(handler::update_item))
}
