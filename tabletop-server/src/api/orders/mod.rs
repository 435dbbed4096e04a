//! Order API Module
//!
//! | 路径 | 方法 | 调用方 |
//! |------|------|--------|
//! | /api/orders | POST | 任何人 (扫码顾客) |
//! | /api/orders | GET | 员工 |
//! | /api/orders/{id} | GET | 员工 |
//! | /api/orders/{id} | DELETE | 经理 |
//! | /api/orders/{id}/status | PUT | 员工 (按目标状态授权) |
//! | /api/orders/{id}/queue | GET | 任何人 |

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/orders", get(handler::list).post(handler::create))
        .route(
            "/api/orders/{id}",
            get(handler::get_by_id).delete(handler::delete),
        )
        .route("/api/orders/{id}/status", put(handler::transition))
        .route("/api/orders/{id}/queue", get(handler::queue_position))
}
