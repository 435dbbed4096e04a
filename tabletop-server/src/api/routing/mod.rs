//! Waiter/Table Routing API
//!
//! | 路径 | 方法 | 调用方 |
//! |------|------|--------|
//! | /api/waiters/{id}/tables | GET | 该服务员本人或经理 |
//! | /api/waiters/{id}/tables/{tableId} | PUT / DELETE | 经理 |
//! | /api/tables/{id}/waiters | GET | 员工 |

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/waiters/{id}/tables", get(handler::tables_for_waiter))
        .route(
            "/api/waiters/{id}/tables/{table_id}",
            put(handler::assign).delete(handler::unassign),
        )
        .route("/api/tables/{id}/waiters", get(handler::waiters_for_table))
}
