//! Routing API Handlers

use std::collections::BTreeSet;

use axum::{
    Json,
    extract::State,
};
use shared::models::WaiterAssignment;

use crate::api::extract::ApiPath;
use crate::auth::{Action, Principal};
use crate::core::ServerState;
use crate::utils::{ApiResponse, AppResult};

pub async fn tables_for_waiter(
    State(state): State<ServerState>,
    principal: Principal,
    ApiPath(waiter_id): ApiPath<i64>,
) -> AppResult<Json<BTreeSet<i64>>> {
    principal.require(Action::ViewWaiterTables(waiter_id))?;
    Ok(Json(state.routing.tables_for_waiter(waiter_id).await?))
}

pub async fn waiters_for_table(
    State(state): State<ServerState>,
    principal: Principal,
    ApiPath(table_id): ApiPath<i64>,
) -> AppResult<Json<BTreeSet<i64>>> {
    principal.require(Action::ViewTableWaiters)?;
    Ok(Json(state.routing.waiters_for_table(table_id).await?))
}

pub async fn assign(
    State(state): State<ServerState>,
    principal: Principal,
    ApiPath((waiter_id, table_id)): ApiPath<(i64, i64)>,
) -> AppResult<Json<WaiterAssignment>> {
    principal.require(Action::ManageAssignments)?;
    Ok(Json(state.routing.assign(waiter_id, table_id).await?))
}

pub async fn unassign(
    State(state): State<ServerState>,
    principal: Principal,
    ApiPath((waiter_id, table_id)): ApiPath<(i64, i64)>,
) -> AppResult<Json<ApiResponse<()>>> {
    principal.require(Action::ManageAssignments)?;
    state.routing.unassign(waiter_id, table_id).await?;
    Ok(Json(ApiResponse::ok()))
}
