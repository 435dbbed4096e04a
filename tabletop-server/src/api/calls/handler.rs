//! Call-Waiter Handlers

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Deserialize;

use crate::api::extract::{ApiJson, ApiPath};
use crate::auth::{Action, Principal};
use crate::core::ServerState;
use crate::utils::AppResult;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    pub table_id: i64,
}

/// POST /api/calls
pub async fn call(
    State(state): State<ServerState>,
    principal: Principal,
    ApiJson(payload): ApiJson<CallRequest>,
) -> AppResult<StatusCode> {
    principal.require(Action::CallWaiter)?;
    state.calls.call(payload.table_id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/calls/{tableId}/accept
pub async fn accept(
    State(state): State<ServerState>,
    principal: Principal,
    ApiPath(table_id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    principal.require(Action::AnswerCall)?;
    // AnswerCall 只授予员工，staff_id 一定存在
    let waiter_id = principal.staff_id().unwrap_or_default();
    state.calls.accept(table_id, waiter_id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /api/calls/{tableId}/clear
pub async fn clear(
    State(state): State<ServerState>,
    principal: Principal,
    ApiPath(table_id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    principal.require(Action::AnswerCall)?;
    state.calls.clear(table_id, principal.staff_id()).await?;
    Ok(StatusCode::ACCEPTED)
}
