//! Order API Handlers

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Deserialize;
use shared::order::{CreateOrderRequest, Order, OrderCreated, OrderStatus, QueuePosition, TransitionRequest};

use crate::api::validated;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::auth::{Action, Principal};
use crate::core::ServerState;
use crate::orders::OrderFilter;
use crate::utils::{ApiResponse, AppError, AppResult};

/// Query params for listing orders
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// 逗号分隔，e.g. `PLACED,PREPARING`
    pub status: Option<String>,
    pub table_id: Option<i64>,
    pub limit: Option<i64>,
}

impl ListQuery {
    fn into_filter(self) -> AppResult<OrderFilter> {
        let statuses = match self.status.as_deref() {
            None | Some("") => Vec::new(),
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().parse::<OrderStatus>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::validation(e.to_string()))?,
        };
        if let Some(limit) = self.limit
            && limit < 1
        {
            return Err(AppError::validation("limit must be positive"));
        }
        Ok(OrderFilter {
            statuses,
            table_id: self.table_id,
            limit: self.limit,
        })
    }
}

/// POST /api/orders
pub async fn create(
    State(state): State<ServerState>,
    principal: Principal,
    ApiJson(payload): ApiJson<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<OrderCreated>)> {
    principal.require(Action::PlaceOrder)?;
    let payload = validated(payload)?;
    let order = state.engine.create(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(OrderCreated { order_id: order.id }),
    ))
}

/// GET /api/orders
pub async fn list(
    State(state): State<ServerState>,
    principal: Principal,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    principal.require(Action::ViewOrders)?;
    let filter = query.into_filter()?;
    Ok(Json(state.engine.list(&filter).await?))
}

/// GET /api/orders/{id}
pub async fn get_by_id(
    State(state): State<ServerState>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<Order>> {
    principal.require(Action::ViewOrders)?;
    Ok(Json(state.engine.get(id).await?))
}

/// PUT /api/orders/{id}/status
pub async fn transition(
    State(state): State<ServerState>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<TransitionRequest>,
) -> AppResult<Json<Order>> {
    principal.require(Action::Transition(payload.status))?;
    let result = state
        .engine
        .transition(id, payload.status, principal.role())
        .await?;
    Ok(Json(result.order))
}

/// DELETE /api/orders/{id}
pub async fn delete(
    State(state): State<ServerState>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    principal.require(Action::DeleteOrder)?;
    state.engine.delete(id, principal.role()).await?;
    Ok(Json(ApiResponse::ok()))
}

/// GET /api/orders/{id}/queue
pub async fn queue_position(
    State(state): State<ServerState>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
) -> AppResult<Json<QueuePosition>> {
    principal.require(Action::ViewQueue)?;
    Ok(Json(state.projections.queue_position(id).await?))
}
