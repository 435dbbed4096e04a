//! Projection API Handlers

use axum::{
    Json,
    extract::State,
};
use shared::projection::{QueueLength, SeriesPoint, SeriesQuery, StatusCount, TableActivity};

use crate::api::extract::ApiQuery;
use crate::auth::{Action, Principal};
use crate::core::ServerState;
use crate::utils::AppResult;

pub async fn status_counts(
    State(state): State<ServerState>,
    principal: Principal,
) -> AppResult<Json<Vec<StatusCount>>> {
    principal.require(Action::ViewProjections)?;
    Ok(Json(state.projections.status_counts().await?))
}

pub async fn tables(
    State(state): State<ServerState>,
    principal: Principal,
) -> AppResult<Json<Vec<TableActivity>>> {
    principal.require(Action::ViewProjections)?;
    Ok(Json(state.projections.active_by_table().await?))
}

pub async fn queue(
    State(state): State<ServerState>,
    principal: Principal,
) -> AppResult<Json<QueueLength>> {
    principal.require(Action::ViewQueue)?;
    Ok(Json(state.projections.queue_length().await?))
}

/// GET /api/projections/series?bucket=hour&from=..&to=..
pub async fn series(
    State(state): State<ServerState>,
    principal: Principal,
    ApiQuery(query): ApiQuery<SeriesQuery>,
) -> AppResult<Json<Vec<SeriesPoint>>> {
    principal.require(Action::ViewAnalytics)?;
    Ok(Json(state.projections.series(&query).await?))
}
