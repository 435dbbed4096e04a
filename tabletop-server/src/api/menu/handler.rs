//! Menu API Handlers

use axum::{
    Json,
    extract::State,
};
use shared::models::{MenuItem, MenuItemUpdate};

use crate::api::extract::{ApiJson, ApiPath};
use crate::auth::{Action, Principal};
use crate::core::ServerState;
use crate::utils::AppResult;

/// PATCH /api/menu/items/{id}
pub async fn update_item(
    State(state): State<ServerState>,
    principal: Principal,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<MenuItemUpdate>,
) -> AppResult<Json<MenuItem>> {
    principal.require(Action::UpdateMenu)?;
    Ok(Json(state.menu.update_item(id, &payload).await?))
}
