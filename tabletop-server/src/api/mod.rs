//! API 路由模块
//!
//! # 结构
//!
//! - [`health`] - 健康检查
//! - [`orders`] - 下单、状态迁移、删除、排队位置
//! - [`projections`] - 看板读模型
//! - [`routing`] - 服务员 ↔ 桌台分配
//! - [`calls`] - 呼叫服务员
//! - [`menu`] - 菜品改价 / 上下架
//!
//! 成功时响应体就是资源 JSON；失败时为 `ApiResponse { code, message, details }`。

pub mod calls;
pub mod extract;
pub mod health;
pub mod menu;
pub mod orders;
pub mod projections;
pub mod routing;

use std::time::Duration;

use axum::Router;
use http::{HeaderName, HeaderValue, StatusCode};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use validator::Validate;

use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Snowflake request id
#[derive(Clone, Copy)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = shared::util::snowflake_id().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(orders::router())
        .merge(projections::router())
        .merge(routing::router())
        .merge(calls::router())
        .merge(menu::router())
}

/// Build a fully configured application with all middleware and state
///
/// HTTP 服务器与测试 (oneshot) 共用
pub fn build_app(state: ServerState) -> Router {
    let timeout = Duration::from_millis(state.config.request_timeout_ms);
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    build_router().with_state(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), XRequestId))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(request_id))
            .layer(CorsLayer::permissive())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                timeout,
            )),
    )
}

/// Run `validator` rules on a request body
pub(crate) fn validated<T: Validate>(body: T) -> AppResult<T> {
    body.validate()
        .map_err(|e| AppError::validation(e.to_string().replace('\n', "; ")))?;
    Ok(body)
}
