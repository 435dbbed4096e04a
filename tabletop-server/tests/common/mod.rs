//! 集成测试公共工具：内存数据库、种子数据、令牌、oneshot 请求

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use shared::models::StaffRole;
use sqlx::SqlitePool;
use tabletop_server::db::DbService;
use tabletop_server::{Config, ServerState};
use tower::ServiceExt;

pub const STORE: &str = "s1";

pub const WAITER: i64 = 7;
pub const OTHER_WAITER: i64 = 8;
pub const MANAGER: i64 = 1;
pub const COOK: i64 = 3;

/// 2025-01-01T00:00:00Z
pub const DAY0: i64 = 1_735_689_600_000;

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "STORE_ID" => Some(STORE.to_string()),
        // 关闭投影缓存，读取总是看到最新数据
        "PROJECTION_TTL_MS" => Some("0".to_string()),
        _ => None,
    })
}

/// State on an in-memory database, seeded with the cafe fixture
pub async fn test_state() -> ServerState {
    let db = DbService::memory().await.unwrap();
    seed_cafe(&db.pool).await;
    ServerState::new(test_config(), db)
}

pub fn app(state: &ServerState) -> Router {
    tabletop_server::api::build_app(state.clone())
}

pub fn token(state: &ServerState, staff_id: i64, role: StaffRole) -> String {
    state
        .jwt
        .issue(staff_id, "tester", role, chrono::Duration::minutes(5))
        .unwrap()
}

pub fn manager_token(state: &ServerState) -> String {
    token(state, MANAGER, StaffRole::Manager)
}

pub fn waiter_token(state: &ServerState) -> String {
    token(state, WAITER, StaffRole::Waiter)
}

pub fn cook_token(state: &ServerState) -> String {
    token(state, COOK, StaffRole::Cook)
}

/// Send one request through the full middleware stack
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

// ==================== Seeds ====================

async fn exec(pool: &SqlitePool, sql: &str) {
    sqlx::query(sql).execute(pool).await.unwrap();
}

/// T1, T2 active, T9 inactive; Latte 250 (Milk: Oat +30 / Whole +0); Muffin 300; Soup unavailable
pub async fn seed_cafe(pool: &SqlitePool) {
    exec(
        pool,
        "INSERT INTO dining_table (id, label, is_active) VALUES (1, 'T1', 1), (2, 'T2', 1), (9, 'T9', 0)",
    )
    .await;
    exec(
        pool,
        "INSERT INTO menu_item (id, name, price_cents, is_available) VALUES \
         (100, 'Latte', 250, 1), (101, 'Muffin', 300, 1), (102, 'Soup', 450, 0)",
    )
    .await;
    exec(pool, "INSERT INTO modifier (id, item_id, name) VALUES (11, 100, 'Milk')").await;
    exec(
        pool,
        "INSERT INTO modifier_option (id, modifier_id, name, price_delta_cents) VALUES \
         (21, 11, 'Oat', 30), (22, 11, 'Whole', 0)",
    )
    .await;
    exec(
        pool,
        "INSERT INTO staff (id, name, role, is_active) VALUES \
         (1, 'Mia', 'manager', 1), (3, 'Chen', 'cook', 1), (7, 'Ana', 'waiter', 1), (8, 'Leo', 'waiter', 1)",
    )
    .await;
}

/// Raw order row with a fixed creation time
pub async fn seed_order(pool: &SqlitePool, id: i64, table_id: i64, status: &str, total: i64, at: i64) {
    sqlx::query(
        "INSERT INTO orders (id, table_id, status, total_cents, note, created_at, updated_at) VALUES (?, ?, ?, ?, NULL, ?, ?)",
    )
    .bind(id)
    .bind(table_id)
    .bind(status)
    .bind(total)
    .bind(at)
    .bind(at)
    .execute(pool)
    .await
    .unwrap();
}

/// One Latte with oat milk on table 1: (250 + 30) × qty
pub fn latte_order(qty: i64) -> Value {
    serde_json::json!({
        "tableId": 1,
        "items": [{
            "itemId": 100,
            "quantity": qty,
            "priceCents": 250,
            "modifiers": { "11": [21] }
        }],
        "totalCents": 280 * qty,
        "note": "no sugar"
    })
}
