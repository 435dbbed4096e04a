//! Test fixtures: in-memory database, recording publishers and raw-SQL seeds

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::{BusMessage, PublishError, Publisher, Topics};
use sqlx::SqlitePool;

use crate::db::DbService;
use crate::orders::{OrderEngine, OrderNotifier};

pub const STORE: &str = "s1";

/// Captures every published message
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<BusMessage>>,
}

impl RecordingPublisher {
    pub fn messages(&self) -> Vec<BusMessage> {
        self.messages.lock().clone()
    }

    pub fn topics(&self) -> Vec<String> {
        self.messages.lock().iter().map(|m| m.topic.clone()).collect()
    }

    pub fn on(&self, topic: &str) -> Vec<BusMessage> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn publish(&self, msg: BusMessage) -> Result<(), PublishError> {
        self.messages.lock().push(msg);
        Ok(())
    }
}

/// Always fails, like a client whose broker connection is down
pub struct FailingPublisher;

#[async_trait]
impl Publisher for FailingPublisher {
    async fn publish(&self, _msg: BusMessage) -> Result<(), PublishError> {
        Err(PublishError::Disconnected)
    }
}

pub async fn memory_pool() -> SqlitePool {
    DbService::memory().await.unwrap().pool
}

pub fn topics() -> Topics {
    Topics::new(STORE)
}

pub fn engine_with(pool: &SqlitePool, publisher: Arc<dyn Publisher>) -> OrderEngine {
    OrderEngine::new(pool.clone(), OrderNotifier::new(publisher, topics()))
}

pub async fn seed_table(pool: &SqlitePool, id: i64, label: &str, active: bool) {
    sqlx::query("INSERT INTO dining_table (id, label, is_active) VALUES (?, ?, ?)")
        .bind(id)
        .bind(label)
        .bind(active)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_item(pool: &SqlitePool, id: i64, name: &str, price_cents: i64, available: bool) {
    sqlx::query("INSERT INTO menu_item (id, name, price_cents, is_available) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(name)
        .bind(price_cents)
        .bind(available)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_modifier(pool: &SqlitePool, id: i64, item_id: i64, name: &str) {
    sqlx::query("INSERT INTO modifier (id, item_id, name) VALUES (?, ?, ?)")
        .bind(id)
        .bind(item_id)
        .bind(name)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn seed_option(pool: &SqlitePool, id: i64, modifier_id: i64, name: &str, delta: i64) {
    sqlx::query(
        "INSERT INTO modifier_option (id, modifier_id, name, price_delta_cents) VALUES (?, ?, ?, ?)",
    )
    .bind(id)
    .bind(modifier_id)
    .bind(name)
    .bind(delta)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn seed_staff(pool: &SqlitePool, id: i64, name: &str, role: &str) {
    sqlx::query("INSERT INTO staff (id, name, role, is_active) VALUES (?, ?, ?, 1)")
        .bind(id)
        .bind(name)
        .bind(role)
        .execute(pool)
        .await
        .unwrap();
}

/// Raw order row with a fixed creation time (for projection tests)
pub async fn seed_order(
    pool: &SqlitePool,
    id: i64,
    table_id: i64,
    status: &str,
    total_cents: i64,
    created_at: i64,
) {
    sqlx::query(
        "INSERT INTO orders (id, table_id, status, total_cents, note, created_at, updated_at) VALUES (?, ?, ?, ?, NULL, ?, ?)",
    )
    .bind(id)
    .bind(table_id)
    .bind(status)
    .bind(total_cents)
    .bind(created_at)
    .bind(created_at)
    .execute(pool)
    .await
    .unwrap();
}

/// T1 (active) + T9 (inactive); Latte 250 with Milk {Oat +30, Whole +0}; Muffin 300; Soup (unavailable)
pub async fn seed_cafe(pool: &SqlitePool) {
    seed_table(pool, 1, "T1", true).await;
    seed_table(pool, 2, "T2", true).await;
    seed_table(pool, 9, "T9", false).await;
    seed_item(pool, 100, "Latte", 250, true).await;
    seed_item(pool, 101, "Muffin", 300, true).await;
    seed_item(pool, 102, "Soup", 450, false).await;
    seed_modifier(pool, 11, 100, "Milk").await;
    seed_option(pool, 21, 11, "Oat", 30).await;
    seed_option(pool, 22, 11, "Whole", 0).await;
    seed_modifier(pool, 12, 101, "Warm").await;
    seed_option(pool, 23, 12, "Yes", 0).await;
}
