//! Injectable key → value TTL cache

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::time::Instant;

#[async_trait]
pub trait TtlCache: Send + Sync {
    /// 未过期的值；过期条目在读取时移除
    async fn get(&self, key: &str) -> Option<Value>;

    async fn put(&self, key: String, value: Value, ttl: Duration);

    async fn invalidate_all(&self);
}

/// In-process cache backed by `dashmap`
#[derive(Debug, Default)]
pub struct MemoryTtlCache {
    entries: DashMap<String, (Instant, Value)>,
}

impl MemoryTtlCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TtlCache for MemoryTtlCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let hit = self.entries.get(key).and_then(|entry| {
            let (expires_at, value) = entry.value();
            (*expires_at > now).then(|| value.clone())
        });
        if hit.is_none() {
            self.entries.remove_if(key, |_, (expires_at, _)| *expires_at <= now);
        }
        hit
    }

    async fn put(&self, key: String, value: Value, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let now = Instant::now();
        // 顺带清掉过期条目，不再被读取的 key 不会常驻
        self.entries.retain(|_, (expires_at, _)| *expires_at > now);
        self.entries.insert(key, (now + ttl, value));
    }

    async fn invalidate_all(&self) {
        self.entries.clear();
    }
}
