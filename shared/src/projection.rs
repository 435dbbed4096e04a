//! Read-side projection DTOs
//!
//! 看板读取的聚合视图；每次读取时重新计算 (可带短 TTL 缓存)。

use serde::{Deserialize, Serialize};

use crate::order::OrderStatus;

/// Orders per status (all five statuses, zero-filled)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// Active (PLACED / PREPARING / READY) orders on one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableActivity {
    pub table_id: i64,
    pub label: String,
    pub active_orders: i64,
}

/// Kitchen queue length (PLACED + PREPARING)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueLength {
    pub ahead: i64,
}

/// Series bucket width (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Hour,
    Day,
}

impl Bucket {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Bucket::Hour => "hour",
            Bucket::Day => "day",
        }
    }

    /// Bucket width in milliseconds
    pub const fn millis(&self) -> i64 {
        match self {
            Bucket::Hour => 3_600_000,
            Bucket::Day => 86_400_000,
        }
    }
}

/// GET /api/projections/series query
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesQuery {
    pub bucket: Bucket,
    /// 起始 (含)，Unix 毫秒
    pub from: i64,
    /// 结束 (不含)，Unix 毫秒
    pub to: i64,
}

/// One point of the order/revenue series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    /// 桶起点 (Unix 毫秒, UTC 对齐)
    pub bucket_start: i64,
    /// 该桶内创建的订单数 (含已取消)
    pub orders: i64,
    /// 未取消订单的总额
    pub revenue_cents: i64,
}
