//! Read-Side Projections
//!
//! 每次读取时从订单表重新计算：
//! - 各状态订单数 (五个状态，缺失补零)
//! - 各桌台活跃订单数 (PLACED / PREPARING / READY)
//! - 厨房排队长度与单个订单的排队位置
//! - 按小时/天分桶的订单数与营收
//!
//! 结果可放入短 TTL 缓存 ([`TtlCache`])，TTL 为 0 时不缓存。

pub mod cache;

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::error::{AppError, ErrorCode};
use shared::order::{OrderStatus, QueuePosition};
use shared::projection::{Bucket, QueueLength, SeriesPoint, SeriesQuery, StatusCount, TableActivity};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::repository::RepoError;
use crate::db::repository::order as order_repo;

pub use cache::{MemoryTtlCache, TtlCache};

/// Series range limit
pub const MAX_SERIES_DAYS: i64 = 366;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] RepoError),
}

pub type ProjectionResult<T> = Result<T, ProjectionError>;

impl From<ProjectionError> for AppError {
    fn from(err: ProjectionError) -> Self {
        let message = err.to_string();
        match err {
            ProjectionError::InvalidRange(_) => {
                AppError::with_message(ErrorCode::ValueOutOfRange, message)
            }
            ProjectionError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, message).with_detail("orderId", id)
            }
            ProjectionError::Storage(e) => e.into(),
        }
    }
}

#[derive(Clone)]
pub struct Projections {
    pool: SqlitePool,
    cache: Arc<dyn TtlCache>,
    ttl: Duration,
    /// 每次失效递增；失效前开始的加载不回写缓存
    generation: Arc<AtomicU64>,
}

impl Projections {
    pub fn new(pool: SqlitePool, cache: Arc<dyn TtlCache>, ttl: Duration) -> Self {
        Self {
            pool,
            cache,
            ttl,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Drop every cached view (called on `orders/changed`)
    pub async fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.invalidate_all().await;
    }

    pub async fn status_counts(&self) -> ProjectionResult<Vec<StatusCount>> {
        self.cached("status_counts".to_string(), || async {
            let found: BTreeMap<OrderStatus, i64> =
                order_repo::count_by_status(&self.pool).await?.into_iter().collect();
            Ok(OrderStatus::ALL
                .iter()
                .map(|status| StatusCount {
                    status: *status,
                    count: found.get(status).copied().unwrap_or(0),
                })
                .collect())
        })
        .await
    }

    pub async fn active_by_table(&self) -> ProjectionResult<Vec<TableActivity>> {
        self.cached("active_by_table".to_string(), || async {
            let rows = order_repo::active_count_by_table(&self.pool).await?;
            Ok(rows
                .into_iter()
                .map(|(table_id, label, active_orders)| TableActivity {
                    table_id,
                    label,
                    active_orders,
                })
                .collect())
        })
        .await
    }

    pub async fn queue_length(&self) -> ProjectionResult<QueueLength> {
        self.cached("queue_length".to_string(), || async {
            let ahead = order_repo::count_queued(&self.pool).await?;
            Ok(QueueLength { ahead })
        })
        .await
    }

    /// 排在该订单前面的排队订单数；订单已离开队列时为 0
    pub async fn queue_position(&self, order_id: i64) -> ProjectionResult<QueuePosition> {
        let order = order_repo::find_header(&self.pool, order_id)
            .await?
            .ok_or(ProjectionError::OrderNotFound(order_id))?;
        let ahead = if order.status.is_queued() {
            order_repo::count_queued_ahead(&self.pool, order.created_at, order.id).await?
        } else {
            0
        };
        Ok(QueuePosition {
            order_id,
            status: order.status,
            ahead,
        })
    }

    /// Zero-filled order/revenue series over `[from, to)`
    pub async fn series(&self, query: &SeriesQuery) -> ProjectionResult<Vec<SeriesPoint>> {
        let (first, end) = series_bounds(query)?;
        let key = format!("series:{}:{}:{}", query.bucket.as_str(), query.from, query.to);
        let (from, to, bucket) = (query.from, query.to, query.bucket);

        self.cached(key, || async move {
            let rows = order_repo::series_rows(&self.pool, from, to).await?;
            Ok(bucketize(bucket, first, end, &rows))
        })
        .await
    }

    async fn cached<T, F, Fut>(&self, key: String, load: F) -> ProjectionResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = ProjectionResult<T>>,
    {
        if self.ttl.is_zero() {
            return load().await;
        }
        if let Some(value) = self.cache.get(&key).await
            && let Ok(hit) = serde_json::from_value(value)
        {
            return Ok(hit);
        }

        let started = self.generation.load(Ordering::Acquire);
        let fresh = load().await?;
        if self.generation.load(Ordering::Acquire) != started {
            tracing::debug!(key = %key, "Projection invalidated during load, not caching");
            return Ok(fresh);
        }
        match serde_json::to_value(&fresh) {
            Ok(value) => self.cache.put(key, value, self.ttl).await,
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to cache projection"),
        }
        Ok(fresh)
    }
}

/// UTC-aligned start of the bucket containing `ts`
fn bucket_start(bucket: Bucket, ts: i64) -> ProjectionResult<i64> {
    let dt: DateTime<Utc> = DateTime::from_timestamp_millis(ts)
        .ok_or_else(|| ProjectionError::InvalidRange(format!("timestamp out of range: {ts}")))?;
    let width = match bucket {
        Bucket::Hour => TimeDelta::hours(1),
        Bucket::Day => TimeDelta::days(1),
    };
    dt.duration_trunc(width)
        .map(|d| d.timestamp_millis())
        .map_err(|e| ProjectionError::InvalidRange(e.to_string()))
}

/// Validate the query and return (first bucket start, exclusive end)
fn series_bounds(query: &SeriesQuery) -> ProjectionResult<(i64, i64)> {
    if query.from >= query.to {
        return Err(ProjectionError::InvalidRange(
            "`from` must be earlier than `to`".into(),
        ));
    }
    let span = query
        .to
        .checked_sub(query.from)
        .ok_or_else(|| ProjectionError::InvalidRange("range overflows".into()))?;
    if span > MAX_SERIES_DAYS * Bucket::Day.millis() {
        return Err(ProjectionError::InvalidRange(format!(
            "range must not exceed {MAX_SERIES_DAYS} days"
        )));
    }
    let first = bucket_start(query.bucket, query.from)?;
    bucket_start(query.bucket, query.to)?;
    Ok((first, query.to))
}

fn bucketize(
    bucket: Bucket,
    first: i64,
    end: i64,
    rows: &[(i64, OrderStatus, i64)],
) -> Vec<SeriesPoint> {
    let width = bucket.millis();
    let mut points = Vec::new();
    let mut start = first;
    while start < end {
        points.push(SeriesPoint {
            bucket_start: start,
            orders: 0,
            revenue_cents: 0,
        });
        start += width;
    }

    for (created_at, status, total_cents) in rows {
        let idx = ((created_at - first) / width) as usize;
        if let Some(point) = points.get_mut(idx) {
            point.orders += 1;
            if *status != OrderStatus::Cancelled {
                point.revenue_cents += total_cents;
            }
        }
    }
    points
}
