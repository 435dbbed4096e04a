//! Order Repository
//!
//! `orders` + `order_line`. 状态只由生命周期引擎通过 [`update_status_if`] 写入。

use std::collections::HashMap;

use super::{RepoError, RepoResult};
use shared::order::{ModifierSelection, Order, OrderLine, OrderStatus};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    table_id: i64,
    status: String,
    total_cents: i64,
    note: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepoError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<OrderStatus>()
            .map_err(|e| RepoError::Database(e.to_string()))?;
        Ok(Order {
            id: row.id,
            table_id: row.table_id,
            status,
            total_cents: row.total_cents,
            note: row.note,
            created_at: row.created_at,
            updated_at: row.updated_at,
            lines: Vec::new(),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    id: i64,
    order_id: i64,
    item_id: i64,
    item_name: String,
    quantity: i64,
    unit_price_cents: i64,
    modifier_delta_cents: i64,
    modifiers_json: String,
}

impl TryFrom<LineRow> for OrderLine {
    type Error = RepoError;

    fn try_from(row: LineRow) -> Result<Self, Self::Error> {
        let modifiers: ModifierSelection = serde_json::from_str(&row.modifiers_json)
            .map_err(|e| RepoError::Database(format!("corrupt modifiers snapshot: {e}")))?;
        Ok(OrderLine {
            id: row.id,
            order_id: row.order_id,
            item_id: row.item_id,
            item_name: row.item_name,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            modifier_delta_cents: row.modifier_delta_cents,
            modifiers,
        })
    }
}

const ORDER_COLUMNS: &str = "id, table_id, status, total_cents, note, created_at, updated_at";
const LINE_COLUMNS: &str = "id, order_id, item_id, item_name, quantity, unit_price_cents, modifier_delta_cents, modifiers_json";

/// List filter (newest first)
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// 为空表示不过滤
    pub statuses: Vec<OrderStatus>,
    pub table_id: Option<i64>,
    pub limit: Option<i64>,
}

/// Insert an order and its lines inside the caller's transaction
pub async fn insert(conn: &mut SqliteConnection, order: &Order) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO orders (id, table_id, status, total_cents, note, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(order.id)
    .bind(order.table_id)
    .bind(order.status.as_str())
    .bind(order.total_cents)
    .bind(&order.note)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    for (line_no, line) in order.lines.iter().enumerate() {
        let modifiers_json = serde_json::to_string(&line.modifiers)
            .map_err(|e| RepoError::Validation(e.to_string()))?;
        sqlx::query(
            "INSERT INTO order_line (id, order_id, line_no, item_id, item_name, quantity, unit_price_cents, modifier_delta_cents, modifiers_json) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(line.id)
        .bind(order.id)
        .bind(line_no as i64)
        .bind(line.item_id)
        .bind(&line.item_name)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.modifier_delta_cents)
        .bind(modifiers_json)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Order header only (lines empty)
pub async fn find_header(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?");
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(Order::try_from).transpose()
}

/// Order with its lines
pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Order>> {
    let Some(mut order) = find_header(pool, id).await? else {
        return Ok(None);
    };
    order.lines = find_lines(pool, id).await?;
    Ok(Some(order))
}

pub async fn find_lines(pool: &SqlitePool, order_id: i64) -> RepoResult<Vec<OrderLine>> {
    let sql = format!("SELECT {LINE_COLUMNS} FROM order_line WHERE order_id = ? ORDER BY line_no");
    let rows = sqlx::query_as::<_, LineRow>(&sql)
        .bind(order_id)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(OrderLine::try_from).collect()
}

/// Lines of many orders in one query, grouped by order id
pub async fn find_lines_for(
    pool: &SqlitePool,
    order_ids: &[i64],
) -> RepoResult<HashMap<i64, Vec<OrderLine>>> {
    let mut grouped: HashMap<i64, Vec<OrderLine>> = HashMap::new();
    if order_ids.is_empty() {
        return Ok(grouped);
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT {LINE_COLUMNS} FROM order_line WHERE order_id IN ("
    ));
    let mut sep = qb.separated(", ");
    for id in order_ids {
        sep.push_bind(*id);
    }
    sep.push_unseparated(") ORDER BY order_id, line_no");

    let rows = qb.build_query_as::<LineRow>().fetch_all(pool).await?;
    for row in rows {
        let line = OrderLine::try_from(row)?;
        grouped.entry(line.order_id).or_default().push(line);
    }
    Ok(grouped)
}

pub async fn list(pool: &SqlitePool, filter: &OrderFilter) -> RepoResult<Vec<Order>> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1 = 1"));

    if !filter.statuses.is_empty() {
        qb.push(" AND status IN (");
        let mut sep = qb.separated(", ");
        for status in &filter.statuses {
            sep.push_bind(status.as_str());
        }
        sep.push_unseparated(")");
    }
    if let Some(table_id) = filter.table_id {
        qb.push(" AND table_id = ").push_bind(table_id);
    }
    qb.push(" ORDER BY created_at DESC, id DESC");
    if let Some(limit) = filter.limit {
        qb.push(" LIMIT ").push_bind(limit);
    }

    let rows = qb.build_query_as::<OrderRow>().fetch_all(pool).await?;
    let mut orders = rows
        .into_iter()
        .map(Order::try_from)
        .collect::<RepoResult<Vec<_>>>()?;

    let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let mut lines = find_lines_for(pool, &ids).await?;
    for order in &mut orders {
        order.lines = lines.remove(&order.id).unwrap_or_default();
    }
    Ok(orders)
}

/// Compare-and-swap status write
///
/// 返回 `false` 表示当前状态已不是 `expected` (另一个写者先到)。
pub async fn update_status_if(
    pool: &SqlitePool,
    id: i64,
    expected: OrderStatus,
    to: OrderStatus,
    now: i64,
) -> RepoResult<bool> {
    let rows =
        sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(to.as_str())
            .bind(now)
            .bind(id)
            .bind(expected.as_str())
            .execute(pool)
            .await?;
    Ok(rows.rows_affected() == 1)
}

/// Hard delete (lines cascade); returns `false` when the order did not exist
pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM orders WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

// ==================== Read-model queries ====================

/// (status, count) for statuses that have at least one order
pub async fn count_by_status(pool: &SqlitePool) -> RepoResult<Vec<(OrderStatus, i64)>> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT status, COUNT(*) FROM orders GROUP BY status",
    )
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|(status, count)| {
            status
                .parse::<OrderStatus>()
                .map(|s| (s, count))
                .map_err(|e| RepoError::Database(e.to_string()))
        })
        .collect()
}

/// (table_id, label, active count): every active table, plus inactive tables that still have active orders
pub async fn active_count_by_table(pool: &SqlitePool) -> RepoResult<Vec<(i64, String, i64)>> {
    let rows = sqlx::query_as::<_, (i64, String, i64)>(
        "SELECT t.id, t.label, COUNT(o.id) FROM dining_table t \
         LEFT JOIN orders o ON o.table_id = t.id AND o.status IN ('PLACED', 'PREPARING', 'READY') \
         WHERE t.is_active = 1 OR o.id IS NOT NULL \
         GROUP BY t.id, t.label ORDER BY t.id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Orders currently occupying the kitchen queue
pub async fn count_queued(pool: &SqlitePool) -> RepoResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM orders WHERE status IN ('PLACED', 'PREPARING')",
    )
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Queued orders strictly ahead of `(created_at, id)`
pub async fn count_queued_ahead(pool: &SqlitePool, created_at: i64, id: i64) -> RepoResult<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM orders WHERE status IN ('PLACED', 'PREPARING') \
         AND (created_at < ?1 OR (created_at = ?1 AND id < ?2))",
    )
    .bind(created_at)
    .bind(id)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Raw rows for the analytics series: (created_at, status, total_cents) in `[from, to)`
pub async fn series_rows(
    pool: &SqlitePool,
    from: i64,
    to: i64,
) -> RepoResult<Vec<(i64, OrderStatus, i64)>> {
    let rows = sqlx::query_as::<_, (i64, String, i64)>(
        "SELECT created_at, status, total_cents FROM orders \
         WHERE created_at >= ? AND created_at < ? ORDER BY created_at",
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|(created_at, status, total)| {
            status
                .parse::<OrderStatus>()
                .map(|s| (created_at, s, total))
                .map_err(|e| RepoError::Database(e.to_string()))
        })
        .collect()
}
