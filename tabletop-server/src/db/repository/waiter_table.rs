//! Waiter ↔ Table assignment Repository
//!
//! (waiter_id, table_id) 为联合主键；插入使用 `OR IGNORE` 保证幂等。

use super::RepoResult;
use shared::models::WaiterAssignment;
use sqlx::SqlitePool;

pub async fn find(
    pool: &SqlitePool,
    waiter_id: i64,
    table_id: i64,
) -> RepoResult<Option<WaiterAssignment>> {
    let row = sqlx::query_as::<_, WaiterAssignment>(
        "SELECT waiter_id, table_id, assigned_at FROM waiter_table WHERE waiter_id = ? AND table_id = ?",
    )
    .bind(waiter_id)
    .bind(table_id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Insert the pair; returns `false` when it already existed
pub async fn insert(
    pool: &SqlitePool,
    waiter_id: i64,
    table_id: i64,
    assigned_at: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "INSERT OR IGNORE INTO waiter_table (waiter_id, table_id, assigned_at) VALUES (?, ?, ?)",
    )
    .bind(waiter_id)
    .bind(table_id)
    .bind(assigned_at)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Delete the pair; returns `false` when nothing was deleted
pub async fn delete(pool: &SqlitePool, waiter_id: i64, table_id: i64) -> RepoResult<bool> {
    let rows = sqlx::query("DELETE FROM waiter_table WHERE waiter_id = ? AND table_id = ?")
        .bind(waiter_id)
        .bind(table_id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

pub async fn tables_for_waiter(pool: &SqlitePool, waiter_id: i64) -> RepoResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT table_id FROM waiter_table WHERE waiter_id = ? ORDER BY table_id",
    )
    .bind(waiter_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

pub async fn waiters_for_table(pool: &SqlitePool, table_id: i64) -> RepoResult<Vec<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT waiter_id FROM waiter_table WHERE table_id = ? ORDER BY waiter_id",
    )
    .bind(table_id)
    .fetch_all(pool)
    .await?;
    Ok(ids)
}

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<WaiterAssignment>> {
    let rows = sqlx::query_as::<_, WaiterAssignment>(
        "SELECT waiter_id, table_id, assigned_at FROM waiter_table ORDER BY waiter_id, table_id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
