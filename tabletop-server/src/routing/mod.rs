//! Table/Waiter Routing Table
//!
//! 服务员 ↔ 桌台的多对多映射。路由表本身不过滤总线投递；
//! 客户端用 `WaiterScope` 根据服务员的桌台集合决定哪些桌台事件需要处理。

use std::collections::BTreeSet;

use shared::error::{AppError, ErrorCode};
use shared::models::{StaffRole, WaiterAssignment};
use shared::util::now_millis;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::repository::{RepoError, dining_table, staff, waiter_table};

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("Waiter not found: {0}")]
    WaiterNotFound(i64),

    #[error("Staff member {0} is not a waiter")]
    NotAWaiter(i64),

    #[error("Table not found: {0}")]
    TableNotFound(i64),

    #[error("Waiter {waiter_id} is not assigned to table {table_id}")]
    AssignmentNotFound { waiter_id: i64, table_id: i64 },

    #[error("Storage error: {0}")]
    Storage(#[from] RepoError),
}

pub type RoutingResult<T> = Result<T, RoutingError>;

impl From<RoutingError> for AppError {
    fn from(err: RoutingError) -> Self {
        let message = err.to_string();
        match err {
            RoutingError::WaiterNotFound(id) => {
                AppError::with_message(ErrorCode::StaffNotFound, message).with_detail("waiterId", id)
            }
            RoutingError::NotAWaiter(id) => {
                AppError::with_message(ErrorCode::NotAWaiter, message).with_detail("staffId", id)
            }
            RoutingError::TableNotFound(id) => {
                AppError::with_message(ErrorCode::TableNotFound, message).with_detail("tableId", id)
            }
            RoutingError::AssignmentNotFound {
                waiter_id,
                table_id,
            } => AppError::with_message(ErrorCode::AssignmentNotFound, message)
                .with_detail("waiterId", waiter_id)
                .with_detail("tableId", table_id),
            RoutingError::Storage(e) => e.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutingTable {
    pool: SqlitePool,
}

impl RoutingTable {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Idempotent: an existing pair is returned unchanged
    pub async fn assign(&self, waiter_id: i64, table_id: i64) -> RoutingResult<WaiterAssignment> {
        let waiter = staff::find_by_id(&self.pool, waiter_id)
            .await?
            .ok_or(RoutingError::WaiterNotFound(waiter_id))?;
        if waiter.role != StaffRole::Waiter {
            return Err(RoutingError::NotAWaiter(waiter_id));
        }
        if dining_table::find_by_id(&self.pool, table_id).await?.is_none() {
            return Err(RoutingError::TableNotFound(table_id));
        }

        let inserted = waiter_table::insert(&self.pool, waiter_id, table_id, now_millis()).await?;
        if inserted {
            tracing::info!(waiter_id, table_id, "Waiter assigned to table");
        }

        waiter_table::find(&self.pool, waiter_id, table_id)
            .await?
            .ok_or(RoutingError::AssignmentNotFound {
                waiter_id,
                table_id,
            })
    }

    pub async fn unassign(&self, waiter_id: i64, table_id: i64) -> RoutingResult<()> {
        if !waiter_table::delete(&self.pool, waiter_id, table_id).await? {
            return Err(RoutingError::AssignmentNotFound {
                waiter_id,
                table_id,
            });
        }
        tracing::info!(waiter_id, table_id, "Waiter unassigned from table");
        Ok(())
    }

    pub async fn tables_for_waiter(&self, waiter_id: i64) -> RoutingResult<BTreeSet<i64>> {
        let ids = waiter_table::tables_for_waiter(&self.pool, waiter_id).await?;
        Ok(ids.into_iter().collect())
    }

    pub async fn waiters_for_table(&self, table_id: i64) -> RoutingResult<BTreeSet<i64>> {
        let ids = waiter_table::waiters_for_table(&self.pool, table_id).await?;
        Ok(ids.into_iter().collect())
    }

    pub async fn assignments(&self) -> RoutingResult<Vec<WaiterAssignment>> {
        Ok(waiter_table::find_all(&self.pool).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    async fn setup() -> RoutingTable {
        let pool = memory_pool().await;
        seed_table(&pool, 1, "T1", true).await;
        seed_table(&pool, 2, "T2", true).await;
        seed_staff(&pool, 7, "Ana", "waiter").await;
        seed_staff(&pool, 8, "Ben", "waiter").await;
        seed_staff(&pool, 9, "Chef", "cook").await;
        RoutingTable::new(pool)
    }

    #[tokio::test]
    async fn test_assign_is_idempotent() {
        let routing = setup().await;
        let first = routing.assign(7, 1).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let second = routing.assign(7, 1).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(routing.assignments().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_lookups_both_directions() {
        let routing = setup().await;
        routing.assign(7, 1).await.unwrap();
        routing.assign(7, 2).await.unwrap();
        routing.assign(8, 2).await.unwrap();

        assert_eq!(
            routing.tables_for_waiter(7).await.unwrap(),
            BTreeSet::from([1, 2])
        );
        assert_eq!(
            routing.waiters_for_table(2).await.unwrap(),
            BTreeSet::from([7, 8])
        );
        assert!(routing.tables_for_waiter(99).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unassign_absent_pair() {
        let routing = setup().await;
        assert!(matches!(
            routing.unassign(7, 1).await,
            Err(RoutingError::AssignmentNotFound { .. })
        ));

        routing.assign(7, 1).await.unwrap();
        routing.unassign(7, 1).await.unwrap();
        assert!(routing.tables_for_waiter(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_assign_validation() {
        let routing = setup().await;
        assert!(matches!(
            routing.assign(99, 1).await,
            Err(RoutingError::WaiterNotFound(99))
        ));
        assert!(matches!(
            routing.assign(9, 1).await,
            Err(RoutingError::NotAWaiter(9))
        ));
        assert!(matches!(
            routing.assign(7, 42).await,
            Err(RoutingError::TableNotFound(42))
        ));
    }
}
