//! Waiter/Table Assignment Model

use serde::{Deserialize, Serialize};

/// 服务员-桌台分配 (多对多)
///
/// (waiter_id, table_id) 唯一；行的存在即事实本身。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct WaiterAssignment {
    pub waiter_id: i64,
    pub table_id: i64,
    /// 分配时间 (Unix 毫秒)
    pub assigned_at: i64,
}
