//! Dining Table Model

use serde::{Deserialize, Serialize};

/// Dining table entity (桌台)
///
/// 停用是逻辑停用 (`is_active = false`)，历史订单仍引用该桌台，不做物理删除。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct DiningTable {
    pub id: i64,
    /// 唯一的桌台标签 (e.g. "T1")
    pub label: String,
    pub is_active: bool,
}
