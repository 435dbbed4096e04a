//! Menu Models
//!
//! 订单核心只读取菜单；唯一的写操作是价格/可售状态调整 ([`MenuItemUpdate`])。

use serde::{Deserialize, Serialize};

/// Menu item (菜品)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    /// 当前价格 (最小货币单位)
    pub price_cents: i64,
    pub is_available: bool,
}

/// Modifier axis attached to one item (e.g. "Milk")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Modifier {
    pub id: i64,
    pub item_id: i64,
    pub name: String,
}

/// Selectable choice of a modifier (e.g. "Oat milk"), carrying a price delta
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ModifierOption {
    pub id: i64,
    pub modifier_id: i64,
    pub name: String,
    pub price_delta_cents: i64,
}

/// Price / availability change payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemUpdate {
    pub price_cents: Option<i64>,
    pub is_available: Option<bool>,
}
