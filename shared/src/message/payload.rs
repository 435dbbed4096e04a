//! 总线消息载荷
//!
//! 每个载荷至少包含 `orderId` 或 `tableId`，以及 `ts` (Unix 毫秒)。

use serde::{Deserialize, Serialize};

use crate::models::StaffRole;
use crate::order::{ModifierSelection, Order, OrderStatus};

// ==================== Kitchen ====================

/// 厨房小票行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketLine {
    pub item_id: i64,
    pub item_name: String,
    pub quantity: i64,
    #[serde(default)]
    pub modifiers: ModifierSelection,
}

/// `stores/{storeId}/printing` - 新订单
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderPayload {
    pub order_id: i64,
    pub table_id: i64,
    pub total_cents: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub lines: Vec<TicketLine>,
    pub ts: i64,
}

impl NewOrderPayload {
    pub fn from_order(order: &Order, ts: i64) -> Self {
        Self {
            order_id: order.id,
            table_id: order.table_id,
            total_cents: order.total_cents,
            note: order.note.clone(),
            lines: order
                .lines
                .iter()
                .map(|l| TicketLine {
                    item_id: l.item_id,
                    item_name: l.item_name.clone(),
                    quantity: l.quantity,
                    modifiers: l.modifiers.clone(),
                })
                .collect(),
            ts,
        }
    }
}

// ==================== Customer-facing ====================

/// `stores/{storeId}/tables/{tableId}/ready`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReadyPayload {
    pub order_id: i64,
    pub table_id: i64,
    pub ts: i64,
}

/// `stores/{storeId}/tables/{tableId}/queue` - 排队位置重算
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePayload {
    pub table_id: i64,
    pub order_id: i64,
    /// 排在该订单前面的 PLACED / PREPARING 订单数
    pub ahead: i64,
    pub ts: i64,
}

// ==================== Dashboards ====================

/// 订单变化类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderChange {
    Created,
    StatusChanged,
    Deleted,
}

/// `stores/{storeId}/orders/changed` - 通用失效事件，看板收到后全量重新拉取
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrdersChangedPayload {
    pub order_id: i64,
    pub table_id: i64,
    pub change: OrderChange,
    /// 删除时为空
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    /// 操作者角色 (顾客下单时为空)；用于区分厨房拒单与经理取消
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by: Option<StaffRole>,
    pub ts: i64,
}

/// `stores/{storeId}/menu/updated`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuUpdatedPayload {
    pub item_id: i64,
    pub ts: i64,
}

// ==================== Call waiter ====================

/// `stores/{storeId}/tables/{tableId}/call[/accepted|/cleared]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallPayload {
    pub table_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waiter_id: Option<i64>,
    pub ts: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_changed_wire_format() {
        let payload = OrdersChangedPayload {
            order_id: 1,
            table_id: 2,
            change: OrderChange::StatusChanged,
            status: Some(OrderStatus::Cancelled),
            by: Some(StaffRole::Cook),
            ts: 99,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["orderId"], 1);
        assert_eq!(json["change"], "status_changed");
        assert_eq!(json["status"], "CANCELLED");
        assert_eq!(json["by"], "cook");
        assert_eq!(json["ts"], 99);
    }

    #[test]
    fn test_call_payload_omits_missing_waiter() {
        let json = serde_json::to_value(CallPayload {
            table_id: 3,
            waiter_id: None,
            ts: 1,
        })
        .unwrap();
        assert!(json.get("waiterId").is_none());
        assert_eq!(json["tableId"], 3);
    }
}
