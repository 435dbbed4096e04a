//! Order types and request/response DTOs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use super::status::OrderStatus;

/// Selected modifier choices: modifier id → chosen option ids
///
/// 作为不透明快照存储，不是对菜单的实时引用。
pub type ModifierSelection = BTreeMap<i64, Vec<i64>>;

/// 订单
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub table_id: i64,
    pub status: OrderStatus,
    /// 创建时冻结的总价 (最小货币单位)
    pub total_cents: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub lines: Vec<OrderLine>,
}

/// 订单行 (随订单级联删除)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: i64,
    pub order_id: i64,
    pub item_id: i64,
    /// 下单时的菜品名快照
    pub item_name: String,
    pub quantity: i64,
    /// 下单时的单价快照
    pub unit_price_cents: i64,
    /// 下单时所选规格的单件加价合计
    pub modifier_delta_cents: i64,
    #[serde(default)]
    pub modifiers: ModifierSelection,
}

impl OrderLine {
    /// (unit + Σ deltas) × quantity
    pub fn line_total_cents(&self) -> i64 {
        (self.unit_price_cents + self.modifier_delta_cents) * self.quantity
    }
}

/// Inbound line of an order creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderLine {
    pub item_id: i64,
    #[validate(range(min = 1, message = "quantity must be a positive integer"))]
    pub quantity: i64,
    /// 客户端认为的单价 (不含加价)
    pub price_cents: i64,
    #[serde(default)]
    pub modifiers: ModifierSelection,
}

/// POST /api/orders body
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub table_id: i64,
    #[validate(length(min = 1, message = "order must contain at least one item"), nested)]
    pub items: Vec<CreateOrderLine>,
    pub total_cents: i64,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub note: Option<String>,
}

/// POST /api/orders response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: i64,
}

/// PUT /api/orders/{id}/status body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub status: OrderStatus,
}

/// Queue position of a single order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePosition {
    pub order_id: i64,
    pub status: OrderStatus,
    /// 排在前面的 PLACED / PREPARING 订单数
    pub ahead: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total() {
        let line = OrderLine {
            id: 1,
            order_id: 1,
            item_id: 1,
            item_name: "Latte".into(),
            quantity: 2,
            unit_price_cents: 250,
            modifier_delta_cents: 30,
            modifiers: ModifierSelection::new(),
        };
        assert_eq!(line.line_total_cents(), 560);
    }

    #[test]
    fn test_create_request_wire_format() {
        let json = serde_json::json!({
            "tableId": 7,
            "items": [{"itemId": 3, "quantity": 2, "priceCents": 250, "modifiers": {"11": [21]}}],
            "totalCents": 560
        });
        let req: CreateOrderRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.table_id, 7);
        assert_eq!(req.items[0].modifiers.get(&11), Some(&vec![21]));
        assert!(req.note.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_request_validation() {
        let req = CreateOrderRequest {
            table_id: 1,
            items: vec![],
            total_cents: 0,
            note: None,
        };
        assert!(req.validate().is_err());

        let req = CreateOrderRequest {
            table_id: 1,
            items: vec![CreateOrderLine {
                item_id: 1,
                quantity: 0,
                price_cents: 100,
                modifiers: ModifierSelection::new(),
            }],
            total_cents: 0,
            note: None,
        };
        assert!(req.validate().is_err());
    }
}
