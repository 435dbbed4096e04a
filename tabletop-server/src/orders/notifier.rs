//! Order notifications
//!
//! 把订单事件翻译成总线消息。发布失败只记录 warn，从不影响订单操作本身。

use std::sync::Arc;

use serde::Serialize;
use shared::message::{
    NewOrderPayload, OrderChange, OrderReadyPayload, OrdersChangedPayload, QueuePayload,
};
use shared::models::StaffRole;
use shared::order::Order;
use shared::util::now_millis;
use shared::{BusMessage, Publisher, Topics};

#[derive(Clone)]
pub struct OrderNotifier {
    publisher: Arc<dyn Publisher>,
    topics: Topics,
}

impl OrderNotifier {
    pub fn new(publisher: Arc<dyn Publisher>, topics: Topics) -> Self {
        Self { publisher, topics }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    /// `printing` - 新订单送厨房
    pub async fn new_order(&self, order: &Order) {
        let payload = NewOrderPayload::from_order(order, now_millis());
        self.send(self.topics.printing(), &payload).await;
    }

    /// `tables/{id}/queue` - 排队位置
    pub async fn queue(&self, order: &Order, ahead: i64) {
        let payload = QueuePayload {
            table_id: order.table_id,
            order_id: order.id,
            ahead,
            ts: now_millis(),
        };
        self.send(self.topics.table_queue(order.table_id), &payload)
            .await;
    }

    /// `tables/{id}/ready`
    pub async fn ready(&self, order: &Order) {
        let payload = OrderReadyPayload {
            order_id: order.id,
            table_id: order.table_id,
            ts: now_millis(),
        };
        self.send(self.topics.table_ready(order.table_id), &payload)
            .await;
    }

    /// `orders/changed` - 看板失效
    pub async fn orders_changed(&self, order: &Order, change: OrderChange, by: Option<StaffRole>) {
        let payload = OrdersChangedPayload {
            order_id: order.id,
            table_id: order.table_id,
            change,
            status: match change {
                OrderChange::Deleted => None,
                _ => Some(order.status),
            },
            by,
            ts: now_millis(),
        };
        self.send(self.topics.orders_changed(), &payload).await;
    }

    async fn send<T: Serialize>(&self, topic: String, payload: &T) {
        let msg = match BusMessage::new(topic.as_str(), payload) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Failed to build bus message");
                return;
            }
        };
        if let Err(e) = self.publisher.publish(msg).await {
            tracing::warn!(topic = %topic, error = %e, "Failed to publish order notification");
        }
    }
}
