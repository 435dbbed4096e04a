//! Order status and the transition whitelist

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 订单状态
///
/// ```text
/// PLACED ──▶ PREPARING ──▶ READY ──▶ SERVED
///    │           │           │
///    └───────────┴───────────┴──▶ CANCELLED
/// ```
///
/// `PLACED` 只能通过创建订单进入；`SERVED` / `CANCELLED` 为终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Placed,
    Preparing,
    Ready,
    Served,
    Cancelled,
}

/// 合法的状态迁移白名单 (from, to)
pub const TRANSITIONS: [(OrderStatus, OrderStatus); 6] = [
    (OrderStatus::Placed, OrderStatus::Preparing),
    (OrderStatus::Placed, OrderStatus::Cancelled),
    (OrderStatus::Preparing, OrderStatus::Ready),
    (OrderStatus::Preparing, OrderStatus::Cancelled),
    (OrderStatus::Ready, OrderStatus::Served),
    (OrderStatus::Ready, OrderStatus::Cancelled),
];

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Placed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Served,
        OrderStatus::Cancelled,
    ];

    /// Statuses that count toward a table's active orders
    pub const ACTIVE: [OrderStatus; 3] = [
        OrderStatus::Placed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
    ];

    /// Statuses that occupy the kitchen queue
    pub const QUEUED: [OrderStatus; 2] = [OrderStatus::Placed, OrderStatus::Preparing];

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "PLACED",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::Served => "SERVED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Served | OrderStatus::Cancelled)
    }

    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            OrderStatus::Placed | OrderStatus::Preparing | OrderStatus::Ready
        )
    }

    pub const fn is_queued(&self) -> bool {
        matches!(self, OrderStatus::Placed | OrderStatus::Preparing)
    }

    /// Whether `(self → to)` is in the whitelist
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        TRANSITIONS.contains(&(*self, to))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PLACED" => Ok(OrderStatus::Placed),
            "PREPARING" => Ok(OrderStatus::Preparing),
            "READY" => Ok(OrderStatus::Ready),
            "SERVED" => Ok(OrderStatus::Served),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}
