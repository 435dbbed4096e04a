//! Principal & authorization
//!
//! 授权是对 `Principal × Action` 的穷举 match，新增角色或动作时编译器会强制补全。

use shared::models::StaffRole;
use shared::order::OrderStatus;

use crate::security_log;
use crate::utils::AppError;

/// 已认证的调用方；无凭据时为 `Customer`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Customer,
    Waiter { staff_id: i64, name: String },
    Manager { staff_id: i64, name: String },
    Cook { staff_id: i64, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    PlaceOrder,
    CallWaiter,
    ViewQueue,
    ViewOrders,
    ViewProjections,
    ViewTableWaiters,
    /// 状态迁移，按目标状态授权
    Transition(OrderStatus),
    DeleteOrder,
    ManageAssignments,
    ViewAnalytics,
    UpdateMenu,
    /// 查看某个服务员负责的桌台
    ViewWaiterTables(i64),
    AnswerCall,
}

impl Principal {
    pub fn role(&self) -> Option<StaffRole> {
        match self {
            Principal::Customer => None,
            Principal::Waiter { .. } => Some(StaffRole::Waiter),
            Principal::Manager { .. } => Some(StaffRole::Manager),
            Principal::Cook { .. } => Some(StaffRole::Cook),
        }
    }

    pub fn staff_id(&self) -> Option<i64> {
        match self {
            Principal::Customer => None,
            Principal::Waiter { staff_id, .. }
            | Principal::Manager { staff_id, .. }
            | Principal::Cook { staff_id, .. } => Some(*staff_id),
        }
    }

    pub fn is_staff(&self) -> bool {
        !matches!(self, Principal::Customer)
    }

    pub fn allows(&self, action: Action) -> bool {
        use Action::*;
        use OrderStatus::*;

        match (self, action) {
            // 任何人
            (_, PlaceOrder | CallWaiter | ViewQueue) => true,

            // PLACED 只能由创建进入
            (_, Transition(Placed)) => false,

            (Principal::Customer, _) => false,

            (Principal::Manager { .. }, _) => true,

            (
                Principal::Waiter { .. } | Principal::Cook { .. },
                ViewOrders | ViewProjections | ViewTableWaiters,
            ) => true,

            (Principal::Waiter { .. }, Transition(to)) => to == Served,
            (Principal::Cook { .. }, Transition(to)) => {
                matches!(to, Preparing | Ready | Cancelled)
            }

            (Principal::Waiter { staff_id, .. }, ViewWaiterTables(w)) => *staff_id == w,
            (Principal::Cook { .. }, ViewWaiterTables(_)) => false,

            (Principal::Waiter { .. }, AnswerCall) => true,
            (Principal::Cook { .. }, AnswerCall) => false,

            (
                Principal::Waiter { .. } | Principal::Cook { .. },
                DeleteOrder | ManageAssignments | ViewAnalytics | UpdateMenu,
            ) => false,
        }
    }

    /// 拒绝时：顾客 → 401 (需要登录)，员工 → 403
    pub fn require(&self, action: Action) -> Result<(), AppError> {
        if self.allows(action) {
            return Ok(());
        }

        security_log!(
            "WARN",
            "authorization_denied",
            role = self.role().map(|r| r.as_str()).unwrap_or("customer"),
            staff_id = self.staff_id().unwrap_or(0),
            action = format!("{action:?}")
        );

        match self {
            Principal::Customer => Err(AppError::unauthorized()),
            _ => Err(AppError::forbidden(format!(
                "{} may not perform {action:?}",
                self.role().map(|r| r.as_str()).unwrap_or("customer")
            ))),
        }
    }
}
