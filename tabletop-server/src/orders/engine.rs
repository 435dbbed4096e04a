//! Order lifecycle engine
//!
//! ```text
//! create ──▶ validate ──▶ price ──▶ tx(insert order + lines) ──▶ notify
//! transition ──▶ whitelist ──▶ CAS UPDATE ... WHERE status = ? ──▶ notify
//! ```
//!
//! 数据库是订单状态的唯一真相；通知在持久化成功之后发出，失败只记录日志。

use shared::message::OrderChange;
use shared::models::StaffRole;
use shared::order::{CreateOrderRequest, Order, OrderLine, OrderStatus};
use shared::util::{now_millis, snowflake_id};
use sqlx::SqlitePool;

use super::error::{OrderError, OrderResult};
use super::notifier::OrderNotifier;
use super::pricing;
use crate::db::repository::order::{self as order_repo, OrderFilter};
use crate::db::repository::{RepoError, dining_table, menu};

/// CAS 重试上限 (每次失败都会重新加载订单再判断)
pub const MAX_CAS_ATTEMPTS: usize = 3;

/// Max note length (characters)
pub const MAX_NOTE_LEN: usize = 500;

/// Result of a status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// 状态已写入，事件已发布
    Applied,
    /// 订单已处于目标状态 (重试或并发写者先到)，不发布任何事件
    AlreadyApplied,
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub order: Order,
    pub outcome: TransitionOutcome,
}

#[derive(Clone)]
pub struct OrderEngine {
    pool: SqlitePool,
    notifier: OrderNotifier,
}

impl OrderEngine {
    pub fn new(pool: SqlitePool, notifier: OrderNotifier) -> Self {
        Self { pool, notifier }
    }

    pub fn notifier(&self) -> &OrderNotifier {
        &self.notifier
    }

    /// Validate, price and persist a new order, then notify kitchen, queue and dashboards
    pub async fn create(&self, req: CreateOrderRequest) -> OrderResult<Order> {
        if req.items.is_empty() {
            return Err(OrderError::EmptyOrder);
        }
        let note = req.note.filter(|n| !n.trim().is_empty());
        if let Some(n) = &note
            && n.chars().count() > MAX_NOTE_LEN
        {
            return Err(OrderError::Validation(format!(
                "note must be at most {MAX_NOTE_LEN} characters"
            )));
        }

        let table = dining_table::find_by_id(&self.pool, req.table_id)
            .await?
            .ok_or(OrderError::TableNotFound(req.table_id))?;
        if !table.is_active {
            return Err(OrderError::TableInactive(table.id));
        }

        let order_id = snowflake_id();
        let now = now_millis();
        let mut lines = Vec::with_capacity(req.items.len());
        let mut line_totals = Vec::with_capacity(req.items.len());

        for (idx, input) in req.items.into_iter().enumerate() {
            if input.quantity < 1 {
                return Err(OrderError::InvalidQuantity { line: idx });
            }

            let item = menu::find_item(&self.pool, input.item_id)
                .await?
                .ok_or(OrderError::ItemNotFound {
                    line: idx,
                    item_id: input.item_id,
                })?;
            if !item.is_available {
                return Err(OrderError::ItemUnavailable {
                    line: idx,
                    item_id: item.id,
                });
            }
            // 客户端菜单过期
            if input.price_cents != item.price_cents {
                return Err(OrderError::PriceMismatch {
                    declared: input.price_cents,
                    computed: item.price_cents,
                    line: Some(idx),
                });
            }

            let delta = if input.modifiers.is_empty() {
                0
            } else {
                let modifiers = menu::modifiers_for_item(&self.pool, item.id).await?;
                let options = menu::options_for_item(&self.pool, item.id).await?;
                pricing::modifier_delta(idx, &input.modifiers, &modifiers, &options)?
            };
            line_totals.push(pricing::line_total(
                idx,
                item.price_cents,
                delta,
                input.quantity,
            )?);

            lines.push(OrderLine {
                id: snowflake_id(),
                order_id,
                item_id: item.id,
                item_name: item.name,
                quantity: input.quantity,
                unit_price_cents: item.price_cents,
                modifier_delta_cents: delta,
                modifiers: input.modifiers,
            });
        }

        let computed = pricing::order_total(&line_totals)?;
        if computed != req.total_cents {
            return Err(OrderError::PriceMismatch {
                declared: req.total_cents,
                computed,
                line: None,
            });
        }

        let order = Order {
            id: order_id,
            table_id: table.id,
            status: OrderStatus::Placed,
            total_cents: computed,
            note,
            created_at: now,
            updated_at: now,
            lines,
        };

        let mut tx = self.pool.begin().await.map_err(RepoError::from)?;
        order_repo::insert(&mut tx, &order).await?;
        tx.commit().await.map_err(RepoError::from)?;

        tracing::info!(
            order_id = order.id,
            table_id = order.table_id,
            total_cents = order.total_cents,
            lines = order.lines.len(),
            "Order placed"
        );

        self.notifier.new_order(&order).await;
        match order_repo::count_queued_ahead(&self.pool, order.created_at, order.id).await {
            Ok(ahead) => self.notifier.queue(&order, ahead).await,
            Err(e) => {
                tracing::warn!(order_id = order.id, error = %e, "Failed to compute queue position")
            }
        }
        self.notifier
            .orders_changed(&order, OrderChange::Created, None)
            .await;

        Ok(order)
    }

    /// Move an order to `to`
    ///
    /// 同目标重试返回 [`TransitionOutcome::AlreadyApplied`] 且不发布事件；
    /// 非白名单迁移返回 [`OrderError::InvalidTransition`]，订单保持不变。
    pub async fn transition(
        &self,
        order_id: i64,
        to: OrderStatus,
        by: Option<StaffRole>,
    ) -> OrderResult<Transition> {
        let mut current = order_repo::find_header(&self.pool, order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;
        let mut attempts = 0;

        loop {
            if current.status == to {
                current.lines = order_repo::find_lines(&self.pool, order_id).await?;
                return Ok(Transition {
                    order: current,
                    outcome: TransitionOutcome::AlreadyApplied,
                });
            }
            if !current.status.can_transition_to(to) {
                return Err(OrderError::InvalidTransition {
                    from: current.status,
                    to,
                });
            }
            if attempts == MAX_CAS_ATTEMPTS {
                tracing::warn!(order_id, to = %to, attempts, "Status update lost every compare-and-swap");
                return Err(OrderError::Conflict(order_id));
            }
            attempts += 1;

            let now = now_millis();
            let from = current.status;
            if order_repo::update_status_if(&self.pool, order_id, from, to, now).await? {
                let mut order = current;
                order.status = to;
                order.updated_at = now;
                order.lines = order_repo::find_lines(&self.pool, order_id).await?;

                tracing::info!(order_id, from = %from, to = %to, by = ?by, "Order status changed");

                if to == OrderStatus::Ready {
                    self.notifier.ready(&order).await;
                }
                self.notifier
                    .orders_changed(&order, OrderChange::StatusChanged, by)
                    .await;

                return Ok(Transition {
                    order,
                    outcome: TransitionOutcome::Applied,
                });
            }

            // 另一个写者先到：重新加载后再判断
            tracing::debug!(order_id, expected = %from, "Compare-and-swap lost, reloading order");
            current = order_repo::find_header(&self.pool, order_id)
                .await?
                .ok_or(OrderError::NotFound(order_id))?;
        }
    }

    pub async fn cancel(&self, order_id: i64, by: Option<StaffRole>) -> OrderResult<Transition> {
        self.transition(order_id, OrderStatus::Cancelled, by).await
    }

    /// Hard delete outside the state machine (lines cascade)
    pub async fn delete(&self, order_id: i64, by: Option<StaffRole>) -> OrderResult<Order> {
        let order = order_repo::find_header(&self.pool, order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;
        if !order_repo::delete(&self.pool, order_id).await? {
            return Err(OrderError::NotFound(order_id));
        }

        tracing::info!(order_id, table_id = order.table_id, status = %order.status, "Order deleted");
        self.notifier
            .orders_changed(&order, OrderChange::Deleted, by)
            .await;
        Ok(order)
    }

    pub async fn get(&self, order_id: i64) -> OrderResult<Order> {
        order_repo::find_by_id(&self.pool, order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))
    }

    /// Newest first
    pub async fn list(&self, filter: &OrderFilter) -> OrderResult<Vec<Order>> {
        Ok(order_repo::list(&self.pool, filter).await?)
    }
}
