//! Order Lifecycle Module
//!
//! - **engine**: 状态机 (create / transition / cancel / delete) + CAS 写入
//! - **pricing**: 整数分计价与规格校验
//! - **notifier**: 订单事件 → 总线消息
//! - **error**: [`OrderError`] 及其到 `AppError` 的映射
//!
//! # Data Flow
//!
//! ```text
//! HTTP ──▶ OrderEngine ──▶ SQLite (单一真相)
//!               │
//!               └──▶ OrderNotifier ──▶ Publisher (MessageBus) ──▶ 订阅者
//! ```

pub mod engine;
pub mod error;
pub mod notifier;
pub mod pricing;

#[cfg(test)]
mod tests;

pub use engine::{MAX_CAS_ATTEMPTS, OrderEngine, Transition, TransitionOutcome};
pub use error::{OrderError, OrderResult};
pub use notifier::OrderNotifier;

pub use crate::db::repository::order::OrderFilter;
