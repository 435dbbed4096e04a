//! Tabletop Client - 看板与服务员终端的客户端适配层
//!
//! - [`BusClient`] - 连接服务端 TCP 总线，自动重连 (固定退避，次数有限)
//! - [`WaiterScope`] - 按服务员负责的桌台过滤总线事件
//! - [`CallTracker`] - 每桌呼叫状态
//! - [`RefreshLoop`] - 总线事件或轮询触发全量刷新
//! - [`HttpClient`] - 类型化的 REST 调用

pub mod call_tracker;
pub mod config;
pub mod error;
pub mod http;
pub mod message;
pub mod refresh;
pub mod scope;

pub use call_tracker::CallTracker;
pub use config::{BusClientConfig, ClientConfig};
pub use error::{ApiFailure, ClientError, ClientResult};
pub use http::{HealthStatus, HttpClient, OrderQuery};
pub use message::{BusClient, ConnectionState, Subscription};
pub use refresh::{DEFAULT_POLL_INTERVAL, RefreshLoop, RefreshTrigger};
pub use scope::WaiterScope;

// Re-export shared message types for convenience
pub use shared::message::{BusMessage, PublishError, Publisher, Topics};
