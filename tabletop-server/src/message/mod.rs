//! Message Bus
//!
//! - [`bus`] - 进程内广播总线 + 通配符订阅
//! - [`tcp_server`] - TCP 帧协议端点 (远程订阅 / 发布)
//!
//! 消息、主题与帧格式定义在 `shared::message`，服务端与客户端共用。

pub mod bus;
pub mod tcp_server;

pub use bus::{BusConfig, ConnectedClient, MessageBus, Subscription};
pub use shared::message::{BusMessage, PublishError, Publisher, Topics};
