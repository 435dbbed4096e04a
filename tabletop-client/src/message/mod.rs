//! 消息模块 - 连接服务端 TCP 总线的客户端

mod client;

pub use client::{BusClient, Subscription};
pub use shared::message::{BusMessage, PublishError};

/// 总线连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// 首次连接中
    Connecting,
    Connected,
    /// 断线后第 `attempt` 次重连
    Reconnecting { attempt: u32 },
    /// 重连次数用尽
    Failed,
    /// 主动关闭
    Closed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// 不会再自行恢复的终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Closed)
    }
}
