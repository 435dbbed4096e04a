//! 消息总线消息类型定义
//!
//! 这些类型在 tabletop-server 和 clients 之间共享，用于
//! 进程内（内存）和网络（TCP）通信。
//!
//! - [`BusMessage`] - 主题 + JSON 载荷 + 时间戳
//! - [`Publisher`] - 发布端抽象 (进程内总线 / 远程客户端)
//! - [`topic`] - 主题命名与通配符匹配
//! - [`frame`] - TCP 帧编解码
//! - [`call`] - 呼叫服务员三态信号

pub mod call;
pub mod frame;
pub mod payload;
pub mod topic;

pub use call::{CallEvent, CallState};
pub use frame::{Frame, FrameError, FrameKind, read_frame, write_frame};
pub use payload::*;
pub use topic::{TopicError, TopicFilter, Topics, parse_table_topic, validate_topic};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::util::now_millis;

/// 总线消息 (瞬态，不持久化)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub topic: String,
    pub payload: Value,
    /// 发出时间 (Unix 毫秒)
    pub ts: i64,
}

impl BusMessage {
    /// 构造消息；主题必须是不含通配符的具体主题
    pub fn new<T: Serialize>(topic: impl Into<String>, payload: &T) -> Result<Self, PublishError> {
        let topic = topic.into();
        validate_topic(&topic)?;
        Ok(Self {
            topic,
            payload: serde_json::to_value(payload)?,
            ts: now_millis(),
        })
    }

    /// 解析载荷
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

/// 发布失败原因
///
/// 调用方负责记录日志；发布失败从不影响触发它的订单操作。
#[derive(Debug, Error)]
pub enum PublishError {
    /// 与 broker 断开，消息被丢弃 (不排队)
    #[error("not connected to the message bus; message dropped")]
    Disconnected,

    /// 总线已关闭
    #[error("message bus is closed")]
    Closed,

    #[error("invalid topic: {0}")]
    InvalidTopic(#[from] TopicError),

    #[error("payload encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Io(String),
}

/// 发布端抽象
///
/// 服务端进程内总线与客户端远程连接都实现此特征，生命周期引擎只依赖它。
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, msg: BusMessage) -> Result<(), PublishError>;
}
