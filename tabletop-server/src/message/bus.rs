//! 消息总线核心实现
//!
//! # 架构
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                     MessageBus                           │
//! │  ┌───────────────────────────────────────────────────┐  │
//! │  │  broadcast::Sender<BusMessage>                    │  │
//! │  └───────────────────────────────────────────────────┘  │
//! └────────────────────────┬────────────────────────────────┘
//!                          │  TopicFilter (+ / #)
//!     ┌────────────────────┼───────────────────┐
//!     ▼                    ▼                   ▼
//! Subscription      subscribe_with()     TCP 连接 (tcp_server)
//! (进程内接收)       (后台处理任务)        (远程客户端)
//! ```
//!
//! 发布从不等待订阅者处理；没有订阅者时发布也算成功。

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use shared::message::{BusMessage, PublishError, Publisher, TopicError, TopicFilter, validate_topic};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Configuration for the bus and its TCP endpoint
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub tcp_listen_addr: String,
    /// Capacity of the broadcast channel (default: 1024)
    pub channel_capacity: usize,
    /// 远程客户端只能发布本门店的 call/accepted 与 call/cleared
    pub store_id: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            tcp_listen_addr: "0.0.0.0:9626".to_string(),
            channel_capacity: 1024,
            store_id: "default".to_string(),
        }
    }
}

/// 已连接的 TCP 客户端
#[derive(Debug, Clone)]
pub struct ConnectedClient {
    pub id: u64,
    pub addr: SocketAddr,
    /// 当前生效的订阅模式
    pub patterns: Vec<String>,
}

/// 消息总线 - 负责消息路由和转发
#[derive(Debug, Clone)]
pub struct MessageBus {
    tx: broadcast::Sender<BusMessage>,
    pub(crate) config: BusConfig,
    /// 关闭信号令牌
    shutdown_token: CancellationToken,
    /// 已连接的 TCP 客户端 (connection id -> client)
    pub(crate) clients: Arc<DashMap<u64, ConnectedClient>>,
    next_client_id: Arc<AtomicU64>,
}

impl MessageBus {
    /// 创建默认配置的消息总线
    pub fn new() -> Self {
        Self::from_config(BusConfig::default())
    }

    pub fn from_config(config: BusConfig) -> Self {
        let (tx, _) = broadcast::channel(config.channel_capacity.max(1));
        Self {
            tx,
            config,
            shutdown_token: CancellationToken::new(),
            clients: Arc::new(DashMap::new()),
            next_client_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_config(BusConfig {
            channel_capacity: capacity,
            ..Default::default()
        })
    }

    /// 发布消息到所有匹配的订阅者
    pub fn send(&self, msg: BusMessage) -> Result<(), PublishError> {
        if self.shutdown_token.is_cancelled() {
            return Err(PublishError::Closed);
        }
        validate_topic(&msg.topic)?;

        let topic = msg.topic.clone();
        match self.tx.send(msg) {
            Ok(receivers) => {
                tracing::trace!(topic = %topic, receivers, "Bus message published");
            }
            Err(_) => {
                tracing::trace!(topic = %topic, "Bus message published with no subscribers");
            }
        }
        Ok(())
    }

    /// 订阅匹配 `pattern` 的消息
    pub fn subscribe(&self, pattern: &str) -> Result<Subscription, TopicError> {
        let filter = TopicFilter::parse(pattern)?;
        Ok(Subscription {
            filter,
            rx: self.tx.subscribe(),
        })
    }

    /// 订阅并在后台任务中处理消息，总线关闭时任务退出
    pub fn subscribe_with<F, Fut>(&self, pattern: &str, handler: F) -> Result<JoinHandle<()>, TopicError>
    where
        F: Fn(BusMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut subscription = self.subscribe(pattern)?;
        let shutdown = self.shutdown_token.clone();

        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    msg = subscription.recv() => match msg {
                        Some(msg) => handler(msg).await,
                        None => break,
                    }
                }
            }
            tracing::debug!(pattern = %subscription.filter, "Bus handler stopped");
        }))
    }

    /// 原始广播接收端 (不过滤)
    pub(crate) fn raw_receiver(&self) -> broadcast::Receiver<BusMessage> {
        self.tx.subscribe()
    }

    pub(crate) fn register_client(&self, addr: SocketAddr) -> u64 {
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        self.clients.insert(
            id,
            ConnectedClient {
                id,
                addr,
                patterns: Vec::new(),
            },
        );
        id
    }

    pub(crate) fn set_client_patterns(&self, id: u64, patterns: Vec<String>) {
        if let Some(mut client) = self.clients.get_mut(&id) {
            client.patterns = patterns;
        }
    }

    pub(crate) fn unregister_client(&self, id: u64) {
        self.clients.remove(&id);
    }

    /// 获取已连接客户端列表
    pub fn connected_clients(&self) -> Vec<ConnectedClient> {
        self.clients.iter().map(|e| e.value().clone()).collect()
    }

    /// 获取关闭令牌 (用于监控关闭信号)
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown_token
    }

    /// 优雅关闭消息总线
    ///
    /// 取消所有运行中的任务，包括 TCP 服务器
    pub fn shutdown(&self) {
        tracing::info!("Shutting down message bus");
        self.shutdown_token.cancel();
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for MessageBus {
    async fn publish(&self, msg: BusMessage) -> Result<(), PublishError> {
        self.send(msg)
    }
}

/// Filtered receiver
pub struct Subscription {
    filter: TopicFilter,
    rx: broadcast::Receiver<BusMessage>,
}

impl Subscription {
    pub fn filter(&self) -> &TopicFilter {
        &self.filter
    }

    /// 下一条匹配的消息；总线关闭后返回 `None`
    ///
    /// 接收端落后 (lagged) 时记录告警并继续，被覆盖的消息丢失。
    pub async fn recv(&mut self) -> Option<BusMessage> {
        loop {
            match self.rx.recv().await {
                Ok(msg) if self.filter.matches(&msg.topic) => return Some(msg),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(pattern = %self.filter, dropped_messages = n, "Subscriber lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant (tests, draining)
    pub fn try_recv(&mut self) -> Option<BusMessage> {
        loop {
            match self.rx.try_recv() {
                Ok(msg) if self.filter.matches(&msg.topic) => return Some(msg),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(pattern = %self.filter, dropped_messages = n, "Subscriber lagged behind");
                }
                Err(_) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn msg(topic: &str) -> BusMessage {
        BusMessage::new(topic, &json!({"tableId": 1, "ts": 1})).unwrap()
    }

    #[tokio::test]
    async fn test_subscription_filters_topics() {
        let bus = MessageBus::new();
        let mut ready = bus.subscribe("stores/s1/tables/+/ready").unwrap();
        let mut everything = bus.subscribe("stores/s1/#").unwrap();

        bus.publish(msg("stores/s1/printing")).await.unwrap();
        bus.publish(msg("stores/s1/tables/3/ready")).await.unwrap();

        assert_eq!(ready.recv().await.unwrap().topic, "stores/s1/tables/3/ready");
        assert!(ready.try_recv().is_none());
        assert_eq!(everything.recv().await.unwrap().topic, "stores/s1/printing");
        assert_eq!(
            everything.recv().await.unwrap().topic,
            "stores/s1/tables/3/ready"
        );
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = MessageBus::new();
        assert!(bus.publish(msg("stores/s1/printing")).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejects_bad_topics_and_patterns() {
        let bus = MessageBus::new();
        assert!(bus.subscribe("stores/s+/printing").is_err());

        let raw = BusMessage {
            topic: "stores/+/printing".into(),
            payload: json!({}),
            ts: 1,
        };
        assert!(matches!(
            bus.publish(raw).await,
            Err(PublishError::InvalidTopic(_))
        ));
    }

    #[tokio::test]
    async fn test_lagged_subscriber_keeps_receiving() {
        let bus = MessageBus::with_capacity(2);
        let mut sub = bus.subscribe("#").unwrap();
        for i in 0..5 {
            bus.publish(msg(&format!("stores/s1/tables/{i}/ready")))
                .await
                .unwrap();
        }
        // 前 3 条被覆盖，剩余 2 条仍可收到
        assert_eq!(sub.recv().await.unwrap().topic, "stores/s1/tables/3/ready");
        assert_eq!(sub.recv().await.unwrap().topic, "stores/s1/tables/4/ready");
    }

    #[tokio::test]
    async fn test_subscribe_with_and_shutdown() {
        let bus = MessageBus::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = bus
            .subscribe_with("stores/s1/menu/updated", move |m| {
                let tx = tx.clone();
                async move {
                    let _ = tx.send(m.topic);
                }
            })
            .unwrap();

        bus.publish(msg("stores/s1/printing")).await.unwrap();
        bus.publish(msg("stores/s1/menu/updated")).await.unwrap();
        let got = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(got.as_deref(), Some("stores/s1/menu/updated"));

        bus.shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            bus.publish(msg("stores/s1/printing")).await,
            Err(PublishError::Closed)
        ));
    }
}
