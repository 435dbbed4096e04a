//! 总线客户端
//!
//! ```text
//! BusClient ──publish──▶ outbound mpsc ──▶ writer ──▶ TCP ──▶ MessageBus
//!     ▲                                                          │
//!     └── events (broadcast) ◀── reader ◀── Message 帧 ◀─────────┘
//! ```
//!
//! - 断线期间发布直接丢弃并返回 `PublishError::Disconnected`，不排队
//! - 重连成功后重新发送所有已登记的订阅模式
//! - 重连间隔固定，次数有上限，用尽后进入 `Failed`

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::message::{
    BusMessage, Frame, FrameError, PublishError, Publisher, TopicFilter, read_frame,
    validate_topic, write_frame,
};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::ConnectionState;
use crate::config::BusClientConfig;
use crate::error::{ClientError, ClientResult};

/// 待写出的帧上限 (订阅模式另外预留)
const OUTBOUND_CAPACITY: usize = 256;

#[derive(Default)]
struct Link {
    /// 已登记的订阅模式，重连时按序重发
    patterns: Vec<String>,
    /// 当前连接的写队列；断线时为 `None`
    outbound: Option<mpsc::Sender<Frame>>,
}

struct Inner {
    config: BusClientConfig,
    link: Mutex<Link>,
    events: broadcast::Sender<BusMessage>,
    state: watch::Sender<ConnectionState>,
    shutdown: CancellationToken,
}

struct Session {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
    outbound: mpsc::Receiver<Frame>,
}

impl Inner {
    /// 安装新连接；在同一把锁内排入订阅帧，保证不会漏掉并发的 subscribe
    fn attach(&self, stream: TcpStream) -> Session {
        let _ = stream.set_nodelay(true);
        let (reader, writer) = stream.into_split();

        let mut link = self.link.lock();
        let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY + link.patterns.len());
        for pattern in &link.patterns {
            let _ = tx.try_send(Frame::Subscribe(pattern.clone()));
        }
        link.outbound = Some(tx);
        drop(link);

        self.state.send_replace(ConnectionState::Connected);
        Session {
            reader,
            writer,
            outbound: rx,
        }
    }

    fn detach(&self) {
        self.link.lock().outbound = None;
    }
}

/// Reconnecting client for the server's TCP bus endpoint
#[derive(Clone)]
pub struct BusClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusClient")
            .field("addr", &self.inner.config.addr)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

impl BusClient {
    /// 连接总线；首次连接失败时按同样的固定间隔重试
    pub async fn connect(config: BusClientConfig) -> ClientResult<Self> {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let (state, _) = watch::channel(ConnectionState::Connecting);
        let inner = Arc::new(Inner {
            config,
            link: Mutex::new(Link::default()),
            events,
            state,
            shutdown: CancellationToken::new(),
        });

        let stream = match open(&inner.config).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!(addr = %inner.config.addr, error = %e, "Initial bus connection failed, retrying");
                match reconnect(&inner).await {
                    Some(stream) => stream,
                    None => {
                        inner.state.send_replace(ConnectionState::Failed);
                        return Err(ClientError::Connection(format!(
                            "{} unreachable after {} attempts",
                            inner.config.addr,
                            inner.config.max_reconnect_attempts + 1
                        )));
                    }
                }
            }
        };

        tracing::info!(addr = %inner.config.addr, "Connected to message bus");
        let session = inner.attach(stream);
        tokio::spawn(drive(inner.clone(), session));

        Ok(Self { inner })
    }

    /// 发布消息 (不等待)；断线时返回 `Disconnected`
    pub fn send(&self, msg: BusMessage) -> Result<(), PublishError> {
        validate_topic(&msg.topic)?;
        if self.inner.shutdown.is_cancelled() {
            return Err(PublishError::Closed);
        }

        let link = self.inner.link.lock();
        let Some(tx) = link.outbound.as_ref() else {
            tracing::debug!(topic = %msg.topic, "Bus disconnected, publish dropped");
            return Err(PublishError::Disconnected);
        };
        match tx.try_send(Frame::Publish(msg)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PublishError::Disconnected),
            Err(mpsc::error::TrySendError::Full(_)) => {
                Err(PublishError::Io("outbound queue full".to_string()))
            }
        }
    }

    /// 订阅匹配 `pattern` 的消息，模式会在重连后自动重发
    pub fn subscribe(&self, pattern: &str) -> ClientResult<Subscription> {
        let filter = TopicFilter::parse(pattern)?;
        let rx = self.inner.events.subscribe();
        self.register(filter.as_str());
        Ok(Subscription { filter, rx })
    }

    /// 订阅并在后台任务中处理消息，客户端关闭时任务退出
    pub fn subscribe_with<F, Fut>(&self, pattern: &str, handler: F) -> ClientResult<JoinHandle<()>>
    where
        F: Fn(BusMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut subscription = self.subscribe(pattern)?;
        let shutdown = self.inner.shutdown.clone();

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
            tracing::debug!(pattern = %subscription.filter, "Bus client handler stopped");
        }))
    }

    /// 取消服务端转发；本地已有的 `Subscription` 不再收到该模式独有的消息
    pub fn unsubscribe(&self, pattern: &str) {
        let mut link = self.inner.link.lock();
        let before = link.patterns.len();
        link.patterns.retain(|p| p != pattern);
        if link.patterns.len() == before {
            return;
        }
        if let Some(tx) = &link.outbound {
            let _ = tx.try_send(Frame::Unsubscribe(pattern.to_string()));
        }
    }

    fn register(&self, pattern: &str) {
        let mut link = self.inner.link.lock();
        if link.patterns.iter().any(|p| p == pattern) {
            return;
        }
        link.patterns.push(pattern.to_string());
        if let Some(tx) = &link.outbound
            && tx.try_send(Frame::Subscribe(pattern.to_string())).is_err()
        {
            tracing::warn!(pattern, "Subscribe frame not queued; it will be sent on reconnect");
        }
    }

    /// 所有收到的消息 (不过滤)
    pub fn events(&self) -> broadcast::Receiver<BusMessage> {
        self.inner.events.subscribe()
    }

    /// 当前已登记的订阅模式
    pub fn patterns(&self) -> Vec<String> {
        self.inner.link.lock().patterns.clone()
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// 监听连接状态变化
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// 关闭连接并停止重连
    pub fn shutdown(&self) {
        tracing::info!(addr = %self.inner.config.addr, "Closing message bus client");
        self.inner.shutdown.cancel();
        self.inner.detach();
        self.inner.state.send_replace(ConnectionState::Closed);
    }
}

#[async_trait]
impl Publisher for BusClient {
    async fn publish(&self, msg: BusMessage) -> Result<(), PublishError> {
        self.send(msg)
    }
}

/// 连接生命周期：会话结束后重连，直到关闭或次数用尽
async fn drive(inner: Arc<Inner>, mut session: Session) {
    loop {
        run_session(&inner, session).await;
        inner.detach();
        if inner.shutdown.is_cancelled() {
            break;
        }

        tracing::warn!(addr = %inner.config.addr, "Message bus connection lost");
        match reconnect(&inner).await {
            Some(stream) => {
                tracing::info!(addr = %inner.config.addr, "Reconnected to message bus");
                session = inner.attach(stream);
            }
            None => break,
        }
    }

    if inner.shutdown.is_cancelled() {
        inner.state.send_replace(ConnectionState::Closed);
    } else {
        tracing::error!(
            addr = %inner.config.addr,
            attempts = inner.config.max_reconnect_attempts,
            "Message bus reconnect attempts exhausted"
        );
        inner.state.send_replace(ConnectionState::Failed);
    }
}

async fn run_session(inner: &Inner, session: Session) {
    let Session {
        mut reader,
        mut writer,
        mut outbound,
    } = session;

    let write_loop = async {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = write_frame(&mut writer, &frame).await {
                tracing::debug!(error = %e, "Bus write failed");
                break;
            }
        }
    };

    let read_loop = async {
        loop {
            match read_frame(&mut reader).await {
                Ok(Frame::Message(msg)) => {
                    let _ = inner.events.send(msg);
                }
                Ok(other) => {
                    tracing::debug!(kind = ?other.kind(), "Ignoring unexpected frame from server");
                }
                Err(FrameError::Disconnected) => {
                    tracing::debug!("Server closed the bus connection");
                    break;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Bus read failed");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = inner.shutdown.cancelled() => {}
        _ = write_loop => {}
        _ = read_loop => {}
    }
}

/// 固定间隔重连，最多 `max_reconnect_attempts` 次；关闭时返回 `None`
async fn reconnect(inner: &Inner) -> Option<TcpStream> {
    let max = inner.config.max_reconnect_attempts;
    for attempt in 1..=max {
        inner
            .state
            .send_replace(ConnectionState::Reconnecting { attempt });

        tokio::select! {
            _ = inner.shutdown.cancelled() => return None,
            _ = tokio::time::sleep(inner.config.reconnect_interval) => {}
        }

        match open(&inner.config).await {
            Ok(stream) => return Some(stream),
            Err(e) => {
                tracing::warn!(attempt, max, error = %e, "Bus reconnect attempt failed");
            }
        }
    }
    None
}

async fn open(config: &BusClientConfig) -> std::io::Result<TcpStream> {
    match tokio::time::timeout(config.connect_timeout, TcpStream::connect(&config.addr)).await {
        Ok(result) => result,
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "connect timed out",
        )),
    }
}

/// Filtered receiver over the client's incoming messages
pub struct Subscription {
    filter: TopicFilter,
    rx: broadcast::Receiver<BusMessage>,
}

impl Subscription {
    /// 基于任意广播源构造 (进程内事件源、测试)
    pub fn new(filter: TopicFilter, rx: broadcast::Receiver<BusMessage>) -> Self {
        Self { filter, rx }
    }

    pub fn filter(&self) -> &TopicFilter {
        &self.filter
    }

    /// 下一条匹配的消息；客户端释放后返回 `None`
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

    /// Non-blocking variant, used to coalesce bursts
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
