//! TCP 服务器实现
//!
//! 负责处理远程客户端连接 (看板、服务员终端)：
//! - 监听连接
//! - 按连接维护订阅模式 (Subscribe / Unsubscribe 帧)
//! - 将匹配的总线消息以 Message 帧转发给客户端
//! - 将客户端的 Publish 帧重新发布到总线，仅限本门店的 call/accepted 与 call/cleared

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use shared::message::{
    BusMessage, Frame, FrameError, TopicFilter, parse_table_topic, read_frame, write_frame,
};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::bus::MessageBus;
use crate::security_log;
use crate::utils::AppError;

type Patterns = Arc<RwLock<Vec<TopicFilter>>>;

impl MessageBus {
    /// Bind the configured TCP address
    pub async fn bind_tcp(&self) -> Result<TcpListener, AppError> {
        let listener = TcpListener::bind(&self.config.tcp_listen_addr)
            .await
            .map_err(|e| {
                AppError::internal(format!(
                    "Failed to bind {}: {}",
                    self.config.tcp_listen_addr, e
                ))
            })?;
        Ok(listener)
    }

    /// Start TCP server (for network clients)
    pub async fn start_tcp_server(&self) -> Result<(), AppError> {
        let listener = self.bind_tcp().await?;
        self.serve_tcp(listener).await
    }

    /// Main accept loop, returns on bus shutdown
    pub async fn serve_tcp(&self, listener: TcpListener) -> Result<(), AppError> {
        match listener.local_addr() {
            Ok(addr) => tracing::info!("Message bus TCP server listening on {}", addr),
            Err(_) => tracing::info!("Message bus TCP server listening"),
        }

        loop {
            tokio::select! {
                _ = self.shutdown_token().cancelled() => {
                    tracing::info!("Message bus TCP server shutting down");
                    break;
                }

                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            tracing::debug!("Client connected: {}", addr);
                            self.spawn_client_handler(stream, addr);
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Spawn a new task to handle client connection
    fn spawn_client_handler(&self, stream: TcpStream, addr: SocketAddr) {
        let bus = self.clone();
        tokio::spawn(async move {
            handle_client_connection(stream, addr, bus).await;
        });
    }
}

/// Handle a single client connection
async fn handle_client_connection(stream: TcpStream, addr: SocketAddr, bus: MessageBus) {
    let _ = stream.set_nodelay(true);
    let (reader, writer) = stream.into_split();
    let client_id = bus.register_client(addr);
    let patterns: Patterns = Arc::new(RwLock::new(Vec::new()));

    // 断开检测：读端出错时取消，forwarder 随之停止
    let disconnect_token = CancellationToken::new();

    // 先订阅再开始读帧，保证 Subscribe 之后发布的消息不会丢
    let forward_handle = tokio::spawn(forward_to_client(
        writer,
        bus.raw_receiver(),
        patterns.clone(),
        bus.shutdown_token().clone(),
        disconnect_token.clone(),
        client_id,
    ));

    read_client_frames(reader, &bus, &patterns, client_id, addr).await;

    disconnect_token.cancel();
    let _ = forward_handle.await;
    bus.unregister_client(client_id);
    tracing::debug!(client_id, "Client removed from registry");
}

/// Forward matching bus messages to the client
async fn forward_to_client(
    mut writer: OwnedWriteHalf,
    mut rx: broadcast::Receiver<BusMessage>,
    patterns: Patterns,
    shutdown_token: CancellationToken,
    disconnect_token: CancellationToken,
    client_id: u64,
) {
    loop {
        tokio::select! {
            _ = shutdown_token.cancelled() => {
                tracing::debug!(client_id, "Client forwarder shutting down");
                break;
            }
            _ = disconnect_token.cancelled() => {
                tracing::debug!(client_id, "Client disconnected, forwarder stopping");
                break;
            }
            msg_result = rx.recv() => {
                match msg_result {
                    Ok(msg) => {
                        let wanted = patterns.read().iter().any(|f| f.matches(&msg.topic));
                        if !wanted {
                            continue;
                        }
                        if let Err(e) = write_frame(&mut writer, &Frame::Message(msg)).await {
                            tracing::debug!(client_id, "Client write failed: {}", e);
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // 客户端会在下一次轮询时全量刷新
                        tracing::warn!(client_id, dropped_messages = n, "Client lagged behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::debug!(client_id, "Broadcast channel closed");
                        break;
                    }
                }
            }
        }
    }
    tracing::debug!(client_id, "Client forwarder stopped");
}

/// Read frames from the client until it disconnects or the bus shuts down
async fn read_client_frames(
    mut reader: OwnedReadHalf,
    bus: &MessageBus,
    patterns: &Patterns,
    client_id: u64,
    addr: SocketAddr,
) {
    loop {
        let frame = tokio::select! {
            _ = bus.shutdown_token().cancelled() => break,
            frame = read_frame(&mut reader) => frame,
        };

        match frame {
            Ok(Frame::Subscribe(pattern)) => match TopicFilter::parse(&pattern) {
                Ok(filter) => {
                    let mut guard = patterns.write();
                    if !guard.contains(&filter) {
                        tracing::debug!(client_id, pattern = %filter, "Client subscribed");
                        guard.push(filter);
                        bus.set_client_patterns(client_id, pattern_list(&guard));
                    }
                }
                Err(e) => {
                    tracing::warn!(client_id, pattern = %pattern, error = %e, "Client sent invalid subscription pattern");
                }
            },
            Ok(Frame::Unsubscribe(pattern)) => {
                let mut guard = patterns.write();
                guard.retain(|f| f.as_str() != pattern);
                bus.set_client_patterns(client_id, pattern_list(&guard));
                drop(guard);
                tracing::debug!(client_id, pattern = %pattern, "Client unsubscribed");
            }
            Ok(Frame::Publish(msg)) => {
                if !client_may_publish(&bus.config.store_id, &msg.topic) {
                    security_log!(
                        "WARN",
                        "bus_publish_rejected",
                        client_id = client_id,
                        addr = addr.to_string(),
                        topic = msg.topic.as_str()
                    );
                    continue;
                }
                let topic = msg.topic.clone();
                if let Err(e) = bus.send(msg) {
                    tracing::warn!(client_id, topic = %topic, error = %e, "Failed to publish client message");
                }
            }
            Ok(Frame::Message(_)) => {
                tracing::debug!(client_id, "Ignoring Message frame sent by client");
            }
            Err(FrameError::Disconnected) => {
                tracing::debug!(client_id, "Client {} disconnected", addr);
                break;
            }
            Err(e) => {
                tracing::debug!(client_id, "Client {} read error: {}", addr, e);
                break;
            }
        }
    }
}

/// 终端经 TCP 只能应答呼叫；订单事件只由服务端自己发布
fn client_may_publish(store_id: &str, topic: &str) -> bool {
    parse_table_topic(topic).is_some_and(|t| {
        t.store_id == store_id && matches!(t.rest, "call/accepted" | "call/cleared")
    })
}

fn pattern_list(filters: &[TopicFilter]) -> Vec<String> {
    filters.iter().map(|f| f.as_str().to_string()).collect()
}
