//! 看板刷新循环
//!
//! 看板不做增量合并：每条相关的总线事件都触发一次全量重新拉取，
//! 同时按固定间隔 (默认 5 秒) 轮询，弥补断线或丢失的事件。
//! 事件触发的刷新会重置轮询计时。

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::message::Subscription;

/// 默认轮询间隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// 触发本次刷新的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// 启动后的首次拉取
    Initial,
    /// 轮询到期
    Tick,
    /// 总线事件；突发的多条事件合并为一次刷新，这里记录最后一条的主题
    Event { topic: String, coalesced: usize },
}

pub struct RefreshLoop {
    interval: Duration,
    events: Option<Subscription>,
    shutdown: CancellationToken,
}

impl RefreshLoop {
    pub fn new() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            events: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// 事件源；通常是 `BusClient::subscribe(topics.all())`
    pub fn with_events(mut self, subscription: Subscription) -> Self {
        self.events = Some(subscription);
        self
    }

    /// 取消后循环在当前刷新完成后退出
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// 运行直到取消；`fetch` 执行一次全量拉取
    pub async fn run<F, Fut>(mut self, mut fetch: F)
    where
        F: FnMut(RefreshTrigger) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // 第一次 tick 立即完成
        ticker.tick().await;
        fetch(RefreshTrigger::Initial).await;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => fetch(RefreshTrigger::Tick).await,
                msg = next_event(&mut self.events) => match msg {
                    Some(topic) => {
                        let (topic, coalesced) = drain(&mut self.events, topic);
                        fetch(RefreshTrigger::Event { topic, coalesced }).await;
                        ticker.reset();
                    }
                    None => {
                        tracing::warn!("Refresh event source closed, falling back to polling only");
                        self.events = None;
                    }
                }
            }
        }
        tracing::debug!("Refresh loop stopped");
    }

    /// 在后台任务中运行
    pub fn spawn<F, Fut>(self, fetch: F) -> JoinHandle<()>
    where
        F: FnMut(RefreshTrigger) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(self.run(fetch))
    }
}

impl Default for RefreshLoop {
    fn default() -> Self {
        Self::new()
    }
}

async fn next_event(events: &mut Option<Subscription>) -> Option<String> {
    match events {
        Some(sub) => sub.recv().await.map(|msg| msg.topic),
        None => std::future::pending().await,
    }
}

/// 合并已经排队的事件
fn drain(events: &mut Option<Subscription>, first: String) -> (String, usize) {
    let mut last = first;
    let mut count = 1;
    if let Some(sub) = events {
        while let Some(msg) = sub.try_recv() {
            last = msg.topic;
            count += 1;
        }
    }
    (last, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use shared::message::{BusMessage, TopicFilter};
    use std::sync::Arc;
    use tokio::sync::broadcast;

    type Log = Arc<Mutex<Vec<RefreshTrigger>>>;

    fn start(refresh: RefreshLoop) -> (Log, CancellationToken, JoinHandle<()>) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let token = refresh.shutdown_token();
        let sink = log.clone();
        let handle = refresh.spawn(move |trigger| {
            let sink = sink.clone();
            async move {
                sink.lock().push(trigger);
            }
        });
        (log, token, handle)
    }

    fn events(pattern: &str) -> (broadcast::Sender<BusMessage>, Subscription) {
        let (tx, rx) = broadcast::channel(16);
        (tx, Subscription::new(TopicFilter::parse(pattern).unwrap(), rx))
    }

    fn msg(topic: &str) -> BusMessage {
        BusMessage::new(topic, &json!({"orderId": 1, "ts": 1})).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval() {
        let (log, token, handle) = start(RefreshLoop::new());

        tokio::time::sleep(Duration::from_millis(11_000)).await;
        assert_eq!(
            *log.lock(),
            vec![
                RefreshTrigger::Initial,
                RefreshTrigger::Tick,
                RefreshTrigger::Tick
            ]
        );

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_triggers_full_refetch() {
        let (tx, sub) = events("stores/s1/#");
        let (log, token, handle) = start(RefreshLoop::new().with_events(sub));

        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.send(msg("stores/s1/orders/changed")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        // other stores are filtered out
        tx.send(msg("stores/s2/orders/changed")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(
            *log.lock(),
            vec![
                RefreshTrigger::Initial,
                RefreshTrigger::Event {
                    topic: "stores/s1/orders/changed".into(),
                    coalesced: 1
                }
            ]
        );

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_is_coalesced() {
        let (tx, sub) = events("stores/s1/#");
        let (log, token, handle) = start(RefreshLoop::new().with_events(sub));
        tokio::time::sleep(Duration::from_millis(10)).await;

        tx.send(msg("stores/s1/printing")).unwrap();
        tx.send(msg("stores/s1/orders/changed")).unwrap();
        tx.send(msg("stores/s1/tables/3/queue")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let log = log.lock().clone();
        assert_eq!(log.len(), 2);
        assert_eq!(
            log[1],
            RefreshTrigger::Event {
                topic: "stores/s1/tables/3/queue".into(),
                coalesced: 3
            }
        );

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_resets_poll_timer() {
        let (tx, sub) = events("stores/s1/#");
        let (log, token, handle) = start(RefreshLoop::new().with_events(sub));

        tokio::time::sleep(Duration::from_secs(3)).await;
        tx.send(msg("stores/s1/orders/changed")).unwrap();

        // 下一次轮询在 t = 3 + 5 = 8 秒
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(log.lock().len(), 2);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(log.lock().len(), 3);
        assert_eq!(log.lock()[2], RefreshTrigger::Tick);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_source_falls_back_to_polling() {
        let (tx, sub) = events("stores/s1/#");
        let (log, token, handle) = start(RefreshLoop::new().with_events(sub));
        drop(tx);

        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(
            *log.lock(),
            vec![RefreshTrigger::Initial, RefreshTrigger::Tick]
        );

        token.cancel();
        handle.await.unwrap();
    }
}
