//! Call-Waiter Signal Channel
//!
//! 顾客呼叫服务员：`call` → `call/accepted` → `call/cleared`。
//! 信号只存在于总线上，不写数据库；服务端只负责校验桌台并发布。

use std::sync::Arc;

use shared::error::{AppError, ErrorCode};
use shared::message::{CallEvent, CallPayload};
use shared::util::now_millis;
use shared::{BusMessage, Publisher, Topics};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::repository::{RepoError, dining_table};

#[derive(Debug, Error)]
pub enum CallError {
    #[error("Table not found: {0}")]
    TableNotFound(i64),

    #[error("Table {0} is inactive")]
    TableInactive(i64),

    #[error("Storage error: {0}")]
    Storage(#[from] RepoError),
}

pub type CallResult<T> = Result<T, CallError>;

impl From<CallError> for AppError {
    fn from(err: CallError) -> Self {
        let message = err.to_string();
        match err {
            CallError::TableNotFound(id) => {
                AppError::with_message(ErrorCode::TableNotFound, message).with_detail("tableId", id)
            }
            CallError::TableInactive(id) => {
                AppError::with_message(ErrorCode::TableInactive, message).with_detail("tableId", id)
            }
            CallError::Storage(e) => e.into(),
        }
    }
}

#[derive(Clone)]
pub struct CallChannel {
    pool: SqlitePool,
    publisher: Arc<dyn Publisher>,
    topics: Topics,
}

impl CallChannel {
    pub fn new(pool: SqlitePool, publisher: Arc<dyn Publisher>, topics: Topics) -> Self {
        Self {
            pool,
            publisher,
            topics,
        }
    }

    /// Customer asks for a waiter; the table must exist and be active
    pub async fn call(&self, table_id: i64) -> CallResult<()> {
        let table = dining_table::find_by_id(&self.pool, table_id)
            .await?
            .ok_or(CallError::TableNotFound(table_id))?;
        if !table.is_active {
            return Err(CallError::TableInactive(table_id));
        }
        self.emit(table_id, CallEvent::Call, None).await;
        Ok(())
    }

    pub async fn accept(&self, table_id: i64, waiter_id: i64) -> CallResult<()> {
        self.ensure_table(table_id).await?;
        self.emit(table_id, CallEvent::Accepted, Some(waiter_id))
            .await;
        Ok(())
    }

    pub async fn clear(&self, table_id: i64, waiter_id: Option<i64>) -> CallResult<()> {
        self.ensure_table(table_id).await?;
        self.emit(table_id, CallEvent::Cleared, waiter_id).await;
        Ok(())
    }

    async fn ensure_table(&self, table_id: i64) -> CallResult<()> {
        match dining_table::find_by_id(&self.pool, table_id).await? {
            Some(_) => Ok(()),
            None => Err(CallError::TableNotFound(table_id)),
        }
    }

    async fn emit(&self, table_id: i64, event: CallEvent, waiter_id: Option<i64>) {
        let topic = match event {
            CallEvent::Call => self.topics.table_call(table_id),
            CallEvent::Accepted => self.topics.table_call_accepted(table_id),
            CallEvent::Cleared => self.topics.table_call_cleared(table_id),
        };
        let payload = CallPayload {
            table_id,
            waiter_id,
            ts: now_millis(),
        };
        let msg = match BusMessage::new(topic.as_str(), &payload) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Failed to build call message");
                return;
            }
        };
        match self.publisher.publish(msg).await {
            Ok(()) => tracing::debug!(table_id, event = event.suffix(), "Call signal published"),
            Err(e) => tracing::warn!(topic = %topic, error = %e, "Failed to publish call signal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use shared::message::CallState;

    async fn setup() -> (CallChannel, Arc<RecordingPublisher>) {
        let pool = memory_pool().await;
        seed_table(&pool, 1, "T1", true).await;
        seed_table(&pool, 9, "T9", false).await;
        let recorder = Arc::new(RecordingPublisher::default());
        let channel = CallChannel::new(pool, recorder.clone(), topics());
        (channel, recorder)
    }

    #[tokio::test]
    async fn test_call_accept_clear_topics() {
        let (channel, recorder) = setup().await;
        channel.call(1).await.unwrap();
        channel.accept(1, 7).await.unwrap();
        channel.clear(1, Some(7)).await.unwrap();

        assert_eq!(
            recorder.topics(),
            vec![
                "stores/s1/tables/1/call",
                "stores/s1/tables/1/call/accepted",
                "stores/s1/tables/1/call/cleared",
            ]
        );

        let accepted: CallPayload = recorder.messages()[1].parse_payload().unwrap();
        assert_eq!(accepted.table_id, 1);
        assert_eq!(accepted.waiter_id, Some(7));

        // 事件序列按 reducer 折叠回 idle
        let state = recorder
            .messages()
            .iter()
            .filter_map(|m| CallEvent::from_topic(&m.topic))
            .fold(CallState::default(), |s, (_, e)| s.apply(e));
        assert_eq!(state, CallState::Idle);
    }

    #[tokio::test]
    async fn test_call_rejects_unknown_and_inactive_tables() {
        let (channel, recorder) = setup().await;
        assert!(matches!(
            channel.call(42).await,
            Err(CallError::TableNotFound(42))
        ));
        assert!(matches!(
            channel.call(9).await,
            Err(CallError::TableInactive(9))
        ));
        assert!(matches!(
            channel.accept(42, 7).await,
            Err(CallError::TableNotFound(42))
        ));
        assert!(recorder.messages().is_empty());
    }

    #[tokio::test]
    async fn test_publish_failure_is_swallowed() {
        let pool = memory_pool().await;
        seed_table(&pool, 1, "T1", true).await;
        let channel = CallChannel::new(pool, Arc::new(FailingPublisher), topics());
        channel.call(1).await.unwrap();
    }
}
