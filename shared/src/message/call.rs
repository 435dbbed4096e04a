//! 呼叫服务员信号
//!
//! 每张桌台一个三态信号 `idle → pending → accepted → idle`，只存在于总线消息中，
//! 不做持久化。中途加入的客户端无法恢复真实状态，从 `Idle` 开始，等待下一条事件。

use serde::{Deserialize, Serialize};

use super::topic::parse_table_topic;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    #[default]
    Idle,
    Pending,
    Accepted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallEvent {
    Call,
    Accepted,
    Cleared,
}

impl CallEvent {
    /// Topic suffix after `tables/{tableId}/`
    pub const fn suffix(&self) -> &'static str {
        match self {
            CallEvent::Call => "call",
            CallEvent::Accepted => "call/accepted",
            CallEvent::Cleared => "call/cleared",
        }
    }

    /// Decode `(tableId, event)` from a call topic
    pub fn from_topic(topic: &str) -> Option<(i64, CallEvent)> {
        let parsed = parse_table_topic(topic)?;
        let event = match parsed.rest {
            "call" => CallEvent::Call,
            "call/accepted" => CallEvent::Accepted,
            "call/cleared" => CallEvent::Cleared,
            _ => return None,
        };
        Some((parsed.table_id, event))
    }
}

impl CallState {
    /// Reduce one event into the next state
    pub fn apply(self, event: CallEvent) -> CallState {
        match (self, event) {
            (_, CallEvent::Call) => CallState::Pending,
            (CallState::Pending, CallEvent::Accepted) => CallState::Accepted,
            // accepted without a visible pending call: keep what we know
            (state, CallEvent::Accepted) => state,
            (_, CallEvent::Cleared) => CallState::Idle,
        }
    }
}
