//! 每桌呼叫状态
//!
//! 状态只来自订阅到的总线事件。中途加入的终端看到的所有桌台都是 `Idle`，
//! 直到下一条呼叫事件到达。

use std::collections::HashMap;

use shared::message::{BusMessage, CallEvent, CallState};

#[derive(Debug, Clone, Default)]
pub struct CallTracker {
    states: HashMap<i64, CallState>,
}

impl CallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 未见过的桌台为 `Idle`
    pub fn state(&self, table_id: i64) -> CallState {
        self.states.get(&table_id).copied().unwrap_or_default()
    }

    /// 应用一条总线消息；非呼叫主题返回 `None`
    pub fn apply(&mut self, msg: &BusMessage) -> Option<(i64, CallState)> {
        let (table_id, event) = CallEvent::from_topic(&msg.topic)?;
        Some((table_id, self.apply_event(table_id, event)))
    }

    pub fn apply_event(&mut self, table_id: i64, event: CallEvent) -> CallState {
        let next = self.state(table_id).apply(event);
        if next == CallState::Idle {
            self.states.remove(&table_id);
        } else {
            self.states.insert(table_id, next);
        }
        next
    }

    /// 仍在等待服务员响应的桌台 (升序)
    pub fn pending_tables(&self) -> Vec<i64> {
        let mut tables: Vec<i64> = self
            .states
            .iter()
            .filter(|(_, s)| **s == CallState::Pending)
            .map(|(t, _)| *t)
            .collect();
        tables.sort_unstable();
        tables
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::message::{CallPayload, Topics};

    fn call_msg(topic: String, table_id: i64) -> BusMessage {
        BusMessage::new(
            topic,
            &CallPayload {
                table_id,
                waiter_id: None,
                ts: 1,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_fresh_tracker_is_idle() {
        let tracker = CallTracker::new();
        assert_eq!(tracker.state(9), CallState::Idle);
        assert!(tracker.pending_tables().is_empty());
    }

    #[test]
    fn test_follows_bus_events() {
        let topics = Topics::new("s1");
        let mut tracker = CallTracker::new();

        assert_eq!(
            tracker.apply(&call_msg(topics.table_call(4), 4)),
            Some((4, CallState::Pending))
        );
        tracker.apply(&call_msg(topics.table_call(2), 2));
        assert_eq!(tracker.pending_tables(), vec![2, 4]);

        tracker.apply(&call_msg(topics.table_call_accepted(4), 4));
        assert_eq!(tracker.state(4), CallState::Accepted);
        assert_eq!(tracker.pending_tables(), vec![2]);

        tracker.apply(&call_msg(topics.table_call_cleared(4), 4));
        assert_eq!(tracker.state(4), CallState::Idle);
    }

    #[test]
    fn test_ignores_other_topics() {
        let topics = Topics::new("s1");
        let mut tracker = CallTracker::new();
        assert_eq!(tracker.apply(&call_msg(topics.table_ready(4), 4)), None);
        assert_eq!(tracker.apply(&call_msg(topics.printing(), 4)), None);
        assert_eq!(tracker.state(4), CallState::Idle);
    }

    #[test]
    fn test_accept_without_call_stays_idle() {
        let mut tracker = CallTracker::new();
        assert_eq!(tracker.apply_event(1, CallEvent::Accepted), CallState::Idle);
    }
}
