//! 主题命名与通配符匹配
//!
//! 所有主题都以门店为作用域：
//!
//! ```text
//! stores/{storeId}/printing                          新订单 → 厨房
//! stores/{storeId}/orders/changed                    任意订单变化 → 看板刷新
//! stores/{storeId}/menu/updated                      菜单变化 → 菜单缓存失效
//! stores/{storeId}/tables/{tableId}/ready            订单出餐 → 顾客/服务员
//! stores/{storeId}/tables/{tableId}/queue            排队位置重算
//! stores/{storeId}/tables/{tableId}/call             呼叫服务员
//! stores/{storeId}/tables/{tableId}/call/accepted
//! stores/{storeId}/tables/{tableId}/call/cleared
//! ```
//!
//! 订阅模式支持 `+` (单层) 与 `#` (多层，只能位于末尾，同时匹配父层)。

use std::fmt;
use thiserror::Error;

pub const SINGLE_LEVEL: &str = "+";
pub const MULTI_LEVEL: &str = "#";

/// Topic / filter parse errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    #[error("topic must not be empty")]
    Empty,

    #[error("wildcards are not allowed in a published topic: {0}")]
    WildcardInTopic(String),

    #[error("wildcard must occupy a whole level: {0}")]
    PartialWildcard(String),

    #[error("multi-level wildcard must be the last level: {0}")]
    MultiLevelNotLast(String),
}

/// Validate a concrete (publishable) topic
pub fn validate_topic(topic: &str) -> Result<(), TopicError> {
    if topic.is_empty() {
        return Err(TopicError::Empty);
    }
    if topic.contains(['+', '#']) {
        return Err(TopicError::WildcardInTopic(topic.to_string()));
    }
    Ok(())
}

/// Store-scoped topic builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    store_id: String,
}

impl Topics {
    pub fn new(store_id: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
        }
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    fn store(&self, suffix: &str) -> String {
        format!("stores/{}/{}", self.store_id, suffix)
    }

    fn table(&self, table_id: i64, suffix: &str) -> String {
        format!("stores/{}/tables/{}/{}", self.store_id, table_id, suffix)
    }

    pub fn printing(&self) -> String {
        self.store("printing")
    }

    pub fn orders_changed(&self) -> String {
        self.store("orders/changed")
    }

    pub fn menu_updated(&self) -> String {
        self.store("menu/updated")
    }

    pub fn table_ready(&self, table_id: i64) -> String {
        self.table(table_id, "ready")
    }

    pub fn table_queue(&self, table_id: i64) -> String {
        self.table(table_id, "queue")
    }

    pub fn table_call(&self, table_id: i64) -> String {
        self.table(table_id, "call")
    }

    pub fn table_call_accepted(&self, table_id: i64) -> String {
        self.table(table_id, "call/accepted")
    }

    pub fn table_call_cleared(&self, table_id: i64) -> String {
        self.table(table_id, "call/cleared")
    }

    /// Pattern for one table-scoped suffix across every table, e.g. `stores/s1/tables/+/ready`
    pub fn any_table(&self, suffix: &str) -> String {
        self.table_pattern(SINGLE_LEVEL, suffix)
    }

    /// Everything under one table, e.g. `stores/s1/tables/7/#`
    pub fn table_all(&self, table_id: i64) -> String {
        self.table(table_id, MULTI_LEVEL)
    }

    /// Everything in the store
    pub fn all(&self) -> String {
        self.store(MULTI_LEVEL)
    }

    fn table_pattern(&self, table: &str, suffix: &str) -> String {
        format!("stores/{}/tables/{}/{}", self.store_id, table, suffix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Level {
    Exact(String),
    Single,
    Multi,
}

/// Parsed subscription pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFilter {
    pattern: String,
    levels: Vec<Level>,
}

impl TopicFilter {
    pub fn parse(pattern: &str) -> Result<Self, TopicError> {
        if pattern.is_empty() {
            return Err(TopicError::Empty);
        }

        let raw: Vec<&str> = pattern.split('/').collect();
        let mut levels = Vec::with_capacity(raw.len());
        for (idx, level) in raw.iter().enumerate() {
            let parsed = match *level {
                SINGLE_LEVEL => Level::Single,
                MULTI_LEVEL => {
                    if idx != raw.len() - 1 {
                        return Err(TopicError::MultiLevelNotLast(pattern.to_string()));
                    }
                    Level::Multi
                }
                other if other.contains(['+', '#']) => {
                    return Err(TopicError::PartialWildcard(pattern.to_string()));
                }
                other => Level::Exact(other.to_string()),
            };
            levels.push(parsed);
        }

        Ok(Self {
            pattern: pattern.to_string(),
            levels,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, topic: &str) -> bool {
        let mut topic_levels = topic.split('/');
        for level in &self.levels {
            match level {
                Level::Multi => return true,
                Level::Single => {
                    if topic_levels.next().is_none() {
                        return false;
                    }
                }
                Level::Exact(expected) => match topic_levels.next() {
                    Some(actual) if actual == expected => {}
                    _ => return false,
                },
            }
        }
        topic_levels.next().is_none()
    }
}

impl fmt::Display for TopicFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// A topic under `stores/{storeId}/tables/{tableId}/...`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableTopic<'a> {
    pub store_id: &'a str,
    pub table_id: i64,
    /// Remaining levels after the table id, e.g. `call/accepted`
    pub rest: &'a str,
}

/// Extract the table id from a table-scoped topic
pub fn parse_table_topic(topic: &str) -> Option<TableTopic<'_>> {
    let mut parts = topic.splitn(5, '/');
    if parts.next()? != "stores" {
        return None;
    }
    let store_id = parts.next()?;
    if parts.next()? != "tables" {
        return None;
    }
    let table_id = parts.next()?.parse().ok()?;
    let rest = parts.next().unwrap_or("");
    Some(TableTopic {
        store_id,
        table_id,
        rest,
    })
}
