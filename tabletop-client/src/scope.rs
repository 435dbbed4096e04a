//! 服务员作用域
//!
//! 路由表不过滤总线投递：每个服务员终端都会收到整个门店的事件，
//! 再用 [`WaiterScope`] 判断哪些桌台事件需要自己处理。

use std::collections::BTreeSet;

use shared::message::parse_table_topic;

/// The set of tables one waiter is responsible for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaiterScope {
    tables: BTreeSet<i64>,
}

impl WaiterScope {
    pub fn new(tables: impl IntoIterator<Item = i64>) -> Self {
        Self {
            tables: tables.into_iter().collect(),
        }
    }

    pub fn tables(&self) -> &BTreeSet<i64> {
        &self.tables
    }

    pub fn contains(&self, table_id: i64) -> bool {
        self.tables.contains(&table_id)
    }

    /// 刷新负责的桌台 (分配变化后重新拉取 `/api/waiters/{id}/tables`)
    pub fn replace(&mut self, tables: impl IntoIterator<Item = i64>) {
        self.tables = tables.into_iter().collect();
    }

    /// 门店级主题总是需要处理；桌台主题只处理自己负责的桌台
    pub fn is_actionable(&self, topic: &str) -> bool {
        match parse_table_topic(topic) {
            Some(table) => self.contains(table.table_id),
            None => true,
        }
    }
}
