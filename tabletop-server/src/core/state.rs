use std::path::Path;
use std::sync::Arc;

use shared::{Publisher, Topics};

use crate::auth::JwtService;
use crate::calls::CallChannel;
use crate::core::{Config, ServerError};
use crate::db::DbService;
use crate::menu::MenuService;
use crate::message::{BusConfig, MessageBus};
use crate::orders::{OrderEngine, OrderNotifier};
use crate::projections::{MemoryTtlCache, Projections};
use crate::routing::RoutingTable;

/// 服务器状态 - 持有所有服务的共享引用
///
/// 所有字段都是浅拷贝 (连接池 / Arc)，每个请求 clone 一次的成本很低。
///
/// | 字段 | 说明 |
/// |------|------|
/// | config | 配置项 (不可变) |
/// | db | SQLite 连接池 |
/// | bus | 进程内消息总线 (+ TCP 端点) |
/// | engine | 订单生命周期引擎 |
/// | routing | 服务员 ↔ 桌台路由表 |
/// | projections | 看板读模型 |
/// | calls | 呼叫服务员信号 |
/// | menu | 菜品改价 / 上下架 |
/// | jwt | JWT 验证 |
#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: DbService,
    pub bus: MessageBus,
    pub engine: OrderEngine,
    pub routing: RoutingTable,
    pub projections: Projections,
    pub calls: CallChannel,
    pub menu: MenuService,
    pub jwt: Arc<JwtService>,
}

impl ServerState {
    /// Wire every service on top of an open database
    pub fn new(config: Config, db: DbService) -> Self {
        let bus = MessageBus::from_config(BusConfig {
            tcp_listen_addr: config.bus_listen_addr(),
            channel_capacity: config.bus_channel_capacity,
            store_id: config.store_id.clone(),
        });
        let publisher: Arc<dyn Publisher> = Arc::new(bus.clone());
        let topics = Topics::new(config.store_id.clone());
        let pool = db.pool.clone();

        Self {
            engine: OrderEngine::new(
                pool.clone(),
                OrderNotifier::new(publisher.clone(), topics.clone()),
            ),
            routing: RoutingTable::new(pool.clone()),
            projections: Projections::new(
                pool.clone(),
                Arc::new(MemoryTtlCache::new()),
                config.projection_ttl(),
            ),
            calls: CallChannel::new(pool.clone(), publisher.clone(), topics.clone()),
            menu: MenuService::new(pool, publisher, topics),
            jwt: Arc::new(JwtService::with_config(config.jwt.clone())),
            bus,
            db,
            config,
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 配置检查
    /// 2. 工作目录结构 (logs/, database/)
    /// 3. 数据库 (迁移)
    /// 4. 各服务
    pub async fn initialize(config: &Config) -> Result<Self, ServerError> {
        config.validate()?;

        std::fs::create_dir_all(config.log_dir())?;
        if let Some(parent) = sqlite_file_path(&config.database_url).and_then(Path::parent) {
            std::fs::create_dir_all(parent)?;
        }

        let db = DbService::new(&config.database_url).await?;
        tracing::info!(url = %config.database_url, "Database ready");

        Ok(Self::new(config.clone(), db))
    }

    /// 启动后台任务
    ///
    /// - 订单 / 菜单变更时清空投影缓存
    pub fn start_background_tasks(&self) {
        let topics = self.topics();
        for pattern in [topics.orders_changed(), topics.menu_updated()] {
            let projections = self.projections.clone();
            let result = self.bus.subscribe_with(&pattern, move |_msg| {
                let projections = projections.clone();
                async move { projections.invalidate().await }
            });
            if let Err(e) = result {
                tracing::error!(pattern = %pattern, error = %e, "Failed to start cache invalidation");
            }
        }
    }

    pub fn topics(&self) -> &Topics {
        self.engine.notifier().topics()
    }

    /// 关闭总线 (TCP 端点和后台任务随之退出)
    pub fn shutdown(&self) {
        self.bus.shutdown();
    }
}

/// `sqlite://path/to.db` → `path/to.db`; `None` for in-memory urls
fn sqlite_file_path(url: &str) -> Option<&Path> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Some(Path::new(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_file_path() {
        assert_eq!(
            sqlite_file_path("sqlite://./data/database/tabletop.db"),
            Some(Path::new("./data/database/tabletop.db"))
        );
        assert_eq!(
            sqlite_file_path("sqlite:/tmp/x.db?mode=rwc"),
            Some(Path::new("/tmp/x.db"))
        );
        assert_eq!(sqlite_file_path("sqlite::memory:"), None);
        assert_eq!(sqlite_file_path("postgres://x"), None);
    }
}
