//! Tabletop Edge Server - 门店点餐核心
//!
//! # 架构概述
//!
//! - **订单生命周期** (`orders`): 下单校验、定价、状态机、通知
//! - **消息总线** (`message`): 进程内广播 + TCP 帧协议端点
//! - **数据库** (`db`): SQLite (sqlx)，订单状态的唯一事实来源
//! - **路由表** (`routing`): 服务员 ↔ 桌台
//! - **读模型** (`projections`): 排队位置、桌台活跃订单、状态计数、营收序列
//! - **呼叫服务员** (`calls`): 仅存在于总线上的三态信号
//! - **认证** (`auth`): JWT → Principal，穷举授权
//! - **HTTP API** (`api`): axum 路由
//!
//! # 模块结构
//!
//! ```text
//! tabletop-server/src/
//! ├── core/          # 配置、状态、启动
//! ├── auth/          # JWT 解码、授权
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # 连接池与仓储
//! ├── message/       # 消息总线
//! ├── orders/        # 生命周期引擎
//! ├── routing/       # 服务员路由表
//! ├── projections/   # 读模型 + TTL 缓存
//! ├── calls/         # 呼叫服务员
//! ├── menu/          # 改价 / 上下架
//! └── utils/         # 日志、错误类型
//! ```

pub mod api;
pub mod auth;
pub mod calls;
pub mod core;
pub mod db;
pub mod menu;
pub mod message;
pub mod orders;
pub mod projections;
pub mod routing;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export 公共类型
pub use auth::{Action, JwtService, Principal};
pub use core::{Config, Server, ServerState};
pub use message::{BusMessage, MessageBus};
pub use orders::OrderEngine;
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 日志保留天数
const LOG_RETENTION_DAYS: u64 = 14;

/// 设置运行环境：加载 `.env`，创建工作目录，初始化日志
///
/// 返回加载好的配置
pub fn setup_environment() -> Result<Config, std::io::Error> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    let log_dir = config.log_dir();
    std::fs::create_dir_all(&log_dir)?;

    init_logger_with_file(Some(&config.log_level), config.log_json, Some(&log_dir));

    match cleanup_old_logs(&log_dir, LOG_RETENTION_DAYS) {
        Ok(0) => {}
        Ok(n) => tracing::info!(removed = n, "Old log files removed"),
        Err(e) => tracing::warn!(error = %e, "Failed to clean up old logs"),
    }

    Ok(config)
}

pub fn print_banner() {
    println!(
        r#"
  _____     _     _      _
 |_   _|_ _| |__ | | ___| |_ ___  _ __
   | |/ _` | '_ \| |/ _ \ __/ _ \| '_ \
   | | (_| | |_) | |  __/ || (_) | |_) |
   |_|\__,_|_.__/|_|\___|\__\___/| .__/
                                 |_|
    "#
    );
}
