use std::path::PathBuf;
use std::time::Duration;

use shared::message::{Topics, validate_topic};

use crate::auth::JwtConfig;
use crate::core::ServerError;

/// 服务器配置 - 门店边缘节点的所有配置项
///
/// # 环境变量
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 9625 | HTTP API 端口 |
/// | BUS_TCP_PORT | 9626 | TCP 消息总线端口 |
/// | STORE_ID | default | 主题前缀中的门店 ID |
/// | DATABASE_URL | sqlite://{WORK_DIR}/database/tabletop.db | SQLite 连接串 |
/// | JWT_SECRET | 开发默认值 | 生产环境必须设置 |
/// | JWT_ISSUER | tabletop-identity | 令牌签发者 |
/// | JWT_AUDIENCE | tabletop-edge | 令牌受众 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 日志 |
/// | PROJECTION_TTL_MS | 2000 | 投影缓存 TTL，0 关闭 |
/// | BUS_CHANNEL_CAPACITY | 1024 | 广播通道容量 |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/tabletop HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    pub http_port: u16,
    /// TCP 消息总线端口 (看板、服务员终端直连)
    pub bus_tcp_port: u16,
    pub store_id: String,
    pub database_url: String,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    pub projection_ttl_ms: u64,
    pub bus_channel_capacity: usize,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (environment, map in tests)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parsed<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
            default: T,
        ) -> T {
            match lookup(key) {
                Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                    tracing::warn!(key, value = %raw, "Ignoring unparsable config value");
                    default
                }),
                None => default,
            }
        }

        let work_dir = lookup("WORK_DIR").unwrap_or_else(|| "./data".into());
        let database_url = lookup("DATABASE_URL")
            .unwrap_or_else(|| format!("sqlite://{work_dir}/database/tabletop.db"));
        let defaults = JwtConfig::default();

        Self {
            http_port: parsed(&lookup, "HTTP_PORT", 9625),
            bus_tcp_port: parsed(&lookup, "BUS_TCP_PORT", 9626),
            store_id: lookup("STORE_ID").unwrap_or_else(|| "default".into()),
            database_url,
            jwt: JwtConfig {
                secret: lookup("JWT_SECRET").unwrap_or(defaults.secret),
                issuer: lookup("JWT_ISSUER").unwrap_or(defaults.issuer),
                audience: lookup("JWT_AUDIENCE").unwrap_or(defaults.audience),
            },
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".into()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: parsed(&lookup, "LOG_JSON", false),
            projection_ttl_ms: parsed(&lookup, "PROJECTION_TTL_MS", 2000),
            bus_channel_capacity: parsed(&lookup, "BUS_CHANNEL_CAPACITY", 1024),
            request_timeout_ms: parsed(&lookup, "REQUEST_TIMEOUT_MS", 30000),
            work_dir,
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景；数据库路径跟随新的工作目录
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16, bus_tcp_port: u16) -> Self {
        let work_dir = work_dir.into();
        Self::from_lookup(|key| match key {
            "WORK_DIR" => Some(work_dir.clone()),
            "HTTP_PORT" => Some(http_port.to_string()),
            "BUS_TCP_PORT" => Some(bus_tcp_port.to_string()),
            "DATABASE_URL" => None,
            _ => std::env::var(key).ok(),
        })
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// 启动前检查：生产环境不允许使用开发密钥
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.is_production() && self.jwt.uses_dev_secret() {
            return Err(ServerError::Config(
                "JWT_SECRET must be set in production".into(),
            ));
        }
        if self.jwt.secret.len() < 32 {
            return Err(ServerError::Config(
                "JWT_SECRET must be at least 32 characters long".into(),
            ));
        }
        if self.bus_channel_capacity == 0 {
            return Err(ServerError::Config(
                "BUS_CHANNEL_CAPACITY must be positive".into(),
            ));
        }
        self.validate_store_id()
    }

    /// 门店 ID 是主题中的单个层级：非空，不含 `/` `+` `#`
    fn validate_store_id(&self) -> Result<(), ServerError> {
        if self.store_id.is_empty() || self.store_id.contains('/') {
            return Err(ServerError::Config(format!(
                "STORE_ID must be a single non-empty topic level: {:?}",
                self.store_id
            )));
        }
        validate_topic(&Topics::new(&self.store_id).printing())
            .map_err(|e| ServerError::Config(format!("STORE_ID is not usable in topics: {e}")))
    }

    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.work_dir().join("logs")
    }

    pub fn projection_ttl(&self) -> Duration {
        Duration::from_millis(self.projection_ttl_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn bus_listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.bus_tcp_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
