//! Client configuration

use std::time::Duration;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., "http://localhost:9625")
    pub base_url: String,

    /// JWT token for authentication (`None` = customer)
    pub token: Option<String>,

    /// Request timeout
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the JWT token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create an HTTP client from this configuration
    pub fn build_http_client(&self) -> crate::ClientResult<crate::HttpClient> {
        crate::HttpClient::new(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:9625")
    }
}

/// 总线客户端配置
///
/// 重连采用固定间隔，不做指数退避；超过次数后停止并进入 `Failed`。
#[derive(Debug, Clone)]
pub struct BusClientConfig {
    /// 服务端 TCP 总线地址
    pub addr: String,
    /// 每次重连前等待的固定间隔
    pub reconnect_interval: Duration,
    /// 最大重连次数 (不含首次连接)
    pub max_reconnect_attempts: u32,
    /// 单次 TCP 连接超时
    pub connect_timeout: Duration,
    /// 本地事件广播容量
    pub event_capacity: usize,
}

impl BusClientConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            reconnect_interval: Duration::from_secs(2),
            max_reconnect_attempts: 10,
            connect_timeout: Duration::from_secs(3),
            event_capacity: 1024,
        }
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

impl Default for BusClientConfig {
    fn default() -> Self {
        Self::new("127.0.0.1:9626")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_config_builder() {
        let config = BusClientConfig::new("10.0.0.2:9626")
            .with_reconnect_interval(Duration::from_millis(250))
            .with_max_reconnect_attempts(3);

        assert_eq!(config.addr, "10.0.0.2:9626");
        assert_eq!(config.reconnect_interval, Duration::from_millis(250));
        assert_eq!(config.max_reconnect_attempts, 3);
        assert_eq!(config.event_capacity, 1024);
    }

    #[test]
    fn test_http_config_defaults() {
        let config = ClientConfig::default().with_token("abc");
        assert_eq!(config.base_url, "http://localhost:9625");
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
