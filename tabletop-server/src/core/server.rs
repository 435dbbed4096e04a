//! Server Implementation
//!
//! HTTP 服务器 + TCP 消息总线的启动和关闭

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::api;
use crate::core::{Config, Result, ServerState};

/// HTTP Server
pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    /// Create server with existing state
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    /// Bind both listeners and serve until Ctrl-C or bus shutdown
    pub async fn run(&self) -> Result<()> {
        let state = match &self.state {
            Some(s) => s.clone(),
            None => ServerState::initialize(&self.config).await?,
        };

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let http_listener = TcpListener::bind(addr).await?;
        let bus_listener = state.bus.bind_tcp().await?;

        self.serve(state, http_listener, bus_listener).await
    }

    /// Serve on already-bound listeners (tests bind port 0)
    pub async fn serve(
        &self,
        state: ServerState,
        http_listener: TcpListener,
        bus_listener: TcpListener,
    ) -> Result<()> {
        state.start_background_tasks();
        api::health::mark_started();

        let bus = state.bus.clone();
        let bus_task = tokio::spawn(async move {
            if let Err(e) = bus.serve_tcp(bus_listener).await {
                tracing::error!("Message bus TCP server failed: {}", e);
            }
        });

        if let Ok(addr) = http_listener.local_addr() {
            tracing::info!(store_id = %self.config.store_id, "🍽  Tabletop server listening on {}", addr);
        }

        let shutdown_token = state.bus.shutdown_token().clone();
        let app = api::build_app(state.clone());
        let shutdown = async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down..."),
                _ = shutdown_token.cancelled() => tracing::info!("Bus closed, shutting down..."),
            }
        };

        let served = axum::serve(http_listener, app)
            .with_graceful_shutdown(shutdown)
            .await;

        state.shutdown();
        let _ = bus_task.await;
        served?;
        Ok(())
    }
}
