use anyhow::Context;
use tabletop_server::{Server, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 设置环境 (dotenv, 工作目录, 日志) 并加载配置
    let config = setup_environment().context("failed to prepare environment")?;

    print_banner();
    tracing::info!(
        environment = %config.environment,
        store_id = %config.store_id,
        "🍽  Tabletop server starting..."
    );

    // 2. 初始化服务器状态 (数据库迁移、服务装配)
    let state = ServerState::initialize(&config)
        .await
        .context("failed to initialize server state")?;

    // 3. 启动 HTTP 服务器和 TCP 总线
    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
