use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use codebot::server::{self, AppState};
use codebot::{ChatClient, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Only ./.env; parent directories are not searched.
    dotenvy::from_path(".env").ok();
    codebot::logging::init();

    let server_cfg = ServerConfig::from_env();
    let client = ChatClient::from_env().context("Failed to configure chat client")?;
    let cfg = client.config();
    info!(
        provider = %cfg.provider,
        model = %cfg.model,
        endpoint = %cfg.endpoint,
        "resolved chat client configuration"
    );

    let listener = TcpListener::bind(server_cfg.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", server_cfg.bind_addr))?;
    server::serve(listener, AppState::new(client))
        .await
        .context("Server terminated with an error")
}
