use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::{self, EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod github;
mod server;
mod tools;

use crate::config::ServerConfig;
use crate::github::GitHubClient;
use crate::server::ServerState;
use crate::tools::ToolRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .init();

    // Missing credential is fatal before anything binds.
    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration error: {e:#}");
            std::process::exit(1);
        }
    };

    let client = Arc::new(GitHubClient::new(
        config.github_token,
        config.github_api_base,
    )?);
    let registry = ToolRegistry::new(client);
    let state = Arc::new(ServerState { registry });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let addr = listener.local_addr()?;
    tracing::info!("MCP GitHub server listening on: {addr}");
    tracing::info!("Tool discovery endpoint: http://{addr}/tools");
    tracing::info!("Tool invocation endpoint: http://{addr}/invoke");

    axum::serve(listener, server::router(state)).await?;
    Ok(())
}
