use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use agenda_core::repository::SqliteRepository;

use crate::cli::ServeCommand;
use crate::config::Config;
use crate::router::build_router;
use crate::state::AppState;

pub async fn serve(repo: SqliteRepository, mut config: Config, command: ServeCommand) -> Result<()> {
    if let Some(host) = command.host {
        config.server.host = host;
    }
    if let Some(port) = command.port {
        config.server.port = port;
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(AppState::new(repo, config));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
