// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::error::Error;

use tokio::net::TcpListener;
use tracing::{info, warn};

use conduit_server::api::router;
use conduit_server::config::{AppConfig, JWT_SECRET_ENV};
use conduit_server::services::build_broker;
use conduit_server::state::AppState;
use conduit_server::storage::Store;
use conduit_server::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::from_env()?;
    telemetry::init(config.log_format);

    if config.uses_default_secret() {
        warn!("{JWT_SECRET_ENV} is not set; tokens are signed with the development secret");
    }

    let store = match config.database_path() {
        Some(path) => {
            info!(path = %path.display(), "opening database");
            Store::open(&path)?
        }
        None => {
            warn!("DATA_DIR is not set; data lives in memory and is lost on restart");
            Store::in_memory()?
        }
    };
    let broker = build_broker(&store, &config)?;
    let app = router(AppState::new(broker, config.data_dir.clone()));

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!(addr = %listener.local_addr()?, "Conduit server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
    }
}
