use stash::{
    backend::JsonStore,
    server::{self, AppConfig, AppState},
    LedgerService};

use anyhow::{self, Context};
use env_logger::Env;
use log::{info, warn};
use tokio::net::TcpListener;

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = AppConfig::load()?;
    let store = JsonStore::open(&config.storage.ledger_path)
        .with_context(|| format!("failed to open ledger at {}", config.storage.ledger_path.display()))?;
    info!("ledger stored at {}", store.path().display());

    let state = AppState::new(LedgerService::new(store), config.auth.clone());

    let listener = TcpListener::bind(config.server.listen).await
        .with_context(|| format!("failed to bind {}", config.server.listen))?;
    info!("server running at http://{}", listener.local_addr()?);

    server::serve(listener, state.clone(), shutdown_signal()).await
        .with_context(|| "server error")?;

    state.service().shutdown()?;
    info!("ledger store closed");
    Ok(())
}
