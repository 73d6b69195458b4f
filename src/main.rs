use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use vault_ledger::assets;
use vault_ledger::config::Config;
use vault_ledger::grpc::{AccountServiceServer, LedgerService};
use vault_ledger::router::ProtocolRouter;
use vault_ledger::vault::VaultStorage;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_level))
        .init();

    if let Err(err) = run(config).await {
        tracing::error!(error = %err, "server exited");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let storage = Arc::new(VaultStorage::new(config.vault)?);

    // Provision collections on every start; already-exists is success.
    storage.init_collections().await?;

    let service = AccountServiceServer::new(LedgerService::new(storage));
    let router = ProtocolRouter::new(
        service,
        assets::static_router(),
        config.web_allow_any_origin,
    );

    tracing::info!(address = %config.serving_address, "starting server");
    axum::Server::bind(&config.serving_address)
        .serve(tower::make::Shared::new(router))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutting down");
}
