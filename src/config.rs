use std::net::SocketAddr;

use clap::Parser;

/// Process configuration. Everything is environment-driven, with CLI flags
/// as overrides for local runs.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "vault-ledger",
    about = "Ledger service backed by an immudb Vault document store"
)]
pub struct Config {
    /// Address serving gRPC, gRPC-web and the web app on one port.
    #[arg(long, env = "SERVING_ADDRESS", default_value = "0.0.0.0:8081")]
    pub serving_address: SocketAddr,

    /// Log filter (tracing env-filter syntax).
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Accept gRPC-web calls from any origin. When set to false, cross-origin
    /// browser callers are refused.
    #[arg(
        long,
        env = "WEB_GRPC_ALLOW_ANY_ORIGIN",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub web_allow_any_origin: bool,

    #[command(flatten)]
    pub vault: VaultConfig,
}

/// Connection settings for the remote document store.
#[derive(clap::Args, Debug, Clone)]
pub struct VaultConfig {
    /// Base URL of the Vault document API.
    #[arg(
        long,
        env = "VAULT_HOST",
        default_value = "https://vault.immudb.io/ics/api/v1"
    )]
    pub host: String,

    /// Static API key sent with every store request.
    #[arg(long, env = "VAULT_API_KEY")]
    pub api_key: String,

    /// Ledger namespace inside the store.
    #[arg(long, env = "VAULT_LEDGER_NAME", default_value = "default")]
    pub ledger_name: String,

    #[arg(long, env = "VAULT_ACCOUNTS_COLLECTION", default_value = "accounts")]
    pub accounts_collection: String,

    #[arg(
        long,
        env = "VAULT_TRANSACTIONS_COLLECTION",
        default_value = "transactions"
    )]
    pub transactions_collection: String,
}
