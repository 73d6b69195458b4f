//! Ledger service (accounts + transactions) exposed over gRPC and gRPC-web,
//! backed by a remote append-only document store accessed over HTTP.

pub mod assets;
pub mod config;
pub mod error;
pub mod grpc;
pub mod models;
pub mod router;
pub mod vault;
