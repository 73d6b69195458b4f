use thiserror::Error;

/// Error taxonomy for the ledger core.
///
/// `InvalidInput` and `DuplicateKey` map to specific client-facing codes at
/// the RPC layer; `Storage` details stay in server logs only.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Local validation failure. Never reaches the network.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The store rejected a create because of a unique-key conflict.
    #[error("duplicate key")]
    DuplicateKey,

    /// Operation not wired to a handler.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// Transport error, non-success status or decode failure from the store,
    /// with the operation and target collection for diagnostics.
    #[error("storage failure: {op} on collection {collection}: {detail}")]
    Storage {
        op: &'static str,
        collection: String,
        detail: String,
    },
}

impl LedgerError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        LedgerError::InvalidInput(message.into())
    }

    pub fn storage(op: &'static str, collection: &str, detail: impl ToString) -> Self {
        LedgerError::Storage {
            op,
            collection: collection.to_string(),
            detail: detail.to_string(),
        }
    }
}
