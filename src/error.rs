//! Migration Error Types
//!
//! Error definitions for currency network migration operations.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::types::TxHash;

/// Migration error
#[derive(Error, Debug)]
pub enum MigrateError {
    /// A migration precondition was violated before any write was attempted
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// One or more transactions in a fully drained batch failed finality
    #[error("{} transaction(s) failed: {}", .failed.len(), format_tx_set(.failed))]
    TransactionsFailed { failed: BTreeSet<TxHash> },

    /// A receipt reported a status outside confirmed/failed
    #[error("Unexpected receipt status {status} for transaction {tx}")]
    UnexpectedReceiptStatus { tx: TxHash, status: u64 },

    /// A receipt did not reach finality within the timeout
    #[error("Timed out after {timeout_secs}s waiting for receipt of {tx}")]
    ReceiptTimeout { tx: TxHash, timeout_secs: u64 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A privileged ledger call was rejected (e.g. owner already removed)
    #[error("Unauthorized ledger call: {0}")]
    Unauthorized(String),

    /// RPC connection error
    #[error("RPC connection failed: {0}")]
    RpcConnection(String),

    /// RPC request error
    #[error("RPC request failed: {0}")]
    RpcRequest(String),

    /// RPC response error
    #[error("RPC response error: {message}")]
    RpcResponse { code: i32, message: String },

    /// Ledger accessor error
    #[error("Ledger error: {0}")]
    Ledger(String),
}

/// Migration result type
pub type MigrateResult<T> = Result<T, MigrateError>;

fn format_tx_set(failed: &BTreeSet<TxHash>) -> String {
    failed
        .iter()
        .map(|tx| tx.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<reqwest::Error> for MigrateError {
    fn from(e: reqwest::Error) -> Self {
        MigrateError::RpcConnection(e.to_string())
    }
}

impl From<serde_json::Error> for MigrateError {
    fn from(e: serde_json::Error) -> Self {
        MigrateError::RpcRequest(e.to_string())
    }
}

impl From<hex::FromHexError> for MigrateError {
    fn from(e: hex::FromHexError) -> Self {
        MigrateError::Configuration(format!("Hex decode error: {}", e))
    }
}
