//! Ledger Node RPC Client
//!
//! JSON-RPC transport for implementing a [`LedgerAccessor`](crate::ledger::LedgerAccessor)
//! against a real node: receipt retrieval with the exact finality semantics
//! the migration relies on, raw transaction submission, and log retrieval
//! for event history. Contract calldata encoding is the accessor
//! implementation's concern, not this module's; the node-backed accessor
//! that composes these calls with a contract codec lives downstream, so the
//! network-touching methods here are consumed by that implementation rather
//! than by the migration core itself.

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RpcConfig;
use crate::error::{MigrateError, MigrateResult};
use crate::types::{ReceiptStatus, TxHash};

/// JSON-RPC client for a ledger node
pub struct JsonRpcClient {
    /// HTTP client
    client: Client,
    /// RPC configuration
    config: RpcConfig,
    /// Request ID counter
    request_id: AtomicU64,
}

/// JSON-RPC request
#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

/// JSON-RPC response
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
    #[allow(dead_code)]
    id: u64,
}

/// JSON-RPC error
#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i32,
    message: String,
}

/// Transaction receipt as returned by the node
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    /// Transaction hash
    pub transaction_hash: String,
    /// Status word as a hex quantity; absent on pre-finality nodes
    pub status: Option<String>,
    /// Block number once mined
    pub block_number: Option<String>,
}

/// Log filter for event retrieval
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    /// Contract address, 0x-prefixed
    pub address: String,
    /// Topic filters, 0x-prefixed
    pub topics: Vec<String>,
    /// First block of interest, hex quantity
    pub from_block: String,
    /// Last block of interest, hex quantity
    pub to_block: String,
}

/// One emitted log entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Emitting contract address
    pub address: String,
    /// Indexed topics
    pub topics: Vec<String>,
    /// ABI-encoded payload
    pub data: String,
    /// Block the log was emitted in
    pub block_number: Option<String>,
}

/// Parse a 0x-prefixed hex quantity
pub fn parse_hex_u64(s: &str) -> MigrateResult<u64> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(stripped, 16)
        .map_err(|e| MigrateError::RpcRequest(format!("Invalid hex quantity {:?}: {}", s, e)))
}

/// Decode a receipt's status field into finality semantics
///
/// `0x1` confirms, `0x0` fails, and any other word is `Other` — a fatal
/// condition for the migration because it means the node is misbehaving.
pub fn decode_receipt_status(status: &str) -> MigrateResult<ReceiptStatus> {
    Ok(ReceiptStatus::from_word(parse_hex_u64(status)?))
}

/// Clamp a configured poll interval to at least one second
///
/// A zero interval would spin against the node between receipt checks.
fn effective_poll_interval(poll_interval_secs: u64) -> Duration {
    Duration::from_secs(poll_interval_secs.max(1))
}

impl JsonRpcClient {
    /// Create a new RPC client
    pub fn new(config: RpcConfig) -> MigrateResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| MigrateError::RpcConnection(e.to_string()))?;

        Ok(Self {
            client,
            config,
            request_id: AtomicU64::new(0),
        })
    }

    /// Make an RPC call
    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> MigrateResult<T> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        debug!("Ledger RPC call: {} id={}", method, id);

        let response = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| MigrateError::RpcConnection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MigrateError::RpcRequest(format!(
                "HTTP {} - {}",
                status, body
            )));
        }

        let rpc_response: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| MigrateError::RpcRequest(e.to_string()))?;

        if let Some(error) = rpc_response.error {
            return Err(MigrateError::RpcResponse {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response
            .result
            .ok_or_else(|| MigrateError::RpcRequest("Empty response".to_string()))
    }

    /// Test connection to the node
    pub async fn ping(&self) -> MigrateResult<()> {
        let _: String = self.call("eth_blockNumber", serde_json::json!([])).await?;
        Ok(())
    }

    /// Get current block number
    pub async fn block_number(&self) -> MigrateResult<u64> {
        let hex: String = self.call("eth_blockNumber", serde_json::json!([])).await?;
        parse_hex_u64(&hex)
    }

    /// Submit a signed raw transaction
    pub async fn send_raw_transaction(&self, raw_hex: &str) -> MigrateResult<TxHash> {
        let hash: String = self
            .call("eth_sendRawTransaction", serde_json::json!([raw_hex]))
            .await?;
        TxHash::from_str(&hash)
    }

    /// Fetch a transaction receipt, `None` while still pending
    pub async fn get_transaction_receipt(
        &self,
        tx: TxHash,
    ) -> MigrateResult<Option<TransactionReceipt>> {
        self.call(
            "eth_getTransactionReceipt",
            serde_json::json!([tx.to_string()]),
        )
        .await
    }

    /// Poll a transaction until it has a receipt with a status
    ///
    /// Returns the decoded status, or
    /// [`MigrateError::ReceiptTimeout`] once `timeout` elapses without
    /// finality.
    pub async fn wait_for_receipt(
        &self,
        tx: TxHash,
        timeout: Duration,
    ) -> MigrateResult<ReceiptStatus> {
        let start = std::time::Instant::now();
        let poll_interval = effective_poll_interval(self.config.poll_interval_secs);

        loop {
            if let Some(receipt) = self.get_transaction_receipt(tx).await? {
                if let Some(status) = receipt.status {
                    return decode_receipt_status(&status);
                }
            }

            if start.elapsed() >= timeout {
                return Err(MigrateError::ReceiptTimeout {
                    tx,
                    timeout_secs: timeout.as_secs(),
                });
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Fetch logs matching the filter
    pub async fn get_logs(&self, filter: &LogFilter) -> MigrateResult<Vec<LogEntry>> {
        self.call("eth_getLogs", serde_json::json!([filter])).await
    }
}
