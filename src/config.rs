//! Migration Configuration
//!
//! Configuration for a single migration run. Supports loading from
//! environment variables with the CN_MIGRATE_ prefix.

use std::env;

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, MigrateResult};
use crate::types::Address;

/// Signing context handed to ledger accessor implementations
///
/// Opaque to the migration core; the accessor either signs locally with a
/// private key or lets the node's managed account sign.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerConfig {
    /// Sign with a node-managed account
    NodeAccount {
        /// Sender address known to the node
        from: Address,
    },
    /// Sign locally with a raw private key
    PrivateKey {
        /// Hex-encoded private key
        key_hex: String,
    },
}

/// Transaction metadata overrides
///
/// Forwarded unchanged to accessor submissions; the core never inspects
/// these values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TxOptions {
    /// Starting nonce / sequence number override
    #[serde(default)]
    pub nonce: Option<u64>,
    /// Gas price override
    #[serde(default)]
    pub gas_price: Option<u128>,
    /// Gas limit override
    #[serde(default)]
    pub gas_limit: Option<u64>,
}

/// Node RPC configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// RPC endpoint URL
    pub url: String,
    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
    /// Receipt poll interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_rpc_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    1
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8545".to_string(),
            timeout_secs: 30,
            poll_interval_secs: 1,
        }
    }
}

/// Migration configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateConfig {
    /// Address of the frozen source ledger contract
    pub source: Address,
    /// Address of the frozen destination ledger contract
    pub destination: Address,
    /// Signing context for submitted transactions
    pub signer: SignerConfig,
    /// Transaction metadata overrides
    #[serde(default)]
    pub tx_options: TxOptions,
    /// Maximum number of outstanding transactions before a blocking drain
    #[serde(default = "default_max_tx_queue_size")]
    pub max_tx_queue_size: usize,
    /// Timeout for an individual receipt wait in seconds
    #[serde(default = "default_receipt_timeout")]
    pub receipt_timeout_secs: u64,
    /// Node RPC configuration
    #[serde(default)]
    pub rpc: RpcConfig,
}

fn default_max_tx_queue_size() -> usize {
    10
}

fn default_receipt_timeout() -> u64 {
    300
}

impl MigrateConfig {
    /// Create a configuration with defaults for the given ledger pair
    pub fn new(source: Address, destination: Address, signer: SignerConfig) -> Self {
        Self {
            source,
            destination,
            signer,
            tx_options: TxOptions::default(),
            max_tx_queue_size: default_max_tx_queue_size(),
            receipt_timeout_secs: default_receipt_timeout(),
            rpc: RpcConfig::default(),
        }
    }

    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - CN_MIGRATE_SOURCE: source ledger contract address (required)
    /// - CN_MIGRATE_DESTINATION: destination ledger contract address (required)
    /// - CN_MIGRATE_PRIVATE_KEY: hex private key for local signing
    /// - CN_MIGRATE_FROM: node-managed sender address (used when no key given)
    /// - CN_MIGRATE_MAX_TX_QUEUE_SIZE: maximum outstanding transactions
    /// - CN_MIGRATE_RECEIPT_TIMEOUT: receipt wait timeout in seconds
    /// - CN_MIGRATE_NONCE / CN_MIGRATE_GAS_PRICE / CN_MIGRATE_GAS_LIMIT:
    ///   transaction metadata overrides
    /// - CN_MIGRATE_RPC_URL: node RPC endpoint
    /// - CN_MIGRATE_RPC_TIMEOUT: RPC request timeout in seconds
    pub fn from_env() -> MigrateResult<Self> {
        let source: Address = env::var("CN_MIGRATE_SOURCE")
            .map_err(|_| MigrateError::Configuration("CN_MIGRATE_SOURCE not set".to_string()))?
            .parse()?;
        let destination: Address = env::var("CN_MIGRATE_DESTINATION")
            .map_err(|_| {
                MigrateError::Configuration("CN_MIGRATE_DESTINATION not set".to_string())
            })?
            .parse()?;

        let signer = match env::var("CN_MIGRATE_PRIVATE_KEY") {
            Ok(key_hex) => SignerConfig::PrivateKey { key_hex },
            Err(_) => {
                let from: Address = env::var("CN_MIGRATE_FROM")
                    .map_err(|_| {
                        MigrateError::Configuration(
                            "Neither CN_MIGRATE_PRIVATE_KEY nor CN_MIGRATE_FROM set".to_string(),
                        )
                    })?
                    .parse()?;
                SignerConfig::NodeAccount { from }
            }
        };

        let tx_options = TxOptions {
            nonce: env::var("CN_MIGRATE_NONCE").ok().and_then(|s| s.parse().ok()),
            gas_price: env::var("CN_MIGRATE_GAS_PRICE")
                .ok()
                .and_then(|s| s.parse().ok()),
            gas_limit: env::var("CN_MIGRATE_GAS_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok()),
        };

        let rpc = RpcConfig {
            url: env::var("CN_MIGRATE_RPC_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8545".to_string()),
            timeout_secs: env::var("CN_MIGRATE_RPC_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_rpc_timeout),
            poll_interval_secs: env::var("CN_MIGRATE_RPC_POLL_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_poll_interval),
        };

        let config = Self {
            source,
            destination,
            signer,
            tx_options,
            max_tx_queue_size: env::var("CN_MIGRATE_MAX_TX_QUEUE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_max_tx_queue_size),
            receipt_timeout_secs: env::var("CN_MIGRATE_RECEIPT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or_else(default_receipt_timeout),
            rpc,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create a development configuration against a local node
    pub fn development(source: Address, destination: Address) -> Self {
        Self {
            source,
            destination,
            signer: SignerConfig::NodeAccount { from: Address::ZERO },
            tx_options: TxOptions::default(),
            max_tx_queue_size: default_max_tx_queue_size(),
            receipt_timeout_secs: 30,
            rpc: RpcConfig {
                url: "http://127.0.0.1:8545".to_string(),
                timeout_secs: 10,
                poll_interval_secs: 1,
            },
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> MigrateResult<()> {
        if self.max_tx_queue_size == 0 {
            return Err(MigrateError::Configuration(
                "max_tx_queue_size must be at least 1".to_string(),
            ));
        }
        if self.source == self.destination {
            return Err(MigrateError::Configuration(
                "Source and destination ledgers must differ".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; env tests take this lock so
    // they cannot race each other.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_VARS: &[&str] = &[
        "CN_MIGRATE_SOURCE",
        "CN_MIGRATE_DESTINATION",
        "CN_MIGRATE_PRIVATE_KEY",
        "CN_MIGRATE_FROM",
        "CN_MIGRATE_NONCE",
        "CN_MIGRATE_GAS_PRICE",
        "CN_MIGRATE_GAS_LIMIT",
        "CN_MIGRATE_MAX_TX_QUEUE_SIZE",
        "CN_MIGRATE_RECEIPT_TIMEOUT",
        "CN_MIGRATE_RPC_URL",
        "CN_MIGRATE_RPC_TIMEOUT",
        "CN_MIGRATE_RPC_POLL_INTERVAL",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address(bytes)
    }

    #[test]
    fn test_config_defaults() {
        let config = MigrateConfig::new(
            addr(1),
            addr(2),
            SignerConfig::NodeAccount { from: addr(3) },
        );
        assert_eq!(config.max_tx_queue_size, 10);
        assert_eq!(config.receipt_timeout_secs, 300);
        assert!(config.tx_options.nonce.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_queue_size() {
        let mut config = MigrateConfig::new(
            addr(1),
            addr(2),
            SignerConfig::NodeAccount { from: addr(3) },
        );
        config.max_tx_queue_size = 0;
        assert!(matches!(
            config.validate(),
            Err(MigrateError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_same_ledger() {
        let config = MigrateConfig::new(
            addr(1),
            addr(1),
            SignerConfig::NodeAccount { from: addr(3) },
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_env_requires_ledger_addresses() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        // No source at all
        let err = MigrateConfig::from_env().unwrap_err();
        assert!(matches!(err, MigrateError::Configuration(_)));

        // Source present but destination missing
        env::set_var(
            "CN_MIGRATE_SOURCE",
            "0x00000000000000000000000000000000000000aa",
        );
        let err = MigrateConfig::from_env().unwrap_err();
        assert!(matches!(err, MigrateError::Configuration(_)));

        clear_env();
    }

    #[test]
    fn test_from_env_full_configuration() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var(
            "CN_MIGRATE_SOURCE",
            "0x00000000000000000000000000000000000000aa",
        );
        env::set_var(
            "CN_MIGRATE_DESTINATION",
            "0x00000000000000000000000000000000000000bb",
        );
        env::set_var("CN_MIGRATE_PRIVATE_KEY", "deadbeef");
        env::set_var("CN_MIGRATE_MAX_TX_QUEUE_SIZE", "5");
        env::set_var("CN_MIGRATE_RECEIPT_TIMEOUT", "60");
        env::set_var("CN_MIGRATE_GAS_LIMIT", "21000");
        env::set_var("CN_MIGRATE_RPC_URL", "http://10.0.0.1:8545");

        let config = MigrateConfig::from_env().unwrap();
        assert_eq!(config.source, "0x00000000000000000000000000000000000000aa".parse().unwrap());
        assert_eq!(
            config.destination,
            "0x00000000000000000000000000000000000000bb".parse().unwrap()
        );
        assert!(matches!(
            config.signer,
            SignerConfig::PrivateKey { ref key_hex } if key_hex == "deadbeef"
        ));
        assert_eq!(config.max_tx_queue_size, 5);
        assert_eq!(config.receipt_timeout_secs, 60);
        assert_eq!(config.tx_options.gas_limit, Some(21000));
        assert!(config.tx_options.nonce.is_none());
        assert_eq!(config.rpc.url, "http://10.0.0.1:8545");
        assert_eq!(config.rpc.timeout_secs, 30);

        clear_env();
    }

    #[test]
    fn test_development_config() {
        let config = MigrateConfig::development(addr(1), addr(2));
        assert_eq!(config.rpc.url, "http://127.0.0.1:8545");
        assert_eq!(config.receipt_timeout_secs, 30);
    }
}
