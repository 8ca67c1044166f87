//! Currency Network Migration
//!
//! This crate migrates the full state of a running mutual-credit currency
//! network from one deployed ledger contract instance to another, without
//! halting the application relying on it. Both ledgers are frozen for the
//! duration; the destination is unfrozen and its owner dropped only once
//! every copied write has confirmed.
//!
//! # Architecture
//!
//! The migration consists of several components:
//!
//! - **Ledger Accessor**: read/write interface to one deployed ledger
//!   instance, with an in-memory backend for tests and dry runs
//! - **Debt Reconstructor**: folds the source's DebtUpdate event history
//!   into the canonical net-debt table
//! - **Transaction Batch**: tracks outstanding submissions and blocks at
//!   the configured in-flight limit
//! - **Network Migrator**: sequences precondition checks, account,
//!   onboarder and debt migration, unfreeze, and owner removal
//! - **RPC Client**: JSON-RPC transport for wiring an accessor to a node
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cn_migrate::{InMemoryLedger, MigrateConfig, NetworkMigrator, SignerConfig};
//!
//! async fn example() {
//!     let source = Arc::new(InMemoryLedger::new("TestCoin"));
//!     let destination = Arc::new(InMemoryLedger::new("TestCoin"));
//!     source.set_frozen(true).await;
//!     destination.set_frozen(true).await;
//!
//!     let config = MigrateConfig::development(
//!         "0x00000000000000000000000000000000000000aa".parse().unwrap(),
//!         "0x00000000000000000000000000000000000000bb".parse().unwrap(),
//!     );
//!     let mut migrator = NetworkMigrator::new(&config, source, destination).unwrap();
//!     let report = migrator.run().await.unwrap();
//!     println!("migrated {} users", report.users);
//! }
//! ```

pub mod batch;
pub mod config;
pub mod debts;
pub mod error;
pub mod ledger;
pub mod migrate;
pub mod rpc;
pub mod types;

pub use batch::{wait_for_batch, BatchOutcome, TxBatch, WriteIntent};
pub use config::{MigrateConfig, RpcConfig, SignerConfig, TxOptions};
pub use debts::{canonical_debt, reconstruct, DebtKey};
pub use error::{MigrateError, MigrateResult};
pub use ledger::{InMemoryLedger, LedgerAccessor};
pub use migrate::{MigrationPhase, MigrationReport, NetworkMigrator};
pub use rpc::{decode_receipt_status, JsonRpcClient, LogEntry, LogFilter, TransactionReceipt};
pub use types::{Account, Address, DebtUpdateEvent, ReceiptStatus, TxHash};
