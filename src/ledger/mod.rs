//! Ledger Accessor Interface
//!
//! Read/write surface of one deployed currency network contract instance.
//! The migration core only ever talks to the two ledgers through this trait;
//! the concrete transport (a JSON-RPC node, an in-memory backend) is an
//! implementation detail behind it.

pub mod memory;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::MigrateResult;
use crate::types::{Account, Address, DebtUpdateEvent, ReceiptStatus, TxHash};

pub use memory::InMemoryLedger;

/// Accessor for a single deployed ledger instance
///
/// Read queries are synchronous calls against current contract state. Write
/// operations are fire-and-forget submissions: they return a transaction
/// hash once the node accepted the transaction, and finality is observed
/// separately through [`LedgerAccessor::wait_for_receipt`].
#[async_trait]
pub trait LedgerAccessor: Send + Sync {
    /// All addresses holding at least one trustline
    async fn get_users(&self) -> MigrateResult<HashSet<Address>>;

    /// All trustline counterparties of a user
    async fn get_friends(&self, user: Address) -> MigrateResult<HashSet<Address>>;

    /// The trustline between `a` and `b`, seen from `a`'s side
    async fn get_account(&self, a: Address, b: Address) -> MigrateResult<Account>;

    /// Who onboarded this user (zero address when self-onboarded)
    async fn get_onboarder(&self, user: Address) -> MigrateResult<Address>;

    /// Whether the whole ledger is frozen
    async fn is_frozen(&self) -> MigrateResult<bool>;

    /// Human-readable name of the ledger
    async fn get_name(&self) -> MigrateResult<String>;

    /// Chronological DebtUpdate history, replayable from genesis
    async fn get_debt_update_events(
        &self,
        from_block: u64,
    ) -> MigrateResult<Vec<DebtUpdateEvent>>;

    /// Write the full trustline between `a` and `b` from `a`'s view
    async fn submit_set_account(
        &self,
        a: Address,
        b: Address,
        account: Account,
    ) -> MigrateResult<TxHash>;

    /// Write a user's onboarder
    async fn submit_set_onboarder(
        &self,
        user: Address,
        onboarder: Address,
    ) -> MigrateResult<TxHash>;

    /// Write the net debt `debtor` owes `creditor`
    async fn submit_set_debt(
        &self,
        debtor: Address,
        creditor: Address,
        value: i128,
    ) -> MigrateResult<TxHash>;

    /// Unfreeze the ledger
    async fn submit_unfreeze(&self) -> MigrateResult<TxHash>;

    /// Drop the ledger's owner, disabling all further privileged calls
    async fn submit_remove_owner(&self) -> MigrateResult<TxHash>;

    /// Block until the transaction reaches finality
    ///
    /// Returns the resolved receipt status, or
    /// [`MigrateError::ReceiptTimeout`](crate::MigrateError::ReceiptTimeout)
    /// if finality is not reached within `timeout`.
    async fn wait_for_receipt(
        &self,
        tx: TxHash,
        timeout: Duration,
    ) -> MigrateResult<ReceiptStatus>;
}
