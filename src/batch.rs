//! Transaction Batching and Completion Waiting
//!
//! Write intents are submitted fire-and-forget; the batch tracks the
//! outstanding transaction hashes and blocks the caller once the configured
//! in-flight limit is reached. Draining waits out every outstanding hash and
//! reports the complete set of failures, so no transaction is ever left
//! unresolved.

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{MigrateError, MigrateResult};
use crate::ledger::LedgerAccessor;
use crate::types::{Account, Address, ReceiptStatus, TxHash};

/// One ledger write to be submitted through the accessor
#[derive(Debug, Clone)]
pub enum WriteIntent {
    /// Write a full trustline from `a`'s view
    SetAccount {
        a: Address,
        b: Address,
        account: Account,
    },
    /// Write a user's onboarder
    SetOnboarder { user: Address, onboarder: Address },
    /// Write the net debt `debtor` owes `creditor`
    SetDebt {
        debtor: Address,
        creditor: Address,
        value: i128,
    },
    /// Unfreeze the ledger
    Unfreeze,
    /// Drop the ledger's owner
    RemoveOwner,
}

/// Resolution of a fully drained batch
///
/// Partial failure is a value, not an error: callers decide whether a
/// non-empty failed set aborts the run. Unexpected receipt statuses and
/// timeouts are genuine errors and never reach this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every transaction in the batch confirmed
    AllConfirmed,
    /// These transactions resolved to a failed receipt
    SomeFailed(BTreeSet<TxHash>),
}

/// Outstanding-transaction session for one migration run
///
/// Owned and driven by a single orchestrator; not safe for concurrent
/// callers and deliberately unsynchronized.
pub struct TxBatch {
    outstanding: HashSet<TxHash>,
    max_in_flight: usize,
    receipt_timeout: Duration,
}

impl TxBatch {
    /// Create an empty batch
    ///
    /// `max_in_flight` must be positive; config validation enforces this
    /// before a batch is ever constructed.
    pub fn new(max_in_flight: usize, receipt_timeout: Duration) -> Self {
        Self {
            outstanding: HashSet::new(),
            max_in_flight,
            receipt_timeout,
        }
    }

    /// Number of currently outstanding transactions
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Submit a write intent through the accessor
    ///
    /// Once the outstanding set reaches the in-flight limit this drains it
    /// synchronously before returning. This is the backpressure point: the
    /// caller blocks here, there is no background flush.
    pub async fn submit(
        &mut self,
        ledger: &dyn LedgerAccessor,
        intent: WriteIntent,
    ) -> MigrateResult<()> {
        let tx = match intent {
            WriteIntent::SetAccount { a, b, account } => {
                ledger.submit_set_account(a, b, account).await?
            }
            WriteIntent::SetOnboarder { user, onboarder } => {
                ledger.submit_set_onboarder(user, onboarder).await?
            }
            WriteIntent::SetDebt {
                debtor,
                creditor,
                value,
            } => ledger.submit_set_debt(debtor, creditor, value).await?,
            WriteIntent::Unfreeze => ledger.submit_unfreeze().await?,
            WriteIntent::RemoveOwner => ledger.submit_remove_owner().await?,
        };

        debug!(tx = %tx, outstanding = self.outstanding.len() + 1, "Submitted transaction");
        self.outstanding.insert(tx);

        if self.outstanding.len() >= self.max_in_flight {
            self.drain(ledger).await?;
        }
        Ok(())
    }

    /// Wait out every outstanding transaction
    ///
    /// The outstanding set is empty after this returns, whether or not the
    /// batch succeeded. A non-empty failed set becomes
    /// [`MigrateError::TransactionsFailed`] carrying every failed hash.
    pub async fn drain(&mut self, ledger: &dyn LedgerAccessor) -> MigrateResult<()> {
        if self.outstanding.is_empty() {
            return Ok(());
        }

        let ids: Vec<TxHash> = self.outstanding.drain().collect();
        debug!(count = ids.len(), "Draining transaction batch");

        match wait_for_batch(ledger, &ids, self.receipt_timeout).await? {
            BatchOutcome::AllConfirmed => Ok(()),
            BatchOutcome::SomeFailed(failed) => {
                Err(MigrateError::TransactionsFailed { failed })
            }
        }
    }
}

/// Wait for a set of submitted transactions to reach finality
///
/// Waits for *all* ids rather than short-circuiting on the first failed
/// receipt, so every submitted transaction ends up resolved and the failed
/// set is complete. A receipt status outside confirmed/failed indicates a
/// malfunctioning accessor and aborts immediately without waiting on the
/// remaining ids; so does an individual receipt timeout.
pub async fn wait_for_batch(
    ledger: &dyn LedgerAccessor,
    ids: &[TxHash],
    timeout: Duration,
) -> MigrateResult<BatchOutcome> {
    let mut failed = BTreeSet::new();

    for &tx in ids {
        match ledger.wait_for_receipt(tx, timeout).await? {
            ReceiptStatus::Confirmed => {}
            ReceiptStatus::Failed => {
                warn!(tx = %tx, "Transaction failed");
                failed.insert(tx);
            }
            ReceiptStatus::Other(status) => {
                return Err(MigrateError::UnexpectedReceiptStatus { tx, status });
            }
        }
    }

    if failed.is_empty() {
        Ok(BatchOutcome::AllConfirmed)
    } else {
        Ok(BatchOutcome::SomeFailed(failed))
    }
}
