//! Migration Orchestrator
//!
//! Sequences a complete currency network migration: precondition checks,
//! account copies, onboarder copies, debt reconstruction and replay,
//! unfreeze and owner removal. Phases run strictly in order because later
//! phases assume earlier ones committed; a failed drain aborts the run and
//! no later phase is attempted.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::batch::{TxBatch, WriteIntent};
use crate::config::MigrateConfig;
use crate::debts::reconstruct;
use crate::error::{MigrateError, MigrateResult};
use crate::ledger::LedgerAccessor;
use crate::types::Address;

/// Orchestrator phase
///
/// Advances monotonically through the migration; `Aborted` is reachable from
/// any phase on an unrecovered error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationPhase {
    /// Constructed, nothing checked yet
    Init,
    /// Both ledgers frozen, names match
    PreconditionsChecked,
    /// Every trustline copied and confirmed
    AccountsMigrated,
    /// Every onboarder copied and confirmed
    OnboardersMigrated,
    /// Reconstructed debt table replayed and confirmed
    DebtsMigrated,
    /// Destination unfrozen
    Unfrozen,
    /// Destination owner dropped; terminal success
    OwnerRemoved,
    /// Terminal failure
    Aborted,
}

/// Summary of a completed migration run
#[derive(Debug, Clone)]
pub struct MigrationReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
    /// Number of users enumerated on the source ledger
    pub users: usize,
    /// Account copy transactions submitted
    pub accounts_submitted: usize,
    /// Onboarder copy transactions submitted
    pub onboarders_submitted: usize,
    /// Debt replay transactions submitted
    pub debts_submitted: usize,
}

/// Currency network migrator
///
/// Owns its transaction session exclusively; one instance drives one
/// migration run on a single control task.
pub struct NetworkMigrator {
    source: Arc<dyn LedgerAccessor>,
    destination: Arc<dyn LedgerAccessor>,
    batch: TxBatch,
    phase: MigrationPhase,
}

impl NetworkMigrator {
    /// Create a migrator for the given ledger pair
    pub fn new(
        config: &MigrateConfig,
        source: Arc<dyn LedgerAccessor>,
        destination: Arc<dyn LedgerAccessor>,
    ) -> MigrateResult<Self> {
        config.validate()?;
        Ok(Self {
            source,
            destination,
            batch: TxBatch::new(
                config.max_tx_queue_size,
                Duration::from_secs(config.receipt_timeout_secs),
            ),
            phase: MigrationPhase::Init,
        })
    }

    /// Current phase
    pub fn phase(&self) -> MigrationPhase {
        self.phase
    }

    /// Run the full migration
    ///
    /// On success both ledgers have been flipped out of migration mode: the
    /// destination holds a copy of every account, onboarder and net debt, is
    /// unfrozen, and has no owner. On error the run stops where it is;
    /// already-confirmed writes stay committed and a re-run converges
    /// because every write is an absolute overwrite.
    pub async fn run(&mut self) -> MigrateResult<MigrationReport> {
        let started_at = Utc::now();
        match self.run_phases(started_at).await {
            Ok(report) => {
                info!(
                    users = report.users,
                    accounts = report.accounts_submitted,
                    onboarders = report.onboarders_submitted,
                    debts = report.debts_submitted,
                    "Migration complete"
                );
                Ok(report)
            }
            Err(e) => {
                self.phase = MigrationPhase::Aborted;
                error!(error = %e, "Migration aborted");
                Err(e)
            }
        }
    }

    async fn run_phases(&mut self, started_at: DateTime<Utc>) -> MigrateResult<MigrationReport> {
        self.check_preconditions().await?;
        self.phase = MigrationPhase::PreconditionsChecked;

        let users = self.source.get_users().await?;
        info!(users = users.len(), "Preconditions checked, starting migration");

        let accounts_submitted = self.migrate_accounts(&users).await?;
        self.phase = MigrationPhase::AccountsMigrated;
        info!(submitted = accounts_submitted, "Accounts migrated");

        let onboarders_submitted = self.migrate_onboarders(&users).await?;
        self.phase = MigrationPhase::OnboardersMigrated;
        info!(submitted = onboarders_submitted, "Onboarders migrated");

        let debts_submitted = self.migrate_debts().await?;
        self.phase = MigrationPhase::DebtsMigrated;
        info!(submitted = debts_submitted, "Debts migrated");

        self.unfreeze().await?;
        self.phase = MigrationPhase::Unfrozen;
        info!("Destination unfrozen");

        self.remove_owner().await?;
        self.phase = MigrationPhase::OwnerRemoved;
        info!("Destination owner removed");

        Ok(MigrationReport {
            started_at,
            finished_at: Utc::now(),
            users: users.len(),
            accounts_submitted,
            onboarders_submitted,
            debts_submitted,
        })
    }

    /// Both ledgers must be frozen and carry the same name
    ///
    /// Violations surface before any write is attempted.
    async fn check_preconditions(&self) -> MigrateResult<()> {
        if !self.source.is_frozen().await? {
            return Err(MigrateError::Precondition(
                "Source ledger is not frozen".to_string(),
            ));
        }
        if !self.destination.is_frozen().await? {
            return Err(MigrateError::Precondition(
                "Destination ledger is not frozen".to_string(),
            ));
        }

        let source_name = self.source.get_name().await?;
        let destination_name = self.destination.get_name().await?;
        if source_name != destination_name {
            return Err(MigrateError::Precondition(format!(
                "Ledger names do not match: {:?} != {:?}",
                source_name, destination_name
            )));
        }
        Ok(())
    }

    /// Copy every trustline from source to destination
    ///
    /// Each undirected (user, friend) pair holds one relationship whose two
    /// directional views are derivable from each other, so each pair is
    /// written exactly once: the pair is skipped when `user < friend` and
    /// migrated from the greater address's view. This canonicalization is
    /// load-bearing; writing both views would double-write every trustline.
    async fn migrate_accounts(&mut self, users: &HashSet<Address>) -> MigrateResult<usize> {
        let mut submitted = 0;
        for &user in users {
            let friends = self.source.get_friends(user).await?;
            for friend in friends {
                if user < friend {
                    continue;
                }
                let account = self.source.get_account(user, friend).await?;
                self.batch
                    .submit(
                        self.destination.as_ref(),
                        WriteIntent::SetAccount {
                            a: user,
                            b: friend,
                            account,
                        },
                    )
                    .await?;
                submitted += 1;
            }
        }
        self.batch.drain(self.destination.as_ref()).await?;
        Ok(submitted)
    }

    /// Copy every user's onboarder, including the zero address
    async fn migrate_onboarders(&mut self, users: &HashSet<Address>) -> MigrateResult<usize> {
        let mut submitted = 0;
        for &user in users {
            let onboarder = self.source.get_onboarder(user).await?;
            self.batch
                .submit(
                    self.destination.as_ref(),
                    WriteIntent::SetOnboarder { user, onboarder },
                )
                .await?;
            submitted += 1;
        }
        self.batch.drain(self.destination.as_ref()).await?;
        Ok(submitted)
    }

    /// Reconstruct the debt table from event history and replay it
    ///
    /// Debts come from the source's full event history rather than the user
    /// set: addresses without any trustline can still hold debt. The
    /// canonical key is `(debtor, creditor)` with the debtor the greater
    /// address, matching the stored sign convention.
    async fn migrate_debts(&mut self) -> MigrateResult<usize> {
        let events = self.source.get_debt_update_events(0).await?;
        let debts = reconstruct(&events);

        let mut submitted = 0;
        for ((debtor, creditor), value) in debts {
            self.batch
                .submit(
                    self.destination.as_ref(),
                    WriteIntent::SetDebt {
                        debtor,
                        creditor,
                        value,
                    },
                )
                .await?;
            submitted += 1;
        }
        self.batch.drain(self.destination.as_ref()).await?;
        Ok(submitted)
    }

    async fn unfreeze(&mut self) -> MigrateResult<()> {
        self.batch
            .submit(self.destination.as_ref(), WriteIntent::Unfreeze)
            .await?;
        self.batch.drain(self.destination.as_ref()).await
    }

    async fn remove_owner(&mut self) -> MigrateResult<()> {
        self.batch
            .submit(self.destination.as_ref(), WriteIntent::RemoveOwner)
            .await?;
        self.batch.drain(self.destination.as_ref()).await
    }
}
