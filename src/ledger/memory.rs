//! In-Memory Ledger
//!
//! Thread-safe in-memory implementation of [`LedgerAccessor`], used by the
//! test suite and for dry runs. Receipt outcomes can be scripted per
//! submission to exercise failed and unexpected receipts without a node.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::debts::{canonical_debt, DebtKey};
use crate::error::{MigrateError, MigrateResult};
use crate::types::{Account, Address, DebtUpdateEvent, ReceiptStatus, TxHash};

use super::LedgerAccessor;

/// Scripted outcome for one submission
#[derive(Debug, Clone, Copy)]
enum ScriptedOutcome {
    /// Receipt resolves to this status
    Status(ReceiptStatus),
    /// Receipt never resolves; waiting on it times out
    Timeout,
}

/// In-memory currency network ledger
///
/// State changes apply at submission time when the scripted receipt is
/// confirmed, mirroring a node that mines immediately. Privileged
/// submissions after owner removal are rejected, and state-copy writes are
/// rejected while the ledger is unfrozen.
pub struct InMemoryLedger {
    name: String,
    frozen: RwLock<bool>,
    has_owner: RwLock<bool>,
    users: RwLock<HashSet<Address>>,
    friends: RwLock<HashMap<Address, HashSet<Address>>>,
    accounts: RwLock<HashMap<(Address, Address), Account>>,
    onboarders: RwLock<HashMap<Address, Address>>,
    events: RwLock<Vec<DebtUpdateEvent>>,
    debts: RwLock<BTreeMap<DebtKey, i128>>,
    receipts: RwLock<HashMap<TxHash, ScriptedOutcome>>,
    scripted: RwLock<VecDeque<ScriptedOutcome>>,
    next_tx: AtomicU64,
}

impl InMemoryLedger {
    /// Create an empty, unfrozen ledger with an owner
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frozen: RwLock::new(false),
            has_owner: RwLock::new(true),
            users: RwLock::new(HashSet::new()),
            friends: RwLock::new(HashMap::new()),
            accounts: RwLock::new(HashMap::new()),
            onboarders: RwLock::new(HashMap::new()),
            events: RwLock::new(Vec::new()),
            debts: RwLock::new(BTreeMap::new()),
            receipts: RwLock::new(HashMap::new()),
            scripted: RwLock::new(VecDeque::new()),
            next_tx: AtomicU64::new(1),
        }
    }

    /// Freeze or unfreeze the ledger directly (test setup)
    pub async fn set_frozen(&self, frozen: bool) {
        *self.frozen.write().await = frozen;
    }

    /// Install or drop the owner directly (test setup)
    pub async fn set_owner(&self, has_owner: bool) {
        *self.has_owner.write().await = has_owner;
    }

    /// Seed a trustline, storing both directional views
    pub async fn seed_trustline(&self, a: Address, b: Address, account: Account) {
        self.apply_account(a, b, account).await;
    }

    /// Seed a user's onboarder
    pub async fn seed_onboarder(&self, user: Address, onboarder: Address) {
        self.onboarders.write().await.insert(user, onboarder);
    }

    /// Append a DebtUpdate event and apply it to the debt table
    pub async fn seed_debt_event(&self, creditor: Address, debtor: Address, new_debt: i128) {
        self.events.write().await.push(DebtUpdateEvent {
            creditor,
            debtor,
            new_debt,
        });
        let (key, value) = canonical_debt(creditor, debtor, new_debt);
        self.debts.write().await.insert(key, value);
    }

    /// Script the receipt status of the next unscripted submission
    ///
    /// Scripted outcomes apply in submission order; submissions beyond the
    /// scripted queue confirm.
    pub async fn script_receipt(&self, status: ReceiptStatus) {
        self.scripted
            .write()
            .await
            .push_back(ScriptedOutcome::Status(status));
    }

    /// Script the next submission's receipt to never resolve
    pub async fn script_timeout(&self) {
        self.scripted.write().await.push_back(ScriptedOutcome::Timeout);
    }

    /// Whether the ledger still has an owner
    pub async fn has_owner(&self) -> bool {
        *self.has_owner.read().await
    }

    /// Net debt for a pair, looked up under the canonical key
    pub async fn debt_between(&self, a: Address, b: Address) -> i128 {
        let key = if a > b { (a, b) } else { (b, a) };
        self.debts.read().await.get(&key).copied().unwrap_or(0)
    }

    /// Snapshot of the full debt table
    pub async fn debt_table(&self) -> BTreeMap<DebtKey, i128> {
        self.debts.read().await.clone()
    }

    /// Snapshot of all stored account views
    pub async fn account_table(&self) -> HashMap<(Address, Address), Account> {
        self.accounts.read().await.clone()
    }

    /// Snapshot of all onboarder entries
    pub async fn onboarder_table(&self) -> HashMap<Address, Address> {
        self.onboarders.read().await.clone()
    }

    async fn apply_account(&self, a: Address, b: Address, account: Account) {
        let mut accounts = self.accounts.write().await;
        accounts.insert((a, b), account);
        accounts.insert((b, a), account.reversed());
        drop(accounts);

        let mut users = self.users.write().await;
        users.insert(a);
        users.insert(b);
        drop(users);

        let mut friends = self.friends.write().await;
        friends.entry(a).or_default().insert(b);
        friends.entry(b).or_default().insert(a);
    }

    /// Allocate a transaction hash and record its receipt outcome
    ///
    /// State-copy writes additionally require the ledger to be frozen;
    /// unfreeze and owner removal do not.
    async fn record_submission(&self, requires_frozen: bool) -> MigrateResult<(TxHash, bool)> {
        if !*self.has_owner.read().await {
            return Err(MigrateError::Unauthorized(format!(
                "ledger {} has no owner",
                self.name
            )));
        }
        if requires_frozen && !*self.frozen.read().await {
            return Err(MigrateError::Ledger(format!(
                "ledger {} is not frozen; state writes are rejected",
                self.name
            )));
        }

        let outcome = self
            .scripted
            .write()
            .await
            .pop_front()
            .unwrap_or(ScriptedOutcome::Status(ReceiptStatus::Confirmed));

        let seq = self.next_tx.fetch_add(1, Ordering::SeqCst);
        let mut bytes = [0u8; 32];
        let name_bytes = self.name.as_bytes();
        let prefix_len = name_bytes.len().min(8);
        bytes[..prefix_len].copy_from_slice(&name_bytes[..prefix_len]);
        bytes[24..].copy_from_slice(&seq.to_be_bytes());
        let tx = TxHash(bytes);

        self.receipts.write().await.insert(tx, outcome);

        let applies = matches!(outcome, ScriptedOutcome::Status(ReceiptStatus::Confirmed));
        Ok((tx, applies))
    }
}

#[async_trait]
impl LedgerAccessor for InMemoryLedger {
    async fn get_users(&self) -> MigrateResult<HashSet<Address>> {
        Ok(self.users.read().await.clone())
    }

    async fn get_friends(&self, user: Address) -> MigrateResult<HashSet<Address>> {
        Ok(self
            .friends
            .read()
            .await
            .get(&user)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_account(&self, a: Address, b: Address) -> MigrateResult<Account> {
        // Unknown pairs read as zeroed storage, like the contract itself
        Ok(self
            .accounts
            .read()
            .await
            .get(&(a, b))
            .copied()
            .unwrap_or_default())
    }

    async fn get_onboarder(&self, user: Address) -> MigrateResult<Address> {
        Ok(self
            .onboarders
            .read()
            .await
            .get(&user)
            .copied()
            .unwrap_or(Address::ZERO))
    }

    async fn is_frozen(&self) -> MigrateResult<bool> {
        Ok(*self.frozen.read().await)
    }

    async fn get_name(&self) -> MigrateResult<String> {
        Ok(self.name.clone())
    }

    async fn get_debt_update_events(
        &self,
        from_block: u64,
    ) -> MigrateResult<Vec<DebtUpdateEvent>> {
        // The in-memory history has no block structure; only genesis replay
        // is meaningful here.
        let _ = from_block;
        Ok(self.events.read().await.clone())
    }

    async fn submit_set_account(
        &self,
        a: Address,
        b: Address,
        account: Account,
    ) -> MigrateResult<TxHash> {
        let (tx, applies) = self.record_submission(true).await?;
        if applies {
            self.apply_account(a, b, account).await;
        }
        Ok(tx)
    }

    async fn submit_set_onboarder(
        &self,
        user: Address,
        onboarder: Address,
    ) -> MigrateResult<TxHash> {
        let (tx, applies) = self.record_submission(true).await?;
        if applies {
            self.onboarders.write().await.insert(user, onboarder);
        }
        Ok(tx)
    }

    async fn submit_set_debt(
        &self,
        debtor: Address,
        creditor: Address,
        value: i128,
    ) -> MigrateResult<TxHash> {
        let (tx, applies) = self.record_submission(true).await?;
        if applies {
            let (key, stored) = canonical_debt(creditor, debtor, value);
            self.debts.write().await.insert(key, stored);
            self.events.write().await.push(DebtUpdateEvent {
                creditor,
                debtor,
                new_debt: value,
            });
        }
        Ok(tx)
    }

    async fn submit_unfreeze(&self) -> MigrateResult<TxHash> {
        let (tx, applies) = self.record_submission(false).await?;
        if applies {
            *self.frozen.write().await = false;
        }
        Ok(tx)
    }

    async fn submit_remove_owner(&self) -> MigrateResult<TxHash> {
        let (tx, applies) = self.record_submission(false).await?;
        if applies {
            *self.has_owner.write().await = false;
        }
        Ok(tx)
    }

    async fn wait_for_receipt(
        &self,
        tx: TxHash,
        timeout: Duration,
    ) -> MigrateResult<ReceiptStatus> {
        match self.receipts.read().await.get(&tx) {
            Some(ScriptedOutcome::Status(status)) => Ok(*status),
            Some(ScriptedOutcome::Timeout) => Err(MigrateError::ReceiptTimeout {
                tx,
                timeout_secs: timeout.as_secs(),
            }),
            None => Err(MigrateError::Ledger(format!("unknown transaction {}", tx))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address(bytes)
    }

    fn account(balance: i128) -> Account {
        Account {
            creditline_given: 100,
            creditline_received: 150,
            interest_rate_given: 0,
            interest_rate_received: 0,
            is_frozen: false,
            m_time: 1,
            balance,
        }
    }

    #[tokio::test]
    async fn test_account_write_stores_both_views() {
        let ledger = InMemoryLedger::new("TestCoin");
        ledger.set_frozen(true).await;
        ledger
            .submit_set_account(addr(2), addr(1), account(42))
            .await
            .unwrap();

        let forward = ledger.get_account(addr(2), addr(1)).await.unwrap();
        let backward = ledger.get_account(addr(1), addr(2)).await.unwrap();
        assert_eq!(forward.balance, 42);
        assert_eq!(backward.balance, -42);
        assert_eq!(backward, forward.reversed());

        let users = ledger.get_users().await.unwrap();
        assert!(users.contains(&addr(1)) && users.contains(&addr(2)));
        assert!(ledger.get_friends(addr(1)).await.unwrap().contains(&addr(2)));
    }

    #[tokio::test]
    async fn test_scripted_failure_does_not_apply() {
        let ledger = InMemoryLedger::new("TestCoin");
        ledger.set_frozen(true).await;
        ledger.script_receipt(ReceiptStatus::Failed).await;

        let tx = ledger
            .submit_set_onboarder(addr(1), addr(2))
            .await
            .unwrap();
        assert_eq!(
            ledger
                .wait_for_receipt(tx, Duration::from_secs(1))
                .await
                .unwrap(),
            ReceiptStatus::Failed
        );
        assert_eq!(ledger.get_onboarder(addr(1)).await.unwrap(), Address::ZERO);
    }

    #[tokio::test]
    async fn test_privileged_calls_rejected_after_owner_removal() {
        let ledger = InMemoryLedger::new("TestCoin");
        let tx = ledger.submit_remove_owner().await.unwrap();
        assert_eq!(
            ledger
                .wait_for_receipt(tx, Duration::from_secs(1))
                .await
                .unwrap(),
            ReceiptStatus::Confirmed
        );
        assert!(!ledger.has_owner().await);

        let result = ledger.submit_unfreeze().await;
        assert!(matches!(result, Err(MigrateError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_state_writes_rejected_when_unfrozen() {
        let ledger = InMemoryLedger::new("TestCoin");

        // Copy writes need the frozen snapshot guarantee
        let result = ledger
            .submit_set_account(addr(2), addr(1), account(1))
            .await;
        assert!(matches!(result, Err(MigrateError::Ledger(_))));
        assert!(matches!(
            ledger.submit_set_onboarder(addr(1), addr(2)).await,
            Err(MigrateError::Ledger(_))
        ));
        assert!(matches!(
            ledger.submit_set_debt(addr(2), addr(1), 9).await,
            Err(MigrateError::Ledger(_))
        ));

        // Unfreeze and owner removal are allowed either way
        assert!(ledger.submit_unfreeze().await.is_ok());
        assert!(ledger.submit_remove_owner().await.is_ok());
    }

    #[tokio::test]
    async fn test_set_debt_appends_event_history() {
        let ledger = InMemoryLedger::new("TestCoin");
        ledger.set_frozen(true).await;
        ledger.submit_set_debt(addr(2), addr(1), 9).await.unwrap();

        let events = ledger.get_debt_update_events(0).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].new_debt, 9);
        assert_eq!(ledger.debt_between(addr(1), addr(2)).await, 9);
    }
}
