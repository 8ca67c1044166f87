//! Migration integration tests
//!
//! End-to-end and failure-path scenarios driving [`NetworkMigrator`] over
//! in-memory source and destination ledgers.

use std::sync::Arc;

use cn_migrate::{
    Account, Address, InMemoryLedger, LedgerAccessor, MigrateConfig, MigrateError,
    MigrationPhase, NetworkMigrator, ReceiptStatus, SignerConfig,
};

fn addr(n: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = n;
    Address(bytes)
}

fn config() -> MigrateConfig {
    MigrateConfig::new(
        addr(0xf0),
        addr(0xf1),
        SignerConfig::NodeAccount { from: addr(0xf2) },
    )
}

fn trustline(
    creditline_given: u64,
    creditline_received: u64,
    balance: i128,
) -> Account {
    Account {
        creditline_given,
        creditline_received,
        interest_rate_given: 5,
        interest_rate_received: 7,
        is_frozen: false,
        m_time: 1_700_000_000,
        balance,
    }
}

/// Source ledger from the reference scenario: users {A, B, C}, trustlines
/// A-B (credit 100/150) and B-C (credit 200/250), frozen, named "TestCoin".
async fn seeded_source() -> Arc<InMemoryLedger> {
    let source = Arc::new(InMemoryLedger::new("TestCoin"));
    source
        .seed_trustline(addr(1), addr(2), trustline(100, 150, 20))
        .await;
    source
        .seed_trustline(addr(2), addr(3), trustline(200, 250, -35))
        .await;
    source.seed_onboarder(addr(1), Address::ZERO).await;
    source.seed_onboarder(addr(2), addr(1)).await;
    source.seed_onboarder(addr(3), addr(2)).await;
    source.set_frozen(true).await;
    source
}

async fn frozen_destination() -> Arc<InMemoryLedger> {
    let destination = Arc::new(InMemoryLedger::new("TestCoin"));
    destination.set_frozen(true).await;
    destination
}

#[tokio::test]
async fn test_end_to_end_migration() {
    let source = seeded_source().await;
    source.seed_debt_event(addr(1), addr(2), 12).await;
    let destination = frozen_destination().await;

    let mut migrator =
        NetworkMigrator::new(&config(), source.clone(), destination.clone()).unwrap();
    let report = migrator.run().await.unwrap();

    assert_eq!(migrator.phase(), MigrationPhase::OwnerRemoved);
    assert_eq!(report.users, 3);
    assert_eq!(report.accounts_submitted, 2);
    assert_eq!(report.onboarders_submitted, 3);
    assert_eq!(report.debts_submitted, 1);

    // Account state copied field-exactly, both views consistent
    for (a, b) in [(addr(1), addr(2)), (addr(2), addr(3))] {
        let source_view = source.get_account(a, b).await.unwrap();
        let dest_view = destination.get_account(a, b).await.unwrap();
        assert_eq!(dest_view, source_view);

        let reverse = destination.get_account(b, a).await.unwrap();
        assert_eq!(reverse.balance, -dest_view.balance);
        assert_eq!(reverse, dest_view.reversed());
    }

    // The destination knows the full user set
    let users = destination.get_users().await.unwrap();
    assert_eq!(users, [addr(1), addr(2), addr(3)].into_iter().collect());

    // Onboarders copied, including the self-onboarded zero marker
    assert_eq!(destination.get_onboarder(addr(1)).await.unwrap(), Address::ZERO);
    assert_eq!(destination.get_onboarder(addr(2)).await.unwrap(), addr(1));
    assert_eq!(destination.get_onboarder(addr(3)).await.unwrap(), addr(2));

    // Debt replayed under the canonical key
    assert_eq!(destination.debt_between(addr(1), addr(2)).await, 12);

    // Flipped live: unfrozen, owner dropped
    assert!(!destination.is_frozen().await.unwrap());
    assert!(!destination.has_owner().await);

    // Privileged calls now fail with an authorization error
    assert!(matches!(
        destination.submit_unfreeze().await,
        Err(MigrateError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn test_failed_account_tx_aborts_before_onboarders() {
    let source = seeded_source().await;
    let destination = frozen_destination().await;

    // One of the two account-copy transactions fails finality
    destination.script_receipt(ReceiptStatus::Confirmed).await;
    destination.script_receipt(ReceiptStatus::Failed).await;

    let mut migrator =
        NetworkMigrator::new(&config(), source, destination.clone()).unwrap();
    let err = migrator.run().await.unwrap_err();

    match err {
        MigrateError::TransactionsFailed { failed } => {
            assert_eq!(failed.len(), 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(migrator.phase(), MigrationPhase::Aborted);

    // The onboarder and debt phases were never issued
    assert!(destination.onboarder_table().await.is_empty());
    assert!(destination.debt_table().await.is_empty());

    // And the destination is still frozen with its owner in place
    assert!(destination.is_frozen().await.unwrap());
    assert!(destination.has_owner().await);
}

#[tokio::test]
async fn test_unexpected_receipt_status_is_fatal() {
    let source = seeded_source().await;
    let destination = frozen_destination().await;

    destination.script_receipt(ReceiptStatus::Other(3)).await;

    let mut migrator =
        NetworkMigrator::new(&config(), source, destination.clone()).unwrap();
    let err = migrator.run().await.unwrap_err();
    assert!(matches!(
        err,
        MigrateError::UnexpectedReceiptStatus { status: 3, .. }
    ));
    assert_eq!(migrator.phase(), MigrationPhase::Aborted);
}

#[tokio::test]
async fn test_receipt_timeout_is_fatal() {
    let source = seeded_source().await;
    let destination = frozen_destination().await;

    destination.script_timeout().await;

    let mut migrator =
        NetworkMigrator::new(&config(), source, destination.clone()).unwrap();
    let err = migrator.run().await.unwrap_err();
    assert!(matches!(err, MigrateError::ReceiptTimeout { .. }));
    assert_eq!(migrator.phase(), MigrationPhase::Aborted);
}

#[tokio::test]
async fn test_small_queue_size_still_migrates_everything() {
    let source = seeded_source().await;
    // Extra trustlines so the account phase spans several drains
    source
        .seed_trustline(addr(1), addr(4), trustline(10, 20, 1))
        .await;
    source
        .seed_trustline(addr(3), addr(5), trustline(30, 40, -2))
        .await;
    let destination = frozen_destination().await;

    let mut small = config();
    small.max_tx_queue_size = 1;

    let mut migrator =
        NetworkMigrator::new(&small, source.clone(), destination.clone()).unwrap();
    let report = migrator.run().await.unwrap();
    assert_eq!(report.accounts_submitted, 4);

    for (a, b) in [
        (addr(1), addr(2)),
        (addr(2), addr(3)),
        (addr(1), addr(4)),
        (addr(3), addr(5)),
    ] {
        assert_eq!(
            destination.get_account(a, b).await.unwrap(),
            source.get_account(a, b).await.unwrap()
        );
    }
}

#[tokio::test]
async fn test_migration_overwrites_preseeded_destination_state() {
    let source = seeded_source().await;
    source.seed_debt_event(addr(1), addr(2), 12).await;

    // The destination already holds stale state for the same pairs
    let destination = Arc::new(InMemoryLedger::new("TestCoin"));
    destination
        .seed_trustline(addr(1), addr(2), trustline(999, 999, 999))
        .await;
    destination.seed_onboarder(addr(2), addr(3)).await;
    destination.seed_debt_event(addr(1), addr(2), 999).await;
    destination.set_frozen(true).await;

    let mut migrator =
        NetworkMigrator::new(&config(), source.clone(), destination.clone()).unwrap();
    migrator.run().await.unwrap();

    assert_eq!(
        destination.get_account(addr(1), addr(2)).await.unwrap(),
        source.get_account(addr(1), addr(2)).await.unwrap()
    );
    assert_eq!(destination.get_onboarder(addr(2)).await.unwrap(), addr(1));
    assert_eq!(destination.debt_between(addr(1), addr(2)).await, 12);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let source = seeded_source().await;
    source.seed_debt_event(addr(2), addr(3), -8).await;
    let destination = frozen_destination().await;

    let mut migrator =
        NetworkMigrator::new(&config(), source.clone(), destination.clone()).unwrap();
    migrator.run().await.unwrap();

    let accounts_after_first = destination.account_table().await;
    let onboarders_after_first = destination.onboarder_table().await;
    let debts_after_first = destination.debt_table().await;

    // Re-arm the destination as if the run were being repeated from the top
    destination.set_frozen(true).await;
    destination.set_owner(true).await;

    let mut migrator =
        NetworkMigrator::new(&config(), source, destination.clone()).unwrap();
    migrator.run().await.unwrap();

    // Overwrite semantics: the second run changes nothing
    assert_eq!(destination.account_table().await, accounts_after_first);
    assert_eq!(destination.onboarder_table().await, onboarders_after_first);
    assert_eq!(destination.debt_table().await, debts_after_first);
}

#[tokio::test]
async fn test_debts_of_non_users_are_migrated() {
    let source = seeded_source().await;
    // Addresses 8 and 9 hold no trustline but still owe each other
    source.seed_debt_event(addr(8), addr(9), 77).await;
    let destination = frozen_destination().await;

    let mut migrator =
        NetworkMigrator::new(&config(), source, destination.clone()).unwrap();
    let report = migrator.run().await.unwrap();

    assert_eq!(report.debts_submitted, 1);
    assert_eq!(destination.debt_between(addr(8), addr(9)).await, 77);
}

#[tokio::test]
async fn test_zero_debt_overwrites_destination_value() {
    let source = seeded_source().await;
    // Latest event zeroes the debt out; the zero must still be migrated
    source.seed_debt_event(addr(1), addr(2), 50).await;
    source.seed_debt_event(addr(1), addr(2), 0).await;

    let destination = frozen_destination().await;
    destination.seed_debt_event(addr(1), addr(2), 50).await;

    let mut migrator =
        NetworkMigrator::new(&config(), source, destination.clone()).unwrap();
    let report = migrator.run().await.unwrap();

    assert_eq!(report.debts_submitted, 1);
    assert_eq!(destination.debt_between(addr(1), addr(2)).await, 0);
}

#[tokio::test]
async fn test_destination_not_frozen_is_rejected_without_writes() {
    let source = seeded_source().await;
    let destination = Arc::new(InMemoryLedger::new("TestCoin"));

    let mut migrator =
        NetworkMigrator::new(&config(), source, destination.clone()).unwrap();
    let err = migrator.run().await.unwrap_err();
    assert!(matches!(err, MigrateError::Precondition(_)));
    assert!(destination.account_table().await.is_empty());
}
