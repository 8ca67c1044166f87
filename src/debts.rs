//! Debt Reconstruction
//!
//! The source ledger never exposes its net-debt table directly; it has to be
//! rebuilt from the chronological DebtUpdate event history. Each event
//! carries an absolute replacement value for one pair, so the table is a
//! plain fold that keeps the latest value per canonical pair.

use std::collections::BTreeMap;

use crate::types::{Address, DebtUpdateEvent};

/// Canonical key for an undirected debt relationship: `(max, min)`
pub type DebtKey = (Address, Address);

/// Canonicalize one debt update
///
/// The stored key is always `(greater address, lesser address)` and the sign
/// is positive when the greater address is the debtor. An event whose
/// creditor is numerically smaller than its debtor is stored as-is; otherwise
/// the value's sign flips.
pub fn canonical_debt(creditor: Address, debtor: Address, value: i128) -> (DebtKey, i128) {
    if creditor < debtor {
        ((debtor, creditor), value)
    } else {
        ((creditor, debtor), -value)
    }
}

/// Fold a chronological event history into the net-debt table
///
/// Later events unconditionally overwrite earlier ones for the same canonical
/// pair; values are absolute, never summed. The fold is deterministic for a
/// fixed sequence but not commutative: reordering two events that touch the
/// same pair changes the result. Zero values stay in the table because a zero
/// may overwrite nonzero state on the destination.
pub fn reconstruct(events: &[DebtUpdateEvent]) -> BTreeMap<DebtKey, i128> {
    let mut debts = BTreeMap::new();
    for event in events {
        let (key, value) = canonical_debt(event.creditor, event.debtor, event.new_debt);
        debts.insert(key, value);
    }
    debts
}
