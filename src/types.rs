//! Core Migration Types
//!
//! Addresses, transaction hashes, trustline accounts, debt update events and
//! receipt statuses shared by the migration components.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MigrateError;

/// Ledger participant address
///
/// Fixed-width 20 byte identifier. Ordering is numeric (big-endian byte
/// order) and is used to canonicalize undirected pairs.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The zero address, used as the self-onboarded marker
    pub const ZERO: Address = Address([0u8; 20]);

    /// Whether this is the zero address
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_str = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(hex_str)?;
        let bytes: [u8; 20] = bytes.try_into().map_err(|_| {
            MigrateError::Configuration(format!("Address must be 20 bytes: {}", s))
        })?;
        Ok(Address(bytes))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Transaction hash
///
/// Opaque identifier of a submitted ledger transaction.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl FromStr for TxHash {
    type Err = MigrateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_str = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(hex_str)?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| {
            MigrateError::Configuration(format!("Transaction hash must be 32 bytes: {}", s))
        })?;
        Ok(TxHash(bytes))
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// One directional view of a trustline between two addresses
///
/// `Account` as read via `get_account(a, b)` holds the fields from `a`'s
/// perspective. The `(b, a)` view of the same relationship has the
/// given/received field pairs swapped and the balance negated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Credit line extended by the first address to the second
    pub creditline_given: u64,
    /// Credit line extended by the second address to the first
    pub creditline_received: u64,
    /// Interest rate on credit given
    pub interest_rate_given: i16,
    /// Interest rate on credit received
    pub interest_rate_received: i16,
    /// Whether this single trustline is frozen
    pub is_frozen: bool,
    /// Last modification time (ledger timestamp)
    pub m_time: u64,
    /// Raw balance, positive when the second address owes the first
    pub balance: i128,
}

impl Account {
    /// The same relationship seen from the other side
    ///
    /// Swaps the given/received pairs and negates the balance, so that
    /// `get_account(a, b).reversed() == get_account(b, a)`.
    pub fn reversed(&self) -> Account {
        Account {
            creditline_given: self.creditline_received,
            creditline_received: self.creditline_given,
            interest_rate_given: self.interest_rate_received,
            interest_rate_received: self.interest_rate_given,
            is_frozen: self.is_frozen,
            m_time: self.m_time,
            balance: -self.balance,
        }
    }
}

/// Historical debt update emitted by the source ledger
///
/// `new_debt` is an absolute replacement value, not an increment. The full
/// debt table is the chronological fold of these events, keeping the latest
/// value per canonical pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtUpdateEvent {
    /// Address owed
    pub creditor: Address,
    /// Address owing
    pub debtor: Address,
    /// New absolute debt value
    pub new_debt: i128,
}

/// Resolved status of a transaction receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    /// Transaction was durably applied
    Confirmed,
    /// Transaction reached finality but failed
    Failed,
    /// Any other status word; indicates a malfunctioning ledger accessor
    Other(u64),
}

impl ReceiptStatus {
    /// Map a raw receipt status word to its finality semantics
    ///
    /// `1` is confirmed, `0` is failed, anything else is fatal for the
    /// migration because it means the accessor itself is misbehaving.
    pub fn from_word(word: u64) -> ReceiptStatus {
        match word {
            1 => ReceiptStatus::Confirmed,
            0 => ReceiptStatus::Failed,
            other => ReceiptStatus::Other(other),
        }
    }
}
