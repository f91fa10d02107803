//! # State Store
//!
//! The contract's persistent global state: a mapping from a fixed set of
//! eleven keys to either a byte string or an unsigned 64-bit integer.
//!
//! ## Layout
//!
//! | Key | Type |
//! |---|---|
//! | `organizer`, `vendor` | bytes |
//! | `deposit_amount`, `rental_fee`, `lease_start`, `lease_end` | uint |
//! | `deposit_paid`, `prop_delivered`, `prop_returned`, `damage_reported`, `dispute_active` | uint (0/1) |
//!
//! ## Security Invariant
//!
//! Reads are public; writes are `pub(crate)` and only reachable from the
//! executor's commit path. Flags can only be raised, never cleared: the
//! store exposes `raise_flag` and no way to write zero to a flag after
//! initialization.

use std::collections::BTreeMap;

use rental_core::Address;
use serde::{Deserialize, Serialize};

use crate::error::EscrowError;

/// The eleven global state keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKey {
    Organizer,
    Vendor,
    DepositAmount,
    RentalFee,
    LeaseStart,
    LeaseEnd,
    DepositPaid,
    PropDelivered,
    PropReturned,
    DamageReported,
    DisputeActive,
}

/// Type tag of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Bytes,
    Uint,
}

impl StateKey {
    /// Every key, in declaration order.
    pub const ALL: [StateKey; 11] = [
        Self::Organizer,
        Self::Vendor,
        Self::DepositAmount,
        Self::RentalFee,
        Self::LeaseStart,
        Self::LeaseEnd,
        Self::DepositPaid,
        Self::PropDelivered,
        Self::PropReturned,
        Self::DamageReported,
        Self::DisputeActive,
    ];

    /// The five one-way boolean flags.
    pub const FLAGS: [StateKey; 5] = [
        Self::DepositPaid,
        Self::PropDelivered,
        Self::PropReturned,
        Self::DamageReported,
        Self::DisputeActive,
    ];

    /// The persisted key name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organizer => "organizer",
            Self::Vendor => "vendor",
            Self::DepositAmount => "deposit_amount",
            Self::RentalFee => "rental_fee",
            Self::LeaseStart => "lease_start",
            Self::LeaseEnd => "lease_end",
            Self::DepositPaid => "deposit_paid",
            Self::PropDelivered => "prop_delivered",
            Self::PropReturned => "prop_returned",
            Self::DamageReported => "damage_reported",
            Self::DisputeActive => "dispute_active",
        }
    }

    /// Declared value type for this key.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Organizer | Self::Vendor => ValueType::Bytes,
            _ => ValueType::Uint,
        }
    }

    /// Whether this key is one of the one-way flags.
    pub fn is_flag(&self) -> bool {
        Self::FLAGS.contains(self)
    }
}

impl std::fmt::Display for StateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateValue {
    Bytes(Vec<u8>),
    Uint(u64),
}

impl StateValue {
    /// Type tag of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bytes(_) => ValueType::Bytes,
            Self::Uint(_) => ValueType::Uint,
        }
    }
}

/// Declared storage schema: how many entries of each type a contract uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSchema {
    /// Number of byte-string entries.
    pub num_byte_slices: u32,
    /// Number of unsigned-integer entries.
    pub num_uints: u32,
}

impl StateSchema {
    /// Global schema: two addresses, four terms, five flags.
    pub const GLOBAL: StateSchema = StateSchema {
        num_byte_slices: 2,
        num_uints: 9,
    };

    /// Local (per-caller) schema. The contract keeps no local state.
    pub const LOCAL: StateSchema = StateSchema {
        num_byte_slices: 0,
        num_uints: 0,
    };

    /// Total number of entries.
    pub fn total(&self) -> u32 {
        self.num_byte_slices + self.num_uints
    }
}

/// The contract's global key-value state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateStore {
    entries: BTreeMap<StateKey, StateValue>,
}

impl StateStore {
    /// An empty store, as it exists before creation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::KeyNotFound`] if the key has not been written,
    /// which is the case for every key before creation.
    pub fn get(&self, key: StateKey) -> Result<&StateValue, EscrowError> {
        self.entries.get(&key).ok_or(EscrowError::KeyNotFound(key))
    }

    /// Read a byte-string entry as an address.
    pub fn address(&self, key: StateKey) -> Result<Address, EscrowError> {
        match self.get(key)? {
            StateValue::Bytes(bytes) => {
                Address::from_bytes(bytes).map_err(|_| EscrowError::StateEncoding {
                    key,
                    expected: "address",
                })
            }
            StateValue::Uint(_) => Err(EscrowError::StateEncoding {
                key,
                expected: "address",
            }),
        }
    }

    /// Read an unsigned-integer entry.
    pub fn uint(&self, key: StateKey) -> Result<u64, EscrowError> {
        match self.get(key)? {
            StateValue::Uint(v) => Ok(*v),
            StateValue::Bytes(_) => Err(EscrowError::StateEncoding {
                key,
                expected: "uint",
            }),
        }
    }

    /// Read a flag. Any non-zero integer is `true`.
    pub fn flag(&self, key: StateKey) -> Result<bool, EscrowError> {
        Ok(self.uint(key)? != 0)
    }

    /// Whether any state exists (the contract has been created).
    pub fn is_initialized(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&StateKey, &StateValue)> {
        self.entries.iter()
    }

    /// Write a value, enforcing the key's declared type.
    pub(crate) fn put(&mut self, key: StateKey, value: StateValue) -> Result<(), EscrowError> {
        if key.value_type() != value.value_type() {
            return Err(EscrowError::StateEncoding {
                key,
                expected: match key.value_type() {
                    ValueType::Bytes => "bytes",
                    ValueType::Uint => "uint",
                },
            });
        }
        self.entries.insert(key, value);
        Ok(())
    }

    /// Set a flag to 1. The only write path for flags after creation.
    pub(crate) fn raise_flag(&mut self, key: StateKey) -> Result<(), EscrowError> {
        if !key.is_flag() {
            return Err(EscrowError::StateEncoding {
                key,
                expected: "flag",
            });
        }
        self.put(key, StateValue::Uint(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_before_creation_is_key_not_found() {
        let store = StateStore::new();
        for key in StateKey::ALL {
            match store.get(key) {
                Err(EscrowError::KeyNotFound(k)) => assert_eq!(k, key),
                other => panic!("expected KeyNotFound, got {other:?}"),
            }
        }
        assert!(!store.is_initialized());
    }

    #[test]
    fn schema_matches_key_types() {
        let bytes = StateKey::ALL
            .iter()
            .filter(|k| k.value_type() == ValueType::Bytes)
            .count() as u32;
        let uints = StateKey::ALL
            .iter()
            .filter(|k| k.value_type() == ValueType::Uint)
            .count() as u32;
        assert_eq!(bytes, StateSchema::GLOBAL.num_byte_slices);
        assert_eq!(uints, StateSchema::GLOBAL.num_uints);
        assert_eq!(StateSchema::GLOBAL.total(), 11);
        assert_eq!(StateSchema::LOCAL.total(), 0);
    }

    #[test]
    fn put_rejects_type_mismatch() {
        let mut store = StateStore::new();
        assert!(store
            .put(StateKey::Organizer, StateValue::Uint(5))
            .is_err());
        assert!(store
            .put(StateKey::DepositAmount, StateValue::Bytes(b"x".to_vec()))
            .is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn typed_reads() {
        let mut store = StateStore::new();
        store
            .put(StateKey::Vendor, StateValue::Bytes(b"VENDORB".to_vec()))
            .unwrap();
        store
            .put(StateKey::RentalFee, StateValue::Uint(100))
            .unwrap();
        store
            .put(StateKey::DepositPaid, StateValue::Uint(0))
            .unwrap();
        assert_eq!(store.address(StateKey::Vendor).unwrap().as_str(), "VENDORB");
        assert_eq!(store.uint(StateKey::RentalFee).unwrap(), 100);
        assert!(!store.flag(StateKey::DepositPaid).unwrap());
        assert!(matches!(
            store.uint(StateKey::Vendor),
            Err(EscrowError::StateEncoding { .. })
        ));
        assert!(matches!(
            store.address(StateKey::RentalFee),
            Err(EscrowError::StateEncoding { .. })
        ));
    }

    #[test]
    fn undecodable_address_is_encoding_error() {
        let mut store = StateStore::new();
        store
            .put(StateKey::Organizer, StateValue::Bytes(vec![0xff]))
            .unwrap();
        assert!(matches!(
            store.address(StateKey::Organizer),
            Err(EscrowError::StateEncoding { .. })
        ));
    }

    #[test]
    fn raise_flag_only_for_flags() {
        let mut store = StateStore::new();
        store.raise_flag(StateKey::PropDelivered).unwrap();
        assert!(store.flag(StateKey::PropDelivered).unwrap());
        assert!(store.raise_flag(StateKey::LeaseEnd).is_err());
    }

    #[test]
    fn store_serializes_with_key_names() {
        let mut store = StateStore::new();
        store.put(StateKey::LeaseEnd, StateValue::Uint(9)).unwrap();
        let json = serde_json::to_string(&store).unwrap();
        assert_eq!(json, r#"{"entries":{"lease_end":{"uint":9}}}"#);
    }
}
