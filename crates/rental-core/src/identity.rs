//! # Ledger Identity Newtypes
//!
//! Newtype wrappers for the identities the escrow contract compares:
//! account addresses and contract identifiers. You cannot pass a
//! `ContractId` where an `Address` is expected.
//!
//! ## Security Invariant
//!
//! Every guard in the escrow state machine is an equality check between
//! an authenticated sender and a stored `Address`. Validating addresses at
//! construction means a stored organizer or vendor can never be an empty
//! or whitespace-padded string that silently fails to match.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ValidationError;

/// Maximum address length in bytes.
pub const MAX_ADDRESS_LEN: usize = 64;

/// A ledger account address.
///
/// Addresses are opaque ASCII alphanumeric strings of 1 to 64 characters.
/// The escrow contract stores them as raw bytes and compares them for
/// equality only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Create an address from a string, validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidAddress`] if the value is empty,
    /// longer than [`MAX_ADDRESS_LEN`], or contains characters other than
    /// ASCII letters and digits.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// Decode an address from raw bytes as stored in contract state.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NonUtf8Address`] for non-UTF-8 input and
    /// [`ValidationError::InvalidAddress`] for malformed addresses.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValidationError> {
        let s = std::str::from_utf8(bytes).map_err(|_| ValidationError::NonUtf8Address)?;
        Self::new(s)
    }

    /// Derive the escrow account address owned by a deployed contract.
    ///
    /// SHA-256 over `"appID" || id (big-endian)`, rendered as `APP` followed
    /// by the upper-case hex of the first 16 digest bytes. Deterministic, so
    /// every party computes the same escrow address from the contract id.
    pub fn for_contract(id: ContractId) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"appID");
        hasher.update(id.value().to_be_bytes());
        let hash = hasher.finalize();
        let hex: String = hash[..16].iter().map(|b| format!("{b:02X}")).collect();
        Self(format!("APP{hex}"))
    }

    fn validate(s: &str) -> Result<(), ValidationError> {
        if s.is_empty()
            || s.len() > MAX_ADDRESS_LEN
            || !s.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ValidationError::InvalidAddress(s.to_string()));
        }
        Ok(())
    }

    /// Access the address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The raw bytes stored in contract state for this address.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Address {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

/// Identifier of a deployed escrow contract, assigned by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContractId(u64);

impl ContractId {
    /// Wrap a ledger-assigned application id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The numeric id.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ContractId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "contract:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_alphanumeric_address() {
        let addr = Address::new("ORGANIZER7Q2").unwrap();
        assert_eq!(addr.as_str(), "ORGANIZER7Q2");
        assert_eq!(addr.to_string(), "ORGANIZER7Q2");
    }

    #[test]
    fn rejects_empty_address() {
        assert_eq!(
            Address::new(""),
            Err(ValidationError::InvalidAddress(String::new()))
        );
    }

    #[test]
    fn rejects_whitespace_and_punctuation() {
        assert!(Address::new("VENDOR ").is_err());
        assert!(Address::new("VEN-DOR").is_err());
    }

    #[test]
    fn rejects_overlong_address() {
        let long = "A".repeat(MAX_ADDRESS_LEN + 1);
        assert!(Address::new(long).is_err());
        assert!(Address::new("A".repeat(MAX_ADDRESS_LEN)).is_ok());
    }

    #[test]
    fn from_bytes_round_trips() {
        let addr = Address::new("VENDORB").unwrap();
        assert_eq!(Address::from_bytes(addr.as_bytes()).unwrap(), addr);
    }

    #[test]
    fn from_bytes_rejects_non_utf8() {
        assert_eq!(
            Address::from_bytes(&[0xff, 0xfe]),
            Err(ValidationError::NonUtf8Address)
        );
    }

    #[test]
    fn contract_address_is_deterministic_and_distinct() {
        let a1 = Address::for_contract(ContractId::new(1));
        let a1_again = Address::for_contract(ContractId::new(1));
        let a2 = Address::for_contract(ContractId::new(2));
        assert_eq!(a1, a1_again);
        assert_ne!(a1, a2);
        assert!(a1.as_str().starts_with("APP"));
        assert_eq!(a1.as_str().len(), 3 + 32);
        assert!(Address::new(a1.as_str()).is_ok());
    }

    #[test]
    fn serde_rejects_invalid_address() {
        let ok: Address = serde_json::from_str("\"ABC123\"").unwrap();
        assert_eq!(ok.as_str(), "ABC123");
        assert!(serde_json::from_str::<Address>("\"not valid\"").is_err());
    }

    #[test]
    fn contract_id_display() {
        assert_eq!(ContractId::new(42).to_string(), "contract:42");
    }
}
