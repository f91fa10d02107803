//! # Escrow Error Types
//!
//! Every rejected bundle surfaces one of these variants. Each variant
//! names the transition and the guard that failed, so a caller can tell
//! from the error alone which precondition to fix before resubmitting.
//!
//! No variant is ever recovered from inside the crate: any error voids the
//! whole bundle, state and payments included.

use std::path::PathBuf;

use rental_core::{Address, CanonicalizationError, ContractId, Timestamp};
use thiserror::Error;

use crate::action::Role;
use crate::store::StateKey;

/// Errors arising from escrow transitions and the reference ledger.
#[derive(Error, Debug)]
pub enum EscrowError {
    /// Caller identity does not match the role the transition requires.
    #[error("{transition}: caller {caller} is not the {required}")]
    Authorization {
        /// Transition name.
        transition: &'static str,
        /// Role the caller must hold.
        required: Role,
        /// Authenticated sender of the transition request.
        caller: Address,
    },

    /// A flag is not in the state the transition requires.
    #[error("{transition}: sequencing guard failed: {guard}")]
    Sequence {
        /// Transition name.
        transition: &'static str,
        /// The failing guard, e.g. `deposit_paid == false`.
        guard: String,
    },

    /// The companion operation is missing, of the wrong kind, or does not
    /// match the transition's required sender, receiver, or amount.
    #[error("{transition}: group structure invalid: {reason}")]
    GroupStructure {
        /// Transition name.
        transition: &'static str,
        /// What was wrong with the group.
        reason: String,
    },

    /// `timeout_claim` was invoked before the grace period elapsed.
    #[error("timeout_claim: grace period not elapsed (now {now}, unlocks at {unlocks_at})")]
    TimeoutNotReached {
        /// Ledger time of the bundle.
        now: Timestamp,
        /// Earliest time the claim is accepted, or `never` on overflow.
        unlocks_at: String,
    },

    /// Action identifier is not one of the recognized tokens.
    #[error("unknown action identifier: {0:?}")]
    UnknownAction(String),

    /// State was read before the contract was created.
    #[error("state key not found: {0}")]
    KeyNotFound(StateKey),

    /// Creation arguments are malformed.
    #[error("invalid creation arguments: {0}")]
    InvalidCreationArgs(String),

    /// Clear-state (opt-out) calls are always rejected.
    #[error("clear-state rejected for {contract}: escrow history cannot be removed")]
    ClearStateRejected {
        /// The contract the call targeted.
        contract: ContractId,
    },

    /// A stored value has the wrong type for its key.
    #[error("state key {key} does not hold a valid {expected}")]
    StateEncoding {
        /// The offending key.
        key: StateKey,
        /// Expected value type.
        expected: &'static str,
    },

    /// An approval was committed against a different state than the one
    /// it was evaluated on.
    #[error("stale approval: evaluated at state version {evaluated}, contract is at {current}")]
    StaleApproval {
        /// Version the approval was evaluated at.
        evaluated: u64,
        /// Current contract version.
        current: u64,
    },

    /// A payment sender cannot cover the amount.
    #[error("insufficient funds in {account}: required {required}, available {available}")]
    InsufficientFunds {
        /// The paying account.
        account: Address,
        /// Amount required.
        required: u64,
        /// Current balance.
        available: u64,
    },

    /// Crediting a payment would overflow the receiving account.
    #[error("balance overflow in {account}: balance {balance}, credit {credit}")]
    BalanceOverflow {
        /// The receiving account.
        account: Address,
        /// Current balance.
        balance: u64,
        /// Amount being credited.
        credit: u64,
    },

    /// The ledger holds no contract with this id.
    #[error("{0} not found")]
    ContractNotFound(ContractId),

    /// The reference ledger cannot execute this operation kind.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Canonicalization error during snapshot digest computation.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Fieldless classification of [`EscrowError`] for matching in callers
/// and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authorization,
    Sequence,
    GroupStructure,
    TimeoutNotReached,
    UnknownAction,
    KeyNotFound,
    InvalidCreationArgs,
    ClearStateRejected,
    StateEncoding,
    StaleApproval,
    InsufficientFunds,
    BalanceOverflow,
    ContractNotFound,
    UnsupportedOperation,
    Canonicalization,
}

impl EscrowError {
    /// The error's classification.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Authorization { .. } => ErrorKind::Authorization,
            Self::Sequence { .. } => ErrorKind::Sequence,
            Self::GroupStructure { .. } => ErrorKind::GroupStructure,
            Self::TimeoutNotReached { .. } => ErrorKind::TimeoutNotReached,
            Self::UnknownAction(_) => ErrorKind::UnknownAction,
            Self::KeyNotFound(_) => ErrorKind::KeyNotFound,
            Self::InvalidCreationArgs(_) => ErrorKind::InvalidCreationArgs,
            Self::ClearStateRejected { .. } => ErrorKind::ClearStateRejected,
            Self::StateEncoding { .. } => ErrorKind::StateEncoding,
            Self::StaleApproval { .. } => ErrorKind::StaleApproval,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::BalanceOverflow { .. } => ErrorKind::BalanceOverflow,
            Self::ContractNotFound(_) => ErrorKind::ContractNotFound,
            Self::UnsupportedOperation(_) => ErrorKind::UnsupportedOperation,
            Self::Canonicalization(_) => ErrorKind::Canonicalization,
        }
    }
}

/// Errors loading escrow or ledger configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Configuration is not valid YAML for the expected schema.
    #[error("failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[test]
    fn authorization_display_names_role_and_caller() {
        let err = EscrowError::Authorization {
            transition: "delivery",
            required: Role::Vendor,
            caller: addr("MALLORY"),
        };
        let msg = err.to_string();
        assert!(msg.contains("delivery"));
        assert!(msg.contains("MALLORY"));
        assert!(msg.contains("vendor"));
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn sequence_display_names_guard() {
        let err = EscrowError::Sequence {
            transition: "deposit",
            guard: "deposit_paid == false".to_string(),
        };
        assert!(err.to_string().contains("deposit_paid == false"));
        assert_eq!(err.kind(), ErrorKind::Sequence);
    }

    #[test]
    fn timeout_display() {
        let err = EscrowError::TimeoutNotReached {
            now: Timestamp::from_epoch_secs(1_731_859_200),
            unlocks_at: Timestamp::from_epoch_secs(1_734_451_200).to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("2024-11-17T16:00:00Z"));
        assert!(msg.contains("2024-12-17T16:00:00Z"));
    }

    #[test]
    fn key_not_found_display() {
        let err = EscrowError::KeyNotFound(StateKey::Organizer);
        assert_eq!(err.to_string(), "state key not found: organizer");
        assert_eq!(err.kind(), ErrorKind::KeyNotFound);
    }

    #[test]
    fn clear_state_display() {
        let err = EscrowError::ClearStateRejected {
            contract: ContractId::new(7),
        };
        assert!(err.to_string().contains("contract:7"));
    }

    #[test]
    fn insufficient_funds_display() {
        let err = EscrowError::InsufficientFunds {
            account: addr("ORG"),
            required: 150,
            available: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("150"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn balance_overflow_display() {
        let err = EscrowError::BalanceOverflow {
            account: addr("VEN"),
            balance: u64::MAX,
            credit: 100,
        };
        let msg = err.to_string();
        assert!(msg.contains("VEN"));
        assert!(msg.contains(&u64::MAX.to_string()));
        assert_eq!(err.kind(), ErrorKind::BalanceOverflow);
    }
}
