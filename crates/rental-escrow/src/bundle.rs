//! # Bundles
//!
//! An atomic group of operations submitted together: exactly one
//! application call (the transition request) in the first slot, followed
//! by zero or more companion operations. The ledger applies a bundle
//! all-or-nothing.

use rental_core::Address;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::terms::{CreationArgs, EscrowTerms};

/// A native-currency payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub sender: Address,
    pub receiver: Address,
    pub amount: u64,
    /// If set, after paying `amount` the sender's entire remaining balance
    /// is swept to this address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_remainder_to: Option<Address>,
}

impl Payment {
    pub fn new(sender: Address, receiver: Address, amount: u64) -> Self {
        Self {
            sender,
            receiver,
            amount,
            close_remainder_to: None,
        }
    }

    /// Sweep the sender's remaining balance to `to` after the transfer.
    pub fn close_remainder_to(mut self, to: Address) -> Self {
        self.close_remainder_to = Some(to);
        self
    }
}

/// A transfer of a non-native asset. Never valid as an escrow companion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTransfer {
    pub sender: Address,
    pub receiver: Address,
    pub asset_id: u64,
    pub amount: u64,
}

/// A companion operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    Payment(Payment),
    AssetTransfer(AssetTransfer),
}

impl Operation {
    /// Operation kind name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Payment(_) => "payment",
            Self::AssetTransfer(_) => "asset_transfer",
        }
    }

    pub fn sender(&self) -> &Address {
        match self {
            Self::Payment(p) => &p.sender,
            Self::AssetTransfer(t) => &t.sender,
        }
    }
}

/// How the application call is dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "on_completion", rename_all = "snake_case")]
pub enum CallKind {
    /// Initialize the contract with six positional arguments.
    Create { args: Vec<Vec<u8>> },
    /// Run a transition; the first argument is the action token.
    NoOp { args: Vec<Vec<u8>> },
    /// Opt out and discard the caller's state. Always rejected.
    ClearState,
}

/// The transition request: authenticated sender plus call kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCall {
    pub sender: Address,
    pub kind: CallKind,
}

/// An atomic group: the application call followed by its companions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    pub call: AppCall,
    #[serde(default)]
    pub companions: Vec<Operation>,
}

impl Bundle {
    /// A creation bundle carrying the encoded terms.
    pub fn create(sender: Address, terms: &EscrowTerms) -> Self {
        Self::create_raw(sender, CreationArgs::encode(terms).into_vec())
    }

    /// A creation bundle with arbitrary raw arguments.
    pub fn create_raw(sender: Address, args: Vec<Vec<u8>>) -> Self {
        Self {
            call: AppCall {
                sender,
                kind: CallKind::Create { args },
            },
            companions: Vec::new(),
        }
    }

    /// A transition request for `action`, with no companion yet.
    pub fn invoke(sender: Address, action: Action) -> Self {
        Self::invoke_raw(sender, vec![action.token().as_bytes().to_vec()])
    }

    /// A transition request with arbitrary raw arguments.
    pub fn invoke_raw(sender: Address, args: Vec<Vec<u8>>) -> Self {
        Self {
            call: AppCall {
                sender,
                kind: CallKind::NoOp { args },
            },
            companions: Vec::new(),
        }
    }

    /// A clear-state call.
    pub fn clear_state(sender: Address) -> Self {
        Self {
            call: AppCall {
                sender,
                kind: CallKind::ClearState,
            },
            companions: Vec::new(),
        }
    }

    /// Append a companion payment.
    pub fn with_payment(self, payment: Payment) -> Self {
        self.with_operation(Operation::Payment(payment))
    }

    /// Append an arbitrary companion operation.
    pub fn with_operation(mut self, op: Operation) -> Self {
        self.companions.push(op);
        self
    }

    /// Total operations in the group, the application call included.
    pub fn group_size(&self) -> usize {
        1 + self.companions.len()
    }

    /// Authenticated sender of the transition request.
    pub fn caller(&self) -> &Address {
        &self.call.sender
    }
}
