//! # Actions
//!
//! The closed set of post-creation transitions. Raw action tokens arrive
//! as bytes in the first call argument and are parsed exactly once, in
//! [`Action::from_token`]; everything downstream matches on the enum.

use serde::{Deserialize, Serialize};

use crate::error::EscrowError;

/// A post-creation transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Organizer pays deposit plus rental fee into escrow.
    Deposit,
    /// Vendor confirms the prop was delivered.
    Delivery,
    /// Organizer confirms the prop was returned.
    Return,
    /// Vendor reports damage, opening a dispute.
    Damage,
    /// Rental fee is paid out to the vendor.
    ReleaseFee,
    /// Deposit is refunded to the organizer.
    Refund,
    /// Deposit is paid to the vendor after a damage report.
    Claim,
    /// Vendor sweeps the escrow after the grace period.
    Timeout,
}

/// Who may submit a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Organizer,
    Vendor,
    /// Any sender able to assemble the bundle.
    Any,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Organizer => "organizer",
            Self::Vendor => "vendor",
            Self::Any => "any",
        })
    }
}

impl Action {
    /// Every action, in lifecycle order.
    pub const ALL: [Action; 8] = [
        Self::Deposit,
        Self::Delivery,
        Self::Return,
        Self::Damage,
        Self::ReleaseFee,
        Self::Refund,
        Self::Claim,
        Self::Timeout,
    ];

    /// The wire token carried in the first call argument.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Delivery => "delivery",
            Self::Return => "return",
            Self::Damage => "damage",
            Self::ReleaseFee => "release_fee",
            Self::Refund => "refund",
            Self::Claim => "claim",
            Self::Timeout => "timeout",
        }
    }

    /// Parse a wire token.
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::UnknownAction`] for anything outside the
    /// eight recognized tokens. Matching is exact and case-sensitive.
    pub fn from_token(token: &[u8]) -> Result<Self, EscrowError> {
        Self::ALL
            .into_iter()
            .find(|a| a.token().as_bytes() == token)
            .ok_or_else(|| EscrowError::UnknownAction(String::from_utf8_lossy(token).into_owned()))
    }

    /// Transition name used in errors and history. Identical to the token
    /// except `timeout`, whose transition is `timeout_claim`.
    pub fn transition_name(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout_claim",
            other => other.token(),
        }
    }

    /// The role whose identity the caller must match.
    pub fn authorized_role(&self) -> Role {
        match self {
            Self::Deposit | Self::Return => Role::Organizer,
            Self::Delivery | Self::Damage | Self::Timeout => Role::Vendor,
            Self::ReleaseFee | Self::Refund | Self::Claim => Role::Any,
        }
    }

    /// Whether the bundle must carry exactly one companion payment.
    pub fn requires_payment(&self) -> bool {
        !matches!(self, Self::Delivery | Self::Return | Self::Damage)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

impl std::str::FromStr for Action {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s.as_bytes())
    }
}
