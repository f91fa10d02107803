//! # Escrow Terms, Flags, and Snapshots
//!
//! Typed views over the raw [`StateStore`]:
//!
//! - [`EscrowTerms`]: the six immutable fields fixed at creation.
//! - [`CreationArgs`]: the positional argument encoding of the terms.
//! - [`EscrowFlags`]: the five one-way lifecycle flags.
//! - [`EscrowSnapshot`]: terms and flags together, serializable and
//!   digestible.

use rental_core::{Address, CanonicalBytes, ContentDigest, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::EscrowError;
use crate::store::{StateKey, StateStore, StateValue};

/// Number of positional creation arguments.
pub const CREATION_ARG_COUNT: usize = 6;

/// Maximum encoded width of an integer creation argument.
const UINT_ARG_MAX_LEN: usize = 8;

/// The immutable terms of a rental agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTerms {
    /// Event organizer (renter); pays deposit and fee.
    pub organizer: Address,
    /// Prop vendor (owner); receives fee and, on damage, the deposit.
    pub vendor: Address,
    /// Refundable security deposit, in base units.
    pub deposit_amount: u64,
    /// Rental fee, in base units.
    pub rental_fee: u64,
    /// Lease start.
    pub lease_start: Timestamp,
    /// Lease end. The timeout grace period counts from here.
    pub lease_end: Timestamp,
}

impl EscrowTerms {
    /// Decode the six positional creation arguments.
    ///
    /// Order: organizer, vendor, deposit_amount, rental_fee, lease_start,
    /// lease_end. Addresses are raw UTF-8 bytes; integers are big-endian,
    /// at most eight bytes (shorter inputs are zero-extended).
    ///
    /// # Errors
    ///
    /// Returns [`EscrowError::InvalidCreationArgs`] unless exactly six
    /// well-formed arguments are supplied.
    pub fn decode_args(args: &[Vec<u8>]) -> Result<Self, EscrowError> {
        if args.len() != CREATION_ARG_COUNT {
            return Err(EscrowError::InvalidCreationArgs(format!(
                "expected exactly {CREATION_ARG_COUNT} arguments, got {}",
                args.len()
            )));
        }
        let organizer = decode_address(&args[0], "organizer")?;
        let vendor = decode_address(&args[1], "vendor")?;
        Ok(Self {
            organizer,
            vendor,
            deposit_amount: decode_uint(&args[2], "deposit_amount")?,
            rental_fee: decode_uint(&args[3], "rental_fee")?,
            lease_start: Timestamp::from_epoch_secs(decode_uint(&args[4], "lease_start")?),
            lease_end: Timestamp::from_epoch_secs(decode_uint(&args[5], "lease_end")?),
        })
    }

    /// Encode as the six positional creation arguments.
    pub fn encode_args(&self) -> Vec<Vec<u8>> {
        vec![
            self.organizer.as_bytes().to_vec(),
            self.vendor.as_bytes().to_vec(),
            self.deposit_amount.to_be_bytes().to_vec(),
            self.rental_fee.to_be_bytes().to_vec(),
            self.lease_start.epoch_secs().to_be_bytes().to_vec(),
            self.lease_end.epoch_secs().to_be_bytes().to_vec(),
        ]
    }

    /// Minimum deposit payment: `deposit_amount + rental_fee`.
    ///
    /// `None` if the sum overflows, in which case no payment can satisfy
    /// the deposit guard.
    pub fn required_deposit(&self) -> Option<u64> {
        self.deposit_amount.checked_add(self.rental_fee)
    }

    /// Earliest ledger time at which the vendor may claim by timeout.
    ///
    /// `None` if `lease_end + grace_period_secs` overflows.
    pub fn timeout_unlocks_at(&self, grace_period_secs: u64) -> Option<Timestamp> {
        self.lease_end.checked_add_secs(grace_period_secs)
    }

    /// Read the terms from an initialized store.
    pub fn load(store: &StateStore) -> Result<Self, EscrowError> {
        Ok(Self {
            organizer: store.address(StateKey::Organizer)?,
            vendor: store.address(StateKey::Vendor)?,
            deposit_amount: store.uint(StateKey::DepositAmount)?,
            rental_fee: store.uint(StateKey::RentalFee)?,
            lease_start: Timestamp::from_epoch_secs(store.uint(StateKey::LeaseStart)?),
            lease_end: Timestamp::from_epoch_secs(store.uint(StateKey::LeaseEnd)?),
        })
    }

    /// The store entries written at creation: six terms and five zeroed flags.
    pub(crate) fn initial_entries(&self) -> Vec<(StateKey, StateValue)> {
        let mut entries = vec![
            (
                StateKey::Organizer,
                StateValue::Bytes(self.organizer.as_bytes().to_vec()),
            ),
            (
                StateKey::Vendor,
                StateValue::Bytes(self.vendor.as_bytes().to_vec()),
            ),
            (StateKey::DepositAmount, StateValue::Uint(self.deposit_amount)),
            (StateKey::RentalFee, StateValue::Uint(self.rental_fee)),
            (
                StateKey::LeaseStart,
                StateValue::Uint(self.lease_start.epoch_secs()),
            ),
            (
                StateKey::LeaseEnd,
                StateValue::Uint(self.lease_end.epoch_secs()),
            ),
        ];
        entries.extend(StateKey::FLAGS.iter().map(|k| (*k, StateValue::Uint(0))));
        entries
    }
}

/// The six raw positional arguments of a creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationArgs(Vec<Vec<u8>>);

impl CreationArgs {
    /// Encode terms as creation arguments.
    pub fn encode(terms: &EscrowTerms) -> Self {
        Self(terms.encode_args())
    }

    /// Wrap raw arguments without validating them.
    pub fn from_raw(args: Vec<Vec<u8>>) -> Self {
        Self(args)
    }

    /// Decode back into terms.
    pub fn decode(&self) -> Result<EscrowTerms, EscrowError> {
        EscrowTerms::decode_args(&self.0)
    }

    pub fn as_slice(&self) -> &[Vec<u8>] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Vec<u8>> {
        self.0
    }
}

fn decode_address(arg: &[u8], name: &str) -> Result<Address, EscrowError> {
    Address::from_bytes(arg)
        .map_err(|e| EscrowError::InvalidCreationArgs(format!("{name}: {e}")))
}

fn decode_uint(arg: &[u8], name: &str) -> Result<u64, EscrowError> {
    if arg.len() > UINT_ARG_MAX_LEN {
        return Err(EscrowError::InvalidCreationArgs(format!(
            "{name}: integer argument is {} bytes, maximum is {UINT_ARG_MAX_LEN}",
            arg.len()
        )));
    }
    Ok(arg.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// The five lifecycle flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EscrowFlags {
    pub deposit_paid: bool,
    pub prop_delivered: bool,
    pub prop_returned: bool,
    pub damage_reported: bool,
    pub dispute_active: bool,
}

impl EscrowFlags {
    /// Read the flags from an initialized store.
    pub fn load(store: &StateStore) -> Result<Self, EscrowError> {
        Ok(Self {
            deposit_paid: store.flag(StateKey::DepositPaid)?,
            prop_delivered: store.flag(StateKey::PropDelivered)?,
            prop_returned: store.flag(StateKey::PropReturned)?,
            damage_reported: store.flag(StateKey::DamageReported)?,
            dispute_active: store.flag(StateKey::DisputeActive)?,
        })
    }

    /// The flags as an array in [`StateKey::FLAGS`] order.
    pub fn as_array(&self) -> [bool; 5] {
        [
            self.deposit_paid,
            self.prop_delivered,
            self.prop_returned,
            self.damage_reported,
            self.dispute_active,
        ]
    }

    /// Whether every flag set in `earlier` is still set here.
    ///
    /// Holds for any pair of snapshots taken in order from the same
    /// contract, since flags are one-way.
    pub fn is_progression_of(&self, earlier: &EscrowFlags) -> bool {
        earlier
            .as_array()
            .iter()
            .zip(self.as_array().iter())
            .all(|(before, after)| !before || *after)
    }
}

/// Decoded contract state: terms plus flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowSnapshot {
    pub terms: EscrowTerms,
    pub flags: EscrowFlags,
}

impl EscrowSnapshot {
    /// Decode a snapshot from an initialized store.
    pub fn load(store: &StateStore) -> Result<Self, EscrowError> {
        Ok(Self {
            terms: EscrowTerms::load(store)?,
            flags: EscrowFlags::load(store)?,
        })
    }

    /// SHA-256 digest of the canonical (JCS) serialization.
    pub fn digest(&self) -> Result<ContentDigest, EscrowError> {
        let canonical = CanonicalBytes::new(self)?;
        Ok(ContentDigest::sha256(&canonical))
    }
}
