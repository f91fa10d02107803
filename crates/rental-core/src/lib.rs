//! # rental-core — Foundational Types for the Rental Escrow Stack
//!
//! Defines the domain primitives every other crate in the workspace builds
//! on. This crate depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for ledger primitives.** `Address` and `ContractId`
//!    are distinct types with validated constructors. No bare strings or
//!    integers for identities.
//!
//! 2. **`CanonicalBytes` newtype.** All digest computation flows through
//!    `CanonicalBytes::new()`, so two snapshots of the same escrow state
//!    always hash to the same value.
//!
//! 3. **Epoch-second timestamps.** `Timestamp` is the unsigned 64-bit Unix
//!    time the ledger reports for the latest committed round, rendered as
//!    UTC ISO8601 with `Z` suffix for humans.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `rental-*` crates (leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::ContentDigest;
pub use error::{CanonicalizationError, ValidationError};
pub use identity::{Address, ContractId};
pub use temporal::Timestamp;
