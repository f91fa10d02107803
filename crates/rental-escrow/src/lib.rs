//! # rental-escrow — Rental Escrow State Machine
//!
//! A three-party custodial contract for a prop rental. The organizer pays
//! a deposit and rental fee into escrow, the vendor confirms delivery, the
//! organizer confirms return, and the funds settle to whoever the recorded
//! lifecycle says is owed them. The vendor may report damage (opening a
//! dispute that redirects the deposit) or, if the lease is never resolved,
//! sweep the escrow after a grace period.
//!
//! ## Architecture
//!
//! - **State Store** ([`store`]): the eleven persisted fields. Six terms
//!   fixed at creation and five one-way flags. Writes are crate-private.
//!
//! - **Dispatcher** ([`dispatch`]): parses the action token once into the
//!   closed [`Action`] enum, routes creation separately, and rejects
//!   clear-state calls.
//!
//! - **Validator/Executor** ([`guard`], [`executor`]): per-transition
//!   guards over committed state and the companion payment, and the
//!   two-phase evaluate/commit that is the only write path.
//!
//! - **Reference ledger** ([`ledger`]): an in-memory atomic bundle
//!   executor that pairs each state commit with its fund movement.
//!
//! ## Transitions
//!
//! | Action | Caller | Requires | Sets | Payment |
//! |---|---|---|---|---|
//! | `deposit` | organizer | `!deposit_paid` | `deposit_paid` | organizer → escrow, ≥ deposit + fee |
//! | `delivery` | vendor | `deposit_paid`, `!prop_delivered` | `prop_delivered` | none |
//! | `return` | organizer | `prop_delivered`, `!prop_returned` | `prop_returned` | none |
//! | `damage` | vendor | `prop_returned` | `damage_reported`, `dispute_active` | none |
//! | `release_fee` | any | `prop_delivered` | | escrow → vendor, = fee |
//! | `refund` | any | `prop_returned`, `!damage_reported`, `!dispute_active` | | escrow → organizer, = deposit |
//! | `claim` | any | `damage_reported` | | escrow → vendor, = deposit |
//! | `timeout` | vendor | now ≥ lease_end + grace | | escrow → vendor, close remainder to vendor |
//!
//! Settlement transitions carry no "already settled" guard and can be
//! replayed while the escrow account still holds funds.
//!
//! ## Crate Policy
//!
//! - No subscriber is installed; `tracing` events go to whatever the
//!   embedding binary configures.
//! - No `.unwrap()` outside tests.

pub mod action;
pub mod bundle;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod guard;
pub mod ledger;
pub mod store;
pub mod terms;

pub use action::{Action, Role};
pub use bundle::{AppCall, AssetTransfer, Bundle, CallKind, Operation, Payment};
pub use config::{EscrowConfig, LedgerConfig, DEFAULT_GRACE_PERIOD_SECS};
pub use dispatch::Route;
pub use error::{ConfigError, ErrorKind, EscrowError};
pub use executor::{Approval, EscrowContract, TransitionRecord};
pub use guard::Effect;
pub use ledger::{Ledger, Receipt, Transfer};
pub use store::{StateKey, StateSchema, StateStore, StateValue, ValueType};
pub use terms::{CreationArgs, EscrowFlags, EscrowSnapshot, EscrowTerms, CREATION_ARG_COUNT};
