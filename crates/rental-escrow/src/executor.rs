//! # Transition Executor
//!
//! [`EscrowContract`] owns one contract's [`StateStore`] and its
//! transition history. It is the only code path that writes state.
//!
//! Execution is two-phase:
//!
//! 1. [`EscrowContract::evaluate`] dispatches the bundle, runs the
//!    transition's guard against committed state, and returns an
//!    [`Approval`]. Nothing is written.
//! 2. [`EscrowContract::commit`] applies the approval's effect to a copy
//!    of the store, digests the resulting snapshot, and installs the copy.
//!
//! A caller that also moves funds (the ledger) checks availability
//! between the two phases. If that check fails the approval is dropped
//! and the contract is untouched.

use rental_core::{Address, ContentDigest, ContractId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::bundle::{Bundle, Payment};
use crate::config::EscrowConfig;
use crate::dispatch::{self, Route};
use crate::error::EscrowError;
use crate::guard::{self, Effect, GuardInput, Passed};
use crate::store::StateStore;
use crate::terms::{EscrowFlags, EscrowSnapshot, EscrowTerms};

/// One applied bundle in a contract's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Zero-based position in the contract's history.
    pub sequence: u64,
    /// Transition name (`create`, `deposit`, ..., `timeout_claim`).
    pub transition: String,
    /// Authenticated sender of the transition request.
    pub caller: Address,
    /// Ledger time the bundle was applied.
    pub timestamp: Timestamp,
    /// Companion payment executed with the transition, if any.
    pub payment: Option<Payment>,
    /// Digest of the snapshot after the transition.
    pub state_digest: ContentDigest,
}

/// A bundle that passed its guard and is ready to commit.
///
/// Bound to the contract version it was evaluated against; committing it
/// after any other commit fails with [`EscrowError::StaleApproval`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    version: u64,
    transition: &'static str,
    caller: Address,
    effect: Effect,
    payment: Option<Payment>,
}

impl Approval {
    /// Transition name.
    pub fn transition(&self) -> &'static str {
        self.transition
    }

    pub fn caller(&self) -> &Address {
        &self.caller
    }

    /// The validated companion payment, if the transition moves funds.
    pub fn payment(&self) -> Option<&Payment> {
        self.payment.as_ref()
    }

    /// State writes the commit will perform.
    pub fn effect(&self) -> &Effect {
        &self.effect
    }
}

/// A single rental escrow contract.
#[derive(Debug, Clone)]
pub struct EscrowContract {
    id: ContractId,
    address: Address,
    config: EscrowConfig,
    store: StateStore,
    history: Vec<TransitionRecord>,
}

impl EscrowContract {
    /// An uncreated contract. Its store is empty until a creation bundle
    /// is committed.
    pub fn new(id: ContractId, config: EscrowConfig) -> Self {
        Self {
            id,
            address: Address::for_contract(id),
            config,
            store: StateStore::new(),
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> ContractId {
        self.id
    }

    /// Escrow account address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn config(&self) -> &EscrowConfig {
        &self.config
    }

    pub fn is_created(&self) -> bool {
        self.store.is_initialized()
    }

    /// Read-only view of the raw store.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn terms(&self) -> Result<EscrowTerms, EscrowError> {
        EscrowTerms::load(&self.store)
    }

    pub fn flags(&self) -> Result<EscrowFlags, EscrowError> {
        EscrowFlags::load(&self.store)
    }

    /// Decode the full contract state.
    ///
    /// # Errors
    ///
    /// [`EscrowError::KeyNotFound`] before creation.
    pub fn snapshot(&self) -> Result<EscrowSnapshot, EscrowError> {
        EscrowSnapshot::load(&self.store)
    }

    /// Applied transitions, oldest first.
    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    /// Number of commits so far.
    pub fn version(&self) -> u64 {
        self.history.len() as u64
    }

    /// Dispatch and guard a bundle without writing anything.
    pub fn evaluate(&self, bundle: &Bundle, now: Timestamp) -> Result<Approval, EscrowError> {
        match self.check(bundle, now) {
            Ok((transition, passed)) => Ok(Approval {
                version: self.version(),
                transition,
                caller: bundle.caller().clone(),
                effect: passed.effect,
                payment: passed.payment,
            }),
            Err(e) => {
                tracing::warn!(
                    contract = %self.id,
                    caller = %bundle.caller(),
                    error = %e,
                    "bundle rejected"
                );
                Err(e)
            }
        }
    }

    fn check(
        &self,
        bundle: &Bundle,
        now: Timestamp,
    ) -> Result<(&'static str, Passed), EscrowError> {
        match dispatch::route(self.id, &bundle.call, self.store.is_initialized())? {
            Route::Create(args) => Ok(("create", guard::check_create(args)?)),
            Route::Invoke(action) => {
                let input = GuardInput {
                    store: &self.store,
                    bundle,
                    contract: &self.address,
                    now,
                    grace_period_secs: self.config.grace_period_secs,
                };
                Ok((action.transition_name(), guard::check(action, &input)?))
            }
        }
    }

    /// Apply an approval evaluated against the current version.
    pub fn commit(
        &mut self,
        approval: Approval,
        now: Timestamp,
    ) -> Result<TransitionRecord, EscrowError> {
        if approval.version != self.version() {
            return Err(EscrowError::StaleApproval {
                evaluated: approval.version,
                current: self.version(),
            });
        }

        let mut next = self.store.clone();
        match &approval.effect {
            Effect::Initialize(terms) => {
                for (key, value) in terms.initial_entries() {
                    next.put(key, value)?;
                }
            }
            Effect::Raise(keys) => {
                for key in keys.iter() {
                    next.raise_flag(*key)?;
                }
            }
        }
        let state_digest = EscrowSnapshot::load(&next)?.digest()?;

        let record = TransitionRecord {
            sequence: self.version(),
            transition: approval.transition.to_string(),
            caller: approval.caller,
            timestamp: now,
            payment: approval.payment,
            state_digest,
        };
        self.store = next;
        self.history.push(record.clone());

        tracing::info!(
            contract = %self.id,
            action = record.transition.as_str(),
            caller = %record.caller,
            sequence = record.sequence,
            "transition applied"
        );
        Ok(record)
    }

    /// Evaluate and commit in one step. Moves no funds; the companion
    /// payment is validated and recorded only.
    pub fn execute(
        &mut self,
        bundle: &Bundle,
        now: Timestamp,
    ) -> Result<TransitionRecord, EscrowError> {
        let approval = self.evaluate(bundle, now)?;
        self.commit(approval, now)
    }
}
