//! # Reference Ledger
//!
//! An in-memory atomic bundle executor with exactly the properties the
//! escrow contract relies on:
//!
//! - **Single global order.** All accounts and contracts sit behind one
//!   `parking_lot::Mutex`, held for the whole of [`Ledger::submit`].
//! - **Authenticated senders.** The sender named on an operation is
//!   trusted. A contract account is the exception: it can only pay out
//!   through the companion payment its own guard approved.
//! - **All-or-nothing.** Transfers are simulated on a copy of the balances
//!   and installed together with the contract's state commit. Any failure
//!   leaves state and balances exactly as they were.
//! - **Close remainder.** A payment may sweep the sender's remaining
//!   balance to a named account after the transfer.
//!
//! No fees, no signatures, no consensus.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rental_core::{Address, ContractId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::bundle::{Bundle, Operation, Payment};
use crate::config::LedgerConfig;
use crate::error::EscrowError;
use crate::executor::{Approval, EscrowContract, TransitionRecord};
use crate::store::StateStore;
use crate::terms::{CreationArgs, EscrowSnapshot, EscrowTerms};

/// A balance movement executed as part of a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub amount: u64,
}

/// Outcome of an applied bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Global round number; increments once per applied bundle.
    pub round: u64,
    pub contract: ContractId,
    pub record: TransitionRecord,
    /// Balance movements, in execution order. Close-remainder sweeps
    /// appear as separate entries after their payment.
    pub transfers: Vec<Transfer>,
}

#[derive(Debug)]
struct LedgerState {
    config: LedgerConfig,
    now: Timestamp,
    round: u64,
    next_contract: u64,
    balances: BTreeMap<Address, u64>,
    contracts: BTreeMap<ContractId, EscrowContract>,
}

/// Shared handle to an in-memory ledger.
#[derive(Debug, Clone)]
pub struct Ledger {
    inner: Arc<Mutex<LedgerState>>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LedgerState {
                config,
                now: config.genesis_timestamp,
                round: 0,
                next_contract: 1,
                balances: BTreeMap::new(),
                contracts: BTreeMap::new(),
            })),
        }
    }

    pub fn config(&self) -> LedgerConfig {
        self.inner.lock().config
    }

    // ── Accounts and clock ──────────────────────────────────────────

    /// Credit an account out of thin air. Returns the new balance, or
    /// `BalanceOverflow` with the balance unchanged.
    pub fn fund(&self, account: &Address, amount: u64) -> Result<u64, EscrowError> {
        let mut state = self.inner.lock();
        let balance = state.balances.entry(account.clone()).or_insert(0);
        *balance = credit(account, *balance, amount)?;
        Ok(*balance)
    }

    pub fn balance(&self, account: &Address) -> u64 {
        self.inner.lock().balances.get(account).copied().unwrap_or(0)
    }

    /// Timestamp of the latest round.
    pub fn now(&self) -> Timestamp {
        self.inner.lock().now
    }

    /// Move the clock to `at`. Earlier times are ignored; the clock
    /// never runs backwards. Returns the resulting time.
    pub fn set_time(&self, at: Timestamp) -> Timestamp {
        let mut state = self.inner.lock();
        if at > state.now {
            state.now = at;
        }
        state.now
    }

    /// Advance the clock by `secs`, saturating.
    pub fn advance(&self, secs: u64) -> Timestamp {
        let mut state = self.inner.lock();
        state.now = state.now.saturating_add_secs(secs);
        state.now
    }

    /// Current global round.
    pub fn round(&self) -> u64 {
        self.inner.lock().round
    }

    // ── Contracts ───────────────────────────────────────────────────

    /// Deploy a contract with the given terms.
    pub fn deploy(
        &self,
        creator: &Address,
        terms: &EscrowTerms,
    ) -> Result<ContractId, EscrowError> {
        self.deploy_raw(creator, CreationArgs::encode(terms).into_vec())
    }

    /// Deploy a contract with raw creation arguments. Nothing is
    /// registered if creation fails.
    pub fn deploy_raw(
        &self,
        creator: &Address,
        args: Vec<Vec<u8>>,
    ) -> Result<ContractId, EscrowError> {
        let mut state = self.inner.lock();
        let id = ContractId::new(state.next_contract);
        let mut contract = EscrowContract::new(id, state.config.escrow);
        let bundle = Bundle::create_raw(creator.clone(), args);
        let approval = contract.evaluate(&bundle, state.now)?;
        contract.commit(approval, state.now)?;

        state.next_contract += 1;
        state.round += 1;
        tracing::debug!(contract = %id, address = %contract.address(), "contract deployed");
        state.contracts.insert(id, contract);
        Ok(id)
    }

    /// Apply a bundle to a contract atomically.
    ///
    /// # Errors
    ///
    /// Any guard failure from the contract, plus
    /// [`EscrowError::ContractNotFound`], [`EscrowError::InsufficientFunds`],
    /// [`EscrowError::UnsupportedOperation`], and
    /// [`EscrowError::GroupStructure`] for contract-account spends the
    /// guard did not approve. On error nothing changes.
    pub fn submit(&self, id: ContractId, bundle: &Bundle) -> Result<Receipt, EscrowError> {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        let now = state.now;

        let contract = state
            .contracts
            .get(&id)
            .ok_or(EscrowError::ContractNotFound(id))?;
        let approval = contract.evaluate(bundle, now)?;

        let (balances, transfers) =
            simulate(state, &approval, bundle).map_err(|e| voided(id, e))?;

        let contract = state
            .contracts
            .get_mut(&id)
            .ok_or(EscrowError::ContractNotFound(id))?;
        let record = contract.commit(approval, now)?;

        state.balances = balances;
        state.round += 1;
        for t in &transfers {
            tracing::debug!(from = %t.from, to = %t.to, amount = t.amount, "transfer");
        }
        Ok(Receipt {
            round: state.round,
            contract: id,
            record,
            transfers,
        })
    }

    /// Escrow account address of a deployed contract.
    pub fn contract_address(&self, id: ContractId) -> Result<Address, EscrowError> {
        self.with_contract(id, |c| Ok(c.address().clone()))
    }

    /// Decoded state of a deployed contract.
    pub fn snapshot(&self, id: ContractId) -> Result<EscrowSnapshot, EscrowError> {
        self.with_contract(id, EscrowContract::snapshot)
    }

    pub fn history(&self, id: ContractId) -> Result<Vec<TransitionRecord>, EscrowError> {
        self.with_contract(id, |c| Ok(c.history().to_vec()))
    }

    /// Copy of the raw global state of a deployed contract.
    pub fn read_state(&self, id: ContractId) -> Result<StateStore, EscrowError> {
        self.with_contract(id, |c| Ok(c.store().clone()))
    }

    fn with_contract<T>(
        &self,
        id: ContractId,
        f: impl FnOnce(&EscrowContract) -> Result<T, EscrowError>,
    ) -> Result<T, EscrowError> {
        let state = self.inner.lock();
        let contract = state
            .contracts
            .get(&id)
            .ok_or(EscrowError::ContractNotFound(id))?;
        f(contract)
    }
}

fn voided(contract: ContractId, err: EscrowError) -> EscrowError {
    tracing::warn!(contract = %contract, error = %err, "bundle voided");
    err
}

/// Run every companion against a copy of the balances.
fn simulate(
    state: &LedgerState,
    approval: &Approval,
    bundle: &Bundle,
) -> Result<(BTreeMap<Address, u64>, Vec<Transfer>), EscrowError> {
    let mut balances = state.balances.clone();
    let mut transfers = Vec::new();

    for (index, op) in bundle.companions.iter().enumerate() {
        let payment = match op {
            Operation::Payment(p) => p,
            Operation::AssetTransfer(_) => {
                return Err(EscrowError::UnsupportedOperation(format!(
                    "companion {index} is an asset transfer"
                )))
            }
        };
        let is_contract_account = state
            .contracts
            .values()
            .any(|c| c.address() == &payment.sender);
        let approved = index == 0 && approval.payment() == Some(payment);
        if is_contract_account && !approved {
            return Err(EscrowError::GroupStructure {
                transition: approval.transition(),
                reason: format!(
                    "companion {index} spends from contract account {} without approval",
                    payment.sender
                ),
            });
        }
        apply_payment(&mut balances, &mut transfers, payment)?;
    }
    Ok((balances, transfers))
}

fn apply_payment(
    balances: &mut BTreeMap<Address, u64>,
    transfers: &mut Vec<Transfer>,
    payment: &Payment,
) -> Result<(), EscrowError> {
    move_funds(balances, &payment.sender, &payment.receiver, payment.amount)?;
    transfers.push(Transfer {
        from: payment.sender.clone(),
        to: payment.receiver.clone(),
        amount: payment.amount,
    });

    if let Some(close_to) = &payment.close_remainder_to {
        let remainder = balances.get(&payment.sender).copied().unwrap_or(0);
        move_funds(balances, &payment.sender, close_to, remainder)?;
        if remainder > 0 {
            transfers.push(Transfer {
                from: payment.sender.clone(),
                to: close_to.clone(),
                amount: remainder,
            });
        }
    }
    Ok(())
}

fn move_funds(
    balances: &mut BTreeMap<Address, u64>,
    from: &Address,
    to: &Address,
    amount: u64,
) -> Result<(), EscrowError> {
    let available = balances.get(from).copied().unwrap_or(0);
    let remaining = available
        .checked_sub(amount)
        .ok_or_else(|| EscrowError::InsufficientFunds {
            account: from.clone(),
            required: amount,
            available,
        })?;
    balances.insert(from.clone(), remaining);
    let credited = balances.entry(to.clone()).or_insert(0);
    *credited = credit(to, *credited, amount)?;
    Ok(())
}

fn credit(account: &Address, balance: u64, amount: u64) -> Result<u64, EscrowError> {
    balance
        .checked_add(amount)
        .ok_or_else(|| EscrowError::BalanceOverflow {
            account: account.clone(),
            balance,
            credit: amount,
        })
}
