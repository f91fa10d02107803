//! # Transition Guards
//!
//! One guard per transition. Each reads committed state and the bundle
//! and either returns the [`Effect`] to apply or the first failing
//! condition as an [`EscrowError`].
//!
//! Conditions are checked in a fixed order: caller authorization, flag
//! prerequisites, the timeout clock, then group structure (size, companion
//! kind, sender, receiver, amount). Guards never write.

use rental_core::{Address, Timestamp};

use crate::action::{Action, Role};
use crate::bundle::{Bundle, Operation, Payment};
use crate::error::EscrowError;
use crate::store::{StateKey, StateStore};
use crate::terms::EscrowTerms;

/// Number of operations in a fund-moving bundle.
pub const PAIRED_GROUP_SIZE: usize = 2;

/// State writes produced by a passing guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write the six terms and five zeroed flags.
    Initialize(EscrowTerms),
    /// Raise these flags. Empty for settlements, which move funds only.
    Raise(&'static [StateKey]),
}

/// Inputs shared by every post-creation guard.
pub struct GuardInput<'a> {
    pub store: &'a StateStore,
    pub bundle: &'a Bundle,
    /// Escrow account address of the contract.
    pub contract: &'a Address,
    pub now: Timestamp,
    pub grace_period_secs: u64,
}

/// Result of a passing guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passed {
    pub effect: Effect,
    /// The validated companion payment, for fund-moving transitions.
    pub payment: Option<Payment>,
}

/// Guard for contract creation.
pub fn check_create(args: &[Vec<u8>]) -> Result<Passed, EscrowError> {
    let terms = EscrowTerms::decode_args(args)?;
    Ok(Passed {
        effect: Effect::Initialize(terms),
        payment: None,
    })
}

/// Guard for a post-creation transition.
pub fn check(action: Action, input: &GuardInput<'_>) -> Result<Passed, EscrowError> {
    let t = action.transition_name();
    let store = input.store;
    let terms = EscrowTerms::load(store)?;
    require_role(action, &terms, input.bundle.caller())?;

    match action {
        Action::Deposit => {
            require_flag(t, store, StateKey::DepositPaid, false)?;
            let payment = companion_payment(t, input.bundle)?;
            require_party(t, "sender", &payment.sender, &terms.organizer)?;
            require_party(t, "receiver", &payment.receiver, input.contract)?;
            match &payment.close_remainder_to {
                Some(to) if to != input.contract => {
                    return Err(EscrowError::GroupStructure {
                        transition: t,
                        reason: format!(
                            "close_remainder_to {to}, only the escrow account is permitted"
                        ),
                    })
                }
                _ => {}
            }
            let minimum = terms
                .required_deposit()
                .ok_or_else(|| EscrowError::GroupStructure {
                    transition: t,
                    reason: "deposit_amount + rental_fee overflows".to_string(),
                })?;
            if payment.amount < minimum {
                return Err(EscrowError::GroupStructure {
                    transition: t,
                    reason: format!("payment amount {} below minimum {minimum}", payment.amount),
                });
            }
            Ok(raise(&[StateKey::DepositPaid], Some(payment.clone())))
        }
        Action::Delivery => {
            require_flag(t, store, StateKey::DepositPaid, true)?;
            require_flag(t, store, StateKey::PropDelivered, false)?;
            Ok(raise(&[StateKey::PropDelivered], None))
        }
        Action::Return => {
            require_flag(t, store, StateKey::PropDelivered, true)?;
            require_flag(t, store, StateKey::PropReturned, false)?;
            Ok(raise(&[StateKey::PropReturned], None))
        }
        Action::Damage => {
            require_flag(t, store, StateKey::PropReturned, true)?;
            Ok(raise(
                &[StateKey::DamageReported, StateKey::DisputeActive],
                None,
            ))
        }
        Action::ReleaseFee => {
            require_flag(t, store, StateKey::PropDelivered, true)?;
            let payment = settlement_payment(t, input, &terms.vendor, terms.rental_fee)?;
            Ok(raise(&[], Some(payment.clone())))
        }
        Action::Refund => {
            require_flag(t, store, StateKey::PropReturned, true)?;
            require_flag(t, store, StateKey::DamageReported, false)?;
            require_flag(t, store, StateKey::DisputeActive, false)?;
            let payment = settlement_payment(t, input, &terms.organizer, terms.deposit_amount)?;
            Ok(raise(&[], Some(payment.clone())))
        }
        Action::Claim => {
            require_flag(t, store, StateKey::DamageReported, true)?;
            let payment = settlement_payment(t, input, &terms.vendor, terms.deposit_amount)?;
            Ok(raise(&[], Some(payment.clone())))
        }
        Action::Timeout => {
            match terms.timeout_unlocks_at(input.grace_period_secs) {
                Some(unlocks_at) if input.now >= unlocks_at => {}
                Some(unlocks_at) => {
                    return Err(EscrowError::TimeoutNotReached {
                        now: input.now,
                        unlocks_at: unlocks_at.to_string(),
                    })
                }
                None => {
                    return Err(EscrowError::TimeoutNotReached {
                        now: input.now,
                        unlocks_at: "never".to_string(),
                    })
                }
            }
            let vendor = &terms.vendor;
            let payment = companion_payment(t, input.bundle)?;
            require_party(t, "sender", &payment.sender, input.contract)?;
            require_party(t, "receiver", &payment.receiver, vendor)?;
            match &payment.close_remainder_to {
                Some(to) if to == vendor => {}
                Some(to) => {
                    return Err(EscrowError::GroupStructure {
                        transition: t,
                        reason: format!("close_remainder_to {to}, expected {vendor}"),
                    })
                }
                None => {
                    return Err(EscrowError::GroupStructure {
                        transition: t,
                        reason: format!("close_remainder_to missing, expected {vendor}"),
                    })
                }
            }
            Ok(raise(&[], Some(payment.clone())))
        }
    }
}

fn raise(keys: &'static [StateKey], payment: Option<Payment>) -> Passed {
    Passed {
        effect: Effect::Raise(keys),
        payment,
    }
}

/// Match the caller against the party the action's role names.
fn require_role(
    action: Action,
    terms: &EscrowTerms,
    caller: &Address,
) -> Result<(), EscrowError> {
    let required = action.authorized_role();
    let expected = match required {
        Role::Organizer => &terms.organizer,
        Role::Vendor => &terms.vendor,
        Role::Any => return Ok(()),
    };
    if caller == expected {
        Ok(())
    } else {
        Err(EscrowError::Authorization {
            transition: action.transition_name(),
            required,
            caller: caller.clone(),
        })
    }
}

fn require_flag(
    transition: &'static str,
    store: &StateStore,
    key: StateKey,
    expected: bool,
) -> Result<(), EscrowError> {
    if store.flag(key)? == expected {
        Ok(())
    } else {
        Err(EscrowError::Sequence {
            transition,
            guard: format!("{key} == {expected}"),
        })
    }
}

fn require_party(
    transition: &'static str,
    field: &str,
    actual: &Address,
    expected: &Address,
) -> Result<(), EscrowError> {
    if actual == expected {
        Ok(())
    } else {
        Err(EscrowError::GroupStructure {
            transition,
            reason: format!("payment {field} {actual}, expected {expected}"),
        })
    }
}

/// The single companion payment of a paired bundle.
fn companion_payment<'b>(
    transition: &'static str,
    bundle: &'b Bundle,
) -> Result<&'b Payment, EscrowError> {
    if bundle.group_size() != PAIRED_GROUP_SIZE {
        return Err(EscrowError::GroupStructure {
            transition,
            reason: format!(
                "group size {}, expected {PAIRED_GROUP_SIZE}",
                bundle.group_size()
            ),
        });
    }
    match &bundle.companions[0] {
        Operation::Payment(p) => Ok(p),
        other => Err(EscrowError::GroupStructure {
            transition,
            reason: format!("companion is {}, expected payment", other.kind()),
        }),
    }
}

/// Contract-to-recipient payment of an exact amount, with no sweep of
/// the escrow balance.
fn settlement_payment<'b>(
    transition: &'static str,
    input: &GuardInput<'b>,
    recipient: &Address,
    amount: u64,
) -> Result<&'b Payment, EscrowError> {
    let payment = companion_payment(transition, input.bundle)?;
    require_party(transition, "sender", &payment.sender, input.contract)?;
    require_party(transition, "receiver", &payment.receiver, recipient)?;
    if payment.amount != amount {
        return Err(EscrowError::GroupStructure {
            transition,
            reason: format!("payment amount {}, expected {amount}", payment.amount),
        });
    }
    if let Some(to) = &payment.close_remainder_to {
        return Err(EscrowError::GroupStructure {
            transition,
            reason: format!("close_remainder_to {to} not permitted"),
        });
    }
    Ok(payment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::StateValue;

    const GRACE: u64 = 2_592_000;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    fn terms() -> EscrowTerms {
        EscrowTerms {
            organizer: addr("ORG"),
            vendor: addr("VEN"),
            deposit_amount: 50,
            rental_fee: 100,
            lease_start: Timestamp::from_epoch_secs(1_000),
            lease_end: Timestamp::from_epoch_secs(2_000),
        }
    }

    fn store_with(flags: &[StateKey]) -> StateStore {
        let mut store = StateStore::new();
        for (k, v) in terms().initial_entries() {
            store.put(k, v).unwrap();
        }
        for f in flags {
            store.raise_flag(*f).unwrap();
        }
        store
    }

    fn run(
        action: Action,
        store: &StateStore,
        bundle: &Bundle,
        now: u64,
    ) -> Result<Passed, EscrowError> {
        let contract = addr("APP1");
        check(
            action,
            &GuardInput {
                store,
                bundle,
                contract: &contract,
                now: Timestamp::from_epoch_secs(now),
                grace_period_secs: GRACE,
            },
        )
    }

    #[test]
    fn deposit_accepts_overpayment() {
        let store = store_with(&[]);
        let b = Bundle::invoke(addr("ORG"), Action::Deposit)
            .with_payment(Payment::new(addr("ORG"), addr("APP1"), 200));
        let passed = run(Action::Deposit, &store, &b, 0).unwrap();
        assert_eq!(passed.effect, Effect::Raise(&[StateKey::DepositPaid]));
        assert_eq!(passed.payment.unwrap().amount, 200);
    }

    #[test]
    fn deposit_sweep_only_into_escrow() {
        let store = store_with(&[]);
        let to_escrow = Bundle::invoke(addr("ORG"), Action::Deposit).with_payment(
            Payment::new(addr("ORG"), addr("APP1"), 150).close_remainder_to(addr("APP1")),
        );
        assert!(run(Action::Deposit, &store, &to_escrow, 0).is_ok());
        let elsewhere = Bundle::invoke(addr("ORG"), Action::Deposit).with_payment(
            Payment::new(addr("ORG"), addr("APP1"), 150).close_remainder_to(addr("MALLORY")),
        );
        let err = run(Action::Deposit, &store, &elsewhere, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GroupStructure);
        assert!(err.to_string().contains("MALLORY"));
    }

    #[test]
    fn settlements_reject_balance_sweep() {
        let store = store_with(&[
            StateKey::DepositPaid,
            StateKey::PropDelivered,
            StateKey::PropReturned,
        ]);
        let damaged = store_with(&[
            StateKey::DepositPaid,
            StateKey::PropDelivered,
            StateKey::PropReturned,
            StateKey::DamageReported,
            StateKey::DisputeActive,
        ]);
        let cases = [
            (Action::ReleaseFee, &store, "VEN", 100),
            (Action::Refund, &store, "ORG", 50),
            (Action::Claim, &damaged, "VEN", 50),
        ];
        for (action, state, recipient, amount) in cases {
            let exact = Payment::new(addr("APP1"), addr(recipient), amount);
            let plain = Bundle::invoke(addr("MALLORY"), action).with_payment(exact.clone());
            assert!(run(action, state, &plain, 0).is_ok(), "{action}");
            for sweep_to in ["MALLORY", recipient] {
                let swept = Bundle::invoke(addr("MALLORY"), action)
                    .with_payment(exact.clone().close_remainder_to(addr(sweep_to)));
                let err = run(action, state, &swept, 0).unwrap_err();
                assert_eq!(err.kind(), ErrorKind::GroupStructure, "{action} -> {sweep_to}");
                assert!(err.to_string().contains("close_remainder_to"));
            }
        }
    }

    #[test]
    fn deposit_below_minimum() {
        let store = store_with(&[]);
        let b = Bundle::invoke(addr("ORG"), Action::Deposit)
            .with_payment(Payment::new(addr("ORG"), addr("APP1"), 149));
        let err = run(Action::Deposit, &store, &b, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GroupStructure);
        assert!(err.to_string().contains("149"));
    }

    #[test]
    fn deposit_checks_authorization_before_flags() {
        let store = store_with(&[StateKey::DepositPaid]);
        let b = Bundle::invoke(addr("VEN"), Action::Deposit);
        let err = run(Action::Deposit, &store, &b, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn deposit_checks_flags_before_group() {
        let store = store_with(&[StateKey::DepositPaid]);
        let b = Bundle::invoke(addr("ORG"), Action::Deposit);
        let err = run(Action::Deposit, &store, &b, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Sequence);
        assert!(err.to_string().contains("deposit_paid == false"));
    }

    #[test]
    fn deposit_overflowing_minimum_is_group_error() {
        let mut store = store_with(&[]);
        store
            .put(StateKey::RentalFee, StateValue::Uint(u64::MAX))
            .unwrap();
        let b = Bundle::invoke(addr("ORG"), Action::Deposit)
            .with_payment(Payment::new(addr("ORG"), addr("APP1"), u64::MAX));
        assert_eq!(
            run(Action::Deposit, &store, &b, 0).unwrap_err().kind(),
            ErrorKind::GroupStructure
        );
    }

    #[test]
    fn asset_transfer_companion_rejected() {
        let store = store_with(&[StateKey::DepositPaid, StateKey::PropDelivered]);
        let b = Bundle::invoke(addr("VEN"), Action::ReleaseFee).with_operation(
            Operation::AssetTransfer(crate::bundle::AssetTransfer {
                sender: addr("APP1"),
                receiver: addr("VEN"),
                asset_id: 7,
                amount: 100,
            }),
        );
        let err = run(Action::ReleaseFee, &store, &b, 0).unwrap_err();
        assert!(err.to_string().contains("asset_transfer"));
    }

    #[test]
    fn three_operation_group_rejected() {
        let store = store_with(&[StateKey::DepositPaid, StateKey::PropDelivered]);
        let pay = Payment::new(addr("APP1"), addr("VEN"), 100);
        let b = Bundle::invoke(addr("VEN"), Action::ReleaseFee)
            .with_payment(pay.clone())
            .with_payment(pay);
        let err = run(Action::ReleaseFee, &store, &b, 0).unwrap_err();
        assert!(err.to_string().contains("group size 3"));
    }

    #[test]
    fn release_fee_exact_amount() {
        let store = store_with(&[StateKey::DepositPaid, StateKey::PropDelivered]);
        let ok = Bundle::invoke(addr("ANYONE"), Action::ReleaseFee)
            .with_payment(Payment::new(addr("APP1"), addr("VEN"), 100));
        assert_eq!(
            run(Action::ReleaseFee, &store, &ok, 0).unwrap().effect,
            Effect::Raise(&[])
        );
        let over = Bundle::invoke(addr("ANYONE"), Action::ReleaseFee)
            .with_payment(Payment::new(addr("APP1"), addr("VEN"), 101));
        assert!(run(Action::ReleaseFee, &store, &over, 0).is_err());
    }

    #[test]
    fn refund_blocked_by_damage() {
        let store = store_with(&[
            StateKey::DepositPaid,
            StateKey::PropDelivered,
            StateKey::PropReturned,
            StateKey::DamageReported,
            StateKey::DisputeActive,
        ]);
        let b = Bundle::invoke(addr("ORG"), Action::Refund)
            .with_payment(Payment::new(addr("APP1"), addr("ORG"), 50));
        let err = run(Action::Refund, &store, &b, 0).unwrap_err();
        assert!(err.to_string().contains("damage_reported == false"));
    }

    #[test]
    fn timeout_clock_boundary() {
        let store = store_with(&[StateKey::DepositPaid]);
        let b = Bundle::invoke(addr("VEN"), Action::Timeout).with_payment(
            Payment::new(addr("APP1"), addr("VEN"), 0).close_remainder_to(addr("VEN")),
        );
        let err = run(Action::Timeout, &store, &b, 2_000 + GRACE - 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimeoutNotReached);
        assert!(run(Action::Timeout, &store, &b, 2_000 + GRACE).is_ok());
    }

    #[test]
    fn timeout_requires_close_to_vendor() {
        let store = store_with(&[]);
        let b = Bundle::invoke(addr("VEN"), Action::Timeout)
            .with_payment(Payment::new(addr("APP1"), addr("VEN"), 0));
        let err = run(Action::Timeout, &store, &b, u64::MAX).unwrap_err();
        assert!(err.to_string().contains("close_remainder_to missing"));
        let b = Bundle::invoke(addr("VEN"), Action::Timeout).with_payment(
            Payment::new(addr("APP1"), addr("VEN"), 0).close_remainder_to(addr("ORG")),
        );
        assert_eq!(
            run(Action::Timeout, &store, &b, u64::MAX).unwrap_err().kind(),
            ErrorKind::GroupStructure
        );
    }

    #[test]
    fn timeout_overflow_never_unlocks() {
        let mut store = store_with(&[]);
        store
            .put(StateKey::LeaseEnd, StateValue::Uint(u64::MAX))
            .unwrap();
        let b = Bundle::invoke(addr("VEN"), Action::Timeout);
        let err = run(Action::Timeout, &store, &b, u64::MAX).unwrap_err();
        assert!(err.to_string().contains("never"));
    }

    #[test]
    fn guards_fail_before_creation() {
        let store = StateStore::new();
        let b = Bundle::invoke(addr("ORG"), Action::Delivery);
        for action in Action::ALL {
            assert_eq!(
                run(action, &store, &b, 0).unwrap_err().kind(),
                ErrorKind::KeyNotFound
            );
        }
    }
}
