//! Routing of an application call to creation or to one transition.

use rental_core::ContractId;

use crate::action::Action;
use crate::bundle::{AppCall, CallKind};
use crate::error::EscrowError;

/// Where a call goes after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// Contract creation with its raw positional arguments.
    Create(&'a [Vec<u8>]),
    /// A post-creation transition.
    Invoke(Action),
}

/// Route a call.
///
/// `initialized` is whether the contract already holds state. Creation is
/// only routed when it does not; post-creation actions are routed either
/// way and fail on their first state read if the contract is empty.
pub fn route<'a>(
    contract: ContractId,
    call: &'a AppCall,
    initialized: bool,
) -> Result<Route<'a>, EscrowError> {
    match &call.kind {
        CallKind::ClearState => Err(EscrowError::ClearStateRejected { contract }),
        CallKind::Create { .. } if initialized => Err(EscrowError::Sequence {
            transition: "create",
            guard: "contract already created".to_string(),
        }),
        CallKind::Create { args } => Ok(Route::Create(args)),
        CallKind::NoOp { args } => match args.first() {
            Some(token) => Action::from_token(token).map(Route::Invoke),
            None => Err(EscrowError::UnknownAction(String::new())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use rental_core::Address;

    fn call(kind: CallKind) -> AppCall {
        AppCall {
            sender: Address::new("ORG").unwrap(),
            kind,
        }
    }

    #[test]
    fn clear_state_always_rejected() {
        for initialized in [false, true] {
            let err = route(ContractId::new(1), &call(CallKind::ClearState), initialized)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ClearStateRejected);
        }
    }

    #[test]
    fn create_only_before_state_exists() {
        let c = call(CallKind::Create { args: vec![] });
        assert!(matches!(
            route(ContractId::new(1), &c, false),
            Ok(Route::Create(_))
        ));
        let err = route(ContractId::new(1), &c, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Sequence);
    }

    #[test]
    fn noop_routes_on_first_argument() {
        let c = call(CallKind::NoOp {
            args: vec![b"claim".to_vec(), b"ignored".to_vec()],
        });
        assert_eq!(
            route(ContractId::new(1), &c, true).unwrap(),
            Route::Invoke(Action::Claim)
        );
    }

    #[test]
    fn empty_or_unknown_token_rejected() {
        let empty = call(CallKind::NoOp { args: vec![] });
        assert_eq!(
            route(ContractId::new(1), &empty, true).unwrap_err().kind(),
            ErrorKind::UnknownAction
        );
        let bogus = call(CallKind::NoOp {
            args: vec![b"withdraw".to_vec()],
        });
        assert_eq!(
            route(ContractId::new(1), &bogus, false).unwrap_err().kind(),
            ErrorKind::UnknownAction
        );
    }
}
