//! The slice of the PSP22 interface the farm contracts call into.
//!
//! The call helpers need a live contract environment; the off-chain test
//! engine cannot dispatch them.

use crate::{AccountId, Balance, FarmError, FarmResult};
use ink::env::call::{build_call, ExecutionInput, Selector};
use ink::env::DefaultEnvironment;
use ink::prelude::{string::String, vec::Vec};

/// Error type returned by PSP22 token contracts.
#[derive(Debug, Clone, PartialEq, Eq, scale::Encode, scale::Decode)]
#[cfg_attr(feature = "std", derive(scale_info::TypeInfo))]
pub enum Psp22Error {
    Custom(String),
    InsufficientBalance,
    InsufficientAllowance,
    ZeroRecipientAddress,
    ZeroSenderAddress,
    SafeTransferCheckFailed(String),
}

impl From<Psp22Error> for FarmError {
    fn from(error: Psp22Error) -> Self {
        match error {
            Psp22Error::InsufficientBalance => FarmError::InsufficientBalance,
            _ => FarmError::TransferFailed,
        }
    }
}

pub mod selectors {
    pub const TRANSFER: [u8; 4] = ink::selector_bytes!("PSP22::transfer");
    pub const TRANSFER_FROM: [u8; 4] = ink::selector_bytes!("PSP22::transfer_from");
    pub const APPROVE: [u8; 4] = ink::selector_bytes!("PSP22::approve");
    pub const BALANCE_OF: [u8; 4] = ink::selector_bytes!("PSP22::balance_of");
}

type TokenCallResult = Result<ink::MessageResult<Result<(), Psp22Error>>, ink::env::Error>;

fn settle(result: TokenCallResult) -> FarmResult<()> {
    match result {
        Ok(Ok(Ok(()))) => Ok(()),
        Ok(Ok(Err(error))) => Err(error.into()),
        _ => Err(FarmError::TransferFailed),
    }
}

/// Sends `value` of `token` from the calling contract to `to`.
pub fn transfer(token: AccountId, to: AccountId, value: Balance) -> FarmResult<()> {
    settle(
        build_call::<DefaultEnvironment>()
            .call(token)
            .exec_input(
                ExecutionInput::new(Selector::new(selectors::TRANSFER))
                    .push_arg(to)
                    .push_arg(value)
                    .push_arg(Vec::<u8>::new()),
            )
            .returns::<Result<(), Psp22Error>>()
            .try_invoke(),
    )
}

/// Moves `value` of `token` from `from` to `to` against the calling
/// contract's allowance.
pub fn transfer_from(
    token: AccountId,
    from: AccountId,
    to: AccountId,
    value: Balance,
) -> FarmResult<()> {
    settle(
        build_call::<DefaultEnvironment>()
            .call(token)
            .exec_input(
                ExecutionInput::new(Selector::new(selectors::TRANSFER_FROM))
                    .push_arg(from)
                    .push_arg(to)
                    .push_arg(value)
                    .push_arg(Vec::<u8>::new()),
            )
            .returns::<Result<(), Psp22Error>>()
            .try_invoke(),
    )
}

pub fn approve(token: AccountId, spender: AccountId, value: Balance) -> FarmResult<()> {
    settle(
        build_call::<DefaultEnvironment>()
            .call(token)
            .exec_input(
                ExecutionInput::new(Selector::new(selectors::APPROVE))
                    .push_arg(spender)
                    .push_arg(value),
            )
            .returns::<Result<(), Psp22Error>>()
            .try_invoke(),
    )
}

pub fn balance_of(token: AccountId, owner: AccountId) -> FarmResult<Balance> {
    let result = build_call::<DefaultEnvironment>()
        .call(token)
        .exec_input(ExecutionInput::new(Selector::new(selectors::BALANCE_OF)).push_arg(owner))
        .returns::<Balance>()
        .try_invoke();
    match result {
        Ok(Ok(balance)) => Ok(balance),
        _ => Err(FarmError::CallFailed),
    }
}
