use core::fmt;

/// Every failure aborts the whole call; nothing is retried on the caller's behalf.
///
/// One enum is shared by all farm contracts so cross-contract results decode
/// the same way on both sides of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, scale::Encode, scale::Decode)]
#[cfg_attr(feature = "std", derive(scale_info::TypeInfo))]
pub enum FarmError {
    /// Caller is not the owner, admin or an allow-listed operator.
    Unauthorized,
    /// Withdrawal or transfer exceeds the available stake or asset balance.
    InsufficientBalance,
    /// The position's harvest interval has not elapsed yet.
    HarvestLocked,
    /// Checked arithmetic overflowed or underflowed.
    ArithmeticFault,
    /// No pool exists at the given index.
    UnknownPool,
    /// A configuration value exceeds its compile-time ceiling.
    AboveMaximum,
    /// The asset offered to a pool is not the pool's stake asset.
    StakeAssetMismatch,
    /// A state-mutating entry point was entered while another was running.
    Reentrancy,
    /// A PSP22 transfer was rejected by the token contract.
    TransferFailed,
    /// A cross-contract call could not be dispatched or decoded.
    CallFailed,
}

impl fmt::Display for FarmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FarmError::Unauthorized => "caller lacks the required role",
            FarmError::InsufficientBalance => "insufficient balance",
            FarmError::HarvestLocked => "harvest interval has not elapsed",
            FarmError::ArithmeticFault => "arithmetic overflow or underflow",
            FarmError::UnknownPool => "unknown pool",
            FarmError::AboveMaximum => "value above the allowed maximum",
            FarmError::StakeAssetMismatch => "asset is not the pool's stake asset",
            FarmError::Reentrancy => "re-entrant call rejected",
            FarmError::TransferFailed => "token transfer failed",
            FarmError::CallFailed => "cross-contract call failed",
        };
        f.write_str(msg)
    }
}

pub type FarmResult<T> = core::result::Result<T, FarmError>;
