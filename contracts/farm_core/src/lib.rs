#![cfg_attr(not(feature = "std"), no_std)]

//! # Spy Farm: shared core
//!
//! Everything the farm contracts agree on lives here: the fixed-point
//! accrual math, the pool and position records, the shared error type and
//! the three protocol state machines.
//!
//! Each state machine is a trait with provided methods layered over two
//! required traits: a *storage* trait (where state lives) and an
//! *environment* trait (caller, block number, token movements, events).
//! The ink! contracts implement those over contract storage and
//! cross-contract calls; `sim::Chain` (tests, or the `sim` feature)
//! implements them over plain collections so whole scenarios can run
//! deterministically.
//!
//! ```text
//!   [LotteryAdapter] ──deposit/harvest──► [RewardLedger] ──bind/record──► [ReferralRegistry]
//!                                               │
//!                       PSP22 transfer_from ◄───┘  (mining / marketing treasuries)
//! ```

pub mod error;
pub mod events;
pub mod ledger;
pub mod lottery;
pub mod math;
pub mod pool;
pub mod psp22;
pub mod referral;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use error::{FarmError, FarmResult};
pub use events::{LedgerEvent, LotteryEvent, ReferralEvent};
pub use ledger::{AccrualScope, LedgerEnv, LedgerSettings, LedgerStorage, RewardLedger};
pub use lottery::{LotteryAdapter, LotteryEnv, LotteryStorage};
pub use pool::{Pool, Position};
pub use referral::{ReferralEnv, ReferralRegistry, ReferralStorage};

pub use ink::primitives::AccountId;

/// Token amounts, matching the chain's `Balance`.
pub type Balance = u128;

/// A monotonic time counter; the block number of the executing call.
pub type Monotonic = u64;

/// Index of a pool in the ledger's pool list.
pub type PoolId = u32;

/// Allocation weight of a pool.
pub type Weight = u64;

pub mod constants {
    use super::{Balance, Monotonic};

    /// Fixed-point scale of `acc_reward_per_share`.
    pub const ACC_PRECISION: Balance = 1_000_000_000_000;

    pub const BPS_DENOMINATOR: Balance = 10_000;

    /// Referral commission: 5% of every payout, funded by the marketing treasury.
    pub const DEFAULT_REFERRAL_COMMISSION_BPS: u16 = 500;
    pub const MAX_REFERRAL_COMMISSION_BPS: u16 = 1_000;

    /// Harvest fee: 2.5% of every payout stays in the mining treasury.
    pub const DEFAULT_HARVEST_FEE_BPS: u16 = 250;
    pub const MAX_HARVEST_FEE_BPS: u16 = 1_000;

    /// 4 hours of 6 second blocks.
    pub const DEFAULT_HARVEST_INTERVAL: Monotonic = 2_400;
    /// 14 days of 6 second blocks.
    pub const MAX_HARVEST_INTERVAL: Monotonic = 201_600;

    /// 100 tokens per block at 18 decimals.
    pub const MAX_REWARD_PER_BLOCK: Balance = 100 * 1_000_000_000_000_000_000;

    pub const NULL_ACCOUNT: [u8; 32] = [0u8; 32];
}

/// `None` and the all-zero account both mean "no account".
pub fn non_null(account: Option<AccountId>) -> Option<AccountId> {
    account.filter(|a| *a != AccountId::from(constants::NULL_ACCOUNT))
}
