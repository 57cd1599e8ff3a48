//! Chain-agnostic event records.
//!
//! Contracts translate these into `#[ink(event)]` structs; the in-memory
//! chain keeps them in its log.

use crate::{AccountId, AccrualScope, Balance, Monotonic, PoolId, Weight};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    PoolAdded {
        pool_id: PoolId,
        stake_asset: AccountId,
        weight: Weight,
    },
    PoolWeightUpdated {
        pool_id: PoolId,
        previous: Weight,
        current: Weight,
    },
    EmissionRateUpdated {
        previous: Balance,
        current: Balance,
    },
    HarvestIntervalUpdated {
        previous: Monotonic,
        current: Monotonic,
    },
    ReferralRegistryUpdated {
        registry: Option<AccountId>,
    },
    ReferralCommissionRateUpdated {
        previous: u16,
        current: u16,
    },
    HarvestFeeUpdated {
        previous: u16,
        current: u16,
    },
    AccrualScopeUpdated {
        scope: AccrualScope,
    },
    OwnershipTransferred {
        previous: AccountId,
        current: AccountId,
    },
    Deposit {
        owner: AccountId,
        pool_id: PoolId,
        amount: Balance,
    },
    Withdraw {
        owner: AccountId,
        pool_id: PoolId,
        amount: Balance,
    },
    /// A payout: `gross` settled, `fee` kept by the mining treasury, `net` sent.
    Harvest {
        owner: AccountId,
        pool_id: PoolId,
        gross: Balance,
        fee: Balance,
        net: Balance,
    },
    RewardLockedUp {
        owner: AccountId,
        pool_id: PoolId,
        amount: Balance,
    },
    ReferralCommissionPaid {
        owner: AccountId,
        referrer: AccountId,
        amount: Balance,
    },
    EmergencyWithdraw {
        owner: AccountId,
        pool_id: PoolId,
        amount: Balance,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralEvent {
    ReferralRecorded {
        user: AccountId,
        referrer: AccountId,
    },
    CommissionRecorded {
        referrer: AccountId,
        amount: Balance,
    },
    OperatorUpdated {
        operator: AccountId,
        allowed: bool,
    },
    OwnershipTransferred {
        previous: AccountId,
        current: AccountId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LotteryEvent {
    FarmingStarted {
        pool_id: PoolId,
        amount: Balance,
    },
    ProceedsForwarded {
        receiver: AccountId,
        amount: Balance,
    },
    ReceiverUpdated {
        previous: AccountId,
        current: AccountId,
    },
    AdminUpdated {
        previous: AccountId,
        current: AccountId,
    },
    EmergencyWithdraw {
        pool_id: PoolId,
        amount: Balance,
    },
}
