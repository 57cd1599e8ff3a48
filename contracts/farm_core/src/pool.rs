use crate::{math, AccountId, Balance, FarmResult, Monotonic, Weight};

/// A stake-asset bucket with its own weight and share price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, scale::Encode, scale::Decode)]
#[cfg_attr(
    feature = "std",
    derive(scale_info::TypeInfo, ink::storage::traits::StorageLayout)
)]
pub struct Pool {
    pub stake_asset: AccountId,
    pub weight: Weight,
    /// Block up to which `acc_reward_per_share` is current.
    pub last_accrual: Monotonic,
    /// Reward per staked unit, scaled by `ACC_PRECISION`. Never decreases.
    pub acc_reward_per_share: Balance,
    pub total_staked: Balance,
}

impl Pool {
    pub fn new(stake_asset: AccountId, weight: Weight, last_accrual: Monotonic) -> Self {
        Self {
            stake_asset,
            weight,
            last_accrual,
            acc_reward_per_share: 0,
            total_staked: 0,
        }
    }

    /// Brings the share price up to `now` and returns the reward credited.
    ///
    /// Idempotent at a fixed `now`. An empty pool only moves its clock: the
    /// reward for that stretch is never credited to anyone.
    pub fn accrue(
        &mut self,
        now: Monotonic,
        reward_per_block: Balance,
        total_weight: Weight,
    ) -> FarmResult<Balance> {
        if now <= self.last_accrual {
            return Ok(0);
        }
        if self.total_staked == 0 || self.weight == 0 {
            self.last_accrual = now;
            return Ok(0);
        }
        let reward = math::emission(
            now - self.last_accrual,
            reward_per_block,
            self.weight,
            total_weight,
        )?;
        let increment = math::share_increment(reward, self.total_staked)?;
        self.acc_reward_per_share = math::add(self.acc_reward_per_share, increment)?;
        self.last_accrual = now;
        Ok(reward)
    }
}

/// One owner's stake in one pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, scale::Encode, scale::Decode)]
#[cfg_attr(
    feature = "std",
    derive(scale_info::TypeInfo, ink::storage::traits::StorageLayout)
)]
pub struct Position {
    pub amount: Balance,
    /// `amount * acc_reward_per_share / ACC_PRECISION` at the last settlement.
    pub reward_debt: Balance,
    /// Reward settled while the harvest lock was active.
    pub locked_reward: Balance,
    /// First block at which a payout is allowed; 0 before the first deposit.
    pub next_harvest_at: Monotonic,
}

impl Position {
    pub fn pending(&self, acc_reward_per_share: Balance) -> FarmResult<Balance> {
        let entitled = math::entitlement(self.amount, acc_reward_per_share)?;
        math::sub(entitled, self.reward_debt)
    }

    /// Marks everything up to `acc_reward_per_share` as settled.
    pub fn checkpoint(&mut self, acc_reward_per_share: Balance) -> FarmResult<()> {
        self.reward_debt = math::entitlement(self.amount, acc_reward_per_share)?;
        Ok(())
    }

    pub fn can_harvest(&self, now: Monotonic) -> bool {
        now >= self.next_harvest_at
    }
}
