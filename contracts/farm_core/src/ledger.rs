//! Multi-pool staking ledger with lazy, share-price based accrual.
//!
//! A pool only learns about elapsed time when something touches it: the
//! reward for the blocks since `last_accrual` is folded into
//! `acc_reward_per_share`, and each position is owed
//! `amount * acc_reward_per_share - reward_debt`.
//!
//! Every state-mutating entry point runs under a re-entrancy guard and stores
//! all of its bookkeeping before the first token movement.

use crate::constants::{
    DEFAULT_HARVEST_FEE_BPS, DEFAULT_HARVEST_INTERVAL, DEFAULT_REFERRAL_COMMISSION_BPS,
    MAX_HARVEST_FEE_BPS, MAX_HARVEST_INTERVAL, MAX_REFERRAL_COMMISSION_BPS, MAX_REWARD_PER_BLOCK,
};
use crate::pool::{Pool, Position};
use crate::{
    math, non_null, AccountId, Balance, FarmError, FarmResult, LedgerEvent, Monotonic, PoolId,
    Weight,
};

/// Which pools are brought up to date before a weight change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, scale::Encode, scale::Decode)]
#[cfg_attr(
    feature = "std",
    derive(scale_info::TypeInfo, ink::storage::traits::StorageLayout)
)]
pub enum AccrualScope {
    /// Every pool is accrued at the old weights first.
    #[default]
    AllPools,
    /// Only the pool being changed is accrued; the others pick up the new
    /// total weight for their whole unaccrued stretch.
    TouchedPool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, scale::Encode, scale::Decode)]
#[cfg_attr(
    feature = "std",
    derive(scale_info::TypeInfo, ink::storage::traits::StorageLayout)
)]
pub struct LedgerSettings {
    pub owner: AccountId,
    pub reward_token: AccountId,
    /// Funds participant rewards. Keeps the harvest fee.
    pub mining_treasury: AccountId,
    /// Funds referral commission.
    pub marketing_treasury: AccountId,
    pub referral_registry: Option<AccountId>,
    pub reward_per_block: Balance,
    pub start_block: Monotonic,
    pub total_weight: Weight,
    pub harvest_interval: Monotonic,
    pub referral_commission_bps: u16,
    pub harvest_fee_bps: u16,
    pub accrual_scope: AccrualScope,
}

impl LedgerSettings {
    pub fn new(
        owner: AccountId,
        reward_token: AccountId,
        mining_treasury: AccountId,
        marketing_treasury: AccountId,
        reward_per_block: Balance,
        start_block: Monotonic,
    ) -> Self {
        Self {
            owner,
            reward_token,
            mining_treasury,
            marketing_treasury,
            referral_registry: None,
            reward_per_block,
            start_block,
            total_weight: 0,
            harvest_interval: DEFAULT_HARVEST_INTERVAL,
            referral_commission_bps: DEFAULT_REFERRAL_COMMISSION_BPS,
            harvest_fee_bps: DEFAULT_HARVEST_FEE_BPS,
            accrual_scope: AccrualScope::AllPools,
        }
    }
}

pub trait LedgerStorage {
    fn settings(&self) -> &LedgerSettings;
    fn settings_mut(&mut self) -> &mut LedgerSettings;
    fn pool_count(&self) -> PoolId;
    fn set_pool_count(&mut self, count: PoolId);
    fn load_pool(&self, pool_id: PoolId) -> Option<Pool>;
    fn store_pool(&mut self, pool_id: PoolId, pool: Pool);
    /// A position that was never written reads as zeroed.
    fn load_position(&self, pool_id: PoolId, owner: AccountId) -> Position;
    fn store_position(&mut self, pool_id: PoolId, owner: AccountId, position: Position);
    fn entered(&self) -> bool;
    fn set_entered(&mut self, entered: bool);
}

/// Execution context of a ledger call: clock, caller, token movements,
/// registry calls and event output.
pub trait LedgerEnv {
    fn now(&self) -> Monotonic;
    fn caller(&self) -> AccountId;
    /// Pulls `amount` of `asset` from `from` into the ledger.
    fn transfer_in(&mut self, asset: AccountId, from: AccountId, amount: Balance)
        -> FarmResult<()>;
    fn transfer_out(&mut self, asset: AccountId, to: AccountId, amount: Balance)
        -> FarmResult<()>;
    /// Moves reward tokens from a treasury that has approved the ledger.
    fn draw_reward(&mut self, treasury: AccountId, to: AccountId, amount: Balance)
        -> FarmResult<()>;
    fn bind_referral(
        &mut self,
        registry: AccountId,
        user: AccountId,
        referrer: AccountId,
    ) -> FarmResult<()>;
    fn lookup_referrer(&self, registry: AccountId, user: AccountId)
        -> FarmResult<Option<AccountId>>;
    fn credit_commission(
        &mut self,
        registry: AccountId,
        referrer: AccountId,
        amount: Balance,
    ) -> FarmResult<()>;
    fn emit(&mut self, event: LedgerEvent);
}

pub trait RewardLedger: LedgerStorage + LedgerEnv {
    /// Registers a new pool and returns its id.
    fn add_pool(&mut self, weight: Weight, stake_asset: AccountId) -> FarmResult<PoolId> {
        guarded(self, |ledger| {
            ensure_owner(ledger)?;
            if ledger.settings().accrual_scope == AccrualScope::AllPools {
                accrue_all(ledger)?;
            }
            let total_weight = math::add_weight(ledger.settings().total_weight, weight)?;
            let pool_id = ledger.pool_count();
            let next_id = pool_id.checked_add(1).ok_or(FarmError::ArithmeticFault)?;
            let last_accrual = ledger.now().max(ledger.settings().start_block);

            ledger.store_pool(pool_id, Pool::new(stake_asset, weight, last_accrual));
            ledger.set_pool_count(next_id);
            ledger.settings_mut().total_weight = total_weight;
            ledger.emit(LedgerEvent::PoolAdded {
                pool_id,
                stake_asset,
                weight,
            });
            Ok(pool_id)
        })
    }

    /// Changes a pool's weight. With `force_accrual` the pools named by the
    /// configured [`AccrualScope`] are brought up to date at the old weights.
    fn set_pool_weight(
        &mut self,
        pool_id: PoolId,
        weight: Weight,
        force_accrual: bool,
    ) -> FarmResult<()> {
        guarded(self, |ledger| {
            ensure_owner(ledger)?;
            if ledger.load_pool(pool_id).is_none() {
                return Err(FarmError::UnknownPool);
            }
            if force_accrual {
                match ledger.settings().accrual_scope {
                    AccrualScope::AllPools => accrue_all(ledger)?,
                    AccrualScope::TouchedPool => {
                        accrue(ledger, pool_id)?;
                    }
                }
            }
            let mut pool = ledger.load_pool(pool_id).ok_or(FarmError::UnknownPool)?;
            let previous = pool.weight;
            let total_weight = math::add_weight(
                math::sub_weight(ledger.settings().total_weight, previous)?,
                weight,
            )?;
            pool.weight = weight;
            ledger.store_pool(pool_id, pool);
            ledger.settings_mut().total_weight = total_weight;
            ledger.emit(LedgerEvent::PoolWeightUpdated {
                pool_id,
                previous,
                current: weight,
            });
            Ok(())
        })
    }

    /// Every pool is accrued at the old rate first, so the new rate only
    /// applies from the current block on.
    fn set_emission_rate(&mut self, reward_per_block: Balance) -> FarmResult<()> {
        guarded(self, |ledger| {
            ensure_owner(ledger)?;
            if reward_per_block > MAX_REWARD_PER_BLOCK {
                return Err(FarmError::AboveMaximum);
            }
            accrue_all(ledger)?;
            let previous = ledger.settings().reward_per_block;
            ledger.settings_mut().reward_per_block = reward_per_block;
            ledger.emit(LedgerEvent::EmissionRateUpdated {
                previous,
                current: reward_per_block,
            });
            Ok(())
        })
    }

    fn set_spy_per_block(&mut self, reward_per_block: Balance) -> FarmResult<()> {
        self.set_emission_rate(reward_per_block)
    }

    fn set_harvest_interval(&mut self, blocks: Monotonic) -> FarmResult<()> {
        guarded(self, |ledger| {
            ensure_owner(ledger)?;
            if blocks > MAX_HARVEST_INTERVAL {
                return Err(FarmError::AboveMaximum);
            }
            let previous = ledger.settings().harvest_interval;
            ledger.settings_mut().harvest_interval = blocks;
            ledger.emit(LedgerEvent::HarvestIntervalUpdated {
                previous,
                current: blocks,
            });
            Ok(())
        })
    }

    /// Wires (or with `None`, unwires) the referral registry.
    fn set_referral_registry(&mut self, registry: Option<AccountId>) -> FarmResult<()> {
        guarded(self, |ledger| {
            ensure_owner(ledger)?;
            let registry = non_null(registry);
            ledger.settings_mut().referral_registry = registry;
            ledger.emit(LedgerEvent::ReferralRegistryUpdated { registry });
            Ok(())
        })
    }

    fn set_referral_commission_rate(&mut self, bps: u16) -> FarmResult<()> {
        guarded(self, |ledger| {
            ensure_owner(ledger)?;
            if bps > MAX_REFERRAL_COMMISSION_BPS {
                return Err(FarmError::AboveMaximum);
            }
            let previous = ledger.settings().referral_commission_bps;
            ledger.settings_mut().referral_commission_bps = bps;
            ledger.emit(LedgerEvent::ReferralCommissionRateUpdated {
                previous,
                current: bps,
            });
            Ok(())
        })
    }

    fn set_harvest_fee(&mut self, bps: u16) -> FarmResult<()> {
        guarded(self, |ledger| {
            ensure_owner(ledger)?;
            if bps > MAX_HARVEST_FEE_BPS {
                return Err(FarmError::AboveMaximum);
            }
            let previous = ledger.settings().harvest_fee_bps;
            ledger.settings_mut().harvest_fee_bps = bps;
            ledger.emit(LedgerEvent::HarvestFeeUpdated {
                previous,
                current: bps,
            });
            Ok(())
        })
    }

    fn set_accrual_scope(&mut self, scope: AccrualScope) -> FarmResult<()> {
        guarded(self, |ledger| {
            ensure_owner(ledger)?;
            ledger.settings_mut().accrual_scope = scope;
            ledger.emit(LedgerEvent::AccrualScopeUpdated { scope });
            Ok(())
        })
    }

    fn transfer_ownership(&mut self, new_owner: AccountId) -> FarmResult<()> {
        guarded(self, |ledger| {
            ensure_owner(ledger)?;
            let previous = ledger.settings().owner;
            ledger.settings_mut().owner = new_owner;
            ledger.emit(LedgerEvent::OwnershipTransferred {
                previous,
                current: new_owner,
            });
            Ok(())
        })
    }

    fn accrue_pool(&mut self, pool_id: PoolId) -> FarmResult<()> {
        guarded(self, |ledger| accrue(ledger, pool_id).map(|_| ()))
    }

    fn mass_accrue(&mut self) -> FarmResult<()> {
        guarded(self, |ledger| accrue_all(ledger))
    }

    /// Stakes `amount` of the pool's asset for the caller.
    ///
    /// A non-null `referrer` other than the caller is bound in the registry
    /// on the first deposit with `amount > 0`; later referrers are ignored.
    /// Any settled reward is paid out, or locked while the harvest interval
    /// is running.
    fn deposit(
        &mut self,
        pool_id: PoolId,
        amount: Balance,
        referrer: Option<AccountId>,
    ) -> FarmResult<()> {
        guarded(self, |ledger| {
            let owner = ledger.caller();
            let now = ledger.now();
            let mut pool = accrue(ledger, pool_id)?;
            let mut position = ledger.load_position(pool_id, owner);
            if position.next_harvest_at == 0 {
                position.next_harvest_at =
                    math::add_blocks(now, ledger.settings().harvest_interval)?;
            }
            let acc = pool.acc_reward_per_share;
            let payout = settle(ledger, pool_id, owner, acc, &mut position)?;
            position.amount = math::add(position.amount, amount)?;
            pool.total_staked = math::add(pool.total_staked, amount)?;
            position.checkpoint(acc)?;
            ledger.store_pool(pool_id, pool);
            ledger.store_position(pool_id, owner, position);

            if amount > 0 {
                let registry = ledger.settings().referral_registry;
                if let (Some(registry), Some(referrer)) = (registry, non_null(referrer)) {
                    if referrer != owner {
                        ledger.bind_referral(registry, owner, referrer)?;
                    }
                }
                ledger.transfer_in(pool.stake_asset, owner, amount)?;
            }
            pay_out(ledger, pool_id, owner, payout)?;
            ledger.emit(LedgerEvent::Deposit {
                owner,
                pool_id,
                amount,
            });
            Ok(())
        })
    }

    fn withdraw(&mut self, pool_id: PoolId, amount: Balance) -> FarmResult<()> {
        guarded(self, |ledger| {
            let owner = ledger.caller();
            let mut pool = accrue(ledger, pool_id)?;
            let mut position = ledger.load_position(pool_id, owner);
            if amount > position.amount {
                return Err(FarmError::InsufficientBalance);
            }
            let acc = pool.acc_reward_per_share;
            let payout = settle(ledger, pool_id, owner, acc, &mut position)?;
            position.amount = math::sub(position.amount, amount)?;
            pool.total_staked = math::sub(pool.total_staked, amount)?;
            position.checkpoint(acc)?;
            ledger.store_pool(pool_id, pool);
            ledger.store_position(pool_id, owner, position);

            if amount > 0 {
                ledger.transfer_out(pool.stake_asset, owner, amount)?;
            }
            pay_out(ledger, pool_id, owner, payout)?;
            ledger.emit(LedgerEvent::Withdraw {
                owner,
                pool_id,
                amount,
            });
            Ok(())
        })
    }

    /// Pays pending plus locked reward and restarts the harvest interval.
    /// Returns the gross amount settled.
    fn harvest(&mut self, pool_id: PoolId) -> FarmResult<Balance> {
        guarded(self, |ledger| {
            let owner = ledger.caller();
            let now = ledger.now();
            let pool = accrue(ledger, pool_id)?;
            let mut position = ledger.load_position(pool_id, owner);
            if !position.can_harvest(now) {
                return Err(FarmError::HarvestLocked);
            }
            let acc = pool.acc_reward_per_share;
            let payout = math::add(position.pending(acc)?, position.locked_reward)?;
            position.locked_reward = 0;
            position.next_harvest_at = math::add_blocks(now, ledger.settings().harvest_interval)?;
            position.checkpoint(acc)?;
            ledger.store_position(pool_id, owner, position);

            pay_out(ledger, pool_id, owner, payout)?;
            Ok(payout)
        })
    }

    /// Returns the caller's whole stake and forfeits every unpaid reward,
    /// locked reward included. Returns the amount withdrawn.
    ///
    /// Accrual is attempted first; an arithmetic fault there leaves the
    /// share price where it was and the stake still comes back.
    fn emergency_withdraw(&mut self, pool_id: PoolId) -> FarmResult<Balance> {
        guarded(self, |ledger| {
            let owner = ledger.caller();
            let mut pool = match accrue(ledger, pool_id) {
                Err(FarmError::ArithmeticFault) => {
                    ledger.load_pool(pool_id).ok_or(FarmError::UnknownPool)?
                }
                accrued => accrued?,
            };
            let position = ledger.load_position(pool_id, owner);
            let amount = position.amount;
            pool.total_staked = math::sub(pool.total_staked, amount)?;
            ledger.store_pool(pool_id, pool);
            ledger.store_position(
                pool_id,
                owner,
                Position {
                    next_harvest_at: position.next_harvest_at,
                    ..Position::default()
                },
            );

            if amount > 0 {
                ledger.transfer_out(pool.stake_asset, owner, amount)?;
            }
            ledger.emit(LedgerEvent::EmergencyWithdraw {
                owner,
                pool_id,
                amount,
            });
            Ok(amount)
        })
    }

    fn pool_length(&self) -> PoolId {
        self.pool_count()
    }

    fn pool(&self, pool_id: PoolId) -> Option<Pool> {
        self.load_pool(pool_id)
    }

    fn position(&self, pool_id: PoolId, owner: AccountId) -> Position {
        self.load_position(pool_id, owner)
    }

    /// Reward the owner would settle right now, excluding locked reward.
    fn pending_reward(&self, pool_id: PoolId, owner: AccountId) -> FarmResult<Balance> {
        let pool = self.load_pool(pool_id).ok_or(FarmError::UnknownPool)?;
        pending_at(
            &pool,
            &self.load_position(pool_id, owner),
            self.settings(),
            self.now(),
        )
    }

    fn can_harvest(&self, pool_id: PoolId, owner: AccountId) -> bool {
        self.load_position(pool_id, owner).can_harvest(self.now())
    }
}

impl<T: LedgerStorage + LedgerEnv + ?Sized> RewardLedger for T {}

/// Pending reward of `position` with `pool` virtually accrued to `now`.
pub fn pending_at(
    pool: &Pool,
    position: &Position,
    settings: &LedgerSettings,
    now: Monotonic,
) -> FarmResult<Balance> {
    let mut pool = *pool;
    pool.accrue(now, settings.reward_per_block, settings.total_weight)?;
    position.pending(pool.acc_reward_per_share)
}

fn guarded<L, T, F>(ledger: &mut L, op: F) -> FarmResult<T>
where
    L: LedgerStorage + ?Sized,
    F: FnOnce(&mut L) -> FarmResult<T>,
{
    if ledger.entered() {
        return Err(FarmError::Reentrancy);
    }
    ledger.set_entered(true);
    let result = op(ledger);
    ledger.set_entered(false);
    result
}

fn ensure_owner<L: LedgerStorage + LedgerEnv + ?Sized>(ledger: &L) -> FarmResult<()> {
    if ledger.caller() != ledger.settings().owner {
        return Err(FarmError::Unauthorized);
    }
    Ok(())
}

fn accrue<L: LedgerStorage + LedgerEnv + ?Sized>(
    ledger: &mut L,
    pool_id: PoolId,
) -> FarmResult<Pool> {
    let mut pool = ledger.load_pool(pool_id).ok_or(FarmError::UnknownPool)?;
    let now = ledger.now();
    let settings = ledger.settings();
    pool.accrue(now, settings.reward_per_block, settings.total_weight)?;
    ledger.store_pool(pool_id, pool);
    Ok(pool)
}

fn accrue_all<L: LedgerStorage + LedgerEnv + ?Sized>(ledger: &mut L) -> FarmResult<()> {
    for pool_id in 0..ledger.pool_count() {
        accrue(ledger, pool_id)?;
    }
    Ok(())
}

/// Settles pending reward into a payout, or into `locked_reward` while the
/// harvest lock is active. Returns the amount to pay now.
fn settle<L: LedgerStorage + LedgerEnv + ?Sized>(
    ledger: &mut L,
    pool_id: PoolId,
    owner: AccountId,
    acc_reward_per_share: Balance,
    position: &mut Position,
) -> FarmResult<Balance> {
    let now = ledger.now();
    let pending = position.pending(acc_reward_per_share)?;
    if !position.can_harvest(now) {
        if pending > 0 {
            position.locked_reward = math::add(position.locked_reward, pending)?;
            ledger.emit(LedgerEvent::RewardLockedUp {
                owner,
                pool_id,
                amount: pending,
            });
        }
        return Ok(0);
    }
    let payout = math::add(pending, position.locked_reward)?;
    if payout > 0 {
        position.locked_reward = 0;
        position.next_harvest_at = math::add_blocks(now, ledger.settings().harvest_interval)?;
    }
    Ok(payout)
}

/// Pays `gross` to `owner` from the mining treasury, less the harvest fee,
/// and the referral commission on top of it from the marketing treasury.
fn pay_out<L: LedgerStorage + LedgerEnv + ?Sized>(
    ledger: &mut L,
    pool_id: PoolId,
    owner: AccountId,
    gross: Balance,
) -> FarmResult<()> {
    if gross == 0 {
        return Ok(());
    }
    let settings = *ledger.settings();
    let fee = math::bps_of(gross, settings.harvest_fee_bps)?;
    let net = math::sub(gross, fee)?;
    if net > 0 {
        ledger.draw_reward(settings.mining_treasury, owner, net)?;
    }
    ledger.emit(LedgerEvent::Harvest {
        owner,
        pool_id,
        gross,
        fee,
        net,
    });

    let Some(registry) = settings.referral_registry else {
        return Ok(());
    };
    let Some(referrer) = non_null(ledger.lookup_referrer(registry, owner)?) else {
        return Ok(());
    };
    let commission = math::bps_of(gross, settings.referral_commission_bps)?;
    if commission == 0 {
        return Ok(());
    }
    ledger.draw_reward(settings.marketing_treasury, referrer, commission)?;
    ledger.credit_commission(registry, referrer, commission)?;
    ledger.emit(LedgerEvent::ReferralCommissionPaid {
        owner,
        referrer,
        amount: commission,
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ACC_PRECISION;
    use crate::sim::{accounts, Chain, Event};

    const TREASURY_FUNDING: Balance = 10_000;

    fn account(byte: u8) -> AccountId {
        AccountId::from([byte; 32])
    }

    fn lp(index: u8) -> AccountId {
        AccountId::from([0xA0 + index; 32])
    }

    struct Farm {
        chain: Chain,
        owner: AccountId,
    }

    impl Farm {
        /// Ledger with one pool per weight, referrals wired, no harvest lock
        /// and funded treasuries.
        fn new(weights: &[Weight], rate: Balance) -> Self {
            let owner = account(1);
            let mut chain = Chain::new(owner);
            chain.wire_referrals(owner).unwrap();
            chain
                .call_ledger(owner, |l| {
                    l.set_emission_rate(rate)?;
                    l.set_harvest_interval(0)?;
                    for (index, weight) in weights.iter().enumerate() {
                        l.add_pool(*weight, lp(index as u8))?;
                    }
                    Ok(())
                })
                .unwrap();
            chain.mint(accounts::reward_token(), accounts::mining_treasury(), TREASURY_FUNDING);
            chain.mint(accounts::reward_token(), accounts::marketing_treasury(), TREASURY_FUNDING);
            Self { chain, owner }
        }

        fn reward(&self, holder: AccountId) -> Balance {
            self.chain.balance(accounts::reward_token(), holder)
        }

        fn deposit(
            &mut self,
            who: AccountId,
            pool_id: PoolId,
            amount: Balance,
            referrer: Option<AccountId>,
        ) -> FarmResult<()> {
            self.chain
                .call_ledger(who, |l| l.deposit(pool_id, amount, referrer))
        }

        fn pending(&mut self, pool_id: PoolId, who: AccountId) -> Balance {
            self.chain
                .call_ledger(who, |l| l.pending_reward(pool_id, who))
                .unwrap()
        }
    }

    #[test]
    fn withdraw_after_one_block_pays_depositor_and_referrer() {
        let mut farm = Farm::new(&[2_000, 1_000, 500, 500, 500, 500, 500, 100, 100], 590);
        let (user, referrer) = (account(2), account(3));
        farm.chain.mint(lp(0), user, 20);

        farm.chain.set_block(100);
        farm.deposit(user, 0, 20, Some(referrer)).unwrap();
        farm.chain.set_block(101);
        farm.chain
            .call_ledger(user, |l| l.withdraw(0, 20))
            .unwrap();

        assert_eq!(farm.reward(user), 202);
        assert_eq!(farm.reward(referrer), 10);
        assert_eq!(farm.chain.balance(lp(0), user), 20);
        assert_eq!(farm.reward(accounts::mining_treasury()), TREASURY_FUNDING - 202);
        assert_eq!(farm.reward(accounts::marketing_treasury()), TREASURY_FUNDING - 10);
        assert_eq!(farm.chain.registry_view().total_commission(referrer), 10);
        assert_eq!(farm.chain.ledger_view().pool(0).unwrap().total_staked, 0);
    }

    #[test]
    fn no_commission_without_a_bound_referrer() {
        let mut farm = Farm::new(&[1_000], 1_000);
        let user = account(2);
        farm.chain.mint(lp(0), user, 5);

        farm.chain.set_block(10);
        farm.deposit(user, 0, 5, None).unwrap();
        farm.chain.set_block(11);
        let paid = farm.chain.call_ledger(user, |l| l.harvest(0)).unwrap();

        assert_eq!(paid, 1_000);
        assert_eq!(farm.reward(user), 975);
        assert_eq!(farm.reward(accounts::marketing_treasury()), TREASURY_FUNDING);
        assert!(!farm.chain.events().iter().any(|e| matches!(
            e,
            Event::Ledger(LedgerEvent::ReferralCommissionPaid { .. })
        )));
    }

    #[test]
    fn referrer_is_bound_once_and_never_to_self() {
        let mut farm = Farm::new(&[1_000], 100);
        let (user, first, second) = (account(2), account(3), account(4));
        farm.chain.mint(lp(0), user, 10);

        farm.deposit(user, 0, 0, Some(first)).unwrap();
        assert_eq!(farm.chain.registry_view().referrer_of(user), None);

        farm.deposit(user, 0, 1, Some(user)).unwrap();
        assert_eq!(farm.chain.registry_view().referrer_of(user), None);

        farm.deposit(user, 0, 1, Some(account(0))).unwrap();
        farm.deposit(user, 0, 1, Some(first)).unwrap();
        farm.deposit(user, 0, 1, Some(second)).unwrap();

        let registry = farm.chain.registry_view();
        assert_eq!(registry.referrer_of(user), Some(first));
        assert_eq!(registry.referrals_count(first), 1);
        assert_eq!(registry.referrals_count(second), 0);
    }

    #[test]
    fn ledger_must_be_a_registry_operator() {
        let owner = account(1);
        let mut chain = Chain::new(owner);
        chain
            .call_ledger(owner, |l| {
                l.set_referral_registry(Some(accounts::registry()))?;
                l.add_pool(1_000, lp(0)).map(|_| ())
            })
            .unwrap();
        let user = account(2);
        chain.mint(lp(0), user, 1);

        assert_eq!(
            chain.call_ledger(user, |l| l.deposit(0, 1, Some(account(3)))),
            Err(FarmError::Unauthorized)
        );
        // The failed call left nothing behind.
        assert_eq!(chain.balance(lp(0), user), 1);
        assert_eq!(chain.ledger_view().position(0, user), Position::default());
    }

    #[test]
    fn harvest_lock_defers_and_accumulates_reward() {
        let mut farm = Farm::new(&[1_000], 100);
        let user = account(2);
        farm.chain.mint(lp(0), user, 10);
        farm.chain
            .call_ledger(farm.owner, |l| l.set_harvest_interval(10))
            .unwrap();

        farm.chain.set_block(100);
        farm.deposit(user, 0, 10, None).unwrap();
        assert_eq!(farm.chain.ledger_view().position(0, user).next_harvest_at, 110);

        farm.chain.set_block(105);
        farm.deposit(user, 0, 0, None).unwrap();
        let position = farm.chain.ledger_view().position(0, user);
        assert_eq!(position.locked_reward, 500);
        assert_eq!(farm.reward(user), 0);

        farm.chain.set_block(109);
        assert_eq!(
            farm.chain.call_ledger(user, |l| l.harvest(0)),
            Err(FarmError::HarvestLocked)
        );
        assert_eq!(farm.pending(0, user), 400);

        farm.chain.set_block(110);
        assert!(farm.chain.call_ledger(user, |l| Ok(l.can_harvest(0, user))).unwrap());
        let paid = farm.chain.call_ledger(user, |l| l.harvest(0)).unwrap();
        assert_eq!(paid, 1_000);
        assert_eq!(farm.reward(user), 975);

        let position = farm.chain.ledger_view().position(0, user);
        assert_eq!(position.locked_reward, 0);
        assert_eq!(position.next_harvest_at, 120);
    }

    #[test]
    fn withdraw_under_lock_returns_stake_and_keeps_reward_locked() {
        let mut farm = Farm::new(&[1_000], 100);
        let user = account(2);
        farm.chain.mint(lp(0), user, 10);
        farm.chain
            .call_ledger(farm.owner, |l| l.set_harvest_interval(50))
            .unwrap();

        farm.chain.set_block(1);
        farm.deposit(user, 0, 10, None).unwrap();
        farm.chain.set_block(3);
        farm.chain.call_ledger(user, |l| l.withdraw(0, 10)).unwrap();

        assert_eq!(farm.chain.balance(lp(0), user), 10);
        assert_eq!(farm.reward(user), 0);
        assert_eq!(farm.chain.ledger_view().position(0, user).locked_reward, 200);
        assert!(farm.chain.events().iter().any(|e| matches!(
            e,
            Event::Ledger(LedgerEvent::RewardLockedUp { amount: 200, .. })
        )));
    }

    #[test]
    fn withdraw_more_than_staked_fails() {
        let mut farm = Farm::new(&[1_000], 100);
        let user = account(2);
        farm.chain.mint(lp(0), user, 10);
        farm.deposit(user, 0, 10, None).unwrap();

        assert_eq!(
            farm.chain.call_ledger(user, |l| l.withdraw(0, 11)),
            Err(FarmError::InsufficientBalance)
        );
    }

    #[test]
    fn deposit_without_funds_is_rolled_back() {
        let mut farm = Farm::new(&[1_000], 100);
        let user = account(2);
        assert_eq!(
            farm.deposit(user, 0, 10, None),
            Err(FarmError::InsufficientBalance)
        );
        assert_eq!(farm.chain.ledger_view().pool(0).unwrap().total_staked, 0);
    }

    #[test]
    fn emergency_withdraw_forfeits_reward() {
        let mut farm = Farm::new(&[1_000], 100);
        let user = account(2);
        farm.chain.mint(lp(0), user, 40);
        farm.chain
            .call_ledger(farm.owner, |l| l.set_harvest_interval(100))
            .unwrap();

        farm.chain.set_block(10);
        farm.deposit(user, 0, 40, None).unwrap();
        farm.chain.set_block(20);
        farm.deposit(user, 0, 0, None).unwrap();
        farm.chain.set_block(30);

        let returned = farm
            .chain
            .call_ledger(user, |l| l.emergency_withdraw(0))
            .unwrap();

        assert_eq!(returned, 40);
        assert_eq!(farm.chain.balance(lp(0), user), 40);
        assert_eq!(farm.reward(user), 0);
        let position = farm.chain.ledger_view().position(0, user);
        assert_eq!(position.amount, 0);
        assert_eq!(position.reward_debt, 0);
        assert_eq!(position.locked_reward, 0);
        assert_eq!(farm.chain.ledger_view().pool(0).unwrap().total_staked, 0);
    }

    #[test]
    fn emergency_withdraw_survives_an_accrual_fault() {
        let mut farm = Farm::new(&[1_000], MAX_REWARD_PER_BLOCK);
        let (dust, whale) = (account(2), account(3));
        farm.chain.mint(lp(0), dust, 1);
        farm.chain.mint(lp(0), whale, 1_000);

        farm.chain.set_block(1);
        farm.deposit(dust, 0, 1, None).unwrap();
        // 4e6 blocks of 1e20 over one staked unit overflows the share price.
        farm.chain.set_block(4_000_001);
        assert_eq!(
            farm.chain.call_ledger(dust, |l| l.accrue_pool(0)),
            Err(FarmError::ArithmeticFault)
        );

        let returned = farm
            .chain
            .call_ledger(dust, |l| l.emergency_withdraw(0))
            .unwrap();

        assert_eq!(returned, 1);
        assert_eq!(farm.chain.balance(lp(0), dust), 1);
        assert_eq!(farm.chain.ledger_view().position(0, dust).amount, 0);
        let pool = farm.chain.ledger_view().pool(0).unwrap();
        assert_eq!(pool.total_staked, 0);
        assert_eq!(pool.acc_reward_per_share, 0);

        // With the pool empty the clock moves on and staking works again.
        farm.deposit(whale, 0, 1_000, None).unwrap();
        farm.chain.set_block(4_000_002);
        assert_eq!(
            farm.chain
                .call_ledger(whale, |l| l.emergency_withdraw(0))
                .unwrap(),
            1_000
        );
        assert_eq!(farm.chain.balance(lp(0), whale), 1_000);
    }

    #[test]
    fn dust_stake_does_not_price_out_large_deposits() {
        const ONE: Balance = 1_000_000_000_000_000_000;
        let mut farm = Farm::new(&[1_000], ONE);
        let (dust, honest) = (account(2), account(3));
        farm.chain.mint(lp(0), dust, 1);
        farm.chain.mint(lp(0), honest, ONE);

        farm.chain.set_block(10);
        farm.deposit(dust, 0, 1, None).unwrap();
        farm.chain.set_block(11);
        farm.deposit(honest, 0, ONE, None).unwrap();

        let pool = farm.chain.ledger_view().pool(0).unwrap();
        assert_eq!(pool.acc_reward_per_share, ONE * ACC_PRECISION);
        assert_eq!(pool.total_staked, ONE + 1);
        assert_eq!(farm.chain.ledger_view().position(0, honest).reward_debt, ONE * ONE);

        // One more block of 1e18 shared by 1e18 + 1 units, truncated.
        farm.chain.set_block(12);
        assert_eq!(farm.pending(0, honest), 999_999_999_999_000_000);
    }

    #[test]
    fn payouts_never_exceed_emission() {
        let mut farm = Farm::new(&[1_000], 100);
        farm.chain
            .call_ledger(farm.owner, |l| l.set_harvest_fee(0))
            .unwrap();
        let (a, b) = (account(2), account(3));
        farm.chain.mint(lp(0), a, 1);
        farm.chain.mint(lp(0), b, 2);

        farm.chain.set_block(10);
        farm.deposit(a, 0, 1, None).unwrap();
        farm.deposit(b, 0, 2, None).unwrap();
        farm.chain.set_block(11);
        farm.chain.call_ledger(a, |l| l.harvest(0)).unwrap();
        farm.chain.call_ledger(b, |l| l.harvest(0)).unwrap();

        let paid = farm.reward(a) + farm.reward(b);
        assert!(paid <= 100);
        assert_eq!(farm.reward(a), 33);
        assert_eq!(farm.reward(b), 66);
    }

    #[test]
    fn stake_sums_match_pool_total() {
        let mut farm = Farm::new(&[1_000, 500], 100);
        let users = [account(2), account(3), account(4)];
        for user in users {
            farm.chain.mint(lp(1), user, 100);
        }
        farm.deposit(users[0], 1, 30, None).unwrap();
        farm.deposit(users[1], 1, 50, None).unwrap();
        farm.chain.set_block(5);
        farm.deposit(users[2], 1, 70, None).unwrap();
        farm.chain.call_ledger(users[1], |l| l.withdraw(1, 20)).unwrap();
        farm.chain
            .call_ledger(users[2], |l| l.emergency_withdraw(1))
            .unwrap();

        let ledger = farm.chain.ledger_view();
        let staked: Balance = users.iter().map(|u| ledger.position(1, *u).amount).sum();
        assert_eq!(staked, 60);
        assert_eq!(ledger.pool(1).unwrap().total_staked, staked);
    }

    #[test]
    fn rate_change_only_applies_going_forward() {
        let mut farm = Farm::new(&[1_000], 100);
        let user = account(2);
        farm.chain.mint(lp(0), user, 1);
        farm.chain.set_block(10);
        farm.deposit(user, 0, 1, None).unwrap();

        farm.chain.set_block(20);
        farm.chain
            .call_ledger(farm.owner, |l| l.set_spy_per_block(200))
            .unwrap();
        farm.chain.set_block(25);
        assert_eq!(farm.pending(0, user), 1_000 + 1_000);
    }

    #[test]
    fn weight_change_scope_decides_retroactivity() {
        for (scope, expected) in [(AccrualScope::AllPools, 750), (AccrualScope::TouchedPool, 500)] {
            let mut farm = Farm::new(&[1_000, 1_000], 100);
            let user = account(2);
            farm.chain.mint(lp(0), user, 1);
            farm.chain.mint(lp(1), user, 1);
            farm.chain
                .call_ledger(farm.owner, |l| l.set_accrual_scope(scope))
                .unwrap();

            farm.chain.set_block(10);
            farm.deposit(user, 0, 1, None).unwrap();
            farm.deposit(user, 1, 1, None).unwrap();
            farm.chain.set_block(20);
            farm.chain
                .call_ledger(farm.owner, |l| l.set_pool_weight(1, 3_000, true))
                .unwrap();
            farm.chain.set_block(30);

            assert_eq!(farm.pending(0, user), expected);
            assert_eq!(farm.chain.ledger_view().settings().total_weight, 4_000);
        }
    }

    #[test]
    fn new_pool_starts_accruing_at_start_block() {
        let owner = account(1);
        let mut chain = Chain::new(owner);
        chain
            .call_ledger(owner, |l| {
                l.settings_mut().start_block = 50;
                Ok(())
            })
            .unwrap();
        chain.set_block(7);
        let pool_id = chain.call_ledger(owner, |l| l.add_pool(10, lp(0))).unwrap();

        assert_eq!(pool_id, 0);
        assert_eq!(chain.ledger_view().pool(0).unwrap().last_accrual, 50);
        assert_eq!(chain.call_ledger(owner, |l| Ok(l.pool_length())), Ok(1));
    }

    #[test]
    fn admin_calls_need_the_owner() {
        let mut farm = Farm::new(&[1_000], 100);
        let stranger = account(9);
        let attempts: [&dyn Fn(&mut crate::sim::LedgerCall<'_>) -> FarmResult<()>; 8] = [
            &|l| l.add_pool(1, lp(3)).map(|_| ()),
            &|l| l.set_pool_weight(0, 1, false),
            &|l| l.set_emission_rate(1),
            &|l| l.set_harvest_interval(1),
            &|l| l.set_referral_registry(None),
            &|l| l.set_referral_commission_rate(1),
            &|l| l.set_harvest_fee(1),
            &|l| l.transfer_ownership(stranger),
        ];
        for attempt in attempts {
            assert_eq!(
                farm.chain.call_ledger(stranger, |l| attempt(l)),
                Err(FarmError::Unauthorized)
            );
        }
    }

    #[test]
    fn settings_are_bounded() {
        let mut farm = Farm::new(&[1_000], 100);
        let owner = farm.owner;
        let chain = &mut farm.chain;
        assert_eq!(
            chain.call_ledger(owner, |l| l.set_emission_rate(MAX_REWARD_PER_BLOCK + 1)),
            Err(FarmError::AboveMaximum)
        );
        assert_eq!(
            chain.call_ledger(owner, |l| l.set_harvest_interval(MAX_HARVEST_INTERVAL + 1)),
            Err(FarmError::AboveMaximum)
        );
        assert_eq!(
            chain.call_ledger(owner, |l| l.set_referral_commission_rate(
                MAX_REFERRAL_COMMISSION_BPS + 1
            )),
            Err(FarmError::AboveMaximum)
        );
        assert_eq!(
            chain.call_ledger(owner, |l| l.set_harvest_fee(MAX_HARVEST_FEE_BPS + 1)),
            Err(FarmError::AboveMaximum)
        );
        chain
            .call_ledger(owner, |l| l.set_harvest_interval(MAX_HARVEST_INTERVAL))
            .unwrap();
    }

    #[test]
    fn ownership_moves_with_transfer() {
        let mut farm = Farm::new(&[1_000], 100);
        let heir = account(8);
        let owner = farm.owner;
        farm.chain
            .call_ledger(owner, |l| l.transfer_ownership(heir))
            .unwrap();
        assert_eq!(
            farm.chain.call_ledger(owner, |l| l.set_harvest_fee(0)),
            Err(FarmError::Unauthorized)
        );
        farm.chain.call_ledger(heir, |l| l.set_harvest_fee(0)).unwrap();
    }

    #[test]
    fn unknown_pool_is_rejected() {
        let mut farm = Farm::new(&[1_000], 100);
        let user = account(2);
        assert_eq!(farm.deposit(user, 7, 0, None), Err(FarmError::UnknownPool));
        assert_eq!(
            farm.chain.call_ledger(user, |l| l.accrue_pool(7)),
            Err(FarmError::UnknownPool)
        );
        assert_eq!(
            farm.chain.call_ledger(user, |l| l.pending_reward(7, user)),
            Err(FarmError::UnknownPool)
        );
    }

    #[test]
    fn accrual_is_idempotent_within_a_block() {
        let mut farm = Farm::new(&[1_000, 1_000], 100);
        let user = account(2);
        farm.chain.mint(lp(0), user, 3);
        farm.deposit(user, 0, 3, None).unwrap();
        farm.chain.set_block(9);

        farm.chain.call_ledger(user, |l| l.accrue_pool(0)).unwrap();
        let once = farm.chain.ledger_view().pool(0).unwrap();
        farm.chain.call_ledger(user, |l| l.mass_accrue()).unwrap();
        assert_eq!(farm.chain.ledger_view().pool(0).unwrap(), once);
    }

    #[test]
    fn reentry_is_rejected() {
        let mut farm = Farm::new(&[1_000], 100);
        let user = account(2);
        let mut call = farm.chain.ledger(user);
        call.set_entered(true);
        assert_eq!(call.deposit(0, 0, None), Err(FarmError::Reentrancy));
        assert_eq!(call.harvest(0), Err(FarmError::Reentrancy));
        call.set_entered(false);
        assert_eq!(call.harvest(0), Ok(0));
        assert!(!call.entered());
    }
}
