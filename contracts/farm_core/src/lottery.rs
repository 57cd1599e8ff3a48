//! Farms one ledger position on behalf of a lottery and forwards every reward
//! it receives to the configured receiver.
//!
//! Only what the ledger pays during a call is forwarded. Reward-token
//! principal the adapter holds, staked or not, stays with the adapter.

use crate::{math, AccountId, Balance, FarmError, FarmResult, LotteryEvent, Pool, PoolId};

pub trait LotteryStorage {
    fn load_admin(&self) -> AccountId;
    fn store_admin(&mut self, admin: AccountId);
    fn load_receiver(&self) -> AccountId;
    fn store_receiver(&mut self, receiver: AccountId);
    fn ledger_contract(&self) -> AccountId;
    fn reward_asset(&self) -> AccountId;
}

/// Execution context of an adapter call. Asset methods act on the adapter's
/// own holdings; ledger methods call the ledger with the adapter as caller.
pub trait LotteryEnv {
    fn caller(&self) -> AccountId;
    fn asset_balance(&self, asset: AccountId) -> FarmResult<Balance>;
    fn send_asset(&mut self, asset: AccountId, to: AccountId, amount: Balance) -> FarmResult<()>;
    fn approve_asset(&mut self, asset: AccountId, spender: AccountId, amount: Balance)
        -> FarmResult<()>;
    fn ledger_pool(&self, ledger: AccountId, pool_id: PoolId) -> FarmResult<Option<Pool>>;
    fn ledger_pending(&self, ledger: AccountId, pool_id: PoolId) -> FarmResult<Balance>;
    fn ledger_deposit(
        &mut self,
        ledger: AccountId,
        pool_id: PoolId,
        amount: Balance,
        referrer: Option<AccountId>,
    ) -> FarmResult<()>;
    fn ledger_harvest(&mut self, ledger: AccountId, pool_id: PoolId) -> FarmResult<Balance>;
    fn ledger_emergency_withdraw(&mut self, ledger: AccountId, pool_id: PoolId)
        -> FarmResult<Balance>;
    fn emit(&mut self, event: LotteryEvent);
}

pub trait LotteryAdapter: LotteryStorage + LotteryEnv {
    /// Stakes `amount` of `stake_asset`, already held by the adapter, in the
    /// ledger pool `pool_id`. A top-up that settles pending reward forwards
    /// it like a harvest.
    fn start_farming(
        &mut self,
        pool_id: PoolId,
        stake_asset: AccountId,
        amount: Balance,
        referrer: Option<AccountId>,
    ) -> FarmResult<()> {
        ensure_admin(self)?;
        let ledger = self.ledger_contract();
        let pool = self
            .ledger_pool(ledger, pool_id)?
            .ok_or(FarmError::UnknownPool)?;
        if pool.stake_asset != stake_asset {
            return Err(FarmError::StakeAssetMismatch);
        }
        if self.asset_balance(stake_asset)? < amount {
            return Err(FarmError::InsufficientBalance);
        }
        let token = self.reward_asset();
        let before = self.asset_balance(token)?;
        let baseline = if stake_asset == token {
            math::sub(before, amount)?
        } else {
            before
        };

        self.approve_asset(stake_asset, ledger, amount)?;
        self.ledger_deposit(ledger, pool_id, amount, referrer)?;
        self.emit(LotteryEvent::FarmingStarted { pool_id, amount });
        forward_since(self, baseline)?;
        Ok(())
    }

    fn pending_reward(&self, pool_id: PoolId) -> FarmResult<Balance> {
        self.ledger_pending(self.ledger_contract(), pool_id)
    }

    /// Harvests the position and sends what the ledger paid out to the
    /// receiver. Returns the amount forwarded.
    fn harvest(&mut self, pool_id: PoolId) -> FarmResult<Balance> {
        ensure_admin(self)?;
        let ledger = self.ledger_contract();
        let before = self.asset_balance(self.reward_asset())?;
        self.ledger_harvest(ledger, pool_id)?;
        forward_since(self, before)
    }

    fn set_receiver(&mut self, receiver: AccountId) -> FarmResult<()> {
        ensure_admin(self)?;
        let previous = self.load_receiver();
        self.store_receiver(receiver);
        self.emit(LotteryEvent::ReceiverUpdated {
            previous,
            current: receiver,
        });
        Ok(())
    }

    fn set_admin(&mut self, admin: AccountId) -> FarmResult<()> {
        ensure_admin(self)?;
        let previous = self.load_admin();
        self.store_admin(admin);
        self.emit(LotteryEvent::AdminUpdated {
            previous,
            current: admin,
        });
        Ok(())
    }

    /// Pulls the stake back into the adapter, forfeiting unpaid reward.
    fn emergency_withdraw(&mut self, pool_id: PoolId) -> FarmResult<Balance> {
        ensure_admin(self)?;
        let ledger = self.ledger_contract();
        let amount = self.ledger_emergency_withdraw(ledger, pool_id)?;
        self.emit(LotteryEvent::EmergencyWithdraw { pool_id, amount });
        Ok(amount)
    }

    fn admin(&self) -> AccountId {
        self.load_admin()
    }

    fn receiver(&self) -> AccountId {
        self.load_receiver()
    }

    fn ledger(&self) -> AccountId {
        self.ledger_contract()
    }

    fn reward_token(&self) -> AccountId {
        self.reward_asset()
    }
}

impl<T: LotteryStorage + LotteryEnv + ?Sized> LotteryAdapter for T {}

/// Sends the reward-token balance above `baseline` to the receiver.
fn forward_since<A: LotteryStorage + LotteryEnv + ?Sized>(
    adapter: &mut A,
    baseline: Balance,
) -> FarmResult<Balance> {
    let token = adapter.reward_asset();
    let held = adapter.asset_balance(token)?;
    let proceeds = held.saturating_sub(baseline);
    if proceeds > 0 {
        let receiver = adapter.load_receiver();
        adapter.send_asset(token, receiver, proceeds)?;
        adapter.emit(LotteryEvent::ProceedsForwarded {
            receiver,
            amount: proceeds,
        });
    }
    Ok(proceeds)
}

fn ensure_admin<A: LotteryStorage + LotteryEnv + ?Sized>(adapter: &A) -> FarmResult<()> {
    if adapter.caller() != adapter.load_admin() {
        return Err(FarmError::Unauthorized);
    }
    Ok(())
}
