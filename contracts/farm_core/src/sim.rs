//! Deterministic in-memory chain.
//!
//! Hosts one ledger, one referral registry, any number of lottery adapters
//! and a multi-asset token bank. The block number only moves when a test
//! moves it. Every `call_*` runs against a snapshot that is restored if the
//! call fails, the same way a reverted contract call leaves storage alone.

use ink::prelude::collections::BTreeMap;
use ink::prelude::vec::Vec;

use crate::ledger::{pending_at, LedgerEnv, LedgerSettings, LedgerStorage, RewardLedger};
use crate::lottery::{LotteryEnv, LotteryStorage};
use crate::pool::{Pool, Position};
use crate::referral::{ReferralEnv, ReferralRegistry, ReferralStorage};
use crate::{
    math, AccountId, Balance, FarmError, FarmResult, LedgerEvent, LotteryEvent, Monotonic,
    PoolId, ReferralEvent,
};

/// Fixed addresses of the contracts and treasuries hosted by [`Chain`].
pub mod accounts {
    use crate::AccountId;

    pub fn ledger() -> AccountId {
        AccountId::from([0xF0; 32])
    }

    pub fn registry() -> AccountId {
        AccountId::from([0xF1; 32])
    }

    pub fn reward_token() -> AccountId {
        AccountId::from([0xF2; 32])
    }

    pub fn mining_treasury() -> AccountId {
        AccountId::from([0xF3; 32])
    }

    pub fn marketing_treasury() -> AccountId {
        AccountId::from([0xF4; 32])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Ledger(LedgerEvent),
    Referral(ReferralEvent),
    Lottery(LotteryEvent),
}

/// Balances of every asset, keyed by `(asset, holder)`.
#[derive(Debug, Clone, Default)]
pub struct Bank {
    balances: BTreeMap<(AccountId, AccountId), Balance>,
}

impl Bank {
    pub fn balance_of(&self, asset: AccountId, holder: AccountId) -> Balance {
        self.balances.get(&(asset, holder)).copied().unwrap_or(0)
    }

    pub fn mint(&mut self, asset: AccountId, to: AccountId, amount: Balance) {
        let balance = self.balance_of(asset, to).saturating_add(amount);
        self.balances.insert((asset, to), balance);
    }

    pub fn transfer(
        &mut self,
        asset: AccountId,
        from: AccountId,
        to: AccountId,
        amount: Balance,
    ) -> FarmResult<()> {
        let from_balance = self.balance_of(asset, from);
        if from_balance < amount {
            return Err(FarmError::InsufficientBalance);
        }
        self.balances.insert((asset, from), from_balance - amount);
        let to_balance = math::add(self.balance_of(asset, to), amount)?;
        self.balances.insert((asset, to), to_balance);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LedgerState {
    settings: LedgerSettings,
    pool_count: PoolId,
    pools: BTreeMap<PoolId, Pool>,
    positions: BTreeMap<(PoolId, AccountId), Position>,
    entered: bool,
}

impl LedgerState {
    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn pool(&self, pool_id: PoolId) -> Option<Pool> {
        self.pools.get(&pool_id).copied()
    }

    pub fn position(&self, pool_id: PoolId, owner: AccountId) -> Position {
        self.positions
            .get(&(pool_id, owner))
            .copied()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct RegistryState {
    owner: AccountId,
    operators: BTreeMap<AccountId, bool>,
    referrers: BTreeMap<AccountId, AccountId>,
    referrals_count: BTreeMap<AccountId, u32>,
    commissions: BTreeMap<AccountId, Balance>,
}

impl RegistryState {
    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn is_operator(&self, account: AccountId) -> bool {
        self.operators.get(&account).copied().unwrap_or(false)
    }

    pub fn referrer_of(&self, user: AccountId) -> Option<AccountId> {
        self.referrers.get(&user).copied()
    }

    pub fn referrals_count(&self, referrer: AccountId) -> u32 {
        self.referrals_count.get(&referrer).copied().unwrap_or(0)
    }

    pub fn total_commission(&self, referrer: AccountId) -> Balance {
        self.commissions.get(&referrer).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct AdapterState {
    admin: AccountId,
    receiver: AccountId,
    ledger: AccountId,
    reward_token: AccountId,
}

impl AdapterState {
    pub fn admin(&self) -> AccountId {
        self.admin
    }

    pub fn receiver(&self) -> AccountId {
        self.receiver
    }
}

#[derive(Debug, Clone)]
pub struct Chain {
    block: Monotonic,
    bank: Bank,
    ledger: LedgerState,
    registry: RegistryState,
    adapters: BTreeMap<AccountId, AdapterState>,
    log: Vec<Event>,
}

impl Chain {
    /// A ledger with no rate and no pools, and an empty registry, both owned
    /// by `owner`. Referrals are not wired.
    pub fn new(owner: AccountId) -> Self {
        let settings = LedgerSettings::new(
            owner,
            accounts::reward_token(),
            accounts::mining_treasury(),
            accounts::marketing_treasury(),
            0,
            0,
        );
        Self {
            block: 0,
            bank: Bank::default(),
            ledger: LedgerState {
                settings,
                pool_count: 0,
                pools: BTreeMap::new(),
                positions: BTreeMap::new(),
                entered: false,
            },
            registry: RegistryState {
                owner,
                operators: BTreeMap::new(),
                referrals_count: BTreeMap::new(),
                referrers: BTreeMap::new(),
                commissions: BTreeMap::new(),
            },
            adapters: BTreeMap::new(),
            log: Vec::new(),
        }
    }

    /// Makes the ledger a registry operator and points the ledger at the
    /// registry. `owner` must own both.
    pub fn wire_referrals(&mut self, owner: AccountId) -> FarmResult<()> {
        self.call_registry(owner, |r| r.set_operator(accounts::ledger(), true))?;
        self.call_ledger(owner, |l| l.set_referral_registry(Some(accounts::registry())))
    }

    pub fn deploy_adapter(&mut self, account: AccountId, admin: AccountId, receiver: AccountId) {
        self.adapters.insert(
            account,
            AdapterState {
                admin,
                receiver,
                ledger: accounts::ledger(),
                reward_token: accounts::reward_token(),
            },
        );
    }

    pub fn block(&self) -> Monotonic {
        self.block
    }

    pub fn set_block(&mut self, block: Monotonic) {
        self.block = block;
    }

    pub fn mint(&mut self, asset: AccountId, to: AccountId, amount: Balance) {
        self.bank.mint(asset, to, amount);
    }

    pub fn balance(&self, asset: AccountId, holder: AccountId) -> Balance {
        self.bank.balance_of(asset, holder)
    }

    pub fn events(&self) -> &[Event] {
        &self.log
    }

    pub fn ledger_view(&self) -> &LedgerState {
        &self.ledger
    }

    pub fn registry_view(&self) -> &RegistryState {
        &self.registry
    }

    pub fn adapter_view(&self, account: AccountId) -> Option<&AdapterState> {
        self.adapters.get(&account)
    }

    /// Runs `op` all-or-nothing.
    pub fn transact<T>(&mut self, op: impl FnOnce(&mut Chain) -> FarmResult<T>) -> FarmResult<T> {
        let snapshot = self.clone();
        let result = op(self);
        if result.is_err() {
            *self = snapshot;
        }
        result
    }

    pub fn call_ledger<T>(
        &mut self,
        caller: AccountId,
        op: impl FnOnce(&mut LedgerCall<'_>) -> FarmResult<T>,
    ) -> FarmResult<T> {
        self.transact(|chain| op(&mut chain.ledger(caller)))
    }

    pub fn call_registry<T>(
        &mut self,
        caller: AccountId,
        op: impl FnOnce(&mut RegistryCall<'_>) -> FarmResult<T>,
    ) -> FarmResult<T> {
        self.transact(|chain| {
            op(&mut RegistryCall {
                caller,
                state: &mut chain.registry,
                log: &mut chain.log,
            })
        })
    }

    pub fn call_adapter<T>(
        &mut self,
        adapter: AccountId,
        caller: AccountId,
        op: impl FnOnce(&mut LotteryCall<'_>) -> FarmResult<T>,
    ) -> FarmResult<T> {
        self.transact(|chain| {
            let (world, adapters) = chain.split();
            let state = adapters.get_mut(&adapter).ok_or(FarmError::CallFailed)?;
            op(&mut LotteryCall {
                account: adapter,
                caller,
                state,
                world,
            })
        })
    }

    /// A ledger call outside any snapshot; failures are not rolled back.
    pub fn ledger(&mut self, caller: AccountId) -> LedgerCall<'_> {
        LedgerCall {
            caller,
            world: self.split().0,
        }
    }

    fn split(&mut self) -> (World<'_>, &mut BTreeMap<AccountId, AdapterState>) {
        let world = World {
            block: self.block,
            bank: &mut self.bank,
            ledger: &mut self.ledger,
            registry: &mut self.registry,
            log: &mut self.log,
        };
        (world, &mut self.adapters)
    }
}

struct World<'a> {
    block: Monotonic,
    bank: &'a mut Bank,
    ledger: &'a mut LedgerState,
    registry: &'a mut RegistryState,
    log: &'a mut Vec<Event>,
}

impl World<'_> {
    fn reborrow(&mut self) -> World<'_> {
        World {
            block: self.block,
            bank: &mut *self.bank,
            ledger: &mut *self.ledger,
            registry: &mut *self.registry,
            log: &mut *self.log,
        }
    }
}

/// The ledger contract executing a call from `caller`.
pub struct LedgerCall<'a> {
    caller: AccountId,
    world: World<'a>,
}

impl LedgerCall<'_> {
    fn registry_call(&mut self, registry: AccountId) -> FarmResult<RegistryCall<'_>> {
        if registry != accounts::registry() {
            return Err(FarmError::CallFailed);
        }
        Ok(RegistryCall {
            caller: accounts::ledger(),
            state: &mut *self.world.registry,
            log: &mut *self.world.log,
        })
    }
}

impl LedgerStorage for LedgerCall<'_> {
    fn settings(&self) -> &LedgerSettings {
        &self.world.ledger.settings
    }

    fn settings_mut(&mut self) -> &mut LedgerSettings {
        &mut self.world.ledger.settings
    }

    fn pool_count(&self) -> PoolId {
        self.world.ledger.pool_count
    }

    fn set_pool_count(&mut self, count: PoolId) {
        self.world.ledger.pool_count = count;
    }

    fn load_pool(&self, pool_id: PoolId) -> Option<Pool> {
        self.world.ledger.pool(pool_id)
    }

    fn store_pool(&mut self, pool_id: PoolId, pool: Pool) {
        self.world.ledger.pools.insert(pool_id, pool);
    }

    fn load_position(&self, pool_id: PoolId, owner: AccountId) -> Position {
        self.world.ledger.position(pool_id, owner)
    }

    fn store_position(&mut self, pool_id: PoolId, owner: AccountId, position: Position) {
        self.world.ledger.positions.insert((pool_id, owner), position);
    }

    fn entered(&self) -> bool {
        self.world.ledger.entered
    }

    fn set_entered(&mut self, entered: bool) {
        self.world.ledger.entered = entered;
    }
}

impl LedgerEnv for LedgerCall<'_> {
    fn now(&self) -> Monotonic {
        self.world.block
    }

    fn caller(&self) -> AccountId {
        self.caller
    }

    fn transfer_in(&mut self, asset: AccountId, from: AccountId, amount: Balance) -> FarmResult<()> {
        self.world.bank.transfer(asset, from, accounts::ledger(), amount)
    }

    fn transfer_out(&mut self, asset: AccountId, to: AccountId, amount: Balance) -> FarmResult<()> {
        self.world.bank.transfer(asset, accounts::ledger(), to, amount)
    }

    fn draw_reward(&mut self, treasury: AccountId, to: AccountId, amount: Balance) -> FarmResult<()> {
        let token = self.world.ledger.settings.reward_token;
        self.world.bank.transfer(token, treasury, to, amount)
    }

    fn bind_referral(
        &mut self,
        registry: AccountId,
        user: AccountId,
        referrer: AccountId,
    ) -> FarmResult<()> {
        self.registry_call(registry)?.register_referral(user, referrer)
    }

    fn lookup_referrer(&self, registry: AccountId, user: AccountId) -> FarmResult<Option<AccountId>> {
        if registry != accounts::registry() {
            return Err(FarmError::CallFailed);
        }
        Ok(self.world.registry.referrer_of(user))
    }

    fn credit_commission(
        &mut self,
        registry: AccountId,
        referrer: AccountId,
        amount: Balance,
    ) -> FarmResult<()> {
        self.registry_call(registry)?.record_commission(referrer, amount)
    }

    fn emit(&mut self, event: LedgerEvent) {
        self.world.log.push(Event::Ledger(event));
    }
}

/// The referral registry executing a call from `caller`.
pub struct RegistryCall<'a> {
    caller: AccountId,
    state: &'a mut RegistryState,
    log: &'a mut Vec<Event>,
}

impl ReferralStorage for RegistryCall<'_> {
    fn load_owner(&self) -> AccountId {
        self.state.owner
    }

    fn store_owner(&mut self, owner: AccountId) {
        self.state.owner = owner;
    }

    fn load_operator(&self, account: AccountId) -> bool {
        self.state.is_operator(account)
    }

    fn store_operator(&mut self, account: AccountId, allowed: bool) {
        self.state.operators.insert(account, allowed);
    }

    fn load_referrer(&self, user: AccountId) -> Option<AccountId> {
        self.state.referrer_of(user)
    }

    fn store_referrer(&mut self, user: AccountId, referrer: AccountId) {
        self.state.referrers.insert(user, referrer);
    }

    fn load_referrals_count(&self, referrer: AccountId) -> u32 {
        self.state.referrals_count(referrer)
    }

    fn store_referrals_count(&mut self, referrer: AccountId, count: u32) {
        self.state.referrals_count.insert(referrer, count);
    }

    fn load_commission(&self, referrer: AccountId) -> Balance {
        self.state.total_commission(referrer)
    }

    fn store_commission(&mut self, referrer: AccountId, total: Balance) {
        self.state.commissions.insert(referrer, total);
    }
}

impl ReferralEnv for RegistryCall<'_> {
    fn caller(&self) -> AccountId {
        self.caller
    }

    fn emit(&mut self, event: ReferralEvent) {
        self.log.push(Event::Referral(event));
    }
}

/// A lottery adapter at `account` executing a call from `caller`.
pub struct LotteryCall<'a> {
    account: AccountId,
    caller: AccountId,
    state: &'a mut AdapterState,
    world: World<'a>,
}

impl LotteryCall<'_> {
    fn ledger_call(&mut self, ledger: AccountId) -> FarmResult<LedgerCall<'_>> {
        if ledger != accounts::ledger() {
            return Err(FarmError::CallFailed);
        }
        Ok(LedgerCall {
            caller: self.account,
            world: self.world.reborrow(),
        })
    }
}

impl LotteryStorage for LotteryCall<'_> {
    fn load_admin(&self) -> AccountId {
        self.state.admin
    }

    fn store_admin(&mut self, admin: AccountId) {
        self.state.admin = admin;
    }

    fn load_receiver(&self) -> AccountId {
        self.state.receiver
    }

    fn store_receiver(&mut self, receiver: AccountId) {
        self.state.receiver = receiver;
    }

    fn ledger_contract(&self) -> AccountId {
        self.state.ledger
    }

    fn reward_asset(&self) -> AccountId {
        self.state.reward_token
    }
}

impl LotteryEnv for LotteryCall<'_> {
    fn caller(&self) -> AccountId {
        self.caller
    }

    fn asset_balance(&self, asset: AccountId) -> FarmResult<Balance> {
        Ok(self.world.bank.balance_of(asset, self.account))
    }

    fn send_asset(&mut self, asset: AccountId, to: AccountId, amount: Balance) -> FarmResult<()> {
        self.world.bank.transfer(asset, self.account, to, amount)
    }

    /// The bank lets the ledger pull without allowances.
    fn approve_asset(&mut self, _asset: AccountId, _spender: AccountId, _amount: Balance) -> FarmResult<()> {
        Ok(())
    }

    fn ledger_pool(&self, ledger: AccountId, pool_id: PoolId) -> FarmResult<Option<Pool>> {
        if ledger != accounts::ledger() {
            return Err(FarmError::CallFailed);
        }
        Ok(self.world.ledger.pool(pool_id))
    }

    fn ledger_pending(&self, ledger: AccountId, pool_id: PoolId) -> FarmResult<Balance> {
        if ledger != accounts::ledger() {
            return Err(FarmError::CallFailed);
        }
        let state = &*self.world.ledger;
        let pool = state.pool(pool_id).ok_or(FarmError::UnknownPool)?;
        pending_at(
            &pool,
            &state.position(pool_id, self.account),
            &state.settings,
            self.world.block,
        )
    }

    fn ledger_deposit(
        &mut self,
        ledger: AccountId,
        pool_id: PoolId,
        amount: Balance,
        referrer: Option<AccountId>,
    ) -> FarmResult<()> {
        self.ledger_call(ledger)?.deposit(pool_id, amount, referrer)
    }

    fn ledger_harvest(&mut self, ledger: AccountId, pool_id: PoolId) -> FarmResult<Balance> {
        self.ledger_call(ledger)?.harvest(pool_id)
    }

    fn ledger_emergency_withdraw(&mut self, ledger: AccountId, pool_id: PoolId) -> FarmResult<Balance> {
        self.ledger_call(ledger)?.emergency_withdraw(pool_id)
    }

    fn emit(&mut self, event: LotteryEvent) {
        self.world.log.push(Event::Lottery(event));
    }
}
