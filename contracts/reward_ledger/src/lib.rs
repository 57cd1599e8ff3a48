#![cfg_attr(not(feature = "std"), no_std, no_main)]

//! Multi-pool reward ledger ("MasterChef"). Stakers deposit LP tokens into
//! weighted pools and earn the reward token, paid out of the mining treasury.
//! Referrers bound through the referral registry earn a commission paid out
//! of the marketing treasury.

#[ink::contract]
mod reward_ledger {
    use farm_core::{
        psp22, AccrualScope, FarmError, FarmResult, LedgerEnv, LedgerEvent, LedgerSettings,
        LedgerStorage, Monotonic, Pool, PoolId, Position, RewardLedger as Ledger, Weight,
    };
    use ink::env::call::{build_call, ExecutionInput, Selector};
    use ink::codegen::Env;
    use ink::env::DefaultEnvironment;
    use ink::storage::Mapping;

    // =========================================================================
    // STORAGE
    // =========================================================================

    #[ink(storage)]
    pub struct RewardLedger {
        settings: LedgerSettings,
        pool_count: PoolId,
        pools: Mapping<PoolId, Pool>,
        positions: Mapping<(PoolId, AccountId), Position>,
        entered: bool,
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    #[ink(event)]
    pub struct PoolAdded {
        #[ink(topic)]
        pool_id: PoolId,
        #[ink(topic)]
        stake_asset: AccountId,
        weight: Weight,
    }

    #[ink(event)]
    pub struct PoolWeightUpdated {
        #[ink(topic)]
        pool_id: PoolId,
        previous: Weight,
        current: Weight,
    }

    #[ink(event)]
    pub struct EmissionRateUpdated {
        previous: Balance,
        current: Balance,
    }

    #[ink(event)]
    pub struct HarvestIntervalUpdated {
        previous: Monotonic,
        current: Monotonic,
    }

    #[ink(event)]
    pub struct ReferralRegistryUpdated {
        registry: Option<AccountId>,
    }

    #[ink(event)]
    pub struct ReferralCommissionRateUpdated {
        previous: u16,
        current: u16,
    }

    #[ink(event)]
    pub struct HarvestFeeUpdated {
        previous: u16,
        current: u16,
    }

    #[ink(event)]
    pub struct AccrualScopeUpdated {
        scope: AccrualScope,
    }

    #[ink(event)]
    pub struct OwnershipTransferred {
        #[ink(topic)]
        previous: AccountId,
        #[ink(topic)]
        current: AccountId,
    }

    #[ink(event)]
    pub struct Deposit {
        #[ink(topic)]
        owner: AccountId,
        #[ink(topic)]
        pool_id: PoolId,
        amount: Balance,
    }

    #[ink(event)]
    pub struct Withdraw {
        #[ink(topic)]
        owner: AccountId,
        #[ink(topic)]
        pool_id: PoolId,
        amount: Balance,
    }

    #[ink(event)]
    pub struct Harvest {
        #[ink(topic)]
        owner: AccountId,
        #[ink(topic)]
        pool_id: PoolId,
        gross: Balance,
        fee: Balance,
        net: Balance,
    }

    #[ink(event)]
    pub struct RewardLockedUp {
        #[ink(topic)]
        owner: AccountId,
        #[ink(topic)]
        pool_id: PoolId,
        amount: Balance,
    }

    #[ink(event)]
    pub struct ReferralCommissionPaid {
        #[ink(topic)]
        owner: AccountId,
        #[ink(topic)]
        referrer: AccountId,
        amount: Balance,
    }

    #[ink(event)]
    pub struct EmergencyWithdraw {
        #[ink(topic)]
        owner: AccountId,
        #[ink(topic)]
        pool_id: PoolId,
        amount: Balance,
    }

    // =========================================================================
    // IMPLEMENTATION
    // =========================================================================

    impl RewardLedger {
        /// The treasuries must approve this contract to spend `reward_token`.
        #[ink(constructor)]
        pub fn new(
            reward_token: AccountId,
            mining_treasury: AccountId,
            marketing_treasury: AccountId,
            reward_per_block: Balance,
            start_block: BlockNumber,
        ) -> Self {
            Self {
                settings: LedgerSettings::new(
                    Self::env().caller(),
                    reward_token,
                    mining_treasury,
                    marketing_treasury,
                    reward_per_block,
                    Monotonic::from(start_block),
                ),
                pool_count: 0,
                pools: Mapping::default(),
                positions: Mapping::default(),
                entered: false,
            }
        }

        // =================================================================
        // POOL ADMINISTRATION
        // =================================================================

        #[ink(message)]
        pub fn add_pool(&mut self, weight: Weight, stake_asset: AccountId) -> FarmResult<PoolId> {
            Ledger::add_pool(self, weight, stake_asset)
        }

        #[ink(message)]
        pub fn set_pool_weight(
            &mut self,
            pool_id: PoolId,
            weight: Weight,
            force_accrual: bool,
        ) -> FarmResult<()> {
            Ledger::set_pool_weight(self, pool_id, weight, force_accrual)
        }

        #[ink(message)]
        pub fn set_emission_rate(&mut self, reward_per_block: Balance) -> FarmResult<()> {
            Ledger::set_emission_rate(self, reward_per_block)
        }

        #[ink(message)]
        pub fn set_harvest_interval(&mut self, blocks: Monotonic) -> FarmResult<()> {
            Ledger::set_harvest_interval(self, blocks)
        }

        #[ink(message)]
        pub fn set_referral_registry(&mut self, registry: Option<AccountId>) -> FarmResult<()> {
            Ledger::set_referral_registry(self, registry)
        }

        #[ink(message)]
        pub fn set_referral_commission_rate(&mut self, bps: u16) -> FarmResult<()> {
            Ledger::set_referral_commission_rate(self, bps)
        }

        #[ink(message)]
        pub fn set_harvest_fee(&mut self, bps: u16) -> FarmResult<()> {
            Ledger::set_harvest_fee(self, bps)
        }

        #[ink(message)]
        pub fn set_accrual_scope(&mut self, scope: AccrualScope) -> FarmResult<()> {
            Ledger::set_accrual_scope(self, scope)
        }

        #[ink(message)]
        pub fn transfer_ownership(&mut self, new_owner: AccountId) -> FarmResult<()> {
            Ledger::transfer_ownership(self, new_owner)
        }

        #[ink(message)]
        pub fn accrue_pool(&mut self, pool_id: PoolId) -> FarmResult<()> {
            Ledger::accrue_pool(self, pool_id)
        }

        #[ink(message)]
        pub fn mass_accrue(&mut self) -> FarmResult<()> {
            Ledger::mass_accrue(self)
        }

        // =================================================================
        // STAKING
        // =================================================================

        #[ink(message)]
        pub fn deposit(
            &mut self,
            pool_id: PoolId,
            amount: Balance,
            referrer: Option<AccountId>,
        ) -> FarmResult<()> {
            Ledger::deposit(self, pool_id, amount, referrer)
        }

        #[ink(message)]
        pub fn withdraw(&mut self, pool_id: PoolId, amount: Balance) -> FarmResult<()> {
            Ledger::withdraw(self, pool_id, amount)
        }

        #[ink(message)]
        pub fn harvest(&mut self, pool_id: PoolId) -> FarmResult<Balance> {
            Ledger::harvest(self, pool_id)
        }

        #[ink(message)]
        pub fn emergency_withdraw(&mut self, pool_id: PoolId) -> FarmResult<Balance> {
            Ledger::emergency_withdraw(self, pool_id)
        }

        // =================================================================
        // VIEWS
        // =================================================================

        #[ink(message)]
        pub fn pool_length(&self) -> PoolId {
            Ledger::pool_length(self)
        }

        #[ink(message)]
        pub fn pool(&self, pool_id: PoolId) -> Option<Pool> {
            Ledger::pool(self, pool_id)
        }

        #[ink(message)]
        pub fn position(&self, pool_id: PoolId, owner: AccountId) -> Position {
            Ledger::position(self, pool_id, owner)
        }

        #[ink(message)]
        pub fn pending_reward(&self, pool_id: PoolId, owner: AccountId) -> FarmResult<Balance> {
            Ledger::pending_reward(self, pool_id, owner)
        }

        #[ink(message)]
        pub fn can_harvest(&self, pool_id: PoolId, owner: AccountId) -> bool {
            Ledger::can_harvest(self, pool_id, owner)
        }

        #[ink(message)]
        pub fn settings(&self) -> LedgerSettings {
            self.settings
        }

        // =================================================================
        // REFERRAL REGISTRY CALLS
        // =================================================================

        fn registry_register(
            &self,
            registry: AccountId,
            user: AccountId,
            referrer: AccountId,
        ) -> FarmResult<()> {
            let result = build_call::<DefaultEnvironment>()
                .call(registry)
                .exec_input(
                    ExecutionInput::new(Selector::new(ink::selector_bytes!("register_referral")))
                        .push_arg(user)
                        .push_arg(referrer),
                )
                .returns::<FarmResult<()>>()
                .try_invoke();
            match result {
                Ok(Ok(outcome)) => outcome,
                _ => Err(FarmError::CallFailed),
            }
        }

        fn registry_referrer_of(
            &self,
            registry: AccountId,
            user: AccountId,
        ) -> FarmResult<Option<AccountId>> {
            let result = build_call::<DefaultEnvironment>()
                .call(registry)
                .exec_input(
                    ExecutionInput::new(Selector::new(ink::selector_bytes!("referrer_of")))
                        .push_arg(user),
                )
                .returns::<Option<AccountId>>()
                .try_invoke();
            match result {
                Ok(Ok(referrer)) => Ok(referrer),
                _ => Err(FarmError::CallFailed),
            }
        }

        fn registry_record_commission(
            &self,
            registry: AccountId,
            referrer: AccountId,
            amount: Balance,
        ) -> FarmResult<()> {
            let result = build_call::<DefaultEnvironment>()
                .call(registry)
                .exec_input(
                    ExecutionInput::new(Selector::new(ink::selector_bytes!("record_commission")))
                        .push_arg(referrer)
                        .push_arg(amount),
                )
                .returns::<FarmResult<()>>()
                .try_invoke();
            match result {
                Ok(Ok(outcome)) => outcome,
                _ => Err(FarmError::CallFailed),
            }
        }
    }

    impl LedgerStorage for RewardLedger {
        fn settings(&self) -> &LedgerSettings {
            &self.settings
        }

        fn settings_mut(&mut self) -> &mut LedgerSettings {
            &mut self.settings
        }

        fn pool_count(&self) -> PoolId {
            self.pool_count
        }

        fn set_pool_count(&mut self, count: PoolId) {
            self.pool_count = count;
        }

        fn load_pool(&self, pool_id: PoolId) -> Option<Pool> {
            self.pools.get(pool_id)
        }

        fn store_pool(&mut self, pool_id: PoolId, pool: Pool) {
            self.pools.insert(pool_id, &pool);
        }

        fn load_position(&self, pool_id: PoolId, owner: AccountId) -> Position {
            self.positions.get((pool_id, owner)).unwrap_or_default()
        }

        fn store_position(&mut self, pool_id: PoolId, owner: AccountId, position: Position) {
            self.positions.insert((pool_id, owner), &position);
        }

        fn entered(&self) -> bool {
            self.entered
        }

        fn set_entered(&mut self, entered: bool) {
            self.entered = entered;
        }
    }

    impl LedgerEnv for RewardLedger {
        fn now(&self) -> Monotonic {
            Monotonic::from(self.env().block_number())
        }

        fn caller(&self) -> AccountId {
            self.env().caller()
        }

        fn transfer_in(&mut self, asset: AccountId, from: AccountId, amount: Balance) -> FarmResult<()> {
            psp22::transfer_from(asset, from, self.env().account_id(), amount)
        }

        fn transfer_out(&mut self, asset: AccountId, to: AccountId, amount: Balance) -> FarmResult<()> {
            psp22::transfer(asset, to, amount)
        }

        fn draw_reward(&mut self, treasury: AccountId, to: AccountId, amount: Balance) -> FarmResult<()> {
            psp22::transfer_from(self.settings.reward_token, treasury, to, amount)
        }

        fn bind_referral(
            &mut self,
            registry: AccountId,
            user: AccountId,
            referrer: AccountId,
        ) -> FarmResult<()> {
            self.registry_register(registry, user, referrer)
        }

        fn lookup_referrer(&self, registry: AccountId, user: AccountId) -> FarmResult<Option<AccountId>> {
            self.registry_referrer_of(registry, user)
        }

        fn credit_commission(
            &mut self,
            registry: AccountId,
            referrer: AccountId,
            amount: Balance,
        ) -> FarmResult<()> {
            self.registry_record_commission(registry, referrer, amount)
        }

        fn emit(&mut self, event: LedgerEvent) {
            let env = self.env();
            match event {
                LedgerEvent::PoolAdded { pool_id, stake_asset, weight } => {
                    env.emit_event(PoolAdded { pool_id, stake_asset, weight })
                }
                LedgerEvent::PoolWeightUpdated { pool_id, previous, current } => {
                    env.emit_event(PoolWeightUpdated { pool_id, previous, current })
                }
                LedgerEvent::EmissionRateUpdated { previous, current } => {
                    env.emit_event(EmissionRateUpdated { previous, current })
                }
                LedgerEvent::HarvestIntervalUpdated { previous, current } => {
                    env.emit_event(HarvestIntervalUpdated { previous, current })
                }
                LedgerEvent::ReferralRegistryUpdated { registry } => {
                    env.emit_event(ReferralRegistryUpdated { registry })
                }
                LedgerEvent::ReferralCommissionRateUpdated { previous, current } => {
                    env.emit_event(ReferralCommissionRateUpdated { previous, current })
                }
                LedgerEvent::HarvestFeeUpdated { previous, current } => {
                    env.emit_event(HarvestFeeUpdated { previous, current })
                }
                LedgerEvent::AccrualScopeUpdated { scope } => {
                    env.emit_event(AccrualScopeUpdated { scope })
                }
                LedgerEvent::OwnershipTransferred { previous, current } => {
                    env.emit_event(OwnershipTransferred { previous, current })
                }
                LedgerEvent::Deposit { owner, pool_id, amount } => {
                    env.emit_event(Deposit { owner, pool_id, amount })
                }
                LedgerEvent::Withdraw { owner, pool_id, amount } => {
                    env.emit_event(Withdraw { owner, pool_id, amount })
                }
                LedgerEvent::Harvest { owner, pool_id, gross, fee, net } => {
                    env.emit_event(Harvest { owner, pool_id, gross, fee, net })
                }
                LedgerEvent::RewardLockedUp { owner, pool_id, amount } => {
                    env.emit_event(RewardLockedUp { owner, pool_id, amount })
                }
                LedgerEvent::ReferralCommissionPaid { owner, referrer, amount } => {
                    env.emit_event(ReferralCommissionPaid { owner, referrer, amount })
                }
                LedgerEvent::EmergencyWithdraw { owner, pool_id, amount } => {
                    env.emit_event(EmergencyWithdraw { owner, pool_id, amount })
                }
            }
        }
    }

    // =========================================================================
    // UNIT TESTS
    // =========================================================================

}
