#![cfg_attr(not(feature = "std"), no_std, no_main)]

//! Lottery reward pool: holds one staking position in the reward ledger and
//! forwards whatever it harvests to the lottery's receiver.

#[ink::contract]
mod lottery_adapter {
    use farm_core::{
        psp22, FarmError, FarmResult, LotteryAdapter as Adapter, LotteryEnv, LotteryEvent,
        LotteryStorage, Pool, PoolId,
    };
    use ink::env::call::{build_call, ExecutionInput, Selector};
    use ink::codegen::Env;
    use ink::env::DefaultEnvironment;

    // =========================================================================
    // STORAGE
    // =========================================================================

    #[ink(storage)]
    pub struct LotteryAdapter {
        admin: AccountId,
        receiver: AccountId,
        ledger: AccountId,
        reward_token: AccountId,
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    #[ink(event)]
    pub struct FarmingStarted {
        #[ink(topic)]
        pool_id: PoolId,
        amount: Balance,
    }

    #[ink(event)]
    pub struct ProceedsForwarded {
        #[ink(topic)]
        receiver: AccountId,
        amount: Balance,
    }

    #[ink(event)]
    pub struct ReceiverUpdated {
        #[ink(topic)]
        previous: AccountId,
        #[ink(topic)]
        current: AccountId,
    }

    #[ink(event)]
    pub struct AdminUpdated {
        #[ink(topic)]
        previous: AccountId,
        #[ink(topic)]
        current: AccountId,
    }

    #[ink(event)]
    pub struct EmergencyWithdraw {
        #[ink(topic)]
        pool_id: PoolId,
        amount: Balance,
    }

    // =========================================================================
    // IMPLEMENTATION
    // =========================================================================

    impl LotteryAdapter {
        #[ink(constructor)]
        pub fn new(
            ledger: AccountId,
            reward_token: AccountId,
            admin: AccountId,
            receiver: AccountId,
        ) -> Self {
            Self {
                admin,
                receiver,
                ledger,
                reward_token,
            }
        }

        /// Stakes `amount` of `stake_asset` the adapter already holds.
        #[ink(message)]
        pub fn start_farming(
            &mut self,
            pool_id: PoolId,
            stake_asset: AccountId,
            amount: Balance,
            referrer: Option<AccountId>,
        ) -> FarmResult<()> {
            Adapter::start_farming(self, pool_id, stake_asset, amount, referrer)
        }

        #[ink(message)]
        pub fn pending_reward(&self, pool_id: PoolId) -> FarmResult<Balance> {
            Adapter::pending_reward(self, pool_id)
        }

        /// Returns the amount forwarded to the receiver.
        #[ink(message)]
        pub fn harvest(&mut self, pool_id: PoolId) -> FarmResult<Balance> {
            Adapter::harvest(self, pool_id)
        }

        #[ink(message)]
        pub fn set_receiver(&mut self, receiver: AccountId) -> FarmResult<()> {
            Adapter::set_receiver(self, receiver)
        }

        #[ink(message)]
        pub fn set_admin(&mut self, admin: AccountId) -> FarmResult<()> {
            Adapter::set_admin(self, admin)
        }

        #[ink(message)]
        pub fn emergency_withdraw(&mut self, pool_id: PoolId) -> FarmResult<Balance> {
            Adapter::emergency_withdraw(self, pool_id)
        }

        // =================================================================
        // VIEWS
        // =================================================================

        #[ink(message)]
        pub fn admin(&self) -> AccountId {
            Adapter::admin(self)
        }

        #[ink(message)]
        pub fn receiver(&self) -> AccountId {
            Adapter::receiver(self)
        }

        #[ink(message)]
        pub fn ledger(&self) -> AccountId {
            Adapter::ledger(self)
        }

        #[ink(message)]
        pub fn reward_token(&self) -> AccountId {
            Adapter::reward_token(self)
        }
    }

    impl LotteryStorage for LotteryAdapter {
        fn load_admin(&self) -> AccountId {
            self.admin
        }

        fn store_admin(&mut self, admin: AccountId) {
            self.admin = admin;
        }

        fn load_receiver(&self) -> AccountId {
            self.receiver
        }

        fn store_receiver(&mut self, receiver: AccountId) {
            self.receiver = receiver;
        }

        fn ledger_contract(&self) -> AccountId {
            self.ledger
        }

        fn reward_asset(&self) -> AccountId {
            self.reward_token
        }
    }

    impl LotteryEnv for LotteryAdapter {
        fn caller(&self) -> AccountId {
            self.env().caller()
        }

        fn asset_balance(&self, asset: AccountId) -> FarmResult<Balance> {
            psp22::balance_of(asset, self.env().account_id())
        }

        fn send_asset(&mut self, asset: AccountId, to: AccountId, amount: Balance) -> FarmResult<()> {
            psp22::transfer(asset, to, amount)
        }

        fn approve_asset(&mut self, asset: AccountId, spender: AccountId, amount: Balance) -> FarmResult<()> {
            psp22::approve(asset, spender, amount)
        }

        fn ledger_pool(&self, ledger: AccountId, pool_id: PoolId) -> FarmResult<Option<Pool>> {
            let result = build_call::<DefaultEnvironment>()
                .call(ledger)
                .exec_input(
                    ExecutionInput::new(Selector::new(ink::selector_bytes!("pool")))
                        .push_arg(pool_id),
                )
                .returns::<Option<Pool>>()
                .try_invoke();
            match result {
                Ok(Ok(pool)) => Ok(pool),
                _ => Err(FarmError::CallFailed),
            }
        }

        fn ledger_pending(&self, ledger: AccountId, pool_id: PoolId) -> FarmResult<Balance> {
            let result = build_call::<DefaultEnvironment>()
                .call(ledger)
                .exec_input(
                    ExecutionInput::new(Selector::new(ink::selector_bytes!("pending_reward")))
                        .push_arg(pool_id)
                        .push_arg(self.env().account_id()),
                )
                .returns::<FarmResult<Balance>>()
                .try_invoke();
            match result {
                Ok(Ok(pending)) => pending,
                _ => Err(FarmError::CallFailed),
            }
        }

        fn ledger_deposit(
            &mut self,
            ledger: AccountId,
            pool_id: PoolId,
            amount: Balance,
            referrer: Option<AccountId>,
        ) -> FarmResult<()> {
            let result = build_call::<DefaultEnvironment>()
                .call(ledger)
                .exec_input(
                    ExecutionInput::new(Selector::new(ink::selector_bytes!("deposit")))
                        .push_arg(pool_id)
                        .push_arg(amount)
                        .push_arg(referrer),
                )
                .returns::<FarmResult<()>>()
                .try_invoke();
            match result {
                Ok(Ok(outcome)) => outcome,
                _ => Err(FarmError::CallFailed),
            }
        }

        fn ledger_harvest(&mut self, ledger: AccountId, pool_id: PoolId) -> FarmResult<Balance> {
            let result = build_call::<DefaultEnvironment>()
                .call(ledger)
                .exec_input(
                    ExecutionInput::new(Selector::new(ink::selector_bytes!("harvest")))
                        .push_arg(pool_id),
                )
                .returns::<FarmResult<Balance>>()
                .try_invoke();
            match result {
                Ok(Ok(outcome)) => outcome,
                _ => Err(FarmError::CallFailed),
            }
        }

        fn ledger_emergency_withdraw(&mut self, ledger: AccountId, pool_id: PoolId) -> FarmResult<Balance> {
            let result = build_call::<DefaultEnvironment>()
                .call(ledger)
                .exec_input(
                    ExecutionInput::new(Selector::new(ink::selector_bytes!("emergency_withdraw")))
                        .push_arg(pool_id),
                )
                .returns::<FarmResult<Balance>>()
                .try_invoke();
            match result {
                Ok(Ok(outcome)) => outcome,
                _ => Err(FarmError::CallFailed),
            }
        }

        fn emit(&mut self, event: LotteryEvent) {
            let env = self.env();
            match event {
                LotteryEvent::FarmingStarted { pool_id, amount } => {
                    env.emit_event(FarmingStarted { pool_id, amount })
                }
                LotteryEvent::ProceedsForwarded { receiver, amount } => {
                    env.emit_event(ProceedsForwarded { receiver, amount })
                }
                LotteryEvent::ReceiverUpdated { previous, current } => {
                    env.emit_event(ReceiverUpdated { previous, current })
                }
                LotteryEvent::AdminUpdated { previous, current } => {
                    env.emit_event(AdminUpdated { previous, current })
                }
                LotteryEvent::EmergencyWithdraw { pool_id, amount } => {
                    env.emit_event(EmergencyWithdraw { pool_id, amount })
                }
            }
        }
    }

    // =========================================================================
    // UNIT TESTS
    // =========================================================================

}
