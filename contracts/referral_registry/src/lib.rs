#![cfg_attr(not(feature = "std"), no_std, no_main)]

#[ink::contract]
mod referral_registry {
    use farm_core::{FarmResult, ReferralEnv, ReferralEvent, ReferralRegistry as Registry, ReferralStorage};
    use ink::codegen::Env;
    use ink::storage::Mapping;

    // =========================================================================
    // STORAGE
    // =========================================================================

    #[ink(storage)]
    pub struct ReferralRegistry {
        owner: AccountId,
        operators: Mapping<AccountId, bool>,
        /// user -> referrer, written once.
        referrers: Mapping<AccountId, AccountId>,
        referrals_count: Mapping<AccountId, u32>,
        total_commission: Mapping<AccountId, Balance>,
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    #[ink(event)]
    pub struct ReferralRecorded {
        #[ink(topic)]
        user: AccountId,
        #[ink(topic)]
        referrer: AccountId,
    }

    #[ink(event)]
    pub struct CommissionRecorded {
        #[ink(topic)]
        referrer: AccountId,
        amount: Balance,
    }

    #[ink(event)]
    pub struct OperatorUpdated {
        #[ink(topic)]
        operator: AccountId,
        allowed: bool,
    }

    #[ink(event)]
    pub struct OwnershipTransferred {
        #[ink(topic)]
        previous: AccountId,
        #[ink(topic)]
        current: AccountId,
    }

    // =========================================================================
    // IMPLEMENTATION
    // =========================================================================

    impl ReferralRegistry {
        #[ink(constructor)]
        pub fn new() -> Self {
            Self {
                owner: Self::env().caller(),
                operators: Mapping::default(),
                referrers: Mapping::default(),
                referrals_count: Mapping::default(),
                total_commission: Mapping::default(),
            }
        }

        /// Operator-only. Self-referrals, null referrers and already bound
        /// users are accepted without effect.
        #[ink(message)]
        pub fn register_referral(&mut self, user: AccountId, referrer: AccountId) -> FarmResult<()> {
            Registry::register_referral(self, user, referrer)
        }

        #[ink(message)]
        pub fn record_commission(&mut self, referrer: AccountId, amount: Balance) -> FarmResult<()> {
            Registry::record_commission(self, referrer, amount)
        }

        #[ink(message)]
        pub fn set_operator(&mut self, operator: AccountId, allowed: bool) -> FarmResult<()> {
            Registry::set_operator(self, operator, allowed)
        }

        #[ink(message)]
        pub fn transfer_ownership(&mut self, new_owner: AccountId) -> FarmResult<()> {
            Registry::transfer_ownership(self, new_owner)
        }

        // =================================================================
        // VIEWS
        // =================================================================

        #[ink(message)]
        pub fn referrer_of(&self, user: AccountId) -> Option<AccountId> {
            Registry::referrer_of(self, user)
        }

        #[ink(message)]
        pub fn referrals_count(&self, referrer: AccountId) -> u32 {
            Registry::referrals_count(self, referrer)
        }

        #[ink(message)]
        pub fn total_commission(&self, referrer: AccountId) -> Balance {
            Registry::total_commission(self, referrer)
        }

        #[ink(message)]
        pub fn is_operator(&self, account: AccountId) -> bool {
            Registry::is_operator(self, account)
        }

        #[ink(message)]
        pub fn owner(&self) -> AccountId {
            Registry::owner(self)
        }
    }

    impl Default for ReferralRegistry {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ReferralStorage for ReferralRegistry {
        fn load_owner(&self) -> AccountId {
            self.owner
        }

        fn store_owner(&mut self, owner: AccountId) {
            self.owner = owner;
        }

        fn load_operator(&self, account: AccountId) -> bool {
            self.operators.get(account).unwrap_or(false)
        }

        fn store_operator(&mut self, account: AccountId, allowed: bool) {
            if allowed {
                self.operators.insert(account, &true);
            } else {
                self.operators.remove(account);
            }
        }

        fn load_referrer(&self, user: AccountId) -> Option<AccountId> {
            self.referrers.get(user)
        }

        fn store_referrer(&mut self, user: AccountId, referrer: AccountId) {
            self.referrers.insert(user, &referrer);
        }

        fn load_referrals_count(&self, referrer: AccountId) -> u32 {
            self.referrals_count.get(referrer).unwrap_or(0)
        }

        fn store_referrals_count(&mut self, referrer: AccountId, count: u32) {
            self.referrals_count.insert(referrer, &count);
        }

        fn load_commission(&self, referrer: AccountId) -> Balance {
            self.total_commission.get(referrer).unwrap_or(0)
        }

        fn store_commission(&mut self, referrer: AccountId, total: Balance) {
            self.total_commission.insert(referrer, &total);
        }
    }

    impl ReferralEnv for ReferralRegistry {
        fn caller(&self) -> AccountId {
            self.env().caller()
        }

        fn emit(&mut self, event: ReferralEvent) {
            match event {
                ReferralEvent::ReferralRecorded { user, referrer } => {
                    self.env().emit_event(ReferralRecorded { user, referrer })
                }
                ReferralEvent::CommissionRecorded { referrer, amount } => {
                    self.env().emit_event(CommissionRecorded { referrer, amount })
                }
                ReferralEvent::OperatorUpdated { operator, allowed } => {
                    self.env().emit_event(OperatorUpdated { operator, allowed })
                }
                ReferralEvent::OwnershipTransferred { previous, current } => {
                    self.env().emit_event(OwnershipTransferred { previous, current })
                }
            }
        }
    }

    // =========================================================================
    // UNIT TESTS
    // =========================================================================

}
