//! Write-once referrer bindings and cumulative commission accounting.

use crate::{non_null, AccountId, Balance, FarmError, FarmResult, ReferralEvent};

pub trait ReferralStorage {
    fn load_owner(&self) -> AccountId;
    fn store_owner(&mut self, owner: AccountId);
    fn load_operator(&self, account: AccountId) -> bool;
    fn store_operator(&mut self, account: AccountId, allowed: bool);
    fn load_referrer(&self, user: AccountId) -> Option<AccountId>;
    fn store_referrer(&mut self, user: AccountId, referrer: AccountId);
    fn load_referrals_count(&self, referrer: AccountId) -> u32;
    fn store_referrals_count(&mut self, referrer: AccountId, count: u32);
    fn load_commission(&self, referrer: AccountId) -> Balance;
    fn store_commission(&mut self, referrer: AccountId, total: Balance);
}

pub trait ReferralEnv {
    fn caller(&self) -> AccountId;
    fn emit(&mut self, event: ReferralEvent);
}

pub trait ReferralRegistry: ReferralStorage + ReferralEnv {
    /// Binds `user` to `referrer` unless the user is already bound, the
    /// referrer is null or the user refers themselves. Those cases succeed
    /// without effect.
    fn register_referral(&mut self, user: AccountId, referrer: AccountId) -> FarmResult<()> {
        ensure_operator(self)?;
        let Some(referrer) = non_null(Some(referrer)) else {
            return Ok(());
        };
        if referrer == user || self.load_referrer(user).is_some() {
            return Ok(());
        }
        let count = self
            .load_referrals_count(referrer)
            .checked_add(1)
            .ok_or(FarmError::ArithmeticFault)?;
        self.store_referrer(user, referrer);
        self.store_referrals_count(referrer, count);
        self.emit(ReferralEvent::ReferralRecorded { user, referrer });
        Ok(())
    }

    fn record_commission(&mut self, referrer: AccountId, amount: Balance) -> FarmResult<()> {
        ensure_operator(self)?;
        let Some(referrer) = non_null(Some(referrer)) else {
            return Ok(());
        };
        if amount == 0 {
            return Ok(());
        }
        let total = self
            .load_commission(referrer)
            .checked_add(amount)
            .ok_or(FarmError::ArithmeticFault)?;
        self.store_commission(referrer, total);
        self.emit(ReferralEvent::CommissionRecorded { referrer, amount });
        Ok(())
    }

    fn set_operator(&mut self, operator: AccountId, allowed: bool) -> FarmResult<()> {
        ensure_owner(self)?;
        self.store_operator(operator, allowed);
        self.emit(ReferralEvent::OperatorUpdated { operator, allowed });
        Ok(())
    }

    fn transfer_ownership(&mut self, new_owner: AccountId) -> FarmResult<()> {
        ensure_owner(self)?;
        let previous = self.load_owner();
        self.store_owner(new_owner);
        self.emit(ReferralEvent::OwnershipTransferred {
            previous,
            current: new_owner,
        });
        Ok(())
    }

    fn referrer_of(&self, user: AccountId) -> Option<AccountId> {
        self.load_referrer(user)
    }

    fn referrals_count(&self, referrer: AccountId) -> u32 {
        self.load_referrals_count(referrer)
    }

    fn total_commission(&self, referrer: AccountId) -> Balance {
        self.load_commission(referrer)
    }

    fn is_operator(&self, account: AccountId) -> bool {
        self.load_operator(account)
    }

    fn owner(&self) -> AccountId {
        self.load_owner()
    }
}

impl<T: ReferralStorage + ReferralEnv> ReferralRegistry for T {}

fn ensure_owner<R: ReferralStorage + ReferralEnv + ?Sized>(registry: &R) -> FarmResult<()> {
    if registry.caller() != registry.load_owner() {
        return Err(FarmError::Unauthorized);
    }
    Ok(())
}

fn ensure_operator<R: ReferralStorage + ReferralEnv + ?Sized>(registry: &R) -> FarmResult<()> {
    if !registry.load_operator(registry.caller()) {
        return Err(FarmError::Unauthorized);
    }
    Ok(())
}
