//! Integer-only fixed-point helpers.
//!
//! Every division truncates toward zero, so rounding leaves dust in the
//! treasuries and never pays out more than was emitted.

use crate::constants::{ACC_PRECISION, BPS_DENOMINATOR};
use crate::{Balance, FarmError, FarmResult, Monotonic, Weight};
use sp_arithmetic::helpers_128bit::multiply_by_rational_with_rounding;
use sp_arithmetic::Rounding;

pub fn add(a: Balance, b: Balance) -> FarmResult<Balance> {
    a.checked_add(b).ok_or(FarmError::ArithmeticFault)
}

pub fn sub(a: Balance, b: Balance) -> FarmResult<Balance> {
    a.checked_sub(b).ok_or(FarmError::ArithmeticFault)
}

/// `a * b / denominator`, truncated. The product is taken in 256 bits, so
/// only a quotient that does not fit in `Balance` is a fault.
pub fn mul_div(a: Balance, b: Balance, denominator: Balance) -> FarmResult<Balance> {
    multiply_by_rational_with_rounding(a, b, denominator, Rounding::Down)
        .ok_or(FarmError::ArithmeticFault)
}

/// Reward owed to one pool for `elapsed` blocks:
/// `elapsed * reward_per_block * weight / total_weight`.
pub fn emission(
    elapsed: Monotonic,
    reward_per_block: Balance,
    weight: Weight,
    total_weight: Weight,
) -> FarmResult<Balance> {
    if total_weight == 0 {
        return Ok(0);
    }
    let per_pool = Balance::from(elapsed)
        .checked_mul(reward_per_block)
        .ok_or(FarmError::ArithmeticFault)?;
    mul_div(per_pool, Balance::from(weight), Balance::from(total_weight))
}

/// Share-price increase for `reward` spread over `total_staked` units.
pub fn share_increment(reward: Balance, total_staked: Balance) -> FarmResult<Balance> {
    mul_div(reward, ACC_PRECISION, total_staked)
}

/// Reward a stake of `amount` is entitled to at share price `acc_per_share`.
pub fn entitlement(amount: Balance, acc_per_share: Balance) -> FarmResult<Balance> {
    mul_div(amount, acc_per_share, ACC_PRECISION)
}

/// `amount * bps / 10_000`, truncated.
pub fn bps_of(amount: Balance, bps: u16) -> FarmResult<Balance> {
    mul_div(amount, Balance::from(bps), BPS_DENOMINATOR)
}

pub fn add_weight(a: Weight, b: Weight) -> FarmResult<Weight> {
    a.checked_add(b).ok_or(FarmError::ArithmeticFault)
}

pub fn sub_weight(a: Weight, b: Weight) -> FarmResult<Weight> {
    a.checked_sub(b).ok_or(FarmError::ArithmeticFault)
}

pub fn add_blocks(now: Monotonic, blocks: Monotonic) -> FarmResult<Monotonic> {
    now.checked_add(blocks).ok_or(FarmError::ArithmeticFault)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emission_truncates() {
        // 590 * 2000 / 5700 = 207.01...
        assert_eq!(emission(1, 590, 2_000, 5_700), Ok(207));
        // 3 * 750 * 500 / 3000 = 375 exactly
        assert_eq!(emission(3, 750, 500, 3_000), Ok(375));
    }

    #[test]
    fn emission_without_weight_is_zero() {
        assert_eq!(emission(10, 1_000, 0, 0), Ok(0));
        assert_eq!(emission(10, 1_000, 0, 1_000), Ok(0));
    }

    #[test]
    fn emission_overflow_is_a_fault() {
        assert_eq!(
            emission(Monotonic::MAX, Balance::MAX, 1, 1),
            Err(FarmError::ArithmeticFault)
        );
    }

    #[test]
    fn share_price_round_trip_never_over_pays() {
        // 1000 reward over 3 units: each unit is owed 333.33..., never 334.
        let acc = share_increment(1_000, 3).unwrap();
        assert_eq!(entitlement(1, acc), Ok(333));
        assert!(entitlement(3, acc).unwrap() <= 1_000);
    }

    #[test]
    fn bps_of_truncates() {
        assert_eq!(bps_of(500, 250), Ok(12));
        assert_eq!(bps_of(1_000, 250), Ok(25));
        assert_eq!(bps_of(207, 500), Ok(10));
        assert_eq!(bps_of(0, 500), Ok(0));
    }

    #[test]
    fn zero_denominator_is_a_fault() {
        assert_eq!(mul_div(1, 1, 0), Err(FarmError::ArithmeticFault));
        assert_eq!(share_increment(10, 0), Err(FarmError::ArithmeticFault));
    }

    #[test]
    fn wide_products_divide_back_into_range() {
        // 1e18 units at a share price of 1e30: the product is 1e48.
        let price = 1_000_000_000_000_000_000_000_000_000_000;
        assert_eq!(
            entitlement(1_000_000_000_000_000_000, price),
            Ok(1_000_000_000_000_000_000_000_000_000_000_000_000)
        );
        assert_eq!(mul_div(Balance::MAX, Balance::MAX, Balance::MAX), Ok(Balance::MAX));
        assert_eq!(mul_div(Balance::MAX, 2, 1), Err(FarmError::ArithmeticFault));
    }

    #[test]
    fn checked_helpers() {
        assert_eq!(sub(1, 2), Err(FarmError::ArithmeticFault));
        assert_eq!(add(Balance::MAX, 1), Err(FarmError::ArithmeticFault));
        assert_eq!(sub_weight(5, 3), Ok(2));
        assert_eq!(add_blocks(Monotonic::MAX, 1), Err(FarmError::ArithmeticFault));
    }
}
