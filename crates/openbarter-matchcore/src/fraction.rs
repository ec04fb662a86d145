//! Fill accounting over rational fractions.
//!
//! An order's fill state is `total_filled / total_size`, always stored in
//! lowest terms. A new request `numerator / denominator` is brought to a
//! common denominator with the stored state, clamped to whatever remains
//! unfilled, and added. The settled slice keeps the common denominator so
//! amounts scale from it directly; it is only reduced when a term grows past
//! the 120-bit bound. The request fails if either fraction still does not fit.

use alloy_primitives::U256;
use openbarter_types::{OpenbarterError, OrderStatus, OrderType, Result, constants};

/// Outcome of applying a fill request to an order's status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillUpdate {
    /// The fraction of the order to settle in this call.
    pub numerator: u128,
    pub denominator: u128,
    /// The order's new cumulative fill state, in lowest terms.
    pub total_filled: u128,
    pub total_size: u128,
}

/// Reject fractions that are malformed or not permitted by the order type.
pub fn check_fill_request(order_type: OrderType, numerator: u128, denominator: u128) -> Result<()> {
    if numerator == 0
        || numerator > denominator
        || denominator > constants::MAX_FRACTION
    {
        return Err(OpenbarterError::BadFraction {
            numerator,
            denominator,
        });
    }
    if numerator < denominator && !order_type.allows_partial_fills() {
        return Err(OpenbarterError::PartialFillsNotEnabledForOrder);
    }
    Ok(())
}

fn gcd(mut a: U256, mut b: U256) -> U256 {
    while b != U256::ZERO {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

fn to_bounded(value: U256) -> Option<u128> {
    u128::try_from(value)
        .ok()
        .filter(|v| *v <= constants::MAX_FRACTION)
}

/// Divide both terms by their common divisor.
fn reduce(num: U256, den: U256) -> (U256, U256) {
    let divisor = gcd(num, den);
    if divisor <= U256::from(1u8) {
        return (num, den);
    }
    (num / divisor, den / divisor)
}

/// Bound a fraction to 120-bit terms, reducing it first if it is too wide.
fn bounded_pair(num: U256, den: U256) -> Result<(u128, u128)> {
    if let (Some(n), Some(d)) = (to_bounded(num), to_bounded(den)) {
        return Ok((n, d));
    }
    let (num, den) = reduce(num, den);
    match (to_bounded(num), to_bounded(den)) {
        (Some(n), Some(d)) => Ok((n, d)),
        _ => Err(OpenbarterError::InexactFraction),
    }
}

/// Apply a validated fill request to the current status.
///
/// The status must be neither cancelled nor fully filled.
pub fn compute_fill(status: &OrderStatus, numerator: u128, denominator: u128) -> Result<FillUpdate> {
    if status.total_size == 0 {
        let (total_filled, total_size) =
            reduce(U256::from(numerator), U256::from(denominator));
        let (total_filled, total_size) = bounded_pair(total_filled, total_size)?;
        return Ok(FillUpdate {
            numerator,
            denominator,
            total_filled,
            total_size,
        });
    }

    let filled_den = U256::from(status.total_size);
    let mut filled_num = U256::from(status.total_filled);
    let (mut num, mut den) = if denominator == 1 {
        // A full-fill request takes whatever remains.
        (filled_den, filled_den)
    } else {
        (U256::from(numerator), U256::from(denominator))
    };

    if den != filled_den {
        filled_num *= den;
        num *= filled_den;
        den *= filled_den;
    }

    if filled_num + num > den {
        num = den - filled_num;
    }
    filled_num += num;

    let (total_filled, total_size) = reduce(filled_num, den);
    let (total_filled, total_size) = bounded_pair(total_filled, total_size)?;
    let (numerator, denominator) = bounded_pair(num, den)?;

    Ok(FillUpdate {
        numerator,
        denominator,
        total_filled,
        total_size,
    })
}
