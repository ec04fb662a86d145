//! Current-amount computation: fill fractions and linear interpolation.
//!
//! An item's due amount is first scaled by the fill fraction (which must
//! divide it exactly), then interpolated between its start and end amounts
//! over the order's validity window. Offer amounts round down and
//! consideration amounts round up, so rounding never favours the offerer.

use alloy_primitives::U256;
use openbarter_types::{
    ConsiderationItem, OfferItem, OpenbarterError, OrderParameters, ReceivedItem, Result,
    SpentItem,
};

/// Direction of rounding for a division that may not be exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Offer side: the fulfiller never receives more than the curve allows.
    Down,
    /// Consideration side: recipients never receive less than the curve allows.
    Up,
}

/// An order is active over the closed window `[start_time, end_time]`.
pub fn check_validity_window(start_time: u64, end_time: u64, now: u64) -> Result<()> {
    if start_time >= end_time || now < start_time || now > end_time {
        return Err(OpenbarterError::InvalidTime {
            start_time,
            end_time,
            now,
        });
    }
    Ok(())
}

/// `value * numerator / denominator`, failing if the division is not exact.
pub fn get_fraction(numerator: u128, denominator: u128, value: U256) -> Result<U256> {
    if numerator == denominator {
        return Ok(value);
    }
    if denominator == 0 {
        return Err(OpenbarterError::BadFraction {
            numerator,
            denominator,
        });
    }
    let scaled = value
        .checked_mul(U256::from(numerator))
        .ok_or(OpenbarterError::ArithmeticOverflow {
            context: "fraction",
        })?;
    let den = U256::from(denominator);
    if scaled % den != U256::ZERO {
        return Err(OpenbarterError::InexactFraction);
    }
    Ok(scaled / den)
}

/// Linear interpolation between `start_amount` at `start_time` and
/// `end_amount` at `end_time`, evaluated at `now`.
///
/// `now` must lie inside the window; see [`check_validity_window`].
pub fn locate_current_amount(
    start_amount: U256,
    end_amount: U256,
    start_time: u64,
    end_time: u64,
    now: u64,
    rounding: Rounding,
) -> Result<U256> {
    if start_amount == end_amount {
        return Ok(end_amount);
    }
    let now = now.clamp(start_time, end_time);
    let duration = U256::from(end_time - start_time);
    let elapsed = U256::from(now - start_time);
    let remaining = duration - elapsed;

    let overflow = OpenbarterError::ArithmeticOverflow {
        context: "interpolation",
    };
    let total = start_amount
        .checked_mul(remaining)
        .and_then(|a| end_amount.checked_mul(elapsed).and_then(|b| a.checked_add(b)))
        .ok_or_else(|| overflow.clone())?;
    let extra = match rounding {
        Rounding::Down => U256::ZERO,
        Rounding::Up => duration - U256::from(1u8),
    };
    let total = total.checked_add(extra).ok_or(overflow)?;
    Ok(total / duration)
}

/// Scale both endpoints by the fill fraction, then interpolate.
#[allow(clippy::too_many_arguments)]
pub fn apply_fraction(
    start_amount: U256,
    end_amount: U256,
    numerator: u128,
    denominator: u128,
    start_time: u64,
    end_time: u64,
    now: u64,
    rounding: Rounding,
) -> Result<U256> {
    if start_amount == end_amount {
        return get_fraction(numerator, denominator, end_amount);
    }
    let start = get_fraction(numerator, denominator, start_amount)?;
    let end = get_fraction(numerator, denominator, end_amount)?;
    locate_current_amount(start, end, start_time, end_time, now, rounding)
}

/// Current amount of one offer item.
pub fn offer_amount(
    item: &OfferItem,
    parameters: &OrderParameters,
    numerator: u128,
    denominator: u128,
    now: u64,
) -> Result<U256> {
    apply_fraction(
        item.start_amount,
        item.end_amount,
        numerator,
        denominator,
        parameters.start_time,
        parameters.end_time,
        now,
        Rounding::Down,
    )
}

/// Current amount of one consideration item.
pub fn consideration_amount(
    item: &ConsiderationItem,
    parameters: &OrderParameters,
    numerator: u128,
    denominator: u128,
    now: u64,
) -> Result<U256> {
    apply_fraction(
        item.start_amount,
        item.end_amount,
        numerator,
        denominator,
        parameters.start_time,
        parameters.end_time,
        now,
        Rounding::Up,
    )
}

/// Resolve every item of an order to its concrete amount for this fill.
///
/// Criteria items must already be resolved.
pub fn resolve_amounts(
    parameters: &OrderParameters,
    numerator: u128,
    denominator: u128,
    now: u64,
) -> Result<(Vec<SpentItem>, Vec<ReceivedItem>)> {
    let offer = parameters
        .offer
        .iter()
        .map(|item| {
            Ok(SpentItem {
                item_type: item.item_type,
                token: item.token,
                identifier: item.identifier_or_criteria,
                amount: offer_amount(item, parameters, numerator, denominator, now)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let consideration = parameters
        .consideration
        .iter()
        .map(|item| {
            Ok(ReceivedItem {
                item_type: item.item_type,
                token: item.token,
                identifier: item.identifier_or_criteria,
                amount: consideration_amount(item, parameters, numerator, denominator, now)?,
                recipient: item.recipient,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((offer, consideration))
}
