//! Fixed-point arithmetic on the `S = 1e9` scale used for fee rates.
//!
//! Two primitives matter: [`mul`] (`a * b / S`, used to turn a rate into an
//! amount) and [`div`] (`a * S / b`, the inverse). Both round down by
//! default; the `_round` variants additionally report whether the division
//! truncated, so call sites that need to round up (taker commission) can do
//! so explicitly rather than silently losing the remainder.
//!
//! Every operation here is checked: overflow aborts the call rather than
//! wrapping, per spec §4.1.

use crate::constants::SCALE;
use crate::error::OrderBookError;

fn overflow(reason: &str) -> OrderBookError {
    OrderBookError::Overflow {
        reason: reason.to_string(),
    }
}

/// `a * b / S`, rounding down. Used to apply a scaled rate to an amount.
pub fn mul(a: u64, b: u64) -> Result<u64, OrderBookError> {
    Ok(mul_round(a, b)?.0)
}

/// `a * b / S`, rounding down, also reporting whether the division
/// truncated a nonzero remainder.
pub fn mul_round(a: u64, b: u64) -> Result<(u64, bool), OrderBookError> {
    let product = (a as u128)
        .checked_mul(b as u128)
        .ok_or_else(|| overflow("mul: a * b overflowed u128"))?;
    let quotient = product / SCALE as u128;
    let truncated = product % SCALE as u128 != 0;
    let value = u64::try_from(quotient).map_err(|_| overflow("mul: result does not fit in u64"))?;
    Ok((value, truncated))
}

/// `a * S / b`, rounding down. The inverse of [`mul`].
pub fn div(a: u64, b: u64) -> Result<u64, OrderBookError> {
    Ok(div_round(a, b)?.0)
}

/// `a * S / b`, rounding down, also reporting whether the division
/// truncated a nonzero remainder.
pub fn div_round(a: u64, b: u64) -> Result<(u64, bool), OrderBookError> {
    if b == 0 {
        return Err(overflow("div: division by zero"));
    }
    let scaled = (a as u128)
        .checked_mul(SCALE as u128)
        .ok_or_else(|| overflow("div: a * S overflowed u128"))?;
    let quotient = scaled / b as u128;
    let truncated = scaled % b as u128 != 0;
    let value = u64::try_from(quotient).map_err(|_| overflow("div: result does not fit in u64"))?;
    Ok((value, truncated))
}

/// Computes the taker commission on a quote amount: the rate applied and
/// rounded down, except that a nonzero `quote_amount` with a zero-rounded
/// fee is bumped up to 1 unit, so dust-sized fills cannot evade fees
/// entirely.
pub fn taker_commission(quote_amount: u64, taker_rate: u64) -> Result<u64, OrderBookError> {
    let fee = mul(quote_amount, taker_rate)?;
    if fee == 0 && quote_amount != 0 && taker_rate != 0 {
        Ok(1)
    } else {
        Ok(fee)
    }
}

/// Computes the maker rebate on a quote amount: the rate applied and
/// rounded down. Never rounded up — unlike [`taker_commission`], a
/// dust-sized rebate is allowed to floor to zero.
pub fn maker_rebate(quote_amount: u64, maker_rate: u64) -> Result<u64, OrderBookError> {
    mul(quote_amount, maker_rate)
}

/// `quantity * price`, exact (both are native-unit integers, no scale
/// division). Used to size the quote reservation/unlock for a bid.
pub fn quote_value(quantity: u64, price: u64) -> Result<u64, OrderBookError> {
    quantity
        .checked_mul(price)
        .ok_or_else(|| overflow("quote_value: quantity * price overflowed u64"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_rounds_down() {
        // 0.25% of 401 = 1.0025 -> floors to 1, with truncation flagged.
        let (value, truncated) = mul_round(401, 2_500_000).unwrap();
        assert_eq!(value, 1);
        assert!(truncated);
    }

    #[test]
    fn div_round_trips_mul() {
        let rate = div(1, 400).unwrap();
        let back = mul(400, rate).unwrap();
        assert_eq!(back, 1);
    }

    #[test]
    fn taker_commission_rounds_up_dust() {
        // 400 * 2_500_000 / 1e9 = 1.0 exactly -> no bump needed.
        assert_eq!(taker_commission(400, 2_500_000).unwrap(), 1);
        // A tiny amount whose floored fee is zero gets bumped to 1.
        assert_eq!(taker_commission(1, 2_500_000).unwrap(), 1);
        // Zero input never charges a fee.
        assert_eq!(taker_commission(0, 2_500_000).unwrap(), 0);
    }

    #[test]
    fn maker_rebate_never_rounds_up() {
        // 400 * 1_500_000 / 1e9 = 0.6 -> floors to 0, no bump.
        assert_eq!(maker_rebate(400, 1_500_000).unwrap(), 0);
    }

    #[test]
    fn quote_value_overflow_aborts() {
        assert!(quote_value(u64::MAX, 2).is_err());
    }

    #[test]
    fn scenario_1_simple_cross_fees() {
        // From spec §8 scenario 1: filled_base=4, price=100 -> quote=400.
        let quote = quote_value(4, 100).unwrap();
        assert_eq!(quote, 400);
        let commission = taker_commission(quote, 2_500_000).unwrap();
        assert_eq!(commission, 1); // 400 * 0.0025 = 1.0 -> 1, no dust bump needed
        let rebate = maker_rebate(quote, 1_500_000).unwrap();
        assert_eq!(rebate, 0); // 400 * 0.0015 = 0.6 -> floors to 0
    }
}
