//! # Decimal Normalization
//!
//! Pure fixed-point rescaling between an asset's native precision and the
//! canonical accounting precision. Every amount in the engine is a `u128`
//! in smallest-unit denomination -- no floating point, ever.
//!
//! ## Rules
//!
//! - Down-scaling (`from > to`) floor-divides. Information loss is
//!   intentional and one-directional: we never round up, because rounding
//!   up mints value out of thin air.
//! - Up-scaling (`from < to`) multiplies exactly, or fails with
//!   [`NormalizeError::Overflow`]. Silent wrapping is not an option when
//!   the numbers are money.
//! - Price conversion combines the multiply and the divide into a single
//!   step with `u128` headroom, so a native amount times an 8-decimal
//!   price never loses precision to an intermediate division.

use thiserror::Error;

use crate::config::{CANONICAL_DECIMALS, MAX_SCALE_EXPONENT, NATIVE_DECIMALS};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced by normalization arithmetic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// The scaled value does not fit in a `u128`.
    #[error("normalization overflow: {amount} scaled by 10^{exponent}")]
    Overflow {
        /// The amount that was being scaled.
        amount: u128,
        /// The base-10 exponent that was applied.
        exponent: u32,
    },

    /// The requested scaling exponent exceeds [`MAX_SCALE_EXPONENT`].
    /// This is a caller bug (absurd precision delta), not a data case.
    #[error("scale exponent {0} out of range (max {MAX_SCALE_EXPONENT})")]
    ScaleOutOfRange(u32),

    /// A price of zero reached the conversion arithmetic. The oracle
    /// gateway rejects non-positive answers, so this is unreachable in
    /// a correctly wired engine -- but dividing by it is not an option.
    #[error("zero price in conversion arithmetic")]
    ZeroPrice,
}

/// Returns `10^exp`, or an error when the exponent is out of range.
fn pow10(exp: u32) -> Result<u128, NormalizeError> {
    if exp > MAX_SCALE_EXPONENT {
        return Err(NormalizeError::ScaleOutOfRange(exp));
    }
    // Exponent is range-checked above; checked_pow cannot fail here.
    Ok(10u128.pow(exp))
}

// ---------------------------------------------------------------------------
// Rescaling
// ---------------------------------------------------------------------------

/// Rescales `amount` from `from` fractional digits to `to` fractional
/// digits.
///
/// Floor-divides when narrowing, multiplies exactly when widening,
/// identity when equal.
///
/// # Errors
///
/// Returns [`NormalizeError::Overflow`] when widening does not fit in a
/// `u128`, and [`NormalizeError::ScaleOutOfRange`] for absurd precision
/// deltas.
pub fn normalize(amount: u128, from: u8, to: u8) -> Result<u128, NormalizeError> {
    if from == to {
        return Ok(amount);
    }
    if from > to {
        let exponent = u32::from(from - to);
        return Ok(amount / pow10(exponent)?);
    }
    let exponent = u32::from(to - from);
    let factor = pow10(exponent)?;
    amount
        .checked_mul(factor)
        .ok_or(NormalizeError::Overflow { amount, exponent })
}

/// Converts a native-currency amount to canonical units at the given
/// oracle price.
///
/// Computes `amount * price / 10^(native + price_decimals - canonical)`
/// as one multiply followed by one floor division. The combined divisor
/// is what preserves precision: dividing the amount down to canonical
/// first and then applying the price would discard up to 10^12 smallest
/// units before the price ever touched them.
///
/// # Errors
///
/// Returns [`NormalizeError::Overflow`] when the `amount * price` product
/// does not fit in a `u128` -- with 18-decimal amounts and 8-decimal
/// prices that leaves headroom for balances beyond any realistic supply.
pub fn native_to_canonical(
    amount: u128,
    price: u128,
    price_decimals: u8,
) -> Result<u128, NormalizeError> {
    let exponent = u32::from(NATIVE_DECIMALS) + u32::from(price_decimals)
        - u32::from(CANONICAL_DECIMALS);
    let divisor = pow10(exponent)?;
    let product = amount.checked_mul(price).ok_or(NormalizeError::Overflow {
        amount,
        exponent,
    })?;
    Ok(product / divisor)
}

/// Converts a canonical amount back to native-currency smallest units at
/// the given oracle price. The inverse of [`native_to_canonical`], used
/// to size withdrawal payouts. Floor division: the payout never exceeds
/// the debited value.
///
/// # Errors
///
/// Returns [`NormalizeError::Overflow`] on an unrepresentable
/// intermediate product, and [`NormalizeError::ZeroPrice`] when `price`
/// is zero (the gateway rejects non-positive prices long before this is
/// reachable).
pub fn canonical_to_native(
    value: u128,
    price: u128,
    price_decimals: u8,
) -> Result<u128, NormalizeError> {
    let exponent = u32::from(NATIVE_DECIMALS) + u32::from(price_decimals)
        - u32::from(CANONICAL_DECIMALS);
    let factor = pow10(exponent)?;
    if price == 0 {
        return Err(NormalizeError::ZeroPrice);
    }
    let product = value.checked_mul(factor).ok_or(NormalizeError::Overflow {
        amount: value,
        exponent,
    })?;
    Ok(product / price)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
