//! Checked fixed-point helpers. Divisions floor unless named `_ceil`.

use thiserror::Error;

/// Arithmetic overflow or division by zero during sizing. Never wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("arithmetic overflow in {context}")]
pub struct OverflowError {
    pub context: &'static str,
}

/// `a * b / d`, floored.
pub fn mul_div(a: u128, b: u128, d: u128, context: &'static str) -> Result<u128, OverflowError> {
    if d == 0 {
        return Err(OverflowError { context });
    }
    a.checked_mul(b)
        .map(|product| product / d)
        .ok_or(OverflowError { context })
}

/// `a * b / d`, rounded up.
pub fn mul_div_ceil(
    a: u128,
    b: u128,
    d: u128,
    context: &'static str,
) -> Result<u128, OverflowError> {
    if d == 0 {
        return Err(OverflowError { context });
    }
    a.checked_mul(b)
        .map(|product| product.div_ceil(d))
        .ok_or(OverflowError { context })
}

pub fn checked_add(a: u128, b: u128, context: &'static str) -> Result<u128, OverflowError> {
    a.checked_add(b).ok_or(OverflowError { context })
}
