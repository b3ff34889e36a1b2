//! Deviation detector.
//!
//! **Algorithm:**
//! 1. Reject stale market prices.
//! 2. `adjusted_target = target_price * reference_price / PRICE_SCALE`, so the
//!    reference asset's own drift folds into the effective peg.
//! 3. `deviation_bp = |market - adjusted_target| * 10_000 / adjusted_target` (floor).
//! 4. Classify top-down with inclusive thresholds (a tie goes to the higher level).
//!
//! `measure` additionally treats Extreme as a hard stop. `observe` returns the
//! Extreme reading so read-only previews can still display it.

use thiserror::Error;

use super::math::{OverflowError, mul_div};
use super::params::{BPS_DENOMINATOR, PRICE_SCALE, ParameterSet};

/// Side of the adjusted target the market sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Market above target: expand supply (mint).
    Above,
    /// Market below target: contract supply (burn).
    Below,
    AtPeg,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Above => "above",
            Direction::Below => "below",
            Direction::AtPeg => "at_peg",
        }
    }
}

/// Response tier. Ordered so that `Extreme > Large > Medium > Small > None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResponseLevel {
    None,
    Small,
    Medium,
    Large,
    Extreme,
}

impl ResponseLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseLevel::None => "none",
            ResponseLevel::Small => "small",
            ResponseLevel::Medium => "medium",
            ResponseLevel::Large => "large",
            ResponseLevel::Extreme => "extreme",
        }
    }

    /// Inverse of [`ResponseLevel::as_str`].
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "none" => Some(ResponseLevel::None),
            "small" => Some(ResponseLevel::Small),
            "medium" => Some(ResponseLevel::Medium),
            "large" => Some(ResponseLevel::Large),
            "extreme" => Some(ResponseLevel::Extreme),
            _ => None,
        }
    }
}

/// One measurement. Produced per invocation, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviationReading {
    /// Market price (8 decimals).
    pub current_price: u128,
    /// Peg target scaled by the reference asset's drift (8 decimals).
    pub adjusted_target: u128,
    pub direction: Direction,
    pub deviation_bp: u64,
    pub level: ResponseLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeviationError {
    #[error("market price is stale")]
    StalePrice,
    #[error("invalid price input: {reason}")]
    InvalidPrice { reason: &'static str },
    #[error("extreme deviation of {deviation_bp} bp")]
    ExtremeDeviation { reading: DeviationReading, deviation_bp: u64 },
    #[error(transparent)]
    Overflow(#[from] OverflowError),
}

/// Threshold ladder, evaluated from the top.
pub fn classify(deviation_bp: u64, params: &ParameterSet) -> ResponseLevel {
    if deviation_bp >= u64::from(params.extreme_threshold_bp) {
        ResponseLevel::Extreme
    } else if deviation_bp >= u64::from(params.large_threshold_bp) {
        ResponseLevel::Large
    } else if deviation_bp >= u64::from(params.medium_threshold_bp) {
        ResponseLevel::Medium
    } else if deviation_bp >= u64::from(params.small_threshold_bp) {
        ResponseLevel::Small
    } else {
        ResponseLevel::None
    }
}

/// Measure and classify without treating Extreme as an error.
pub fn observe(
    market_price: u128,
    market_valid: bool,
    reference_price: u128,
    target_price: u128,
    params: &ParameterSet,
) -> Result<DeviationReading, DeviationError> {
    if !market_valid {
        return Err(DeviationError::StalePrice);
    }
    if reference_price == 0 {
        return Err(DeviationError::InvalidPrice {
            reason: "reference price is zero",
        });
    }

    let adjusted_target = mul_div(
        target_price,
        reference_price,
        PRICE_SCALE,
        "adjusted target",
    )?;
    if adjusted_target == 0 {
        return Err(DeviationError::InvalidPrice {
            reason: "adjusted target is zero",
        });
    }

    let (direction, gap) = match market_price.cmp(&adjusted_target) {
        std::cmp::Ordering::Greater => (Direction::Above, market_price - adjusted_target),
        std::cmp::Ordering::Less => (Direction::Below, adjusted_target - market_price),
        std::cmp::Ordering::Equal => (Direction::AtPeg, 0),
    };

    let deviation = mul_div(gap, BPS_DENOMINATOR, adjusted_target, "deviation bp")?;
    let deviation_bp = u64::try_from(deviation).map_err(|_| OverflowError {
        context: "deviation bp",
    })?;

    Ok(DeviationReading {
        current_price: market_price,
        adjusted_target,
        direction,
        deviation_bp,
        level: classify(deviation_bp, params),
    })
}

/// Measure for a committing invocation: Extreme aborts the attempt.
pub fn measure(
    market_price: u128,
    market_valid: bool,
    reference_price: u128,
    target_price: u128,
    params: &ParameterSet,
) -> Result<DeviationReading, DeviationError> {
    let reading = observe(
        market_price,
        market_valid,
        reference_price,
        target_price,
        params,
    )?;
    if reading.level == ResponseLevel::Extreme {
        return Err(DeviationError::ExtremeDeviation {
            reading,
            deviation_bp: reading.deviation_bp,
        });
    }
    Ok(reading)
}
