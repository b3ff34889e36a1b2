//! Adjustment calculator.
//!
//! **Sizing (deterministic, amounts floor, budget share rounds up):**
//! 1. Level None sizes to zero.
//! 2. `base = supply * rate / 10_000` (Small, Medium, Large/Extreme rates).
//! 3. Dynamic scale across the level's band:
//!    - Small: fixed 10_000 bp.
//!    - Medium: 8_000 -> 12_000 bp across [medium, large].
//!    - Large: 10_000 -> 20_000 bp across [large, extreme].
//!      `scale = s_lo + (d - t_lo) * (s_hi - s_lo) / (t_hi - t_lo)`
//! 4. `scaled = base * scale / 10_000`.
//! 5. Budget share `ceil(scaled * 10_000 / supply)`. When it exceeds the
//!    remaining daily bp, clamp: the result is exactly
//!    `supply * remaining_bp / 10_000` and consumes all of `remaining_bp`.
//!
//! Rounding the share up means `daily_used_bp` always covers the tokens
//! moved, including adjustments worth less than one basis point.
//!
//! Extreme readings only arrive here from read-only estimation. Their
//! deviation is capped at the extreme threshold, which sizes them at the
//! large-band ceiling (20_000 bp).

use super::deviation::{DeviationReading, ResponseLevel};
use super::math::{OverflowError, mul_div, mul_div_ceil};
use super::params::{BPS_DENOMINATOR, ParameterSet};

const SCALE_UNITY_BP: u64 = 10_000;
const MEDIUM_SCALE_FLOOR_BP: u64 = 8_000;
const MEDIUM_SCALE_CEIL_BP: u64 = 12_000;
const LARGE_SCALE_FLOOR_BP: u64 = 10_000;
const LARGE_SCALE_CEIL_BP: u64 = 20_000;

/// A sized adjustment, before execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdjustmentPlan {
    /// Token units to mint or burn.
    pub amount: u128,
    /// Share of supply the amount consumes from the daily budget.
    pub amount_bp: u32,
    /// Unclamped amount at the base rate.
    pub base_amount: u128,
    /// Dynamic scale applied to `base_amount`.
    pub scale_bp: u64,
    /// True when the daily headroom cut the scaled amount.
    pub clamped: bool,
}

/// Dynamic scale factor for a reading, in bp (10_000 = 1x).
pub fn scale_factor_bp(reading: &DeviationReading, params: &ParameterSet) -> u64 {
    match reading.level {
        ResponseLevel::None => 0,
        ResponseLevel::Small => SCALE_UNITY_BP,
        ResponseLevel::Medium => ramp(
            reading.deviation_bp,
            u64::from(params.medium_threshold_bp),
            u64::from(params.large_threshold_bp),
            MEDIUM_SCALE_FLOOR_BP,
            MEDIUM_SCALE_CEIL_BP,
        ),
        ResponseLevel::Large | ResponseLevel::Extreme => ramp(
            reading.deviation_bp,
            u64::from(params.large_threshold_bp),
            u64::from(params.extreme_threshold_bp),
            LARGE_SCALE_FLOOR_BP,
            LARGE_SCALE_CEIL_BP,
        ),
    }
}

fn ramp(deviation_bp: u64, t_lo: u64, t_hi: u64, s_lo: u64, s_hi: u64) -> u64 {
    // Validated params guarantee t_lo < t_hi; the band bounds keep the
    // product well inside u64.
    if t_hi <= t_lo {
        return s_lo;
    }
    let progressed = deviation_bp.clamp(t_lo, t_hi) - t_lo;
    s_lo + progressed * (s_hi - s_lo) / (t_hi - t_lo)
}

fn base_rate_bp(level: ResponseLevel, params: &ParameterSet) -> u32 {
    match level {
        ResponseLevel::None => 0,
        ResponseLevel::Small => params.small_rate_bp,
        ResponseLevel::Medium => params.medium_rate_bp,
        ResponseLevel::Large | ResponseLevel::Extreme => params.large_rate_bp,
    }
}

/// Size an adjustment. Pure: safe to call for estimates.
pub fn size_adjustment(
    reading: &DeviationReading,
    params: &ParameterSet,
    daily_used_bp: u32,
    total_supply: u128,
) -> Result<AdjustmentPlan, OverflowError> {
    if reading.level == ResponseLevel::None || total_supply == 0 {
        return Ok(AdjustmentPlan::default());
    }

    let rate_bp = base_rate_bp(reading.level, params);
    let base_amount = mul_div(
        total_supply,
        u128::from(rate_bp),
        BPS_DENOMINATOR,
        "base amount",
    )?;
    let scale_bp = scale_factor_bp(reading, params);
    let scaled = mul_div(
        base_amount,
        u128::from(scale_bp),
        BPS_DENOMINATOR,
        "scaled amount",
    )?;

    let remaining_bp = params.daily_cap_bp.saturating_sub(daily_used_bp);
    let share_bp = mul_div_ceil(scaled, BPS_DENOMINATOR, total_supply, "amount bp")?;

    if share_bp > u128::from(remaining_bp) {
        let headroom = mul_div(
            total_supply,
            u128::from(remaining_bp),
            BPS_DENOMINATOR,
            "daily headroom",
        )?;
        return Ok(AdjustmentPlan {
            amount: headroom,
            amount_bp: remaining_bp,
            base_amount,
            scale_bp,
            clamped: true,
        });
    }

    // share_bp <= remaining_bp, so it fits u32.
    let amount_bp = u32::try_from(share_bp).map_err(|_| OverflowError {
        context: "amount bp",
    })?;

    Ok(AdjustmentPlan {
        amount: scaled,
        amount_bp,
        base_amount,
        scale_bp,
        clamped: false,
    })
}
