//! Admin-tunable stabilization parameters.
//!
//! Thresholds and rates are basis points (`BPS_DENOMINATOR` = 100%).
//! Cooldowns are whole seconds. A `ParameterSet` is only ever installed
//! after `validate()` passes, so consumers can rely on its ordering rules.

use thiserror::Error;

/// 10_000 bp = 100%.
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Price fixed-point scale (8 decimal places). `PRICE_SCALE` is 1.00.
pub const PRICE_SCALE: u128 = 100_000_000;

/// Hard ceiling on the daily cap (10% of supply), independent of admin input.
pub const MAX_DAILY_CAP_BP: u32 = 1_000;

/// Length of one daily budget window.
pub const DAILY_WINDOW_S: u64 = 86_400;

/// Threshold and rate magnitudes live on a 0..=10_000 scale.
pub const MAX_BP: u32 = 10_000;

/// Static stabilization policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSet {
    pub small_threshold_bp: u32,
    pub medium_threshold_bp: u32,
    pub large_threshold_bp: u32,
    pub extreme_threshold_bp: u32,
    pub small_rate_bp: u32,
    pub medium_rate_bp: u32,
    pub large_rate_bp: u32,
    pub min_cooldown_s: u64,
    pub max_cooldown_s: u64,
    pub daily_cap_bp: u32,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            small_threshold_bp: 50,
            medium_threshold_bp: 200,
            large_threshold_bp: 500,
            extreme_threshold_bp: 1_000,
            small_rate_bp: 10,
            medium_rate_bp: 50,
            large_rate_bp: 100,
            min_cooldown_s: 3_600,
            max_cooldown_s: 43_200,
            daily_cap_bp: 200,
        }
    }
}

/// Rejection of a malformed administrative update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "thresholds must be strictly increasing: small={small} medium={medium} large={large} extreme={extreme}"
    )]
    ThresholdOrdering {
        small: u32,
        medium: u32,
        large: u32,
        extreme: u32,
    },
    #[error("threshold {name}={value} bp is outside (0, 10000]")]
    ThresholdOutOfRange { name: &'static str, value: u32 },
    #[error("rate {name}={value} bp exceeds 10000")]
    RateOutOfRange { name: &'static str, value: u32 },
    #[error("min cooldown {min_s}s exceeds max cooldown {max_s}s")]
    CooldownOrdering { min_s: u64, max_s: u64 },
    #[error("daily cap {value} bp exceeds hard ceiling of 1000 bp")]
    DailyCapTooHigh { value: u32 },
}

impl ParameterSet {
    /// Check every ordering and range rule.
    ///
    /// The first violated rule is reported; nothing else is inspected.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("small_threshold_bp", self.small_threshold_bp),
            ("medium_threshold_bp", self.medium_threshold_bp),
            ("large_threshold_bp", self.large_threshold_bp),
            ("extreme_threshold_bp", self.extreme_threshold_bp),
        ] {
            if value == 0 || value > MAX_BP {
                return Err(ValidationError::ThresholdOutOfRange { name, value });
            }
        }

        if !(self.small_threshold_bp < self.medium_threshold_bp
            && self.medium_threshold_bp < self.large_threshold_bp
            && self.large_threshold_bp < self.extreme_threshold_bp)
        {
            return Err(ValidationError::ThresholdOrdering {
                small: self.small_threshold_bp,
                medium: self.medium_threshold_bp,
                large: self.large_threshold_bp,
                extreme: self.extreme_threshold_bp,
            });
        }

        for (name, value) in [
            ("small_rate_bp", self.small_rate_bp),
            ("medium_rate_bp", self.medium_rate_bp),
            ("large_rate_bp", self.large_rate_bp),
        ] {
            if value > MAX_BP {
                return Err(ValidationError::RateOutOfRange { name, value });
            }
        }

        if self.min_cooldown_s > self.max_cooldown_s {
            return Err(ValidationError::CooldownOrdering {
                min_s: self.min_cooldown_s,
                max_s: self.max_cooldown_s,
            });
        }

        if self.daily_cap_bp > MAX_DAILY_CAP_BP {
            return Err(ValidationError::DailyCapTooHigh {
                value: self.daily_cap_bp,
            });
        }

        Ok(())
    }

    /// Midpoint of the cooldown bounds (floor).
    pub fn mid_cooldown_s(&self) -> u64 {
        // min + (max - min) / 2 avoids overflow on large bounds.
        self.min_cooldown_s + (self.max_cooldown_s - self.min_cooldown_s) / 2
    }

    /// Clamp a cooldown into the configured bounds.
    pub fn clamp_cooldown(&self, cooldown_s: u64) -> u64 {
        cooldown_s.clamp(self.min_cooldown_s, self.max_cooldown_s)
    }
}
