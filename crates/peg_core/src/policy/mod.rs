//! Stabilization policy: parameters, deviation measurement, adjustment sizing.

pub mod adjustment;
pub mod deviation;
pub mod math;
pub mod params;

pub use adjustment::{AdjustmentPlan, scale_factor_bp, size_adjustment};
pub use deviation::{
    DeviationError, DeviationReading, Direction, ResponseLevel, classify, measure, observe,
};
pub use math::OverflowError;
pub use params::{
    BPS_DENOMINATOR, DAILY_WINDOW_S, MAX_BP, MAX_DAILY_CAP_BP, PRICE_SCALE, ParameterSet,
    ValidationError,
};
