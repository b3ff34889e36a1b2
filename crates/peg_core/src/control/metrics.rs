//! Observability counters for stabilization attempts.
//!
//! Counters are atomics so the reentrancy rejection path can record without
//! taking the state lock.

use std::sync::atomic::{AtomicU64, Ordering};

use super::error::ControllerError;

#[derive(Debug, Default)]
pub struct ControllerMetrics {
    attempts_total: AtomicU64,
    executed_total: AtomicU64,
    no_action_total: AtomicU64,
    reject_halted_total: AtomicU64,
    reject_cooldown_total: AtomicU64,
    reject_reentrant_total: AtomicU64,
    reject_extreme_total: AtomicU64,
    reject_daily_limit_total: AtomicU64,
    reject_other_total: AtomicU64,
}

/// Point-in-time copy of `ControllerMetrics`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerMetricsSnapshot {
    pub attempts_total: u64,
    pub executed_total: u64,
    pub no_action_total: u64,
    pub reject_halted_total: u64,
    pub reject_cooldown_total: u64,
    pub reject_reentrant_total: u64,
    pub reject_extreme_total: u64,
    pub reject_daily_limit_total: u64,
    pub reject_other_total: u64,
}

impl ControllerMetricsSnapshot {
    pub fn rejected_total(&self) -> u64 {
        self.reject_halted_total
            + self.reject_cooldown_total
            + self.reject_reentrant_total
            + self.reject_extreme_total
            + self.reject_daily_limit_total
            + self.reject_other_total
    }
}

impl ControllerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_attempt(&self) {
        self.attempts_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_executed(&self) {
        self.executed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_no_action(&self) {
        self.no_action_total.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reject(&self, err: &ControllerError) {
        let counter = match err {
            ControllerError::EmergencyHalted => &self.reject_halted_total,
            ControllerError::InCooldown { .. } => &self.reject_cooldown_total,
            ControllerError::Reentrant => &self.reject_reentrant_total,
            ControllerError::ExtremeDeviation { .. } => &self.reject_extreme_total,
            ControllerError::DailyLimitExceeded { .. } => &self.reject_daily_limit_total,
            _ => &self.reject_other_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ControllerMetricsSnapshot {
        ControllerMetricsSnapshot {
            attempts_total: self.attempts_total.load(Ordering::Relaxed),
            executed_total: self.executed_total.load(Ordering::Relaxed),
            no_action_total: self.no_action_total.load(Ordering::Relaxed),
            reject_halted_total: self.reject_halted_total.load(Ordering::Relaxed),
            reject_cooldown_total: self.reject_cooldown_total.load(Ordering::Relaxed),
            reject_reentrant_total: self.reject_reentrant_total.load(Ordering::Relaxed),
            reject_extreme_total: self.reject_extreme_total.load(Ordering::Relaxed),
            reject_daily_limit_total: self.reject_daily_limit_total.load(Ordering::Relaxed),
            reject_other_total: self.reject_other_total.load(Ordering::Relaxed),
        }
    }
}
