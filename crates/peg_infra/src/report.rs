//! Serialisable status report for external readers.
//!
//! Combines the controller's status view with its cumulative statistics.
//! Token amounts are rendered as decimal strings.

use serde::Serialize;

use peg_core::{ControllerStatus, PegController, Statistics};

/// Exit code when the controller may act now.
pub const EXIT_ACTIVE: i32 = 0;
/// Exit code while the circuit breaker is engaged.
pub const EXIT_HALTED: i32 = 1;
/// Exit code while cooling down.
pub const EXIT_COOLING: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub active: bool,
    pub halted: bool,
    /// Absent before the first action.
    pub next_eligible_time: Option<u64>,
    pub current_deviation_bp: u64,
    pub daily_remaining_bp: u32,
    #[serde(serialize_with = "crate::decimal::serialize")]
    pub total_minted: u128,
    #[serde(serialize_with = "crate::decimal::serialize")]
    pub total_burned: u128,
    pub action_count: u64,
    #[serde(serialize_with = "crate::decimal::serialize")]
    pub last_adjustment_amount: u128,
}

impl StatusReport {
    pub fn new(status: &ControllerStatus, stats: &Statistics) -> Self {
        Self {
            active: status.active,
            halted: status.halted,
            next_eligible_time: status.next_eligible_time,
            current_deviation_bp: status.current_deviation_bp,
            daily_remaining_bp: status.daily_remaining_bp,
            total_minted: stats.total_minted,
            total_burned: stats.total_burned,
            action_count: stats.action_count,
            last_adjustment_amount: stats.last_adjustment_amount,
        }
    }

    /// Snapshot of `controller` as of `now`.
    pub fn capture(controller: &PegController, now: u64) -> Self {
        Self::new(&controller.status(now), &controller.statistics())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Exit code for a report. Halted wins over cooling.
pub fn exit_code(report: &StatusReport) -> i32 {
    if report.halted {
        EXIT_HALTED
    } else if report.active {
        EXIT_ACTIVE
    } else {
        EXIT_COOLING
    }
}
