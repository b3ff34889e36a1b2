//! Results surfaced by the controller's entry points.

use crate::policy::{DeviationReading, Direction};

/// Why a successful invocation changed no supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoActionReason {
    /// Deviation below the small threshold.
    WithinTolerance,
    /// Deviation warranted action but the sized amount rounded to zero.
    NegligibleAmount,
}

/// A supply change that was executed and committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedAction {
    pub action_id: String,
    pub direction: Direction,
    pub amount: u128,
    pub amount_bp: u32,
    pub scale_bp: u64,
    pub clamped: bool,
    pub reading: DeviationReading,
    pub cooldown_s: u64,
    pub next_eligible_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    NoAction {
        reading: DeviationReading,
        reason: NoActionReason,
    },
    Executed(ExecutedAction),
}

impl ActionOutcome {
    pub fn executed(&self) -> Option<&ExecutedAction> {
        match self {
            ActionOutcome::Executed(action) => Some(action),
            ActionOutcome::NoAction { .. } => None,
        }
    }

    pub fn reading(&self) -> &DeviationReading {
        match self {
            ActionOutcome::NoAction { reading, .. } => reading,
            ActionOutcome::Executed(action) => &action.reading,
        }
    }
}

/// Read-only status view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerStatus {
    /// Not halted and past the cooldown.
    pub active: bool,
    pub halted: bool,
    /// `None` before the first action.
    pub next_eligible_time: Option<u64>,
    /// Zero when either oracle is unavailable or stale.
    pub current_deviation_bp: u64,
    pub daily_remaining_bp: u32,
}
