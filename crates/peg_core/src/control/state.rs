//! Stabilization state machine.
//!
//! **States:** `Active <-> Halted`, and orthogonally `Ready <-> Cooling`
//! where Ready means `now >= last_action_time + current_cooldown_s`.
//!
//! **Hard rules:**
//! - Halt and cooldown gates are checked before any measurement.
//! - `current_cooldown_s` stays within `[min_cooldown_s, max_cooldown_s]`.
//! - `last_action_time` strictly increases: a zero cooldown still needs the
//!   clock to advance one second.
//! - Resuming never resets the cooldown clock or the daily budget.
//! - The controller mutates a cloned draft and writes it back only after
//!   every external call succeeded.

use crate::policy::{DAILY_WINDOW_S, DeviationReading, ParameterSet, ResponseLevel};

use super::error::ControllerError;
use super::stats::Statistics;

/// Mutable runtime state owned by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeState {
    /// Time of the most recent committed stabilization.
    pub last_action_time: Option<u64>,
    /// Market price seen by the most recent committing invocation.
    pub last_price_checked: u128,
    pub current_cooldown_s: u64,
    /// Budget consumed since `daily_reset_at`.
    pub daily_used_bp: u32,
    /// Start of the current daily window.
    pub daily_reset_at: u64,
    pub halted: bool,
}

/// Cooldown recomputed by a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownChange {
    pub previous_s: u64,
    pub current_s: u64,
}

impl CooldownChange {
    pub fn changed(&self) -> bool {
        self.previous_s != self.current_s
    }
}

/// Durable facts carried across a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestoredState {
    pub statistics: Statistics,
    pub last_action_time: Option<u64>,
    /// Level of the most recent action; sets the restored cooldown.
    pub last_action_level: Option<ResponseLevel>,
    /// Budget consumed in the window opened at `daily_reset_at`.
    pub daily_used_bp: u32,
    pub daily_reset_at: Option<u64>,
    pub halted: bool,
}

impl RuntimeState {
    /// Fresh state: no prior action, daily window opened at `started_at`.
    pub fn new(started_at: u64, params: &ParameterSet) -> Self {
        Self {
            last_action_time: None,
            last_price_checked: 0,
            current_cooldown_s: params.min_cooldown_s,
            daily_used_bp: 0,
            daily_reset_at: started_at,
            halted: false,
        }
    }

    /// State resumed from `restored`. Without a recorded window start the
    /// daily window opens at `started_at`.
    pub fn restore(started_at: u64, params: &ParameterSet, restored: &RestoredState) -> Self {
        let current_cooldown_s = restored
            .last_action_level
            .map_or(params.min_cooldown_s, |level| {
                params.clamp_cooldown(Self::cooldown_for(level, params))
            });
        Self {
            last_action_time: restored.last_action_time,
            last_price_checked: 0,
            current_cooldown_s,
            daily_used_bp: restored.daily_used_bp,
            daily_reset_at: restored.daily_reset_at.unwrap_or(started_at),
            halted: restored.halted,
        }
    }

    /// Earliest time the next stabilization may commit. `None` before the
    /// first action (always eligible).
    pub fn next_eligible_at(&self) -> Option<u64> {
        self.last_action_time
            .map(|last| last.saturating_add(self.current_cooldown_s.max(1)))
    }

    pub fn is_ready(&self, now: u64) -> bool {
        self.next_eligible_at().is_none_or(|eligible| now >= eligible)
    }

    /// Single gate evaluated before any measurement or mutation.
    pub fn try_begin(&self, now: u64) -> Result<(), ControllerError> {
        if self.halted {
            return Err(ControllerError::EmergencyHalted);
        }
        match self.next_eligible_at() {
            Some(next_eligible_at) if now < next_eligible_at => {
                Err(ControllerError::InCooldown { next_eligible_at })
            }
            _ => Ok(()),
        }
    }

    pub fn daily_reset_due(&self, now: u64) -> bool {
        now >= self.daily_reset_at.saturating_add(DAILY_WINDOW_S)
    }

    /// Zero the daily budget when the window has elapsed.
    ///
    /// Returns the usage that was cleared, or `None` when no reset happened.
    /// Idempotent within a window.
    pub fn maybe_reset_daily(&mut self, now: u64) -> Option<u32> {
        if !self.daily_reset_due(now) {
            return None;
        }
        let previous_used_bp = self.daily_used_bp;
        self.daily_used_bp = 0;
        self.daily_reset_at = now;
        Some(previous_used_bp)
    }

    /// Headroom as of `now`, counting a reset that is due but not yet applied.
    pub fn daily_remaining_bp(&self, params: &ParameterSet, now: u64) -> u32 {
        if self.daily_reset_due(now) {
            params.daily_cap_bp
        } else {
            params.daily_cap_bp.saturating_sub(self.daily_used_bp)
        }
    }

    /// Cooldown a committed action of `level` imposes. Larger interventions
    /// impose longer quiet periods.
    pub fn cooldown_for(level: ResponseLevel, params: &ParameterSet) -> u64 {
        match level {
            ResponseLevel::Large | ResponseLevel::Extreme => params.max_cooldown_s,
            ResponseLevel::Medium => params.mid_cooldown_s(),
            ResponseLevel::Small | ResponseLevel::None => params.min_cooldown_s,
        }
    }

    /// Record a committed stabilization.
    pub fn commit(
        &mut self,
        now: u64,
        reading: &DeviationReading,
        amount_bp: u32,
        params: &ParameterSet,
    ) -> Result<CooldownChange, ControllerError> {
        let daily_used_bp = self.daily_used_bp.checked_add(amount_bp).ok_or(
            ControllerError::ArithmeticOverflow {
                context: "daily used bp",
            },
        )?;

        let previous_s = self.current_cooldown_s;
        let current_s = params.clamp_cooldown(Self::cooldown_for(reading.level, params));

        self.last_action_time = Some(now);
        self.last_price_checked = reading.current_price;
        self.daily_used_bp = daily_used_bp;
        self.current_cooldown_s = current_s;

        Ok(CooldownChange {
            previous_s,
            current_s,
        })
    }

    pub fn halt(&mut self) -> Result<(), ControllerError> {
        if self.halted {
            return Err(ControllerError::AlreadyHalted);
        }
        self.halted = true;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), ControllerError> {
        if !self.halted {
            return Err(ControllerError::NotHalted);
        }
        self.halted = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Direction;

    fn reading(level: ResponseLevel) -> DeviationReading {
        DeviationReading {
            current_price: 103_000_000,
            adjusted_target: 100_000_000,
            direction: Direction::Above,
            deviation_bp: 300,
            level,
        }
    }

    #[test]
    fn first_attempt_is_always_eligible() {
        let state = RuntimeState::new(0, &ParameterSet::default());
        assert_eq!(state.next_eligible_at(), None);
        assert_eq!(state.try_begin(0), Ok(()));
    }

    #[test]
    fn cooldown_follows_level() {
        let params = ParameterSet::default();
        let mut state = RuntimeState::new(0, &params);

        state.commit(100, &reading(ResponseLevel::Large), 10, &params).unwrap();
        assert_eq!(state.current_cooldown_s, params.max_cooldown_s);

        let change = state
            .commit(200, &reading(ResponseLevel::Medium), 10, &params)
            .unwrap();
        assert_eq!(change.previous_s, params.max_cooldown_s);
        assert_eq!(state.current_cooldown_s, (3_600 + 43_200) / 2);

        state.commit(300, &reading(ResponseLevel::Small), 10, &params).unwrap();
        assert_eq!(state.current_cooldown_s, params.min_cooldown_s);
        assert_eq!(state.daily_used_bp, 30);
        assert_eq!(state.last_action_time, Some(300));
        assert_eq!(state.last_price_checked, 103_000_000);
    }

    #[test]
    fn cooling_gate_reports_next_eligible_time() {
        let params = ParameterSet::default();
        let mut state = RuntimeState::new(0, &params);
        state.commit(1_000, &reading(ResponseLevel::Small), 5, &params).unwrap();

        assert_eq!(
            state.try_begin(1_000 + 3_599),
            Err(ControllerError::InCooldown {
                next_eligible_at: 4_600
            })
        );
        assert_eq!(state.try_begin(4_600), Ok(()));
    }

    #[test]
    fn zero_cooldown_still_requires_a_later_timestamp() {
        let params = ParameterSet {
            min_cooldown_s: 0,
            max_cooldown_s: 0,
            ..ParameterSet::default()
        };
        let mut state = RuntimeState::new(0, &params);
        state.commit(1_000, &reading(ResponseLevel::Small), 5, &params).unwrap();
        assert_eq!(state.current_cooldown_s, 0);

        assert_eq!(
            state.try_begin(1_000),
            Err(ControllerError::InCooldown {
                next_eligible_at: 1_001
            })
        );
        assert_eq!(state.try_begin(999), state.try_begin(1_000));
        assert_eq!(state.try_begin(1_001), Ok(()));
    }

    #[test]
    fn halt_gate_wins_over_cooldown_and_resume_keeps_clock() {
        let params = ParameterSet::default();
        let mut state = RuntimeState::new(0, &params);
        state.commit(1_000, &reading(ResponseLevel::Large), 5, &params).unwrap();
        state.halt().unwrap();

        assert_eq!(state.try_begin(1_001), Err(ControllerError::EmergencyHalted));
        assert_eq!(state.halt(), Err(ControllerError::AlreadyHalted));

        state.resume().unwrap();
        assert_eq!(state.resume(), Err(ControllerError::NotHalted));
        assert_eq!(state.daily_used_bp, 5);
        assert!(matches!(
            state.try_begin(1_001),
            Err(ControllerError::InCooldown { .. })
        ));
    }

    #[test]
    fn restore_resumes_cooldown_budget_and_halt() {
        let params = ParameterSet::default();
        let restored = RestoredState {
            last_action_time: Some(5_000),
            last_action_level: Some(ResponseLevel::Medium),
            daily_used_bp: 120,
            daily_reset_at: Some(4_000),
            halted: true,
            ..RestoredState::default()
        };
        let mut state = RuntimeState::restore(9_000, &params, &restored);

        assert_eq!(state.current_cooldown_s, params.mid_cooldown_s());
        assert_eq!(state.next_eligible_at(), Some(5_000 + 23_400));
        assert_eq!(state.daily_remaining_bp(&params, 9_000), 80);
        assert_eq!(state.daily_reset_at, 4_000);
        assert_eq!(state.try_begin(9_000), Err(ControllerError::EmergencyHalted));

        state.resume().unwrap();
        assert!(matches!(
            state.try_begin(9_000),
            Err(ControllerError::InCooldown { .. })
        ));
    }

    #[test]
    fn restore_without_history_matches_fresh_state() {
        let params = ParameterSet::default();
        let restored = RuntimeState::restore(7, &params, &RestoredState::default());
        assert_eq!(restored, RuntimeState::new(7, &params));
    }

    #[test]
    fn daily_reset_is_idempotent() {
        let params = ParameterSet::default();
        let mut state = RuntimeState::new(0, &params);
        state.daily_used_bp = 200;

        assert_eq!(state.maybe_reset_daily(DAILY_WINDOW_S - 1), None);
        assert_eq!(state.daily_remaining_bp(&params, DAILY_WINDOW_S - 1), 0);
        assert_eq!(state.daily_remaining_bp(&params, DAILY_WINDOW_S), 200);

        assert_eq!(state.maybe_reset_daily(DAILY_WINDOW_S + 1), Some(200));
        assert_eq!(state.daily_used_bp, 0);
        assert_eq!(state.daily_reset_at, DAILY_WINDOW_S + 1);
        assert_eq!(state.maybe_reset_daily(DAILY_WINDOW_S + 2), None);
    }
}
