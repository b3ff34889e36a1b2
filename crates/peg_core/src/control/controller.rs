//! Peg stabilization controller.
//!
//! **Stabilize sequence (one indivisible invocation):**
//! 1. Acquire the invocation guard (nested/concurrent attempts -> `Reentrant`).
//! 2. Take the state write lock and check halt + cooldown gates.
//! 3. Stage a draft: daily reset, measurement, sizing, commit, statistics.
//! 4. Collateral checks (treasury configured) and ledger execution.
//! 5. Write the draft back, release the lock, flush staged notifications.
//!
//! Any failure before step 5 discards the draft, so views only ever observe
//! the state before or after a complete invocation. Collaborators must not
//! call back into this controller from inside `stabilize`; a nested
//! `stabilize` is rejected and a nested view would wait on the lock.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::collab::{
    AccountId, ControllerEvent, EventSink, MarketOracle, NullSink, ReferenceOracle, TokenLedger,
    Treasury,
};
use crate::idempotency::{ActionHashInput, compute_action_hash, format_action_hash};
use crate::policy::{
    DeviationReading, Direction, PRICE_SCALE, ParameterSet, ResponseLevel, ValidationError,
    measure, observe, size_adjustment,
};

use super::error::ControllerError;
use super::guard::InvocationGuard;
use super::metrics::{ControllerMetrics, ControllerMetricsSnapshot};
use super::outcome::{ActionOutcome, ControllerStatus, ExecutedAction, NoActionReason};
use super::state::{RestoredState, RuntimeState};
use super::stats::Statistics;

/// Account used for mints and burns when no treasury is configured.
pub const DEFAULT_CONTROLLER_ACCOUNT: &str = "peg-controller";

#[derive(Debug, Clone)]
struct ControllerState {
    params: ParameterSet,
    runtime: RuntimeState,
    stats: Statistics,
}

/// Builder wiring collaborators and validated parameters.
pub struct PegControllerBuilder {
    market: Arc<dyn MarketOracle>,
    reference: Arc<dyn ReferenceOracle>,
    ledger: Arc<dyn TokenLedger>,
    treasury: Option<Arc<dyn Treasury>>,
    sink: Arc<dyn EventSink>,
    params: ParameterSet,
    target_price: u128,
    account: AccountId,
    restored: Option<RestoredState>,
}

impl PegControllerBuilder {
    pub fn new(
        market: Arc<dyn MarketOracle>,
        reference: Arc<dyn ReferenceOracle>,
        ledger: Arc<dyn TokenLedger>,
    ) -> Self {
        Self {
            market,
            reference,
            ledger,
            treasury: None,
            sink: Arc::new(NullSink),
            params: ParameterSet::default(),
            target_price: PRICE_SCALE,
            account: AccountId::new(DEFAULT_CONTROLLER_ACCOUNT),
            restored: None,
        }
    }

    pub fn treasury(mut self, treasury: Arc<dyn Treasury>) -> Self {
        self.treasury = Some(treasury);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn params(mut self, params: ParameterSet) -> Self {
        self.params = params;
        self
    }

    /// Nominal peg target, 8 decimals.
    pub fn target_price(mut self, target_price: u128) -> Self {
        self.target_price = target_price;
        self
    }

    pub fn account(mut self, account: AccountId) -> Self {
        self.account = account;
        self
    }

    /// Resume statistics, cooldown, daily usage and the halt flag recorded
    /// before a restart.
    pub fn restore(mut self, restored: RestoredState) -> Self {
        self.restored = Some(restored);
        self
    }

    /// Validate and construct. The daily window opens at `started_at` unless
    /// a restored window start was supplied.
    pub fn build(self, started_at: u64) -> Result<PegController, ControllerError> {
        self.params.validate()?;
        if self.target_price == 0 {
            return Err(ControllerError::InvalidPrice {
                reason: "target price is zero",
            });
        }

        let (runtime, stats) = match &self.restored {
            Some(restored) => {
                tracing::info!(
                    actions = restored.statistics.action_count,
                    halted = restored.halted,
                    daily_used_bp = restored.daily_used_bp,
                    "controller state restored"
                );
                (
                    RuntimeState::restore(started_at, &self.params, restored),
                    restored.statistics,
                )
            }
            None => (RuntimeState::new(started_at, &self.params), Statistics::new()),
        };

        Ok(PegController {
            market: self.market,
            reference: self.reference,
            ledger: self.ledger,
            treasury: self.treasury,
            sink: self.sink,
            target_price: self.target_price,
            account: self.account,
            state: RwLock::new(ControllerState {
                runtime,
                params: self.params,
                stats,
            }),
            busy: AtomicBool::new(false),
            metrics: ControllerMetrics::new(),
        })
    }
}

pub struct PegController {
    market: Arc<dyn MarketOracle>,
    reference: Arc<dyn ReferenceOracle>,
    ledger: Arc<dyn TokenLedger>,
    treasury: Option<Arc<dyn Treasury>>,
    sink: Arc<dyn EventSink>,
    target_price: u128,
    account: AccountId,
    state: RwLock<ControllerState>,
    busy: AtomicBool,
    metrics: ControllerMetrics,
}

impl std::fmt::Debug for PegController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PegController")
            .field("target_price", &self.target_price)
            .field("account", &self.account)
            .field("has_treasury", &self.treasury.is_some())
            .field("state", &*self.read_state())
            .finish_non_exhaustive()
    }
}

impl PegController {
    /// Run one stabilization attempt at `now`.
    pub fn stabilize(&self, now: u64) -> Result<ActionOutcome, ControllerError> {
        self.metrics.record_attempt();
        let result = self.run_stabilization(now);
        match &result {
            Ok(ActionOutcome::Executed(_)) => self.metrics.record_executed(),
            Ok(ActionOutcome::NoAction { reason, .. }) => {
                self.metrics.record_no_action();
                tracing::debug!(now, ?reason, "stabilize: no action");
            }
            Err(err @ ControllerError::ArithmeticOverflow { context }) => {
                self.metrics.record_reject(err);
                tracing::error!(now, context, "stabilize aborted on arithmetic overflow");
            }
            Err(err) => {
                self.metrics.record_reject(err);
                tracing::debug!(now, code = err.code(), kind = ?err.kind(), "stabilize rejected");
            }
        }
        result
    }

    fn run_stabilization(&self, now: u64) -> Result<ActionOutcome, ControllerError> {
        let _guard = InvocationGuard::acquire(&self.busy)?;
        let mut state = self.write_state();
        state.runtime.try_begin(now)?;

        let params = state.params;
        let mut runtime = state.runtime.clone();
        let mut stats = state.stats;
        let mut staged = Vec::new();

        if let Some(previous_used_bp) = runtime.maybe_reset_daily(now) {
            staged.push(ControllerEvent::DailyReset {
                at: now,
                previous_used_bp,
            });
        }

        let market = self
            .market
            .get_price()
            .map_err(ControllerError::OracleUnavailable)?;
        let reference = self
            .reference
            .latest_answer()
            .map_err(ControllerError::OracleUnavailable)?;
        let reading = measure(
            market.price,
            market.valid,
            reference,
            self.target_price,
            &params,
        )?;

        if reading.level == ResponseLevel::None || reading.direction == Direction::AtPeg {
            runtime.last_price_checked = reading.current_price;
            state.runtime = runtime;
            drop(state);
            self.flush(staged);
            return Ok(ActionOutcome::NoAction {
                reading,
                reason: NoActionReason::WithinTolerance,
            });
        }
        staged.push(ControllerEvent::DeviationDetected { reading });

        let supply = self
            .ledger
            .total_supply()
            .map_err(ControllerError::ExecutionFailed)?;
        let plan = size_adjustment(&reading, &params, runtime.daily_used_bp, supply)?;

        if plan.amount == 0 {
            if plan.clamped {
                return Err(ControllerError::DailyLimitExceeded {
                    daily_cap_bp: params.daily_cap_bp,
                });
            }
            runtime.last_price_checked = reading.current_price;
            state.runtime = runtime;
            drop(state);
            self.flush(staged);
            return Ok(ActionOutcome::NoAction {
                reading,
                reason: NoActionReason::NegligibleAmount,
            });
        }

        let cooldown = runtime.commit(now, &reading, plan.amount_bp, &params)?;
        match reading.direction {
            Direction::Above => stats.record_mint(plan.amount)?,
            Direction::Below => stats.record_burn(plan.amount)?,
            Direction::AtPeg => {}
        }
        stats.record_action()?;

        let action_id = format_action_hash(compute_action_hash(&ActionHashInput {
            sequence: stats.action_count,
            at: now,
            direction: reading.direction,
            amount: plan.amount,
        }));
        if cooldown.changed() {
            staged.push(ControllerEvent::CooldownAdjusted {
                previous_s: cooldown.previous_s,
                current_s: cooldown.current_s,
            });
        }
        staged.push(ControllerEvent::StabilizationExecuted {
            action_id: action_id.clone(),
            at: now,
            direction: reading.direction,
            level: reading.level,
            amount: plan.amount,
            amount_bp: plan.amount_bp,
            deviation_bp: reading.deviation_bp,
        });

        self.execute(&reading, plan.amount)?;

        let next_eligible_at = runtime.next_eligible_at().unwrap_or(now);
        state.runtime = runtime;
        state.stats = stats;
        drop(state);

        tracing::info!(
            now,
            %action_id,
            direction = reading.direction.as_str(),
            level = reading.level.as_str(),
            deviation_bp = reading.deviation_bp,
            amount = %plan.amount,
            amount_bp = plan.amount_bp,
            scale_bp = plan.scale_bp,
            clamped = plan.clamped,
            "stabilization committed"
        );
        self.flush(staged);

        Ok(ActionOutcome::Executed(ExecutedAction {
            action_id,
            direction: reading.direction,
            amount: plan.amount,
            amount_bp: plan.amount_bp,
            scale_bp: plan.scale_bp,
            clamped: plan.clamped,
            reading,
            cooldown_s: cooldown.current_s,
            next_eligible_at,
        }))
    }

    /// Delegate the supply change. Mints need collateral when a treasury is
    /// configured; the treasury (or this controller's account) receives
    /// minted tokens and supplies burned ones.
    ///
    /// Backing is requested before `mint`. If the mint then fails the draft
    /// is discarded but the treasury keeps the backing; nothing here asks
    /// for it to be released.
    fn execute(&self, reading: &DeviationReading, amount: u128) -> Result<(), ControllerError> {
        let account = match &self.treasury {
            Some(treasury) => treasury.account(),
            None => self.account.clone(),
        };

        let result = match reading.direction {
            Direction::Above => {
                if let Some(treasury) = &self.treasury {
                    let available = treasury
                        .has_available_collateral(amount)
                        .map_err(ControllerError::ExecutionFailed)?;
                    if !available {
                        return Err(ControllerError::CollateralUnavailable { amount });
                    }
                    let backed = treasury
                        .request_collateral_backing(amount)
                        .map_err(ControllerError::ExecutionFailed)?;
                    if !backed {
                        return Err(ControllerError::CollateralUnavailable { amount });
                    }
                }
                self.ledger.mint(&account, amount)
            }
            Direction::Below => self.ledger.burn(&account, amount),
            Direction::AtPeg => Ok(()),
        };

        result.map_err(|err| {
            tracing::warn!(%account, amount = %amount, error = %err, "ledger execution failed");
            ControllerError::ExecutionFailed(err)
        })
    }

    fn flush(&self, staged: Vec<ControllerEvent>) {
        for event in staged {
            self.sink.publish(event);
        }
    }

    /// Current deviation, read-only. Never notifies; Extreme readings are
    /// returned rather than rejected.
    pub fn preview_deviation(&self) -> Result<DeviationReading, ControllerError> {
        let params = self.read_state().params;
        let market = self
            .market
            .get_price()
            .map_err(ControllerError::OracleUnavailable)?;
        let reference = self
            .reference
            .latest_answer()
            .map_err(ControllerError::OracleUnavailable)?;
        Ok(observe(
            market.price,
            market.valid,
            reference,
            self.target_price,
            &params,
        )?)
    }

    /// Estimated amount for `reading` against the current daily usage.
    ///
    /// Extreme readings are sized at the large-band ceiling even though
    /// `stabilize` refuses to act on them.
    pub fn preview_adjustment(&self, reading: &DeviationReading) -> Result<u128, ControllerError> {
        let (params, daily_used_bp) = {
            let state = self.read_state();
            (state.params, state.runtime.daily_used_bp)
        };
        let supply = self
            .ledger
            .total_supply()
            .map_err(ControllerError::ExecutionFailed)?;
        Ok(size_adjustment(reading, &params, daily_used_bp, supply)?.amount)
    }

    /// Status view. Oracle failures are mapped to zero deviation here only.
    pub fn status(&self, now: u64) -> ControllerStatus {
        let (params, runtime) = {
            let state = self.read_state();
            (state.params, state.runtime.clone())
        };

        let current_deviation_bp = match (self.market.get_price(), self.reference.latest_answer())
        {
            (Ok(market), Ok(reference)) => observe(
                market.price,
                market.valid,
                reference,
                self.target_price,
                &params,
            )
            .map(|reading| reading.deviation_bp)
            .unwrap_or(0),
            (market, reference) => {
                tracing::debug!(
                    market_ok = market.is_ok(),
                    reference_ok = reference.is_ok(),
                    "status: oracle unavailable, reporting zero deviation"
                );
                0
            }
        };

        ControllerStatus {
            active: !runtime.halted && runtime.is_ready(now),
            halted: runtime.halted,
            next_eligible_time: runtime.next_eligible_at(),
            current_deviation_bp,
            daily_remaining_bp: runtime.daily_remaining_bp(&params, now),
        }
    }

    pub fn statistics(&self) -> Statistics {
        self.read_state().stats
    }

    pub fn parameters(&self) -> ParameterSet {
        self.read_state().params
    }

    pub fn runtime(&self) -> RuntimeState {
        self.read_state().runtime.clone()
    }

    pub fn metrics(&self) -> ControllerMetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn target_price(&self) -> u128 {
        self.target_price
    }

    /// Install a new parameter set. Invalid sets leave the prior one intact.
    ///
    /// The current cooldown is clamped into the new bounds.
    pub fn update_parameters(&self, params: ParameterSet) -> Result<(), ValidationError> {
        if let Err(err) = params.validate() {
            tracing::debug!(error = %err, "parameter update rejected");
            return Err(err);
        }

        let mut staged = vec![ControllerEvent::ParametersUpdated { params }];
        {
            let mut state = self.write_state();
            let previous_s = state.runtime.current_cooldown_s;
            let current_s = params.clamp_cooldown(previous_s);
            state.params = params;
            state.runtime.current_cooldown_s = current_s;
            if previous_s != current_s {
                staged.push(ControllerEvent::CooldownAdjusted {
                    previous_s,
                    current_s,
                });
            }
        }

        tracing::info!(?params, "parameters updated");
        self.flush(staged);
        Ok(())
    }

    /// Engage the circuit breaker.
    pub fn halt(&self, reason: impl Into<String>) -> Result<(), ControllerError> {
        let reason = reason.into();
        self.write_state().runtime.halt()?;
        tracing::warn!(%reason, "emergency halt engaged");
        self.sink.publish(ControllerEvent::Halted { reason });
        Ok(())
    }

    /// Release the circuit breaker. Cooldown and daily budget are untouched.
    pub fn resume(&self) -> Result<(), ControllerError> {
        self.write_state().runtime.resume()?;
        tracing::info!("emergency halt released");
        self.sink.publish(ControllerEvent::Resumed);
        Ok(())
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ControllerState> {
        // Writers only ever assign complete drafts, so a poisoned lock still
        // guards consistent data.
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ControllerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
