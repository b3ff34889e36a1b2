//! External collaborators consumed by the controller.
//!
//! Oracles, the token ledger and the optional treasury are implemented
//! elsewhere; the controller only sees these traits and assumes the caller
//! has already been authorized.

use std::fmt;

use thiserror::Error;

use crate::policy::{DeviationReading, Direction, ParameterSet, ResponseLevel};

/// Ledger account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failure reported by a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{collaborator}: {reason}")]
pub struct CollaboratorError {
    pub collaborator: &'static str,
    pub reason: String,
}

impl CollaboratorError {
    pub fn new(collaborator: &'static str, reason: impl Into<String>) -> Self {
        Self {
            collaborator,
            reason: reason.into(),
        }
    }
}

/// Market price with the feed's own freshness flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceReading {
    /// Price with 8 decimals.
    pub price: u128,
    pub valid: bool,
}

pub trait MarketOracle: Send + Sync {
    fn get_price(&self) -> Result<PriceReading, CollaboratorError>;
}

/// Price of the reference asset (expected near 1.00000000).
pub trait ReferenceOracle: Send + Sync {
    fn latest_answer(&self) -> Result<u128, CollaboratorError>;
}

/// Token ledger that executes supply changes.
///
/// `burn` draws from `source`; providing that balance is the ledger's
/// concern, and an insufficient balance is reported as an error.
pub trait TokenLedger: Send + Sync {
    fn mint(&self, recipient: &AccountId, amount: u128) -> Result<(), CollaboratorError>;
    fn burn(&self, source: &AccountId, amount: u128) -> Result<(), CollaboratorError>;
    fn total_supply(&self) -> Result<u128, CollaboratorError>;
}

/// Optional collateral service. When configured, it receives minted tokens
/// and supplies burned ones.
pub trait Treasury: Send + Sync {
    fn account(&self) -> AccountId;
    fn has_available_collateral(&self, amount: u128) -> Result<bool, CollaboratorError>;
    fn request_collateral_backing(&self, amount: u128) -> Result<bool, CollaboratorError>;
}

/// Notifications surfaced by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    DeviationDetected {
        reading: DeviationReading,
    },
    StabilizationExecuted {
        action_id: String,
        at: u64,
        direction: Direction,
        level: ResponseLevel,
        amount: u128,
        amount_bp: u32,
        deviation_bp: u64,
    },
    DailyReset {
        at: u64,
        previous_used_bp: u32,
    },
    CooldownAdjusted {
        previous_s: u64,
        current_s: u64,
    },
    Halted {
        reason: String,
    },
    Resumed,
    ParametersUpdated {
        params: ParameterSet,
    },
}

impl ControllerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ControllerEvent::DeviationDetected { .. } => "deviation_detected",
            ControllerEvent::StabilizationExecuted { .. } => "stabilization_executed",
            ControllerEvent::DailyReset { .. } => "daily_reset",
            ControllerEvent::CooldownAdjusted { .. } => "cooldown_adjusted",
            ControllerEvent::Halted { .. } => "halted",
            ControllerEvent::Resumed => "resumed",
            ControllerEvent::ParametersUpdated { .. } => "parameters_updated",
        }
    }
}

/// Fire-and-forget observability sink.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: ControllerEvent);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: ControllerEvent) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: ControllerEvent) {
        match &event {
            ControllerEvent::Halted { reason } => {
                tracing::warn!(event = event.name(), %reason, "controller halted");
            }
            ControllerEvent::StabilizationExecuted {
                action_id,
                direction,
                amount,
                amount_bp,
                ..
            } => {
                tracing::info!(
                    event = event.name(),
                    %action_id,
                    direction = direction.as_str(),
                    amount = %amount,
                    amount_bp,
                    "stabilization executed"
                );
            }
            other => tracing::info!(event = other.name(), detail = ?other, "controller event"),
        }
    }
}
