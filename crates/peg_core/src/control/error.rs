//! Controller error taxonomy.
//!
//! Every variant maps to one `ErrorKind` so callers can tell "try again
//! later" from "needs intervention" from "fix your input".

use thiserror::Error;

use crate::collab::CollaboratorError;
use crate::policy::{DeviationError, OverflowError, ValidationError};

/// How a caller should react to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transient; retrying later may succeed.
    RetryLater,
    /// Do not retry without operator intervention.
    NeedsIntervention,
    /// Administrative input is malformed.
    FixInput,
    /// Arithmetic overflow; the invocation was aborted.
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("controller is emergency halted")]
    EmergencyHalted,
    #[error("in cooldown until {next_eligible_at}")]
    InCooldown { next_eligible_at: u64 },
    #[error("stabilization already in progress")]
    Reentrant,
    #[error("market price is stale")]
    StalePrice,
    #[error("invalid price: {reason}")]
    InvalidPrice { reason: &'static str },
    #[error("extreme deviation of {deviation_bp} bp; refusing to act")]
    ExtremeDeviation { deviation_bp: u64 },
    #[error("daily limit of {daily_cap_bp} bp exhausted")]
    DailyLimitExceeded { daily_cap_bp: u32 },
    #[error("collateral unavailable for {amount}")]
    CollateralUnavailable { amount: u128 },
    #[error("oracle unavailable: {0}")]
    OracleUnavailable(CollaboratorError),
    #[error("execution failed: {0}")]
    ExecutionFailed(CollaboratorError),
    #[error("controller already halted")]
    AlreadyHalted,
    #[error("controller is not halted")]
    NotHalted,
    #[error("invalid parameters: {0}")]
    InvalidParameters(#[from] ValidationError),
    #[error("arithmetic overflow in {context}")]
    ArithmeticOverflow { context: &'static str },
}

impl ControllerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ControllerError::InCooldown { .. }
            | ControllerError::Reentrant
            | ControllerError::OracleUnavailable(_) => ErrorKind::RetryLater,
            ControllerError::EmergencyHalted
            | ControllerError::StalePrice
            | ControllerError::InvalidPrice { .. }
            | ControllerError::ExtremeDeviation { .. }
            | ControllerError::DailyLimitExceeded { .. }
            | ControllerError::CollateralUnavailable { .. }
            | ControllerError::ExecutionFailed(_)
            | ControllerError::AlreadyHalted
            | ControllerError::NotHalted => ErrorKind::NeedsIntervention,
            ControllerError::InvalidParameters(_) => ErrorKind::FixInput,
            ControllerError::ArithmeticOverflow { .. } => ErrorKind::Fatal,
        }
    }

    /// Stable token for logs and metrics.
    pub fn code(&self) -> &'static str {
        match self {
            ControllerError::EmergencyHalted => "EmergencyHalted",
            ControllerError::InCooldown { .. } => "InCooldown",
            ControllerError::Reentrant => "Reentrant",
            ControllerError::StalePrice => "StalePrice",
            ControllerError::InvalidPrice { .. } => "InvalidPrice",
            ControllerError::ExtremeDeviation { .. } => "ExtremeDeviation",
            ControllerError::DailyLimitExceeded { .. } => "DailyLimitExceeded",
            ControllerError::CollateralUnavailable { .. } => "CollateralUnavailable",
            ControllerError::OracleUnavailable(_) => "OracleUnavailable",
            ControllerError::ExecutionFailed(_) => "ExecutionFailed",
            ControllerError::AlreadyHalted => "AlreadyHalted",
            ControllerError::NotHalted => "NotHalted",
            ControllerError::InvalidParameters(_) => "InvalidParameters",
            ControllerError::ArithmeticOverflow { .. } => "ArithmeticOverflow",
        }
    }
}

impl From<DeviationError> for ControllerError {
    fn from(err: DeviationError) -> Self {
        match err {
            DeviationError::StalePrice => ControllerError::StalePrice,
            DeviationError::InvalidPrice { reason } => ControllerError::InvalidPrice { reason },
            DeviationError::ExtremeDeviation { deviation_bp, .. } => {
                ControllerError::ExtremeDeviation { deviation_bp }
            }
            DeviationError::Overflow(OverflowError { context }) => {
                ControllerError::ArithmeticOverflow { context }
            }
        }
    }
}

impl From<OverflowError> for ControllerError {
    fn from(err: OverflowError) -> Self {
        ControllerError::ArithmeticOverflow {
            context: err.context,
        }
    }
}
