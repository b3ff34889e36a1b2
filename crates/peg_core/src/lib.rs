#![forbid(unsafe_code)]

pub mod collab;
pub mod control;
pub mod idempotency;
pub mod policy;

pub use collab::{
    AccountId, CollaboratorError, ControllerEvent, EventSink, MarketOracle, NullSink,
    PriceReading, ReferenceOracle, TokenLedger, TracingSink, Treasury,
};
pub use control::{
    ActionOutcome, ControllerError, ControllerMetricsSnapshot, ControllerStatus, ErrorKind,
    ExecutedAction, NoActionReason, PegController, PegControllerBuilder, RestoredState,
    RuntimeState, Statistics,
};
pub use policy::{
    AdjustmentPlan, DeviationReading, Direction, ParameterSet, ResponseLevel, ValidationError,
};
