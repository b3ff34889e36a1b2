//! Controller: gating state machine, accounting and the stabilize entry point.

pub mod controller;
pub mod error;
pub mod guard;
pub mod metrics;
pub mod outcome;
pub mod state;
pub mod stats;

pub use controller::{PegController, PegControllerBuilder};
pub use error::{ControllerError, ErrorKind};
pub use guard::InvocationGuard;
pub use metrics::{ControllerMetrics, ControllerMetricsSnapshot};
pub use outcome::{ActionOutcome, ControllerStatus, ExecutedAction, NoActionReason};
pub use state::{CooldownChange, RestoredState, RuntimeState};
pub use stats::Statistics;
