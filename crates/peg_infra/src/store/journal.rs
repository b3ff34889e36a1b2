//! Append-only action journal.
//!
//! Executed actions, daily resets, halts, resumes and parameter updates are
//! captured as JSON-lines events. On startup, replay reduces the event stream
//! into cumulative statistics, the latest halt flag, the last action and the
//! current daily window, which [`JournalReplay::apply_to`] feeds back into a
//! controller builder.
//!
//! **Hard rules:**
//! - An action id appears at most once; duplicates are rejected on append and
//!   make a file unloadable.
//! - The file is written before the in-memory view is updated.
//! - `JournalSink` never propagates a write failure into the controller.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use peg_core::{
    ControllerEvent, Direction, EventSink, ParameterSet, PegControllerBuilder, ResponseLevel,
    RestoredState, Statistics,
};

use crate::config::ParameterOverrides;

// --- Supply change ------------------------------------------------------

/// Direction of an executed supply change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplyChange {
    Mint,
    Burn,
}

// --- Journal event ------------------------------------------------------

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JournalEvent {
    ActionExecuted {
        action_id: String,
        at: u64,
        change: SupplyChange,
        /// Response level token (`small`, `medium`, ...).
        level: String,
        #[serde(with = "crate::decimal")]
        amount: u128,
        amount_bp: u32,
        deviation_bp: u64,
    },
    DailyReset {
        at: u64,
        previous_used_bp: u32,
    },
    Halted {
        reason: String,
    },
    Resumed,
    ParametersUpdated {
        params: ParameterOverrides,
    },
}

impl JournalEvent {
    /// Journal form of a controller event. Measurement and cooldown
    /// notifications are not journaled.
    pub fn from_controller_event(event: &ControllerEvent) -> Option<Self> {
        match event {
            ControllerEvent::StabilizationExecuted {
                action_id,
                at,
                direction,
                level,
                amount,
                amount_bp,
                deviation_bp,
            } => Some(Self::ActionExecuted {
                action_id: action_id.clone(),
                at: *at,
                change: map_core_direction(*direction)?,
                level: level.as_str().to_string(),
                amount: *amount,
                amount_bp: *amount_bp,
                deviation_bp: *deviation_bp,
            }),
            ControllerEvent::DailyReset {
                at,
                previous_used_bp,
            } => Some(Self::DailyReset {
                at: *at,
                previous_used_bp: *previous_used_bp,
            }),
            ControllerEvent::Halted { reason } => Some(Self::Halted {
                reason: reason.clone(),
            }),
            ControllerEvent::Resumed => Some(Self::Resumed),
            ControllerEvent::ParametersUpdated { params } => Some(Self::ParametersUpdated {
                params: ParameterOverrides::from_params(params),
            }),
            ControllerEvent::DeviationDetected { .. }
            | ControllerEvent::CooldownAdjusted { .. } => None,
        }
    }
}

fn map_core_direction(direction: Direction) -> Option<SupplyChange> {
    match direction {
        Direction::Above => Some(SupplyChange::Mint),
        Direction::Below => Some(SupplyChange::Burn),
        Direction::AtPeg => None,
    }
}

// --- Append error -------------------------------------------------------

/// Error returned when a journal append fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalAppendError {
    /// The action id was already journaled.
    DuplicateActionId { action_id: String },
    /// Encoding or file write failure.
    WriteFailed { reason: String },
}

impl std::fmt::Display for JournalAppendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateActionId { action_id } => {
                write!(f, "action_id already journaled: {action_id}")
            }
            Self::WriteFailed { reason } => write!(f, "journal write failed: {reason}"),
        }
    }
}

impl std::error::Error for JournalAppendError {}

// --- Replay -------------------------------------------------------------

/// State reconstructed from the journal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JournalReplay {
    pub statistics: Statistics,
    /// Timestamp of the most recent executed action.
    pub last_action_at: Option<u64>,
    pub last_action_level: Option<ResponseLevel>,
    pub halted: bool,
    pub actions_replayed: usize,
    /// Most recent parameter set, if any update was journaled.
    pub parameters: Option<ParameterSet>,
    /// Start of the current daily window: the last journaled reset, or the
    /// first action when no reset was journaled.
    pub daily_reset_at: Option<u64>,
    /// `amount_bp` summed over actions since `daily_reset_at`.
    pub daily_used_bp: u32,
}

impl JournalReplay {
    pub fn restored_state(&self) -> RestoredState {
        RestoredState {
            statistics: self.statistics,
            last_action_time: self.last_action_at,
            last_action_level: self.last_action_level,
            daily_used_bp: self.daily_used_bp,
            daily_reset_at: self.daily_reset_at,
            halted: self.halted,
        }
    }

    /// Seed `builder` with the journaled state. A journaled parameter update
    /// replaces the builder's parameters.
    pub fn apply_to(&self, builder: PegControllerBuilder) -> PegControllerBuilder {
        let builder = match self.parameters {
            Some(params) => builder.params(params),
            None => builder,
        };
        builder.restore(self.restored_state())
    }
}

// --- Metrics ------------------------------------------------------------

/// Observability counters for the journal.
#[derive(Debug, Default)]
pub struct JournalMetrics {
    /// `journal_write_errors` counter.
    write_errors: u64,
    /// Appends refused because the action id already exists.
    duplicate_rejections: u64,
    /// Total successful appends.
    appends_total: u64,
}

impl JournalMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_write_error(&mut self) {
        self.write_errors += 1;
    }

    pub fn record_duplicate(&mut self) {
        self.duplicate_rejections += 1;
    }

    pub fn record_append(&mut self) {
        self.appends_total += 1;
    }

    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    pub fn duplicate_rejections(&self) -> u64 {
        self.duplicate_rejections
    }

    pub fn appends_total(&self) -> u64 {
        self.appends_total
    }
}

// --- Journal ------------------------------------------------------------

/// Action journal with an optional JSONL storage path.
#[derive(Debug, Default)]
pub struct ActionJournal {
    replay: JournalReplay,
    action_ids: HashSet<String>,
    storage_path: Option<PathBuf>,
}

impl ActionJournal {
    /// In-memory journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or load a journal backed by a JSONL file.
    pub fn with_storage_path(storage_path: impl AsRef<Path>) -> io::Result<Self> {
        let path = storage_path.as_ref().to_path_buf();
        let events = load_journal_lines(&path)?;
        let mut journal = Self::new();
        for event in &events {
            journal
                .apply_event(event)
                .map_err(|reason| io::Error::new(io::ErrorKind::InvalidData, reason))?;
        }
        journal.storage_path = Some(path);
        Ok(journal)
    }

    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    pub fn append(
        &mut self,
        event: JournalEvent,
        metrics: &mut JournalMetrics,
    ) -> Result<(), JournalAppendError> {
        if let JournalEvent::ActionExecuted {
            action_id, level, ..
        } = &event
        {
            if self.action_ids.contains(action_id) {
                metrics.record_write_error();
                metrics.record_duplicate();
                return Err(JournalAppendError::DuplicateActionId {
                    action_id: action_id.clone(),
                });
            }
            if ResponseLevel::from_token(level).is_none() {
                metrics.record_write_error();
                return Err(JournalAppendError::WriteFailed {
                    reason: format!("action {action_id} has unknown level {level:?}"),
                });
            }
        }

        if let Some(path) = &self.storage_path {
            append_journal_line(path, &event).map_err(|reason| {
                metrics.record_write_error();
                JournalAppendError::WriteFailed { reason }
            })?;
        }

        self.apply_event(&event).map_err(|reason| {
            metrics.record_write_error();
            JournalAppendError::WriteFailed { reason }
        })?;

        metrics.record_append();
        Ok(())
    }

    /// Reduced view of everything journaled so far.
    pub fn replay(&self) -> JournalReplay {
        self.replay.clone()
    }

    pub fn contains_action(&self, action_id: &str) -> bool {
        self.action_ids.contains(action_id)
    }

    fn apply_event(&mut self, event: &JournalEvent) -> Result<(), String> {
        match event {
            JournalEvent::ActionExecuted {
                action_id,
                at,
                change,
                level,
                amount,
                amount_bp,
                ..
            } => {
                let level = ResponseLevel::from_token(level)
                    .ok_or_else(|| format!("action {action_id} has unknown level {level:?}"))?;
                if !self.action_ids.insert(action_id.clone()) {
                    return Err(format!("duplicate action_id in journal: {action_id}"));
                }
                let stats = &mut self.replay.statistics;
                let recorded = match change {
                    SupplyChange::Mint => stats.record_mint(*amount),
                    SupplyChange::Burn => stats.record_burn(*amount),
                };
                recorded
                    .and_then(|()| stats.record_action())
                    .map_err(|e| format!("replay of {action_id} failed: {e}"))?;
                self.replay.daily_used_bp = self
                    .replay
                    .daily_used_bp
                    .checked_add(*amount_bp)
                    .ok_or_else(|| format!("daily usage overflow at action {action_id}"))?;
                self.replay.daily_reset_at.get_or_insert(*at);
                let last = self.replay.last_action_at.map_or(*at, |last| last.max(*at));
                self.replay.last_action_at = Some(last);
                self.replay.last_action_level = Some(level);
                self.replay.actions_replayed += 1;
            }
            JournalEvent::DailyReset { at, .. } => {
                self.replay.daily_reset_at = Some(*at);
                self.replay.daily_used_bp = 0;
            }
            JournalEvent::Halted { .. } => self.replay.halted = true,
            JournalEvent::Resumed => self.replay.halted = false,
            JournalEvent::ParametersUpdated { params } => {
                let resolved = params
                    .resolve_parameters()
                    .map_err(|e| format!("journaled parameters rejected: {e}"))?;
                self.replay.parameters = Some(resolved);
            }
        }
        Ok(())
    }
}

/// Adapter that journals controller events.
#[derive(Debug)]
pub struct JournalSink {
    inner: Mutex<SinkState>,
}

#[derive(Debug)]
struct SinkState {
    journal: ActionJournal,
    metrics: JournalMetrics,
    last_error: Option<JournalAppendError>,
}

impl JournalSink {
    pub fn new(journal: ActionJournal) -> Self {
        Self {
            inner: Mutex::new(SinkState {
                journal,
                metrics: JournalMetrics::new(),
                last_error: None,
            }),
        }
    }

    pub fn replay(&self) -> JournalReplay {
        self.lock().journal.replay()
    }

    pub fn write_errors(&self) -> u64 {
        self.lock().metrics.write_errors()
    }

    pub fn appends_total(&self) -> u64 {
        self.lock().metrics.appends_total()
    }

    pub fn last_error(&self) -> Option<JournalAppendError> {
        self.lock().last_error.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SinkState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventSink for JournalSink {
    fn publish(&self, event: ControllerEvent) {
        let Some(entry) = JournalEvent::from_controller_event(&event) else {
            return;
        };
        let mut state = self.lock();
        let SinkState {
            journal,
            metrics,
            last_error,
        } = &mut *state;
        if let Err(err) = journal.append(entry, metrics) {
            tracing::warn!(event = event.name(), error = %err, "journal append failed");
            *last_error = Some(err);
        }
    }
}

/// Encode `event` and append it as one line, synced before returning.
fn append_journal_line(path: &Path, event: &JournalEvent) -> Result<(), String> {
    let mut line =
        serde_json::to_string(event).map_err(|e| format!("journal entry not encodable: {e}"))?;
    line.push('\n');

    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("cannot create journal directory {}: {e}", dir.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("cannot open {} for append: {e}", path.display()))?;
    file.write_all(line.as_bytes())
        .and_then(|()| file.sync_data())
        .map_err(|e| format!("append to {} not persisted: {e}", path.display()))
}

/// Parse every non-blank line. A missing file is created empty.
fn load_journal_lines(path: &Path) -> io::Result<Vec<JournalEvent>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            OpenOptions::new().create(true).append(true).open(path)?;
            return Ok(Vec::new());
        }
        Err(err) => return Err(err),
    };

    let mut events = Vec::new();
    for (line_no, line) in (1_usize..).zip(BufReader::new(file).lines()) {
        let line = line?;
        let entry = line.trim();
        if entry.is_empty() {
            continue;
        }
        let event = serde_json::from_str(entry).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{} line {line_no}: unreadable entry: {e}", path.display()),
            )
        })?;
        events.push(event);
    }
    Ok(events)
}
