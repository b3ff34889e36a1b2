//! Durable storage: append-only action journal.

pub mod journal;

pub use journal::{
    ActionJournal, JournalAppendError, JournalEvent, JournalMetrics, JournalReplay, JournalSink,
    SupplyChange,
};
