pub mod hash;

pub use hash::{ActionHashInput, compute_action_hash, format_action_hash};
