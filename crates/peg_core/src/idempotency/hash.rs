//! Action identity.
//!
//! `action_id = xxhash64(sequence + at + direction + amount)`, rendered as
//! 16 lowercase hex digits. `sequence` is the action count after commit,
//! so two executed actions never share an id within one controller history.

use xxhash_rust::xxh64::xxh64;

use crate::policy::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionHashInput {
    pub sequence: u64,
    pub at: u64,
    pub direction: Direction,
    pub amount: u128,
}

pub fn compute_action_hash(input: &ActionHashInput) -> u64 {
    // 0xFF separators cannot appear inside the UTF-8 direction tag.
    let mut buf = Vec::with_capacity(64);

    buf.extend_from_slice(&input.sequence.to_le_bytes());
    buf.push(0xFF);
    buf.extend_from_slice(&input.at.to_le_bytes());
    buf.push(0xFF);
    buf.extend_from_slice(input.direction.as_str().as_bytes());
    buf.push(0xFF);
    buf.extend_from_slice(&input.amount.to_le_bytes());

    xxh64(&buf, 0)
}

pub fn format_action_hash(hash: u64) -> String {
    format!("{hash:016x}")
}
