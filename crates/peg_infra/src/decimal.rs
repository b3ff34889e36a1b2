//! `u128` token amounts as decimal strings on the wire.
//!
//! Internally tagged serde enums buffer their fields, and that buffer has no
//! 128-bit integer representation.

use serde::{Deserialize, Deserializer, Serializer, de};

pub(crate) fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse::<u128>()
        .map_err(|e| de::Error::custom(format!("invalid token amount '{raw}': {e}")))
}
