#![forbid(unsafe_code)]

pub mod config;
pub mod report;
pub mod store;

mod decimal;
