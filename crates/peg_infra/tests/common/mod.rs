#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use peg_core::policy::PRICE_SCALE;
use peg_core::{AccountId, CollaboratorError, MarketOracle, PriceReading, ReferenceOracle, TokenLedger};

pub const SUPPLY: u128 = 1_000_000_000_000;
pub const START: u64 = 1_700_000_000;

pub fn temp_journal_path(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!(
        "peg_journal_{tag}_{}_{}.jsonl",
        std::process::id(),
        nanos
    ))
}

pub fn remove_if_exists(path: &Path) {
    let _ = std::fs::remove_file(path);
}

/// Market feed with an adjustable price.
#[derive(Debug)]
pub struct StaticMarket(pub Mutex<u128>);

impl StaticMarket {
    pub fn new(price: u128) -> Self {
        Self(Mutex::new(price))
    }

    pub fn set_price(&self, price: u128) {
        *self.0.lock().unwrap() = price;
    }
}

impl MarketOracle for StaticMarket {
    fn get_price(&self) -> Result<PriceReading, CollaboratorError> {
        Ok(PriceReading {
            price: *self.0.lock().unwrap(),
            valid: true,
        })
    }
}

/// Reference asset pinned at 1.00.
#[derive(Debug)]
pub struct UnitReference;

impl ReferenceOracle for UnitReference {
    fn latest_answer(&self) -> Result<u128, CollaboratorError> {
        Ok(PRICE_SCALE)
    }
}

/// Ledger that accepts every mint and burn against a running supply.
#[derive(Debug)]
pub struct OpenLedger(pub Mutex<u128>);

impl OpenLedger {
    pub fn new(supply: u128) -> Self {
        Self(Mutex::new(supply))
    }
}

impl TokenLedger for OpenLedger {
    fn mint(&self, _recipient: &AccountId, amount: u128) -> Result<(), CollaboratorError> {
        *self.0.lock().unwrap() += amount;
        Ok(())
    }

    fn burn(&self, _source: &AccountId, amount: u128) -> Result<(), CollaboratorError> {
        let mut supply = self.0.lock().unwrap();
        *supply = supply
            .checked_sub(amount)
            .ok_or_else(|| CollaboratorError::new("ledger", "burn exceeds supply"))?;
        Ok(())
    }

    fn total_supply(&self) -> Result<u128, CollaboratorError> {
        Ok(*self.0.lock().unwrap())
    }
}
