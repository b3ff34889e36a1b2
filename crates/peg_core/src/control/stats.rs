//! Cumulative accounting. Totals only ever grow.

use crate::policy::math::{OverflowError, checked_add};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Statistics {
    pub total_minted: u128,
    pub total_burned: u128,
    pub action_count: u64,
    pub last_adjustment_amount: u128,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_mint(&mut self, amount: u128) -> Result<(), OverflowError> {
        self.total_minted = checked_add(self.total_minted, amount, "total minted")?;
        self.last_adjustment_amount = amount;
        Ok(())
    }

    pub fn record_burn(&mut self, amount: u128) -> Result<(), OverflowError> {
        self.total_burned = checked_add(self.total_burned, amount, "total burned")?;
        self.last_adjustment_amount = amount;
        Ok(())
    }

    pub fn record_action(&mut self) -> Result<(), OverflowError> {
        self.action_count = self.action_count.checked_add(1).ok_or(OverflowError {
            context: "action count",
        })?;
        Ok(())
    }
}
