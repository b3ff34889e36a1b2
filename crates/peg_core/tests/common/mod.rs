#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use peg_core::policy::PRICE_SCALE;
use peg_core::{
    AccountId, CollaboratorError, ControllerEvent, EventSink, MarketOracle, ParameterSet,
    PegController, PegControllerBuilder, PriceReading, ReferenceOracle, TokenLedger, Treasury,
};

pub const ONE: u128 = PRICE_SCALE;
pub const SUPPLY: u128 = 1_000_000_000_000;
pub const START: u64 = 1_700_000_000;

/// Test helper: a market feed whose price and validity can be changed.
#[derive(Debug)]
pub struct FakeMarket {
    reading: Mutex<PriceReading>,
    fail: AtomicBool,
}

impl FakeMarket {
    pub fn new(price: u128) -> Self {
        Self {
            reading: Mutex::new(PriceReading { price, valid: true }),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_price(&self, price: u128) {
        self.reading.lock().unwrap().price = price;
    }

    pub fn set_valid(&self, valid: bool) {
        self.reading.lock().unwrap().valid = valid;
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl MarketOracle for FakeMarket {
    fn get_price(&self) -> Result<PriceReading, CollaboratorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::new("market", "feed offline"));
        }
        Ok(*self.reading.lock().unwrap())
    }
}

#[derive(Debug)]
pub struct FakeReference {
    answer: Mutex<u128>,
    fail: AtomicBool,
}

impl FakeReference {
    pub fn new(answer: u128) -> Self {
        Self {
            answer: Mutex::new(answer),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_answer(&self, answer: u128) {
        *self.answer.lock().unwrap() = answer;
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl ReferenceOracle for FakeReference {
    fn latest_answer(&self) -> Result<u128, CollaboratorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::new("reference", "feed offline"));
        }
        Ok(*self.answer.lock().unwrap())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    Mint(AccountId, u128),
    Burn(AccountId, u128),
}

/// In-memory ledger. Burns require the source to hold the balance.
#[derive(Debug)]
pub struct FakeLedger {
    supply: Mutex<u128>,
    balances: Mutex<HashMap<AccountId, u128>>,
    calls: Mutex<Vec<LedgerCall>>,
    fail_execution: AtomicBool,
}

impl FakeLedger {
    pub fn new(supply: u128) -> Self {
        Self {
            supply: Mutex::new(supply),
            balances: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_execution: AtomicBool::new(false),
        }
    }

    pub fn fund(&self, account: &AccountId, amount: u128) {
        *self
            .balances
            .lock()
            .unwrap()
            .entry(account.clone())
            .or_default() += amount;
    }

    pub fn balance(&self, account: &AccountId) -> u128 {
        self.balances
            .lock()
            .unwrap()
            .get(account)
            .copied()
            .unwrap_or(0)
    }

    pub fn supply(&self) -> u128 {
        *self.supply.lock().unwrap()
    }

    pub fn set_supply(&self, supply: u128) {
        *self.supply.lock().unwrap() = supply;
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail_execution.store(fail, Ordering::SeqCst);
    }
}

impl TokenLedger for FakeLedger {
    fn mint(&self, recipient: &AccountId, amount: u128) -> Result<(), CollaboratorError> {
        if self.fail_execution.load(Ordering::SeqCst) {
            return Err(CollaboratorError::new("ledger", "mint reverted"));
        }
        *self.supply.lock().unwrap() += amount;
        self.fund(recipient, amount);
        self.calls
            .lock()
            .unwrap()
            .push(LedgerCall::Mint(recipient.clone(), amount));
        Ok(())
    }

    fn burn(&self, source: &AccountId, amount: u128) -> Result<(), CollaboratorError> {
        if self.fail_execution.load(Ordering::SeqCst) {
            return Err(CollaboratorError::new("ledger", "burn reverted"));
        }
        let mut balances = self.balances.lock().unwrap();
        let balance = balances.entry(source.clone()).or_default();
        if *balance < amount {
            return Err(CollaboratorError::new("ledger", "insufficient balance"));
        }
        *balance -= amount;
        *self.supply.lock().unwrap() -= amount;
        self.calls
            .lock()
            .unwrap()
            .push(LedgerCall::Burn(source.clone(), amount));
        Ok(())
    }

    fn total_supply(&self) -> Result<u128, CollaboratorError> {
        Ok(self.supply())
    }
}

#[derive(Debug)]
pub struct FakeTreasury {
    account: AccountId,
    available: AtomicBool,
    backing: AtomicBool,
}

impl FakeTreasury {
    pub fn new(account: &str) -> Self {
        Self {
            account: AccountId::new(account),
            available: AtomicBool::new(true),
            backing: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_backing(&self, backing: bool) {
        self.backing.store(backing, Ordering::SeqCst);
    }
}

impl Treasury for FakeTreasury {
    fn account(&self) -> AccountId {
        self.account.clone()
    }

    fn has_available_collateral(&self, _amount: u128) -> Result<bool, CollaboratorError> {
        Ok(self.available.load(Ordering::SeqCst))
    }

    fn request_collateral_backing(&self, _amount: u128) -> Result<bool, CollaboratorError> {
        Ok(self.backing.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ControllerEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ControllerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(ControllerEvent::name).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl EventSink for RecordingSink {
    fn publish(&self, event: ControllerEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Controller wired to fakes. Market and reference start on peg.
pub struct Harness {
    pub market: Arc<FakeMarket>,
    pub reference: Arc<FakeReference>,
    pub ledger: Arc<FakeLedger>,
    pub sink: Arc<RecordingSink>,
    pub controller: PegController,
}

pub fn harness() -> Harness {
    harness_with(ParameterSet::default(), None)
}

pub fn harness_with(params: ParameterSet, treasury: Option<Arc<FakeTreasury>>) -> Harness {
    let market = Arc::new(FakeMarket::new(ONE));
    let reference = Arc::new(FakeReference::new(ONE));
    let ledger = Arc::new(FakeLedger::new(SUPPLY));
    let sink = Arc::new(RecordingSink::default());

    let mut builder = PegControllerBuilder::new(market.clone(), reference.clone(), ledger.clone())
        .sink(sink.clone())
        .params(params);
    if let Some(treasury) = treasury {
        builder = builder.treasury(treasury);
    }
    let controller = builder.build(START).expect("valid harness parameters");

    Harness {
        market,
        reference,
        ledger,
        sink,
        controller,
    }
}

/// Price `bp` basis points away from 1.00.
pub fn price_off_peg(bp: i64) -> u128 {
    let offset = ONE * u128::from(bp.unsigned_abs()) / 10_000;
    if bp >= 0 { ONE + offset } else { ONE - offset }
}
