#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bankroll::adapters::{AdapterError, AdapterFactory, BankAdapter, BankCredentials};
use bankroll::clock::FixedClock;
use bankroll::models::{
    AccountKind, BankDefinition, ConfiguredAccount, FixedDeposit, Id, RawAccount, RawExtraction,
};
use bankroll::pipeline::{Pipeline, PipelineContext};
use bankroll::storage::SnapshotStore;
use chrono::NaiveDate;

pub fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 18).expect("valid date")
}

/// What a scripted adapter does when asked to extract.
#[derive(Debug, Clone)]
pub enum Script {
    Extract(RawExtraction),
    Fail(String),
}

/// Hands out adapters that replay a fixed script per bank and records the
/// usernames they were called with.
#[derive(Debug, Clone, Default)]
pub struct MockAdapterFactory {
    scripts: Arc<Mutex<HashMap<Id, Script>>>,
    calls: Arc<Mutex<Vec<(Id, String)>>>,
}

impl MockAdapterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extraction(self, bank: &str, extraction: RawExtraction) -> Self {
        self.set(bank, Script::Extract(extraction));
        self
    }

    pub fn with_failure(self, bank: &str, message: &str) -> Self {
        self.set(bank, Script::Fail(message.to_string()));
        self
    }

    pub fn set(&self, bank: &str, script: Script) {
        self.scripts
            .lock()
            .expect("scripts lock")
            .insert(Id::from(bank), script);
    }

    pub fn calls(&self) -> Vec<(Id, String)> {
        self.calls.lock().expect("calls lock").clone()
    }
}

struct MockAdapter {
    bank: Id,
    script: Option<Script>,
    calls: Arc<Mutex<Vec<(Id, String)>>>,
}

#[async_trait]
impl BankAdapter for MockAdapter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn extract(&self, credentials: &BankCredentials) -> Result<RawExtraction, AdapterError> {
        self.calls
            .lock()
            .expect("calls lock")
            .push((self.bank.clone(), credentials.username.clone()));
        match &self.script {
            Some(Script::Extract(extraction)) => Ok(extraction.clone()),
            Some(Script::Fail(message)) => Err(AdapterError::Other(message.clone())),
            None => Err(AdapterError::Other("no script for bank".to_string())),
        }
    }
}

impl AdapterFactory for MockAdapterFactory {
    fn create(&self, bank: &BankDefinition) -> Result<Box<dyn BankAdapter>, AdapterError> {
        let script = self
            .scripts
            .lock()
            .expect("scripts lock")
            .get(&bank.id)
            .cloned();
        Ok(Box::new(MockAdapter {
            bank: bank.id.clone(),
            script,
            calls: self.calls.clone(),
        }))
    }
}

pub fn hdfc_bank() -> BankDefinition {
    BankDefinition::new("hdfc-mummyji", "HDFC", "Mummyji")
        .with_account(ConfiguredAccount::new("50100000001234").with_label("Mummyji HDFC Savings"))
}

pub fn sbi_bank() -> BankDefinition {
    BankDefinition::new("sbi-papaji", "SBI", "Papaji")
        .with_account(ConfiguredAccount::new("30000000001234"))
        .with_account(ConfiguredAccount::new("30000000005678"))
}

pub fn pnb_bank() -> BankDefinition {
    BankDefinition::new("pnb-papaji", "PNB", "Papaji")
        .with_account(ConfiguredAccount::new("0123000100009999"))
}

/// The HDFC portal view from a typical morning: one savings account and two
/// term deposits reported on a separate row.
pub fn hdfc_extraction(balance: u64) -> RawExtraction {
    RawExtraction::new(vec![
        RawAccount::new(AccountKind::Savings, "XXXXXXXXXX1234", balance),
        RawAccount::new(AccountKind::TermDeposit, "", 0)
            .with_fd(FixedDeposit::new(137905, "11 Jun 2026"))
            .with_fd(FixedDeposit::new(50000, "18/03/2027")),
    ])
}

pub fn pipeline(
    banks: Vec<BankDefinition>,
    store: Arc<dyn SnapshotStore>,
    factory: MockAdapterFactory,
) -> Pipeline {
    let context = PipelineContext::new(store, Arc::new(factory))
        .with_clock(Arc::new(FixedClock::on(run_date())));
    Pipeline::new(banks, context)
}
