//! The daily run: extract every bank, reconcile into today's snapshot,
//! persist after each bank, then optionally push the day to the remote
//! tracker.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use secrecy::SecretString;

use crate::adapters::{AdapterError, AdapterFactory, BankCredentials, DefaultAdapterFactory};
use crate::clock::{Clock, SystemClock};
use crate::config::ResolvedConfig;
use crate::models::{BankDefinition, DailySnapshot, Id};
use crate::reconcile::{AmbiguityPolicy, ReconcileReport, Reconciler};
use crate::registry::AccountRegistry;
use crate::storage::{JsonFileSnapshotStore, SnapshotStore};
use crate::sync::{RemoteCredentials, SyncEngine};

pub trait SyncPrompter: Send + Sync {
    fn confirm_sync(&self, prompt: &str) -> Result<bool>;
}

#[derive(Debug, Clone)]
pub struct FixedSyncPrompter {
    allow: bool,
}

impl FixedSyncPrompter {
    pub fn allow() -> Self {
        Self { allow: true }
    }

    pub fn deny() -> Self {
        Self { allow: false }
    }
}

impl SyncPrompter for FixedSyncPrompter {
    fn confirm_sync(&self, _prompt: &str) -> Result<bool> {
        Ok(self.allow)
    }
}

pub struct PipelineContext {
    pub store: Arc<dyn SnapshotStore>,
    pub adapter_factory: Arc<dyn AdapterFactory>,
    pub ambiguity: AmbiguityPolicy,
    pub clock: Arc<dyn Clock>,
}

impl PipelineContext {
    pub fn new(store: Arc<dyn SnapshotStore>, adapter_factory: Arc<dyn AdapterFactory>) -> Self {
        Self {
            store,
            adapter_factory,
            ambiguity: AmbiguityPolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Context backed by the on-disk store and configured adapters.
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new(
            Arc::new(JsonFileSnapshotStore::new(&config.data_dir)),
            Arc::new(DefaultAdapterFactory::new(&config.data_dir)),
        )
        .with_ambiguity_policy(config.reconcile.on_ambiguous)
    }

    pub fn with_ambiguity_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

#[derive(Debug)]
pub enum BankOutcome {
    Processed { report: ReconcileReport },
    Failed { bank: Id, error: AdapterError },
}

impl BankOutcome {
    pub fn bank_id(&self) -> &Id {
        match self {
            BankOutcome::Processed { report } => &report.bank_id,
            BankOutcome::Failed { bank, .. } => bank,
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub date: NaiveDate,
    pub outcomes: Vec<BankOutcome>,
    /// The snapshot as saved after the last processed bank.
    pub snapshot: DailySnapshot,
}

impl RunReport {
    pub fn failed(&self) -> impl Iterator<Item = (&Id, &AdapterError)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            BankOutcome::Failed { bank, error } => Some((bank, error)),
            BankOutcome::Processed { .. } => None,
        })
    }

    pub fn processed(&self) -> impl Iterator<Item = &ReconcileReport> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            BankOutcome::Processed { report } => Some(report),
            BankOutcome::Failed { .. } => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Synced { count: usize },
    Declined,
    NothingToSync,
}

pub struct Pipeline {
    banks: Vec<BankDefinition>,
    store: Arc<dyn SnapshotStore>,
    adapter_factory: Arc<dyn AdapterFactory>,
    reconciler: Reconciler,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    /// The account registry is built from `banks`, so matching always sees
    /// exactly the banks this pipeline processes.
    pub fn new(banks: Vec<BankDefinition>, context: PipelineContext) -> Self {
        let reconciler = Reconciler::new(AccountRegistry::from_banks(&banks))
            .with_ambiguity_policy(context.ambiguity);
        Self {
            banks,
            store: context.store,
            adapter_factory: context.adapter_factory,
            reconciler,
            clock: context.clock,
        }
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Process banks in configured order, or only those in `only` when it
    /// is non-empty. A bank's failure is recorded and the run moves on; the
    /// snapshot is saved after every bank that produced data, so an
    /// interrupted run keeps earlier banks' results.
    pub async fn run(&self, only: &[Id]) -> Result<RunReport> {
        for id in only {
            if !self.banks.iter().any(|bank| &bank.id == id) {
                anyhow::bail!("Unknown bank: {id}");
            }
        }

        let date = self.clock.today();
        let mut snapshot = self
            .store
            .load(date)
            .await
            .with_context(|| format!("Failed to load snapshot for {date}"))?;
        let mut outcomes = Vec::new();

        for bank in &self.banks {
            if !only.is_empty() && !only.contains(&bank.id) {
                continue;
            }

            tracing::info!(bank = %bank.id, name = %bank.name, holder = %bank.holder_name, "Processing bank");
            match self.process_bank(bank, &mut snapshot).await {
                Ok(report) => {
                    self.store
                        .save(&snapshot)
                        .await
                        .with_context(|| format!("Failed to save snapshot for {date}"))?;
                    tracing::info!(
                        bank = %bank.id,
                        matched = report.reconciled.len(),
                        unmatched = report.unmatched.len(),
                        "Bank processed"
                    );
                    outcomes.push(BankOutcome::Processed { report });
                }
                Err(error) => {
                    tracing::warn!(bank = %bank.id, error = %error, "Bank failed, continuing");
                    outcomes.push(BankOutcome::Failed {
                        bank: bank.id.clone(),
                        error,
                    });
                }
            }
        }

        Ok(RunReport {
            date,
            outcomes,
            snapshot,
        })
    }

    async fn process_bank(
        &self,
        bank: &BankDefinition,
        snapshot: &mut DailySnapshot,
    ) -> Result<ReconcileReport, AdapterError> {
        let adapter = self.adapter_factory.create(bank)?;
        // Secret sources may prompt (gpg pinentry); only touch them for a login.
        let password = if adapter.needs_credentials() {
            bank.password.resolve().map_err(AdapterError::Credentials)?
        } else {
            SecretString::from(String::new())
        };
        let credentials = BankCredentials {
            username: bank.username.clone(),
            password,
        };

        tracing::debug!(bank = %bank.id, adapter = adapter.name(), "Running adapter");
        let extraction = adapter.extract(&credentials).await?;
        if extraction.accounts.is_empty() {
            return Err(AdapterError::Empty);
        }

        Ok(self.reconciler.reconcile(bank, &extraction, snapshot))
    }

    /// Push the stored snapshot for `date` to the remote tracker after the
    /// user confirms. Empty or missing snapshots are never offered.
    /// `connect` builds the engine and credentials and is only called once
    /// the user has agreed, so a declined sync resolves no secrets.
    pub async fn sync<F>(
        &self,
        date: NaiveDate,
        prompter: &dyn SyncPrompter,
        connect: F,
    ) -> Result<SyncOutcome>
    where
        F: FnOnce() -> Result<(SyncEngine, RemoteCredentials)>,
    {
        let snapshot = match self.store.get(date).await? {
            Some(snapshot) if !snapshot.is_empty() => snapshot,
            _ => {
                tracing::info!(%date, "No accounts to sync");
                return Ok(SyncOutcome::NothingToSync);
            }
        };

        let prompt = format!(
            "Upload {} account(s) for {} to the balance tracker?",
            snapshot.len(),
            date
        );
        if !prompter.confirm_sync(&prompt)? {
            return Ok(SyncOutcome::Declined);
        }

        let (engine, credentials) = connect()?;
        let count = engine.sync(&snapshot, &credentials).await?;
        Ok(SyncOutcome::Synced { count })
    }
}
