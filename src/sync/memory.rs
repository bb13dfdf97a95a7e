use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};

use crate::models::{AccountEntry, FixedDeposit};

use super::supabase::maturity_value;
use super::{RemoteBackend, RemoteCredentials, RemoteUser, SyncError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyRecordRow {
    pub id: u64,
    pub user_id: String,
    pub record_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRow {
    pub id: u64,
    pub daily_record_id: u64,
    pub holder_name: String,
    pub bank_name: String,
    pub account_number: String,
    pub balance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDepositRow {
    pub id: u64,
    pub account_id: u64,
    pub principal: u64,
    pub maturity_date: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    next_id: u64,
    daily_records: Vec<DailyRecordRow>,
    accounts: Vec<AccountRow>,
    fixed_deposits: Vec<FixedDepositRow>,
}

impl Tables {
    fn allocate(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
struct State {
    users: HashMap<String, (String, String)>,
    tables: Tables,
    fail_after_accounts: Option<usize>,
}

/// In-process backend with the same three-table layout and replace-by-day
/// semantics as the hosted tracker. Each `replace_day` either commits fully
/// or leaves the tables untouched.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user that can sign in with `email` / `password`.
    pub fn with_user(self, user_id: &str, email: &str, password: &str) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state
                .users
                .insert(email.to_string(), (user_id.to_string(), password.to_string()));
        }
        self
    }

    /// Make the next `replace_day` fail after inserting `count` accounts.
    pub fn fail_after_accounts(&self, count: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_after_accounts = Some(count);
        }
    }

    pub fn daily_records(&self) -> Vec<DailyRecordRow> {
        self.lock().map(|s| s.tables.daily_records.clone()).unwrap_or_default()
    }

    /// The accounts (with their FDs) stored for `(user_id, date)`, in
    /// insertion order.
    pub fn day(&self, user_id: &str, date: NaiveDate) -> Vec<AccountEntry> {
        let Ok(state) = self.lock() else {
            return Vec::new();
        };
        let tables = &state.tables;
        let Some(record) = tables
            .daily_records
            .iter()
            .find(|r| r.user_id == user_id && r.record_date == date)
        else {
            return Vec::new();
        };

        tables
            .accounts
            .iter()
            .filter(|a| a.daily_record_id == record.id)
            .map(|a| AccountEntry {
                holder_name: a.holder_name.clone(),
                bank_name: a.bank_name.clone(),
                account_number: a.account_number.clone(),
                balance: a.balance,
                fds: tables
                    .fixed_deposits
                    .iter()
                    .filter(|fd| fd.account_id == a.id)
                    .map(|fd| {
                        FixedDeposit::new(fd.principal, fd.maturity_date.clone().unwrap_or_default())
                    })
                    .collect(),
            })
            .collect()
    }

    pub fn fixed_deposit_rows(&self) -> Vec<FixedDepositRow> {
        self.lock()
            .map(|s| s.tables.fixed_deposits.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>, SyncError> {
        self.state
            .lock()
            .map_err(|_| SyncError::Transport("memory backend lock poisoned".to_string()))
    }
}

#[async_trait::async_trait]
impl RemoteBackend for MemoryBackend {
    async fn sign_in(&self, credentials: &RemoteCredentials) -> Result<RemoteUser, SyncError> {
        let state = self.lock()?;
        match state.users.get(&credentials.email) {
            Some((id, password)) if password == credentials.password.expose_secret() => {
                Ok(RemoteUser {
                    id: id.clone(),
                    access_token: SecretString::from(format!("token-{id}")),
                })
            }
            _ => Err(SyncError::Authentication(
                "Invalid login credentials".to_string(),
            )),
        }
    }

    async fn replace_day(
        &self,
        user: &RemoteUser,
        date: NaiveDate,
        accounts: &[AccountEntry],
    ) -> Result<usize, SyncError> {
        let mut state = self.lock()?;
        let fail_after = state.fail_after_accounts.take();
        let mut tables = state.tables.clone();

        let existing = tables
            .daily_records
            .iter()
            .find(|r| r.user_id == user.id && r.record_date == date)
            .map(|r| r.id);

        let record_id = match existing {
            Some(id) => {
                let removed: Vec<u64> = tables
                    .accounts
                    .iter()
                    .filter(|a| a.daily_record_id == id)
                    .map(|a| a.id)
                    .collect();
                tables.accounts.retain(|a| a.daily_record_id != id);
                tables
                    .fixed_deposits
                    .retain(|fd| !removed.contains(&fd.account_id));
                id
            }
            None => {
                let id = tables.allocate();
                tables.daily_records.push(DailyRecordRow {
                    id,
                    user_id: user.id.clone(),
                    record_date: date,
                });
                id
            }
        };

        for (inserted, entry) in accounts.iter().enumerate() {
            if fail_after == Some(inserted) {
                return Err(SyncError::Transport(format!(
                    "connection reset after {inserted} accounts"
                )));
            }
            let account_id = tables.allocate();
            tables.accounts.push(AccountRow {
                id: account_id,
                daily_record_id: record_id,
                holder_name: entry.holder_name.clone(),
                bank_name: entry.bank_name.clone(),
                account_number: entry.account_number.clone(),
                balance: entry.balance,
            });
            for fd in &entry.fds {
                let id = tables.allocate();
                tables.fixed_deposits.push(FixedDepositRow {
                    id,
                    account_id,
                    principal: fd.principal,
                    maturity_date: maturity_value(&fd.maturity_date).map(str::to_string),
                });
            }
        }

        state.tables = tables;
        Ok(accounts.len())
    }
}
