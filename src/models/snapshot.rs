use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::FixedDeposit;

/// A registry-matched account as stored in a snapshot and pushed remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountEntry {
    pub holder_name: String,
    pub bank_name: String,
    /// Full account number taken from the registry.
    pub account_number: String,
    pub balance: u64,
    #[serde(default)]
    pub fds: Vec<FixedDeposit>,
}

impl AccountEntry {
    pub fn fd_total(&self) -> u64 {
        self.fds.iter().map(|fd| fd.principal).sum()
    }
}

/// Whether an upsert added a new entry or replaced an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
}

/// Sums over a snapshot, in whole currency units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotTotals {
    pub balance: u64,
    pub fd: u64,
    pub combined: u64,
}

/// All tracked accounts for one calendar day.
///
/// Entries are ordered by first insertion and unique by `account_number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SnapshotFile")]
pub struct DailySnapshot {
    pub date: NaiveDate,
    accounts: Vec<AccountEntry>,
}

/// On-disk shape. Hand-edited files may repeat an account number; loading
/// folds repeats into the first position with the last value.
#[derive(Deserialize)]
struct SnapshotFile {
    date: NaiveDate,
    #[serde(default)]
    accounts: Vec<AccountEntry>,
}

impl From<SnapshotFile> for DailySnapshot {
    fn from(file: SnapshotFile) -> Self {
        let mut snapshot = DailySnapshot::new(file.date);
        for entry in file.accounts {
            snapshot.upsert(entry);
        }
        snapshot
    }
}

impl DailySnapshot {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            accounts: Vec::new(),
        }
    }

    pub fn accounts(&self) -> &[AccountEntry] {
        &self.accounts
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn get(&self, account_number: &str) -> Option<&AccountEntry> {
        self.accounts
            .iter()
            .find(|entry| entry.account_number == account_number)
    }

    /// Replace the entry with the same account number in place, or append.
    pub fn upsert(&mut self, entry: AccountEntry) -> Upsert {
        match self
            .accounts
            .iter_mut()
            .find(|existing| existing.account_number == entry.account_number)
        {
            Some(existing) => {
                *existing = entry;
                Upsert::Replaced
            }
            None => {
                self.accounts.push(entry);
                Upsert::Inserted
            }
        }
    }

    pub fn totals(&self) -> SnapshotTotals {
        let balance = self.accounts.iter().map(|a| a.balance).sum();
        let fd = self.accounts.iter().map(AccountEntry::fd_total).sum();
        SnapshotTotals {
            balance,
            fd,
            combined: balance + fd,
        }
    }

    /// FDs whose maturity date falls strictly before the snapshot date.
    /// Unparsed maturity dates never count as matured.
    pub fn matured_fds(&self) -> Vec<(&AccountEntry, &FixedDeposit)> {
        self.accounts
            .iter()
            .flat_map(|entry| entry.fds.iter().map(move |fd| (entry, fd)))
            .filter(|(_, fd)| {
                NaiveDate::parse_from_str(&fd.maturity_date, "%Y-%m-%d")
                    .map(|maturity| maturity < self.date)
                    .unwrap_or(false)
            })
            .collect()
    }
}
