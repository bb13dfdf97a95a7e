//! Merging one bank's raw extraction into the day's snapshot.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::{
    AccountEntry, BankDefinition, DailySnapshot, FdAttribution, FixedDeposit, Id, RawAccount,
    RawExtraction, Upsert,
};
use crate::normalize::normalize_maturity_date;
use crate::registry::{match_key, AccountRegistry, RegistryMatch};

/// What to do when several configured accounts share a raw account's key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Use the first candidate in configuration order and log a warning.
    #[default]
    FirstMatch,
    /// Drop the raw account and log a warning.
    Skip,
}

/// One entry written into the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledAccount {
    pub label: String,
    pub account_number: String,
    pub balance: u64,
    pub fd_count: usize,
    pub upsert: Upsert,
}

/// A raw account whose key matched more than one configured account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousMatch {
    pub raw_account_number: String,
    pub candidates: Vec<String>,
    /// The configured number used, if the policy picked one.
    pub chosen: Option<String>,
}

/// Summary of one bank's contribution to the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub bank_id: Id,
    pub reconciled: Vec<ReconciledAccount>,
    /// Raw account numbers with no configured account.
    pub unmatched: Vec<String>,
    pub ambiguous: Vec<AmbiguousMatch>,
}

impl ReconcileReport {
    fn new(bank_id: Id) -> Self {
        Self {
            bank_id,
            reconciled: Vec::new(),
            unmatched: Vec::new(),
            ambiguous: Vec::new(),
        }
    }
}

/// Matches raw extractions against the registry and upserts canonical
/// entries into a snapshot.
#[derive(Debug, Clone)]
pub struct Reconciler {
    registry: AccountRegistry,
    ambiguity: AmbiguityPolicy,
}

impl Reconciler {
    pub fn new(registry: AccountRegistry) -> Self {
        Self {
            registry,
            ambiguity: AmbiguityPolicy::default(),
        }
    }

    pub fn with_ambiguity_policy(mut self, policy: AmbiguityPolicy) -> Self {
        self.ambiguity = policy;
        self
    }

    pub fn registry(&self) -> &AccountRegistry {
        &self.registry
    }

    /// Merge `extraction` for `bank` into `snapshot`.
    ///
    /// Unmatched raw accounts are dropped. With pooled FD attribution every
    /// matched account receives all FDs reported anywhere in the extraction.
    pub fn reconcile(
        &self,
        bank: &BankDefinition,
        extraction: &RawExtraction,
        snapshot: &mut DailySnapshot,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::new(bank.id.clone());
        let pool = normalize_fds(&extraction.fd_pool());

        for raw in &extraction.accounts {
            let Some((configured_number, label)) = self.resolve(bank, raw, &mut report) else {
                continue;
            };

            let fds = match bank.fd_attribution {
                FdAttribution::Pooled => pool.clone(),
                FdAttribution::PerAccount => normalize_fds(&raw.fds),
            };

            let entry = AccountEntry {
                holder_name: bank.holder_name.clone(),
                bank_name: bank.name.clone(),
                account_number: configured_number,
                balance: raw.balance,
                fds,
            };

            let reconciled = ReconciledAccount {
                label,
                account_number: entry.account_number.clone(),
                balance: entry.balance,
                fd_count: entry.fds.len(),
                upsert: Upsert::Inserted,
            };
            let upsert = snapshot.upsert(entry);
            report.reconciled.push(ReconciledAccount {
                upsert,
                ..reconciled
            });
        }

        report
    }

    /// Returns the configured account number and display label for a raw
    /// account, recording misses in `report`.
    fn resolve(
        &self,
        bank: &BankDefinition,
        raw: &RawAccount,
        report: &mut ReconcileReport,
    ) -> Option<(String, String)> {
        let configured = match self.registry.lookup(&bank.id, &raw.account_number) {
            RegistryMatch::Found(account) => account,
            RegistryMatch::NotFound => {
                info!(
                    bank = %bank.id,
                    account = %masked(&raw.account_number),
                    kind = %raw.kind,
                    "Extracted account is not configured, skipping"
                );
                report.unmatched.push(raw.account_number.clone());
                return None;
            }
            RegistryMatch::Ambiguous(candidates) => {
                let numbers: Vec<String> = candidates
                    .iter()
                    .map(|a| a.account_number.clone())
                    .collect();
                let chosen = match self.ambiguity {
                    AmbiguityPolicy::FirstMatch => candidates.first().copied(),
                    AmbiguityPolicy::Skip => None,
                };
                warn!(
                    bank = %bank.id,
                    account = %masked(&raw.account_number),
                    candidates = numbers.len(),
                    chosen = %chosen
                        .map(|a| masked(&a.account_number))
                        .unwrap_or_else(|| "none".to_string()),
                    "Extracted account matches several configured accounts"
                );
                report.ambiguous.push(AmbiguousMatch {
                    raw_account_number: raw.account_number.clone(),
                    candidates: numbers,
                    chosen: chosen.map(|a| a.account_number.clone()),
                });
                chosen?
            }
        };

        let label = configured
            .label
            .clone()
            .unwrap_or_else(|| format!("{} {}", bank.holder_name, raw.kind));
        Some((configured.account_number.clone(), label))
    }
}

/// Account number as it may appear in logs.
fn masked(account_number: &str) -> String {
    format!("..{}", match_key(account_number))
}

fn normalize_fds(fds: &[FixedDeposit]) -> Vec<FixedDeposit> {
    fds.iter()
        .map(|fd| FixedDeposit::new(fd.principal, normalize_maturity_date(&fd.maturity_date)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountKind, ConfiguredAccount};
    use chrono::NaiveDate;

    fn today() -> DailySnapshot {
        DailySnapshot::new(NaiveDate::from_ymd_opt(2026, 3, 18).unwrap())
    }

    fn hdfc() -> BankDefinition {
        BankDefinition::new("hdfc", "HDFC", "Mummyji")
            .with_account(ConfiguredAccount::new("50100000001234").with_label("Mummyji Savings"))
    }

    #[test]
    fn test_single_account_end_to_end() {
        let bank = hdfc();
        let reconciler = Reconciler::new(AccountRegistry::from_banks([&bank]));
        let extraction = RawExtraction::new(vec![RawAccount::new(
            AccountKind::Savings,
            "**1234",
            490793,
        )
        .with_fd(FixedDeposit::new(100000, "2026-06-11"))]);

        let mut snapshot = today();
        let report = reconciler.reconcile(&bank, &extraction, &mut snapshot);

        assert_eq!(snapshot.len(), 1);
        let entry = &snapshot.accounts()[0];
        assert_eq!(entry.account_number, "50100000001234");
        assert_eq!(entry.holder_name, "Mummyji");
        assert_eq!(entry.bank_name, "HDFC");
        assert_eq!(entry.balance, 490793);
        assert_eq!(entry.fds, vec![FixedDeposit::new(100000, "2026-06-11")]);

        assert_eq!(report.reconciled.len(), 1);
        assert_eq!(report.reconciled[0].label, "Mummyji Savings");
        assert_eq!(report.reconciled[0].upsert, Upsert::Inserted);
    }

    #[test]
    fn test_unmatched_accounts_are_dropped() {
        let bank = hdfc();
        let reconciler = Reconciler::new(AccountRegistry::from_banks([&bank]));
        let extraction = RawExtraction::new(vec![
            RawAccount::new(AccountKind::Current, "**9999", 10),
            RawAccount::new(AccountKind::Savings, "", 20),
        ]);

        let mut snapshot = today();
        let report = reconciler.reconcile(&bank, &extraction, &mut snapshot);

        assert!(snapshot.is_empty());
        assert_eq!(report.unmatched, vec!["**9999".to_string(), String::new()]);
    }

    #[test]
    fn test_pooled_fds_attach_to_every_matched_account() {
        let bank = BankDefinition::new("pnb", "PNB", "Papaji")
            .with_account(ConfiguredAccount::new("0001000011111"))
            .with_account(ConfiguredAccount::new("0001000022222"));
        let reconciler = Reconciler::new(AccountRegistry::from_banks([&bank]));
        let extraction = RawExtraction::new(vec![
            RawAccount::new(AccountKind::Savings, "1111", 100)
                .with_fd(FixedDeposit::new(5000, "18/03/2027")),
            RawAccount::new(AccountKind::Current, "2222", 200)
                .with_fd(FixedDeposit::new(7000, "")),
        ]);

        let mut snapshot = today();
        let report = reconciler.reconcile(&bank, &extraction, &mut snapshot);

        let expected = vec![
            FixedDeposit::new(5000, "2027-03-18"),
            FixedDeposit::new(7000, ""),
        ];
        // The summary count is the stored count, pool included.
        assert_eq!(report.reconciled[0].fd_count, 2);
        assert_eq!(report.reconciled[1].fd_count, 2);
        assert_eq!(snapshot.accounts()[0].fds, expected);
        assert_eq!(snapshot.accounts()[1].fds, expected);
    }

    #[test]
    fn test_per_account_fds_keep_ownership() {
        let bank = BankDefinition::new("pnb", "PNB", "Papaji")
            .with_fd_attribution(FdAttribution::PerAccount)
            .with_account(ConfiguredAccount::new("0001000011111"))
            .with_account(ConfiguredAccount::new("0001000022222"));
        let reconciler = Reconciler::new(AccountRegistry::from_banks([&bank]));
        let extraction = RawExtraction::new(vec![
            RawAccount::new(AccountKind::Savings, "1111", 100)
                .with_fd(FixedDeposit::new(5000, "2027-03-18")),
            RawAccount::new(AccountKind::Current, "2222", 200),
        ]);

        let mut snapshot = today();
        reconciler.reconcile(&bank, &extraction, &mut snapshot);

        assert_eq!(snapshot.accounts()[0].fds.len(), 1);
        assert!(snapshot.accounts()[1].fds.is_empty());
    }

    #[test]
    fn test_default_label_uses_holder_and_kind() {
        let bank = BankDefinition::new("sbi", "SBI", "Om")
            .with_account(ConfiguredAccount::new("12345678901"));
        let reconciler = Reconciler::new(AccountRegistry::from_banks([&bank]));
        let extraction =
            RawExtraction::new(vec![RawAccount::new(AccountKind::Savings, "8901", 1)]);

        let mut snapshot = today();
        let report = reconciler.reconcile(&bank, &extraction, &mut snapshot);
        assert_eq!(report.reconciled[0].label, "Om Savings");
    }

    #[test]
    fn test_rerun_replaces_instead_of_duplicating() {
        let bank = hdfc();
        let reconciler = Reconciler::new(AccountRegistry::from_banks([&bank]));
        let mut snapshot = today();

        let first = RawExtraction::new(vec![RawAccount::new(AccountKind::Savings, "1234", 10)]);
        reconciler.reconcile(&bank, &first, &mut snapshot);

        let second = RawExtraction::new(vec![RawAccount::new(AccountKind::Savings, "1234", 99)]);
        let report = reconciler.reconcile(&bank, &second, &mut snapshot);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.accounts()[0].balance, 99);
        assert_eq!(report.reconciled[0].upsert, Upsert::Replaced);
    }

    #[test]
    fn test_masked_keeps_only_match_key() {
        assert_eq!(masked("1110009999"), "..9999");
        assert_eq!(masked("XXXXXXXXXX1234"), "..1234");
        assert_eq!(masked(""), "..");
    }

    #[test]
    fn test_ambiguity_policies() {
        let bank = BankDefinition::new("pnb", "PNB", "Papaji")
            .with_account(ConfiguredAccount::new("1110009999"))
            .with_account(ConfiguredAccount::new("2220009999"));
        let extraction =
            RawExtraction::new(vec![RawAccount::new(AccountKind::Savings, "9999", 42)]);

        let first_match = Reconciler::new(AccountRegistry::from_banks([&bank]));
        let mut snapshot = today();
        let report = first_match.reconcile(&bank, &extraction, &mut snapshot);
        assert_eq!(snapshot.accounts()[0].account_number, "1110009999");
        assert_eq!(report.ambiguous[0].chosen.as_deref(), Some("1110009999"));
        assert_eq!(report.ambiguous[0].candidates.len(), 2);

        let skip = Reconciler::new(AccountRegistry::from_banks([&bank]))
            .with_ambiguity_policy(AmbiguityPolicy::Skip);
        let mut snapshot = today();
        let report = skip.reconcile(&bank, &extraction, &mut snapshot);
        assert!(snapshot.is_empty());
        assert_eq!(report.ambiguous[0].chosen, None);
        assert!(report.reconciled.is_empty());
    }
}
