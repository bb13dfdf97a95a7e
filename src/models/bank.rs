use std::path::PathBuf;

use serde::Deserialize;

use super::Id;
use crate::credentials::SecretSource;

/// An account the user tracks at one bank.
///
/// Identity for matching is the last four characters of `account_number`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConfiguredAccount {
    /// Full account number as it should appear in snapshots.
    pub account_number: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl ConfiguredAccount {
    pub fn new(account_number: impl Into<String>) -> Self {
        Self {
            account_number: account_number.into(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// How fixed deposits reported by a bank are attached to matched accounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FdAttribution {
    /// Every matched account gets the bank's whole FD pool. Only accurate
    /// when a bank has a single matched account.
    #[default]
    Pooled,
    /// Each matched account keeps the FDs its raw account reported.
    PerAccount,
}

/// How a bank's raw extraction is obtained.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdapterSpec {
    /// Run an automation script that writes its extraction to `OUTPUT_FILE`.
    Script {
        command: Vec<String>,
        #[serde(default)]
        working_dir: Option<PathBuf>,
    },
    /// Read an extraction produced out of band. Relative paths resolve
    /// against the data directory; the default is `extractions/{bank id}.json`.
    File {
        #[serde(default)]
        path: Option<PathBuf>,
    },
}

/// One bank login for one account holder.
#[derive(Debug, Clone, Deserialize)]
pub struct BankDefinition {
    pub id: Id,
    pub name: String,
    pub holder_name: String,
    /// Login handed to script adapters. File adapters don't need one.
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: SecretSource,
    #[serde(default)]
    pub fd_attribution: FdAttribution,
    #[serde(default)]
    pub adapter: Option<AdapterSpec>,
    #[serde(default)]
    pub accounts: Vec<ConfiguredAccount>,
}

impl BankDefinition {
    pub fn new(id: impl Into<Id>, name: impl Into<String>, holder_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            holder_name: holder_name.into(),
            username: String::new(),
            password: SecretSource::inline(""),
            fd_attribution: FdAttribution::default(),
            adapter: None,
            accounts: Vec::new(),
        }
    }

    pub fn with_account(mut self, account: ConfiguredAccount) -> Self {
        self.accounts.push(account);
        self
    }

    pub fn with_fd_attribution(mut self, attribution: FdAttribution) -> Self {
        self.fd_attribution = attribution;
        self
    }

    pub fn with_adapter(mut self, adapter: AdapterSpec) -> Self {
        self.adapter = Some(adapter);
        self
    }

    pub fn with_login(mut self, username: impl Into<String>, password: SecretSource) -> Self {
        self.username = username.into();
        self.password = password;
        self
    }
}
