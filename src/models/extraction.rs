use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::normalize::parse_amount;

/// Kind of account as reported by a bank portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountKind {
    Savings,
    Current,
    TermDeposit,
    Other(String),
}

impl From<String> for AccountKind {
    fn from(value: String) -> Self {
        let normalized: String = value
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "savings" => AccountKind::Savings,
            "current" => AccountKind::Current,
            "termdeposit" => AccountKind::TermDeposit,
            _ => AccountKind::Other(value),
        }
    }
}

impl From<AccountKind> for String {
    fn from(value: AccountKind) -> Self {
        value.to_string()
    }
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKind::Savings => f.write_str("Savings"),
            AccountKind::Current => f.write_str("Current"),
            AccountKind::TermDeposit => f.write_str("Term Deposit"),
            AccountKind::Other(name) => f.write_str(name),
        }
    }
}

/// A fixed deposit: principal in whole currency units and an ISO maturity
/// date, or `""` when the adapter could not resolve it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedDeposit {
    #[serde(deserialize_with = "deserialize_amount")]
    pub principal: u64,
    #[serde(default)]
    pub maturity_date: String,
}

impl FixedDeposit {
    pub fn new(principal: u64, maturity_date: impl Into<String>) -> Self {
        Self {
            principal,
            maturity_date: maturity_date.into(),
        }
    }
}

/// One account as scraped from a portal. The account number may be masked
/// or partial (`"**1234"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAccount {
    #[serde(rename = "type")]
    pub kind: AccountKind,
    #[serde(default)]
    pub account_number: String,
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub balance: u64,
    #[serde(default)]
    pub fds: Vec<FixedDeposit>,
}

impl RawAccount {
    pub fn new(kind: AccountKind, account_number: impl Into<String>, balance: u64) -> Self {
        Self {
            kind,
            account_number: account_number.into(),
            balance,
            fds: Vec::new(),
        }
    }

    pub fn with_fd(mut self, fd: FixedDeposit) -> Self {
        self.fds.push(fd);
        self
    }
}

/// Everything one adapter run reported for one bank login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawExtraction {
    #[serde(default)]
    pub accounts: Vec<RawAccount>,
}

impl RawExtraction {
    pub fn new(accounts: Vec<RawAccount>) -> Self {
        Self { accounts }
    }

    /// All FDs across every raw account, in report order.
    pub fn fd_pool(&self) -> Vec<FixedDeposit> {
        self.accounts
            .iter()
            .flat_map(|account| account.fds.iter().cloned())
            .collect()
    }
}

/// Accepts a whole number, a float (truncated) or a locale-formatted string
/// such as `"₹4,90,793.29"`. Negative numbers are rejected.
fn deserialize_amount<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct AmountVisitor;

    impl<'de> Visitor<'de> for AmountVisitor {
        type Value = u64;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-negative amount as a number or string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<u64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<u64, E> {
            u64::try_from(v).map_err(|_| E::custom(format!("negative amount: {v}")))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<u64, E> {
            if v.is_finite() && v >= 0.0 {
                Ok(v.trunc() as u64)
            } else {
                Err(E::custom(format!("invalid amount: {v}")))
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<u64, E> {
            Ok(parse_amount(v))
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}
