//! Lookup of configured accounts by the last four characters of an account
//! number, scoped to a single bank.

use std::collections::HashMap;

use crate::models::{BankDefinition, ConfiguredAccount, Id};

/// Number of trailing characters used as the matching key.
pub const MATCH_KEY_LEN: usize = 4;

/// Outcome of a registry lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryMatch<'a> {
    Found(&'a ConfiguredAccount),
    /// More than one configured account in the bank shares the key.
    /// Candidates are in configuration order.
    Ambiguous(Vec<&'a ConfiguredAccount>),
    NotFound,
}

/// The last `MATCH_KEY_LEN` characters of an account number (or all of it
/// when shorter), ignoring surrounding whitespace.
pub fn match_key(account_number: &str) -> &str {
    let trimmed = account_number.trim();
    let start = trimmed
        .char_indices()
        .rev()
        .nth(MATCH_KEY_LEN - 1)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    &trimmed[start..]
}

/// In-memory view of every bank's configured accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountRegistry {
    banks: HashMap<Id, Vec<ConfiguredAccount>>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_banks<'a>(banks: impl IntoIterator<Item = &'a BankDefinition>) -> Self {
        let mut registry = Self::new();
        for bank in banks {
            registry.insert_bank(bank);
        }
        registry
    }

    pub fn insert_bank(&mut self, bank: &BankDefinition) {
        self.banks.insert(bank.id.clone(), bank.accounts.clone());
    }

    pub fn accounts(&self, bank_id: &Id) -> &[ConfiguredAccount] {
        self.banks.get(bank_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Find the configured account in `bank_id` whose key matches the key of
    /// `raw_account_number`. Accounts of other banks are never considered,
    /// and an empty raw number never matches.
    pub fn lookup(&self, bank_id: &Id, raw_account_number: &str) -> RegistryMatch<'_> {
        let key = match_key(raw_account_number);
        if key.is_empty() {
            return RegistryMatch::NotFound;
        }

        let mut candidates: Vec<&ConfiguredAccount> = self
            .accounts(bank_id)
            .iter()
            .filter(|account| match_key(&account.account_number) == key)
            .collect();

        match candidates.len() {
            0 => RegistryMatch::NotFound,
            1 => RegistryMatch::Found(candidates.remove(0)),
            _ => RegistryMatch::Ambiguous(candidates),
        }
    }

    /// Groups of configured accounts within a bank that share a key.
    pub fn ambiguous_keys(&self, bank_id: &Id) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for account in self.accounts(bank_id) {
            let key = match_key(&account.account_number);
            match counts.iter_mut().find(|(k, _)| k == key) {
                Some((_, count)) => *count += 1,
                None => counts.push((key.to_string(), 1)),
            }
        }
        counts.retain(|(_, count)| *count > 1);
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AccountRegistry {
        let hdfc = BankDefinition::new("hdfc", "HDFC", "Mummyji")
            .with_account(ConfiguredAccount::new("50100000001234").with_label("Savings"))
            .with_account(ConfiguredAccount::new("50200000005678"));
        let sbi = BankDefinition::new("sbi", "SBI", "Papaji")
            .with_account(ConfiguredAccount::new("30000000001234"));
        AccountRegistry::from_banks([&hdfc, &sbi])
    }

    #[test]
    fn test_match_key() {
        assert_eq!(match_key("50100000001234"), "1234");
        assert_eq!(match_key("**1234"), "1234");
        assert_eq!(match_key(" 1234 "), "1234");
        assert_eq!(match_key("34"), "34");
        assert_eq!(match_key(""), "");
        assert_eq!(match_key("₹₹₹1234"), "1234");
    }

    #[test]
    fn test_lookup_is_scoped_to_bank() {
        let registry = registry();

        match registry.lookup(&Id::from("hdfc"), "**1234") {
            RegistryMatch::Found(account) => assert_eq!(account.account_number, "50100000001234"),
            other => panic!("unexpected match: {other:?}"),
        }
        match registry.lookup(&Id::from("sbi"), "XXXX1234") {
            RegistryMatch::Found(account) => assert_eq!(account.account_number, "30000000001234"),
            other => panic!("unexpected match: {other:?}"),
        }
        assert_eq!(
            registry.lookup(&Id::from("sbi"), "5678"),
            RegistryMatch::NotFound
        );
        assert_eq!(
            registry.lookup(&Id::from("unknown"), "1234"),
            RegistryMatch::NotFound
        );
    }

    #[test]
    fn test_empty_raw_number_never_matches() {
        let registry = registry();
        assert_eq!(registry.lookup(&Id::from("hdfc"), ""), RegistryMatch::NotFound);
        assert_eq!(registry.lookup(&Id::from("hdfc"), "   "), RegistryMatch::NotFound);
    }

    #[test]
    fn test_ambiguous_lookup_lists_candidates_in_order() {
        let bank = BankDefinition::new("pnb", "PNB", "Papaji")
            .with_account(ConfiguredAccount::new("1110009999"))
            .with_account(ConfiguredAccount::new("2220009999"))
            .with_account(ConfiguredAccount::new("3330001111"));
        let registry = AccountRegistry::from_banks([&bank]);

        match registry.lookup(&bank.id, "9999") {
            RegistryMatch::Ambiguous(candidates) => {
                let numbers: Vec<_> = candidates.iter().map(|a| a.account_number.as_str()).collect();
                assert_eq!(numbers, vec!["1110009999", "2220009999"]);
            }
            other => panic!("unexpected match: {other:?}"),
        }
        assert_eq!(registry.ambiguous_keys(&bank.id), vec![("9999".to_string(), 2)]);
    }
}
