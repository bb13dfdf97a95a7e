use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::credentials::SecretSource;
use crate::format::DigitGrouping;
use crate::models::{BankDefinition, Id};
use crate::reconcile::AmbiguityPolicy;
use crate::registry::AccountRegistry;
use crate::sync::{RemoteCredentials, ReplaceMode, SupabaseBackend, DEFAULT_RPC_FUNCTION};

fn default_currency_symbol() -> String {
    "₹".to_string()
}

fn default_rpc_function() -> String {
    DEFAULT_RPC_FUNCTION.to_string()
}

/// Display/output formatting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Symbol prefixed to rendered amounts.
    pub currency_symbol: String,

    /// Digit grouping for rendered amounts.
    pub grouping: DigitGrouping,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            currency_symbol: default_currency_symbol(),
            grouping: DigitGrouping::default(),
        }
    }
}

/// Reconciliation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// What to do when a raw account's last four characters match more than
    /// one configured account of the same bank.
    pub on_ambiguous: AmbiguityPolicy,
}

/// Remote balance tracker settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    pub service_key: SecretSource,
    pub email: String,
    pub password: SecretSource,
    #[serde(default)]
    pub mode: ReplaceMode,
    #[serde(default = "default_rpc_function")]
    pub rpc_function: String,
}

impl RemoteConfig {
    pub fn credentials(&self) -> Result<RemoteCredentials> {
        let password = self
            .password
            .resolve()
            .context("Failed to resolve remote password")?;
        Ok(RemoteCredentials {
            email: self.email.clone(),
            password,
        })
    }

    pub fn backend(&self) -> Result<SupabaseBackend> {
        let service_key = self
            .service_key
            .resolve()
            .context("Failed to resolve remote service key")?;
        Ok(SupabaseBackend::new(&self.url, service_key)
            .with_mode(self.mode)
            .with_rpc_function(&self.rpc_function))
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    /// Display/output formatting settings.
    pub display: DisplayConfig,

    /// Reconciliation settings.
    pub reconcile: ReconcileConfig,

    /// Banks to process, in run order.
    pub banks: Vec<BankDefinition>,

    /// Remote tracker. Sync is unavailable when absent.
    pub remote: Option<RemoteConfig>,
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Check bank ids and configured account numbers.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for bank in &self.banks {
            if !Id::is_path_safe(bank.id.as_str()) {
                anyhow::bail!("Bank id {:?} is not a valid path segment", bank.id.as_str());
            }
            if !ids.insert(&bank.id) {
                anyhow::bail!("Duplicate bank id: {}", bank.id);
            }

            let mut numbers = HashSet::new();
            for account in &bank.accounts {
                if account.account_number.trim().is_empty() {
                    anyhow::bail!("Bank {} has an account with an empty number", bank.id);
                }
                if !numbers.insert(account.account_number.as_str()) {
                    anyhow::bail!(
                        "Bank {} lists account {} more than once",
                        bank.id,
                        account.account_number
                    );
                }
            }
        }

        let registry = AccountRegistry::from_banks(&self.banks);
        for bank in &self.banks {
            for (key, count) in registry.ambiguous_keys(&bank.id) {
                tracing::warn!(
                    bank = %bank.id,
                    key = %key,
                    accounts = count,
                    "Configured accounts share their last four digits"
                );
            }
        }

        Ok(())
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The config file this was loaded from (or would have been).
    pub config_path: PathBuf,

    /// The resolved data directory path.
    pub data_dir: PathBuf,

    pub display: DisplayConfig,
    pub reconcile: ReconcileConfig,
    pub banks: Vec<BankDefinition>,
    pub remote: Option<RemoteConfig>,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./bankroll.toml` if it exists in current directory
/// 2. `~/.local/share/bankroll/bankroll.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("bankroll.toml");
    if local_config.exists() {
        return local_config;
    }

    // XDG data directory fallback
    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("bankroll").join("bankroll.toml");
    }

    // Final fallback to local
    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// The data directory is resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        Ok(Self::from_config(config, config_dir, config_path.clone()))
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// If the config file doesn't exist, uses the config file's intended
    /// parent directory as the data directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            // Resolve the config path relative to current directory
            let config_path = if config_path.is_relative() {
                std::env::current_dir()
                    .context("Failed to get current directory")?
                    .join(config_path)
            } else {
                config_path.to_path_buf()
            };

            let config_dir = config_path
                .parent()
                .context("Config path has no parent directory")?
                .to_path_buf();

            Ok(Self::from_config(Config::default(), &config_dir, config_path))
        }
    }

    fn from_config(config: Config, config_dir: &Path, config_path: PathBuf) -> Self {
        Self {
            data_dir: config.resolve_data_dir(config_dir),
            config_path,
            display: config.display,
            reconcile: config.reconcile,
            banks: config.banks,
            remote: config.remote,
        }
    }

    pub fn bank(&self, id: &Id) -> Option<&BankDefinition> {
        self.banks.iter().find(|bank| &bank.id == id)
    }
}
