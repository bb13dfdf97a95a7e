//! The boundary to per-bank automation.
//!
//! An adapter logs into one bank portal and reports what it saw as a
//! [`RawExtraction`]. Everything bank-specific (navigation, OTP and CAPTCHA
//! prompts, scraping) lives behind this trait; the reconciliation core only
//! ever sees structured data or an [`AdapterError`].

mod factory;
mod file;
mod script;

pub use factory::{AdapterFactory, DefaultAdapterFactory};
pub use file::FileAdapter;
pub use script::ScriptAdapter;

use std::path::{Path, PathBuf};

use secrecy::SecretString;

use crate::models::{Id, RawExtraction};

/// Login for one bank portal.
#[derive(Debug)]
pub struct BankCredentials {
    pub username: String,
    pub password: SecretString,
}

/// Why a bank produced no usable data this run.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("no adapter configured for bank {0}")]
    NotConfigured(Id),

    #[error("failed to resolve credentials: {0:#}")]
    Credentials(anyhow::Error),

    #[error("failed to launch adapter `{command}`: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("adapter exited with {status}")]
    Exited { status: std::process::ExitStatus },

    #[error("adapter produced no output at {}", path.display())]
    MissingOutput { path: PathBuf },

    #[error("adapter output {} is not a valid extraction: {source}", path.display())]
    InvalidOutput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read adapter output {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("adapter reported no accounts")]
    Empty,

    #[error("{0}")]
    Other(String),
}

/// Extracts raw account data from one bank.
///
/// Implementations may block on a human (one-time codes, CAPTCHA); the
/// pipeline calls adapters one at a time and never concurrently.
#[async_trait::async_trait]
pub trait BankAdapter: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Whether `extract` logs in. Adapters that return `false` receive an
    /// empty password and the bank's secret source is never resolved.
    fn needs_credentials(&self) -> bool {
        true
    }

    async fn extract(&self, credentials: &BankCredentials) -> Result<RawExtraction, AdapterError>;
}

/// Read an adapter's output document (`{"accounts": [...]}`).
pub async fn read_extraction(path: &Path) -> Result<RawExtraction, AdapterError> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AdapterError::MissingOutput {
                path: path.to_path_buf(),
            })
        }
        Err(source) => {
            return Err(AdapterError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&content).map_err(|source| AdapterError::InvalidOutput {
        path: path.to_path_buf(),
        source,
    })
}
