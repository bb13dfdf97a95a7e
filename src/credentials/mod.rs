//! Secret resolution for bank logins and the remote backend.
//!
//! Secrets in `bankroll.toml` can be written inline, pulled from an
//! environment variable, or read from a password-store entry:
//!
//! ```toml
//! password = "hunter2"
//! password = { env = "HDFC_PASSWORD" }
//! password = { pass = "banks/hdfc", field = "login-password" }
//! ```
//!
//! Nothing is resolved at config load time; callers resolve right before a
//! secret is needed so a missing `pass` entry only affects that one bank.

mod pass;

use std::fmt;

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;

/// Where to find a secret value.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SecretSource {
    Inline(String),
    Env {
        env: String,
    },
    Pass {
        pass: String,
        #[serde(default)]
        field: Option<String>,
    },
}

impl SecretSource {
    pub fn inline(value: impl Into<String>) -> Self {
        Self::Inline(value.into())
    }

    /// Resolve the secret value.
    pub fn resolve(&self) -> Result<SecretString> {
        match self {
            SecretSource::Inline(value) => Ok(SecretString::from(value.clone())),
            SecretSource::Env { env } => std::env::var(env)
                .map(SecretString::from)
                .with_context(|| format!("Environment variable {env} is not set")),
            SecretSource::Pass { pass, field } => pass::read_field(pass, field.as_deref()),
        }
    }
}

impl Default for SecretSource {
    fn default() -> Self {
        Self::Inline(String::new())
    }
}

impl fmt::Debug for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretSource::Inline(_) => f.write_str("Inline([REDACTED])"),
            SecretSource::Env { env } => f.debug_struct("Env").field("env", env).finish(),
            SecretSource::Pass { pass, field } => f
                .debug_struct("Pass")
                .field("pass", pass)
                .field("field", field)
                .finish(),
        }
    }
}
