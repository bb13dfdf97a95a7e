//! Adapter that runs an external automation script.
//!
//! The script gets its login through the environment and writes its
//! extraction as JSON to the path in `OUTPUT_FILE`:
//!
//! | Variable        | Value                              |
//! |-----------------|------------------------------------|
//! | `BANK_USERNAME` | configured username                |
//! | `BANK_PASSWORD` | resolved password                  |
//! | `OUTPUT_FILE`   | fresh path in a private temp dir   |
//!
//! stdin/stdout/stderr are inherited so the script can ask the user for an
//! OTP or CAPTCHA in the same terminal.

use std::path::PathBuf;

use secrecy::ExposeSecret;
use tokio::process::Command;

use super::{read_extraction, AdapterError, BankAdapter, BankCredentials};
use crate::models::{Id, RawExtraction};

pub struct ScriptAdapter {
    bank_id: Id,
    command: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl ScriptAdapter {
    pub fn new(bank_id: Id, command: Vec<String>) -> Self {
        Self {
            bank_id,
            command,
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

#[async_trait::async_trait]
impl BankAdapter for ScriptAdapter {
    fn name(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or("script")
    }

    async fn extract(&self, credentials: &BankCredentials) -> Result<RawExtraction, AdapterError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(AdapterError::NotConfigured(self.bank_id.clone()));
        };

        let output_dir = tempfile::Builder::new()
            .prefix("bankroll-")
            .tempdir()
            .map_err(|source| AdapterError::Io {
                path: std::env::temp_dir(),
                source,
            })?;
        let output_file = output_dir.path().join(format!("{}.json", self.bank_id));

        let mut command = Command::new(program);
        command
            .args(args)
            .env("BANK_USERNAME", &credentials.username)
            .env("BANK_PASSWORD", credentials.password.expose_secret())
            .env("OUTPUT_FILE", &output_file)
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        tracing::info!(bank = %self.bank_id, program = %program, "Running adapter script");
        let status = command
            .status()
            .await
            .map_err(|source| AdapterError::Launch {
                command: self.command.join(" "),
                source,
            })?;

        if !status.success() {
            return Err(AdapterError::Exited { status });
        }

        read_extraction(&output_file).await
    }
}
