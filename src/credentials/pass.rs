//! Password-store (pass) secret backend.
//!
//! Entries are read with `pass show`. The first line is the password; the
//! remaining lines may carry extra fields in the format `field-name: value`.

use std::collections::HashMap;
use std::process::Command;

use anyhow::{Context, Result};
use secrecy::SecretString;

/// Read one field from a pass entry. `None` selects the first line.
pub(crate) fn read_field(path: &str, field: Option<&str>) -> Result<SecretString> {
    let entry = read_entry(path)?;
    let field = field.unwrap_or("password");

    entry
        .fields
        .get(field)
        .map(|v| SecretString::from(v.clone()))
        .with_context(|| format!("Field {field:?} not found in pass entry {path}"))
}

fn read_entry(path: &str) -> Result<PassEntry> {
    let output = Command::new("pass")
        .arg("show")
        .arg(path)
        .output()
        .context("Failed to run pass command")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("pass command failed: {}", stderr.trim());
    }

    let content = String::from_utf8(output.stdout).context("Invalid UTF-8 in pass output")?;

    Ok(PassEntry::parse(&content))
}

/// Parsed pass entry.
#[derive(Debug, Default)]
struct PassEntry {
    /// Field name -> value. The first line is stored as `password`.
    fields: HashMap<String, String>,
}

impl PassEntry {
    fn parse(content: &str) -> Self {
        let mut lines = content.lines();
        let mut fields = HashMap::new();

        if let Some(pw) = lines.next() {
            fields.insert("password".to_string(), pw.to_string());
        }

        for line in lines {
            if let Some((key, value)) = line.split_once(": ") {
                fields.insert(key.trim().to_string(), value.to_string());
            }
        }

        Self { fields }
    }
}
