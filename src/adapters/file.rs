use std::path::{Path, PathBuf};

use super::{read_extraction, AdapterError, BankAdapter, BankCredentials};
use crate::models::RawExtraction;

/// Reads an extraction that some other process already wrote. Credentials
/// are ignored, so this runs headless.
pub struct FileAdapter {
    path: PathBuf,
}

impl FileAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl BankAdapter for FileAdapter {
    fn name(&self) -> &str {
        "file"
    }

    fn needs_credentials(&self) -> bool {
        false
    }

    async fn extract(&self, _credentials: &BankCredentials) -> Result<RawExtraction, AdapterError> {
        read_extraction(&self.path).await
    }
}
