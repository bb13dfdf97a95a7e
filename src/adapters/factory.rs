use std::path::PathBuf;

use super::{AdapterError, BankAdapter, FileAdapter, ScriptAdapter};
use crate::models::{AdapterSpec, BankDefinition};

pub trait AdapterFactory: Send + Sync {
    fn create(&self, bank: &BankDefinition) -> Result<Box<dyn BankAdapter>, AdapterError>;
}

/// Builds adapters from each bank's `adapter` config. Relative paths are
/// resolved against the data directory.
#[derive(Debug, Clone)]
pub struct DefaultAdapterFactory {
    data_dir: PathBuf,
}

impl DefaultAdapterFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn resolve(&self, path: &std::path::Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }
}

impl AdapterFactory for DefaultAdapterFactory {
    fn create(&self, bank: &BankDefinition) -> Result<Box<dyn BankAdapter>, AdapterError> {
        match &bank.adapter {
            Some(AdapterSpec::Script {
                command,
                working_dir,
            }) => {
                let mut adapter = ScriptAdapter::new(bank.id.clone(), command.clone());
                if let Some(dir) = working_dir {
                    adapter = adapter.with_working_dir(self.resolve(dir));
                }
                Ok(Box::new(adapter))
            }
            Some(AdapterSpec::File { path }) => {
                let path = match path {
                    Some(path) => self.resolve(path),
                    None => self
                        .data_dir
                        .join("extractions")
                        .join(format!("{}.json", bank.id)),
                };
                Ok(Box::new(FileAdapter::new(path)))
            }
            None => Err(AdapterError::NotConfigured(bank.id.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_file_adapter_default_path() {
        let factory = DefaultAdapterFactory::new("/data");
        let bank = BankDefinition::new("pnb", "PNB", "Papaji")
            .with_adapter(AdapterSpec::File { path: None });
        let adapter = factory.create(&bank);
        assert!(adapter.is_ok());
    }

    #[test]
    fn test_missing_adapter_is_not_configured() {
        let factory = DefaultAdapterFactory::new("/data");
        let bank = BankDefinition::new("pnb", "PNB", "Papaji");
        assert!(matches!(
            factory.create(&bank),
            Err(AdapterError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_resolve_relative_paths() {
        let factory = DefaultAdapterFactory::new("/data");
        assert_eq!(
            factory.resolve(Path::new("extractions/x.json")),
            PathBuf::from("/data/extractions/x.json")
        );
        assert_eq!(factory.resolve(Path::new("/abs.json")), PathBuf::from("/abs.json"));
    }
}
