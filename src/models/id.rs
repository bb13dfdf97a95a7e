use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error(
    "Invalid id {value:?}: ids must be a single path segment (no '/', '\\\\', NUL, '.' or '..')"
)]
pub struct IdError {
    value: String,
}

/// Identifier for a configured bank.
///
/// Bank ids name files under the data directory, so deserialization rejects
/// anything that is not a safe path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Id(String);

impl Id {
    /// Create an ID from an arbitrary string.
    /// Note: The string must be a valid path segment (no slashes).
    pub fn from_string(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Create an ID from an arbitrary string, validating that it is a safe path segment.
    pub fn from_string_checked(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        if Self::is_path_safe(&value) {
            Ok(Self(value))
        } else {
            Err(IdError { value })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the string is safe to use as a single path segment.
    pub fn is_path_safe(value: &str) -> bool {
        if value.is_empty() || value == "." || value == ".." {
            return false;
        }
        !value.chars().any(|c| c == '/' || c == '\\' || c == '\0')
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for Id {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_string_checked(value)
    }
}

impl From<Id> for String {
    fn from(value: Id) -> Self {
        value.0
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
