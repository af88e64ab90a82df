//! Checksum utilities for type identity and exported documents

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// SHA256 checksum, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute checksum from raw bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(format!("{:x}", hash))
    }

    /// Identity hash of a named type: the namespace and the bare name
    /// concatenated, so equal names in different packages never collide.
    pub fn of_type(package: &str, name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(package.as_bytes());
        hasher.update(name.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Compute checksum from a JSON value.
    ///
    /// Object keys of `serde_json::Value` are kept sorted, so equal documents
    /// always hash the same.
    pub fn from_json(value: &serde_json::Value) -> Self {
        let canonical = serde_json::to_string(value).unwrap_or_default();
        Self::from_bytes(canonical.as_bytes())
    }

    /// Get the hex string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Checksum {
    fn from(s: String) -> Self {
        Self(s)
    }
}
