//! Registry entry type.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One row of the registry, keyed by alias in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Absolute path of the real executable
    pub source: PathBuf,
    /// Absolute path of the link artifact (symlink or indirection script)
    pub link: PathBuf,
    /// User who added the entry; may be empty
    pub owner: String,
    /// Lowercase hex SHA-256 of `source` at add time
    pub fingerprint: String,
    /// Whether `source` still exists and matches `fingerprint`
    pub available: bool,
    /// When the entry was added (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,
}

impl Entry {
    /// Build a freshly added entry. New entries start out available.
    pub fn new(
        source: impl Into<PathBuf>,
        link: impl Into<PathBuf>,
        owner: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            link: link.into(),
            owner: owner.into(),
            fingerprint: fingerprint.into(),
            available: true,
            added_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    /// Whether this entry still describes the same add as `other`.
    ///
    /// Used by reconcile to avoid touching an entry that was replaced while
    /// its source was being hashed.
    pub fn same_origin(&self, other: &Entry) -> bool {
        self.source == other.source && self.fingerprint == other.fingerprint
    }
}
