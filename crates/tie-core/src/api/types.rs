//! Result types returned by the LiteTie boundary operations.

use crate::platform::LinkKind;
use crate::registry::Entry;
use serde::Serialize;
use std::path::PathBuf;

/// Result of a successful [`LiteTie::add`](crate::LiteTie::add).
#[derive(Debug, Clone, Serialize)]
pub struct AddOutcome {
    pub alias: String,
    /// Absolute path of the linked executable
    pub source: PathBuf,
    /// Path of the artifact actually created
    pub link: PathBuf,
    pub kind: LinkKind,
    /// Whether something already at the link path was deleted first
    pub replaced: bool,
    /// The entry as stored in the registry
    pub entry: Entry,
}

/// What happened to one name passed to remove or clean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RemoveStatus {
    /// Link artifact deleted and entry dropped from the registry
    Removed,
    /// No entry with this name
    NotFound,
    /// The confirmation callback declined
    Skipped,
    /// The link artifact couldn't be deleted; the entry is kept
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveReport {
    pub alias: String,
    #[serde(flatten)]
    pub status: RemoveStatus,
}

impl RemoveReport {
    pub(crate) fn new(alias: impl Into<String>, status: RemoveStatus) -> Self {
        Self {
            alias: alias.into(),
            status,
        }
    }

    pub fn is_removed(&self) -> bool {
        self.status == RemoveStatus::Removed
    }
}
