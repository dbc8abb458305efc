//! Persisted alias registry.
//!
//! The registry document is a JSON object mapping alias to [`Entry`]. It is
//! loaded once into memory, mutated there, and rewritten in full after every
//! successful mutation. All access goes through one mutex owned by the store,
//! which serializes read-modify-write cycles within the process. Other
//! processes writing the same file are not coordinated with; the last writer
//! wins.

use super::atomic::{atomic_read_json, atomic_write_json};
use super::entry::Entry;
use crate::config::RegistryConfig;
use crate::error::{Result, TieError};
use crate::fingerprint::{compute_fingerprint, fingerprint_matches};
use crate::platform;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Raw registry document, kept undecoded so a malformed entry only fails the
/// operations that read it.
type Document = Map<String, Value>;

/// Outcome of [`RegistryStore::reconcile_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Number of entries whose availability was recomputed
    pub checked: usize,
    /// Aliases whose source exists and still matches its fingerprint
    pub available: Vec<String>,
    /// Aliases whose source is missing, a directory, unreadable, or modified
    pub unavailable: Vec<String>,
    /// Aliases whose `available` flag flipped during this pass
    pub changed: Vec<String>,
}

/// Registry of linked executables backed by a single JSON document.
///
/// The store starts out uninitialized; [`initialize`](Self::initialize) loads
/// the document (creating an empty one if absent). Every other operation
/// initializes on demand, so calling `initialize` first is optional.
#[derive(Debug)]
pub struct RegistryStore {
    /// Path to the registry JSON file
    path: PathBuf,
    /// In-memory document; `None` until loaded
    document: Mutex<Option<Document>>,
    /// Copy the previous document to `.bak` before each write
    keep_backup: bool,
}

impl RegistryStore {
    /// Create a store for the document at `path`. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            document: Mutex::new(None),
            keep_backup: RegistryConfig::KEEP_BACKUP,
        }
    }

    /// Keep a `.bak` copy of the previous document on every write.
    pub fn with_backup(mut self, enable: bool) -> Self {
        self.keep_backup = enable;
        self
    }

    /// Create a store for the registry document inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(RegistryConfig::FILE_NAME))
    }

    /// Path of the registry document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the document has been loaded into memory.
    pub fn is_loaded(&self) -> bool {
        self.document
            .lock()
            .map(|doc| doc.is_some())
            .unwrap_or(false)
    }

    /// Load the registry document, creating an empty one if it doesn't exist.
    ///
    /// Only the first successful call reads the file; later calls are no-ops
    /// for the lifetime of the store.
    ///
    /// # Errors
    ///
    /// - [`TieError::RegistryCorrupt`] if the file can't be read or isn't a JSON object
    /// - [`TieError::PersistFailure`] if the empty document can't be created
    pub fn initialize(&self) -> Result<()> {
        let mut guard = self.lock()?;
        Self::loaded(&self.path, &mut guard)?;
        Ok(())
    }

    /// Fingerprint `source` and record it under `alias`.
    ///
    /// An existing entry with the same alias is replaced. The lock is held
    /// across hashing and writing so two adds of one alias can't interleave.
    ///
    /// # Errors
    ///
    /// - [`TieError::HashFailure`] if `source` can't be read; nothing is written
    /// - [`TieError::PersistFailure`] if the document can't be saved; the
    ///   in-memory mapping keeps the new entry, so the on-disk state should be
    ///   treated as unknown
    pub fn add_entry(&self, alias: &str, source: &Path, link: &Path) -> Result<Entry> {
        let mut guard = self.lock()?;
        let doc = Self::loaded(&self.path, &mut guard)?;

        let fingerprint = compute_fingerprint(source)?;
        let entry = Entry::new(source, link, platform::current_owner(), fingerprint);

        if doc
            .insert(alias.to_string(), serde_json::to_value(&entry)?)
            .is_some()
        {
            debug!("Replacing registry entry '{}'", alias);
        }

        self.persist(doc)?;
        info!("Registered '{}' -> {}", alias, source.display());
        Ok(entry)
    }

    /// Delete the named entries. Aliases that aren't present are ignored.
    ///
    /// Returns the aliases that were actually removed. The document is only
    /// rewritten when at least one entry was removed.
    pub fn remove_entries<S: AsRef<str>>(&self, aliases: &[S]) -> Result<Vec<String>> {
        let mut guard = self.lock()?;
        let doc = Self::loaded(&self.path, &mut guard)?;

        let mut removed = Vec::new();
        for alias in aliases {
            let alias = alias.as_ref();
            if doc.remove(alias).is_some() {
                removed.push(alias.to_string());
            }
        }

        if removed.is_empty() {
            debug!("No registry entries matched {} alias(es)", aliases.len());
            return Ok(removed);
        }

        self.persist(doc)?;
        info!("Removed {} registry entr(ies)", removed.len());
        Ok(removed)
    }

    /// Snapshot of all entries, ordered by alias.
    ///
    /// # Errors
    ///
    /// [`TieError::ParseFailure`] if a stored value doesn't have the entry shape.
    pub fn get_entries(&self) -> Result<BTreeMap<String, Entry>> {
        let mut guard = self.lock()?;
        let doc = Self::loaded(&self.path, &mut guard)?;

        doc.iter()
            .map(|(alias, value)| decode_entry(alias, value).map(|entry| (alias.clone(), entry)))
            .collect()
    }

    /// Look up a single entry.
    pub fn get_entry(&self, alias: &str) -> Result<Option<Entry>> {
        let mut guard = self.lock()?;
        let doc = Self::loaded(&self.path, &mut guard)?;

        doc.get(alias)
            .map(|value| decode_entry(alias, value))
            .transpose()
    }

    /// Recompute `available` for every entry and save the document once.
    ///
    /// Sources are hashed without holding the lock. Verdicts are applied only
    /// to entries that still carry the same source and fingerprint, so an
    /// entry re-added or removed in the meantime is left as it is. The stored
    /// fingerprint is never changed.
    pub fn reconcile_all(&self) -> Result<ReconcileReport> {
        let snapshot = self.get_entries()?;

        let verdicts: Vec<(String, Entry, bool)> = snapshot
            .into_iter()
            .map(|(alias, entry)| {
                let available = source_available(&alias, &entry);
                (alias, entry, available)
            })
            .collect();

        let mut guard = self.lock()?;
        let doc = Self::loaded(&self.path, &mut guard)?;
        let mut report = ReconcileReport::default();

        for (alias, seen, available) in verdicts {
            let Some(value) = doc.get_mut(&alias) else {
                debug!("Entry '{}' removed during reconcile, skipping", alias);
                continue;
            };
            let current = decode_entry(&alias, value)?;
            if !current.same_origin(&seen) {
                debug!("Entry '{}' replaced during reconcile, skipping", alias);
                continue;
            }

            if let Some(obj) = value.as_object_mut() {
                obj.insert("available".to_string(), Value::Bool(available));
            }

            report.checked += 1;
            if current.available != available {
                report.changed.push(alias.clone());
            }
            if available {
                report.available.push(alias);
            } else {
                report.unavailable.push(alias);
            }
        }

        self.persist(doc)?;
        info!(
            "Reconciled {} entr(ies): {} available, {} unavailable, {} changed",
            report.checked,
            report.available.len(),
            report.unavailable.len(),
            report.changed.len()
        );
        Ok(report)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Document>>> {
        self.document
            .lock()
            .map_err(|_| TieError::Other("Failed to acquire registry lock".to_string()))
    }

    /// Return the loaded document, reading it on first use.
    fn loaded<'a>(path: &Path, slot: &'a mut Option<Document>) -> Result<&'a mut Document> {
        if slot.is_none() {
            *slot = Some(load_document(path)?);
        }
        slot.as_mut()
            .ok_or_else(|| TieError::Other("Registry document not loaded".to_string()))
    }

    fn persist(&self, doc: &Document) -> Result<()> {
        atomic_write_json(&self.path, doc, self.keep_backup)
            .map_err(|e| TieError::persist(e, &self.path))
    }
}

fn load_document(path: &Path) -> Result<Document> {
    if !path.exists() {
        info!("Creating empty registry at {}", path.display());
        atomic_write_json(path, &Document::new(), false).map_err(|e| TieError::persist(e, path))?;
    }

    let corrupt = |message: String| TieError::RegistryCorrupt {
        path: path.to_path_buf(),
        message,
    };

    let value: Value = atomic_read_json(path)
        .map_err(|e| corrupt(e.to_string()))?
        .ok_or_else(|| corrupt("document disappeared while loading".to_string()))?;

    match value {
        Value::Object(doc) => {
            debug!("Loaded {} registry entr(ies) from {}", doc.len(), path.display());
            Ok(doc)
        }
        other => Err(corrupt(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
    }
}

fn decode_entry(alias: &str, value: &Value) -> Result<Entry> {
    Entry::deserialize(value).map_err(|e| TieError::ParseFailure {
        alias: alias.to_string(),
        message: e.to_string(),
    })
}

/// Whether the entry's source exists, is a regular file, and still has the
/// recorded fingerprint.
fn source_available(alias: &str, entry: &Entry) -> bool {
    match std::fs::metadata(&entry.source) {
        Ok(meta) if meta.is_file() => {
            match fingerprint_matches(&entry.source, &entry.fingerprint) {
                Ok(matches) => {
                    if !matches {
                        debug!("Source of '{}' changed since it was added", alias);
                    }
                    matches
                }
                Err(e) => {
                    warn!("Could not fingerprint source of '{}': {}", alias, e);
                    false
                }
            }
        }
        Ok(_) => {
            debug!("Source of '{}' is not a regular file", alias);
            false
        }
        Err(e) => {
            debug!("Source of '{}' is missing: {}", alias, e);
            false
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, RegistryStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = RegistryStore::in_dir(temp_dir.path());
        (temp_dir, store)
    }

    fn write_source(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_initialize_creates_empty_document() {
        let (temp, store) = setup_store();
        assert!(!store.is_loaded());

        store.initialize().unwrap();

        assert!(store.is_loaded());
        let on_disk: Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk, serde_json::json!({}));
        assert!(temp.path().join(RegistryConfig::FILE_NAME).exists());
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let (temp, store) = setup_store();
        let source = write_source(temp.path(), "tool", b"v1");
        store.initialize().unwrap();
        store
            .add_entry("tool", &source, &temp.path().join("tool-link"))
            .unwrap();

        // A later initialize must not reload and lose in-memory state
        std::fs::write(store.path(), "{}").unwrap();
        store.initialize().unwrap();
        assert!(store.get_entry("tool").unwrap().is_some());
    }

    #[test]
    fn test_initialize_rejects_corrupt_document() {
        let (_temp, store) = setup_store();
        std::fs::write(store.path(), "{ not json").unwrap();

        let err = store.initialize().unwrap_err();
        assert!(matches!(err, TieError::RegistryCorrupt { .. }));
        assert!(!store.is_loaded());
    }

    #[test]
    fn test_initialize_rejects_non_object_document() {
        let (_temp, store) = setup_store();
        std::fs::write(store.path(), "[1, 2, 3]").unwrap();

        let err = store.initialize().unwrap_err();
        assert!(matches!(err, TieError::RegistryCorrupt { .. }));
    }

    #[test]
    fn test_add_entry_records_fingerprint() {
        let (temp, store) = setup_store();
        let source = write_source(temp.path(), "tool.exe", b"v1");
        let link = temp.path().join("tool");

        let entry = store.add_entry("tool", &source, &link).unwrap();

        assert!(entry.available);
        assert_eq!(entry.fingerprint, compute_fingerprint(&source).unwrap());
        assert_eq!(entry.source, source);
        assert_eq!(entry.link, link);

        let entries = store.get_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["tool"], entry);
    }

    #[test]
    fn test_add_entry_persists() {
        let (temp, store) = setup_store();
        let source = write_source(temp.path(), "tool.exe", b"v1");
        store
            .add_entry("tool", &source, &temp.path().join("tool"))
            .unwrap();

        let reopened = RegistryStore::in_dir(temp.path());
        let entry = reopened.get_entry("tool").unwrap().unwrap();
        assert_eq!(entry.source, source);
        assert!(entry.available);
    }

    #[test]
    fn test_backup_keeps_previous_document() {
        let temp = TempDir::new().unwrap();
        let store = RegistryStore::in_dir(temp.path()).with_backup(true);
        let source = write_source(temp.path(), "tool.exe", b"v1");
        let backup = store.path().with_extension("json.bak");

        store.initialize().unwrap();
        assert!(!backup.exists());

        store
            .add_entry("tool", &source, &temp.path().join("tool"))
            .unwrap();
        let saved: Value = serde_json::from_slice(&std::fs::read(&backup).unwrap()).unwrap();
        assert_eq!(saved, serde_json::json!({}));

        store.remove_entries(&["tool"]).unwrap();
        let saved: Value = serde_json::from_slice(&std::fs::read(&backup).unwrap()).unwrap();
        assert!(saved.get("tool").is_some());
    }

    #[test]
    fn test_no_backup_by_default() {
        let (temp, store) = setup_store();
        let source = write_source(temp.path(), "tool.exe", b"v1");
        store
            .add_entry("tool", &source, &temp.path().join("tool"))
            .unwrap();

        assert!(!store.path().with_extension("json.bak").exists());
    }

    #[test]
    fn test_add_entry_hash_failure_writes_nothing() {
        let (temp, store) = setup_store();
        store.initialize().unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let err = store
            .add_entry("ghost", &temp.path().join("missing"), &temp.path().join("ghost"))
            .unwrap_err();

        assert!(matches!(err, TieError::HashFailure { .. }));
        assert!(store.get_entries().unwrap().is_empty());
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_add_entry_overwrites_alias() {
        let (temp, store) = setup_store();
        let first = write_source(temp.path(), "first", b"one");
        let second = write_source(temp.path(), "second", b"two");

        store
            .add_entry("tool", &first, &temp.path().join("tool"))
            .unwrap();
        store
            .add_entry("tool", &second, &temp.path().join("tool"))
            .unwrap();

        let entries = store.get_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries["tool"].source, second);
        assert_eq!(
            entries["tool"].fingerprint,
            compute_fingerprint(&second).unwrap()
        );

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(!raw.contains(&compute_fingerprint(&first).unwrap()));
    }

    #[test]
    fn test_add_entry_persist_failure() {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        std::fs::create_dir(&home).unwrap();
        let source = write_source(temp.path(), "tool", b"v1");

        let store = RegistryStore::in_dir(&home);
        store.initialize().unwrap();

        // Replace the registry directory with a plain file so the write fails
        std::fs::remove_dir_all(&home).unwrap();
        std::fs::write(&home, b"not a directory").unwrap();

        let err = store
            .add_entry("tool", &source, &temp.path().join("tool-link"))
            .unwrap_err();
        assert!(matches!(err, TieError::PersistFailure { .. }));

        // The in-memory mapping keeps the mutation
        assert!(store.get_entry("tool").unwrap().is_some());
    }

    #[test]
    fn test_remove_entries() {
        let (temp, store) = setup_store();
        let source = write_source(temp.path(), "tool", b"v1");
        store.add_entry("a", &source, &temp.path().join("a")).unwrap();
        store.add_entry("b", &source, &temp.path().join("b")).unwrap();

        let removed = store.remove_entries(&["a", "missing"]).unwrap();

        assert_eq!(removed, vec!["a".to_string()]);
        let entries = store.get_entries().unwrap();
        assert!(!entries.contains_key("a"));
        assert!(entries.contains_key("b"));

        let reopened = RegistryStore::in_dir(temp.path());
        assert!(reopened.get_entry("a").unwrap().is_none());
    }

    #[test]
    fn test_remove_missing_alias_leaves_document_unchanged() {
        let (temp, store) = setup_store();
        let source = write_source(temp.path(), "tool", b"v1");
        store
            .add_entry("tool", &source, &temp.path().join("tool-link"))
            .unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let removed = store.remove_entries(&["nope"]).unwrap();

        assert!(removed.is_empty());
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_get_entries_is_a_snapshot() {
        let (temp, store) = setup_store();
        let source = write_source(temp.path(), "tool", b"v1");
        store
            .add_entry("tool", &source, &temp.path().join("tool-link"))
            .unwrap();

        let mut snapshot = store.get_entries().unwrap();
        snapshot.get_mut("tool").unwrap().available = false;
        snapshot.remove("tool");

        assert!(store.get_entry("tool").unwrap().unwrap().available);
    }

    #[test]
    fn test_get_entries_parse_failure() {
        let (_temp, store) = setup_store();
        std::fs::write(
            store.path(),
            r#"{"tool": {"source": "/opt/tool", "available": "yes"}}"#,
        )
        .unwrap();

        store.initialize().unwrap();
        let err = store.get_entries().unwrap_err();
        match err {
            TieError::ParseFailure { alias, .. } => assert_eq!(alias, "tool"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_reconcile_unmodified_source_stays_available() {
        let (temp, store) = setup_store();
        let source = write_source(temp.path(), "tool", b"v1");
        store
            .add_entry("tool", &source, &temp.path().join("tool-link"))
            .unwrap();

        let report = store.reconcile_all().unwrap();

        assert_eq!(report.checked, 1);
        assert_eq!(report.available, vec!["tool".to_string()]);
        assert!(report.changed.is_empty());
        assert!(store.get_entry("tool").unwrap().unwrap().available);
    }

    #[test]
    fn test_reconcile_detects_modified_and_deleted_sources() {
        let (temp, store) = setup_store();
        let modified = write_source(temp.path(), "modified", b"v1");
        let deleted = write_source(temp.path(), "deleted", b"v1");
        let replaced_by_dir = write_source(temp.path(), "dir", b"v1");
        store
            .add_entry("modified", &modified, &temp.path().join("m"))
            .unwrap();
        store
            .add_entry("deleted", &deleted, &temp.path().join("d"))
            .unwrap();
        store
            .add_entry("dir", &replaced_by_dir, &temp.path().join("x"))
            .unwrap();
        let original_fingerprint = store.get_entry("modified").unwrap().unwrap().fingerprint;

        std::fs::write(&modified, b"v2").unwrap();
        std::fs::remove_file(&deleted).unwrap();
        std::fs::remove_file(&replaced_by_dir).unwrap();
        std::fs::create_dir(&replaced_by_dir).unwrap();

        let report = store.reconcile_all().unwrap();

        assert_eq!(report.checked, 3);
        assert!(report.available.is_empty());
        assert_eq!(report.changed.len(), 3);
        let entries = store.get_entries().unwrap();
        assert!(entries.values().all(|e| !e.available));
        assert_eq!(entries["modified"].fingerprint, original_fingerprint);

        // Persisted too
        let reopened = RegistryStore::in_dir(temp.path());
        assert!(!reopened.get_entry("deleted").unwrap().unwrap().available);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let (temp, store) = setup_store();
        let kept = write_source(temp.path(), "kept", b"v1");
        let gone = write_source(temp.path(), "gone", b"v1");
        store.add_entry("kept", &kept, &temp.path().join("k")).unwrap();
        store.add_entry("gone", &gone, &temp.path().join("g")).unwrap();
        std::fs::remove_file(&gone).unwrap();

        store.reconcile_all().unwrap();
        let first = store.get_entries().unwrap();
        let document = std::fs::read(store.path()).unwrap();

        let report = store.reconcile_all().unwrap();

        assert!(report.changed.is_empty());
        assert_eq!(store.get_entries().unwrap(), first);
        assert_eq!(std::fs::read(store.path()).unwrap(), document);
    }

    #[test]
    fn test_reconcile_restores_availability() {
        let (temp, store) = setup_store();
        let source = write_source(temp.path(), "tool", b"v1");
        store
            .add_entry("tool", &source, &temp.path().join("tool-link"))
            .unwrap();

        std::fs::write(&source, b"v2").unwrap();
        store.reconcile_all().unwrap();
        assert!(!store.get_entry("tool").unwrap().unwrap().available);

        std::fs::write(&source, b"v1").unwrap();
        let report = store.reconcile_all().unwrap();
        assert_eq!(report.changed, vec!["tool".to_string()]);
        assert!(store.get_entry("tool").unwrap().unwrap().available);
    }

    #[test]
    fn test_concurrent_adds_are_all_persisted() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(RegistryStore::in_dir(temp.path()));
        let source = write_source(temp.path(), "tool", b"shared");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let source = source.clone();
                let link = temp.path().join(format!("tool-{i}"));
                std::thread::spawn(move || {
                    store
                        .add_entry(&format!("tool-{i}"), &source, &link)
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let reopened = RegistryStore::in_dir(temp.path());
        assert_eq!(reopened.get_entries().unwrap().len(), 8);
    }
}
