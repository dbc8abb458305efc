//! Link lifecycle methods on LiteTie: add, list, remove, clean, update.

use super::types::{AddOutcome, RemoveReport, RemoveStatus};
use crate::config::{LinkConfig, RegistryConfig};
use crate::error::{Result, TieError};
use crate::platform::{self, artifact_exists, occupies, ScriptFallback};
use crate::registry::{Entry, ReconcileReport};
use crate::LiteTie;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Component, Path};
use tracing::{debug, info, warn};

impl LiteTie {
    // ========================================
    // Link Lifecycle
    // ========================================

    /// Link `exec_path` into the link directory and register it.
    ///
    /// The alias defaults to the executable's file name. A symlink, an
    /// indirection script, or a recorded link already at the link path is
    /// replaced; any other file there is left alone. If the registry can't be
    /// saved afterwards, the new artifact is deleted again so that no
    /// unregistered link is left behind.
    ///
    /// # Errors
    ///
    /// - [`TieError::InvalidPath`] if `exec_path` is missing or a directory,
    ///   resolves to the link path, or a foreign file is in the way
    /// - [`TieError::InvalidAlias`] if the alias can't be used as a file name
    ///   or names one of lite-tie's own files
    /// - [`TieError::LinkCreationFailed`] if the artifact can't be created
    /// - [`TieError::HashFailure`] if the executable can't be read
    /// - [`TieError::PersistFailure`] if the registry can't be saved
    pub fn add(&self, exec_path: impl AsRef<Path>, alias: Option<&str>) -> Result<AddOutcome> {
        let source = platform::absolute_path(exec_path.as_ref())?;
        let metadata = fs::metadata(&source).map_err(|e| TieError::InvalidPath {
            path: source.clone(),
            reason: e.to_string(),
        })?;
        if metadata.is_dir() {
            return Err(TieError::InvalidPath {
                path: source,
                reason: "path is a directory".to_string(),
            });
        }

        let alias = match alias.filter(|a| !a.is_empty()) {
            Some(alias) => alias.to_string(),
            None => source
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        validate_alias(&alias)?;

        let link_path = self.link_dir.join(&alias);
        let artifact = self.linker.artifact_path(&link_path);
        if artifact
            .file_name()
            .is_some_and(|name| is_reserved_name(&name.to_string_lossy()))
            || occupies(&artifact, self.store.path())
        {
            return Err(TieError::InvalidAlias {
                alias,
                reason: "alias collides with a lite-tie file".to_string(),
            });
        }
        if occupies(&artifact, &source) {
            return Err(TieError::InvalidPath {
                path: source,
                reason: "executable is already at the link path".to_string(),
            });
        }

        let _links = self.lock_links()?;

        let previous = match self.store.get_entry(&alias) {
            Ok(entry) => entry,
            Err(TieError::ParseFailure { message, .. }) => {
                warn!("Overwriting unreadable entry '{}': {}", alias, message);
                None
            }
            Err(e) => return Err(e),
        };

        let replaced = artifact_exists(&artifact);
        if replaced {
            let entries = self.readable_entries();
            if entries.values().any(|e| occupies(&artifact, &e.source)) {
                return Err(TieError::InvalidPath {
                    path: artifact,
                    reason: "a registered executable is at the link path".to_string(),
                });
            }
            let ours = artifact.is_symlink()
                || ScriptFallback::is_script(&artifact)
                || entries.values().any(|e| e.link == artifact);
            if !ours {
                return Err(TieError::InvalidPath {
                    path: artifact,
                    reason: "a file not created by lite-tie is at the link path".to_string(),
                });
            }
            warn!("Link {} already exists, replacing it", artifact.display());
            self.linker.remove(&artifact)?;
        }

        let link = self.linker.create(&source, &link_path)?;

        let entry = match self.store.add_entry(&alias, &source, &link) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(
                    "Registering '{}' failed, rolling back {}",
                    alias,
                    link.display()
                );
                if let Err(cleanup) = self.linker.remove(&link) {
                    warn!("Rollback of {} failed: {}", link.display(), cleanup);
                }
                return Err(e);
            }
        };

        if let Some(previous) = previous {
            self.remove_stale_link(&alias, &previous, &link, &source);
        }

        info!(
            "Added '{}' -> {} ({})",
            alias,
            source.display(),
            self.linker.kind()
        );
        Ok(AddOutcome {
            alias,
            source,
            link,
            kind: self.linker.kind(),
            replaced,
            entry,
        })
    }

    /// Registered entries sorted by alias, or only `name` when given.
    ///
    /// # Errors
    ///
    /// [`TieError::NotFound`] if `name` isn't registered.
    pub fn list(&self, name: Option<&str>) -> Result<Vec<(String, Entry)>> {
        match name {
            Some(name) => match self.store.get_entry(name)? {
                Some(entry) => Ok(vec![(name.to_string(), entry)]),
                None => Err(TieError::NotFound {
                    alias: name.to_string(),
                }),
            },
            None => Ok(self.store.get_entries()?.into_iter().collect()),
        }
    }

    /// Remove the named links and their registry entries.
    ///
    /// Entries still marked available are only removed if `confirm` approves,
    /// unless `silent` is set. An entry whose artifact can't be deleted is
    /// kept. All approved entries are dropped from the registry in one write.
    pub fn remove<S, F>(
        &self,
        names: &[S],
        silent: bool,
        mut confirm: F,
    ) -> Result<Vec<RemoveReport>>
    where
        S: AsRef<str>,
        F: FnMut(&str, &Entry) -> bool,
    {
        let _links = self.lock_links()?;
        let entries = self.store.get_entries()?;
        let mut seen = HashSet::new();
        let mut reports = Vec::new();
        let mut doomed = Vec::new();

        for name in names {
            let name = name.as_ref();
            if !seen.insert(name) {
                continue;
            }

            let Some(entry) = entries.get(name) else {
                info!("'{}' is not registered", name);
                reports.push(RemoveReport::new(name, RemoveStatus::NotFound));
                continue;
            };

            if entry.available && !silent && !confirm(name, entry) {
                debug!("Removal of '{}' declined", name);
                reports.push(RemoveReport::new(name, RemoveStatus::Skipped));
                continue;
            }

            let status = self.delete_link(name, entry);
            if status == RemoveStatus::Removed {
                doomed.push(name.to_string());
            }
            reports.push(RemoveReport::new(name, status));
        }

        self.store.remove_entries(&doomed)?;
        Ok(reports)
    }

    /// Remove every entry currently recorded as unavailable, without asking.
    ///
    /// Availability is taken from the registry as last reconciled; run
    /// [`update`](Self::update) first for a fresh verdict.
    pub fn clean(&self) -> Result<Vec<RemoveReport>> {
        let _links = self.lock_links()?;
        let entries = self.store.get_entries()?;
        let mut reports = Vec::new();
        let mut doomed = Vec::new();

        for (alias, entry) in entries.iter().filter(|(_, entry)| !entry.available) {
            let status = self.delete_link(alias, entry);
            if status == RemoveStatus::Removed {
                doomed.push(alias.clone());
            }
            reports.push(RemoveReport::new(alias.as_str(), status));
        }

        self.store.remove_entries(&doomed)?;
        info!("Cleaned {} unavailable entr(ies)", doomed.len());
        Ok(reports)
    }

    /// Recompute availability for every registered entry.
    pub fn update(&self) -> Result<ReconcileReport> {
        self.store.reconcile_all()
    }

    /// Entries that decode, or none if any stored value is malformed.
    fn readable_entries(&self) -> BTreeMap<String, Entry> {
        self.store.get_entries().unwrap_or_else(|e| {
            debug!("Registry entries unreadable: {}", e);
            BTreeMap::new()
        })
    }

    fn delete_link(&self, alias: &str, entry: &Entry) -> RemoveStatus {
        if occupies(&entry.link, &entry.source) {
            warn!(
                "Entry '{}' links to itself, keeping {}",
                alias,
                entry.source.display()
            );
            return RemoveStatus::Failed("link artifact is the executable itself".to_string());
        }
        if occupies(&entry.link, self.store.path()) {
            warn!("Entry '{}' points at the registry, keeping it", alias);
            return RemoveStatus::Failed("link artifact is the registry".to_string());
        }
        match self.linker.remove(&entry.link) {
            Ok(()) => RemoveStatus::Removed,
            Err(e) => {
                warn!("Failed to remove link for '{}': {}", alias, e);
                RemoveStatus::Failed(e.to_string())
            }
        }
    }

    /// Delete the artifact of an overwritten entry if it lived elsewhere.
    fn remove_stale_link(
        &self,
        alias: &str,
        previous: &Entry,
        current_link: &Path,
        source: &Path,
    ) {
        let stale = &previous.link;
        if stale == current_link
            || stale.parent() != Some(self.link_dir.as_path())
            || !artifact_exists(stale)
            || occupies(stale, &previous.source)
            || occupies(stale, source)
            || occupies(stale, self.store.path())
        {
            return;
        }
        match platform::remove_artifact(stale) {
            Ok(()) => debug!("Removed stale link {} of '{}'", stale.display(), alias),
            Err(e) => warn!("Failed to remove stale link {}: {}", stale.display(), e),
        }
    }
}

/// Names of files lite-tie keeps next to its links: the registry, its
/// backup and temp siblings, and the capability probe.
fn is_reserved_name(name: &str) -> bool {
    let name = name.to_lowercase();
    let registry = RegistryConfig::FILE_NAME;
    name == registry
        || name.starts_with(&format!("{registry}."))
        || name == LinkConfig::PROBE_FILE_NAME
}

/// Reject aliases that can't name a single file in the link directory.
/// Reserved names are refused too.
fn validate_alias(alias: &str) -> Result<()> {
    let invalid = |reason: &str| TieError::InvalidAlias {
        alias: alias.to_string(),
        reason: reason.to_string(),
    };

    if alias.trim().is_empty() {
        return Err(invalid("alias is empty"));
    }
    if alias.contains('/') || alias.contains('\\') {
        return Err(invalid("alias contains a path separator"));
    }
    let mut components = Path::new(alias).components();
    if !matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) {
        return Err(invalid("alias is not a plain file name"));
    }
    if is_reserved_name(alias) {
        return Err(invalid("alias collides with a lite-tie file"));
    }
    Ok(())
}
