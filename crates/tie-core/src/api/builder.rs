//! Builder for configuring LiteTie initialization.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::config::RegistryConfig;
use crate::error::{Result, TieError};
use crate::platform::{self, LinkKind, LinkManager};
use crate::registry::RegistryStore;
use crate::LiteTie;

/// Builder for configuring LiteTie initialization.
///
/// # Example
///
/// ```rust,ignore
/// use tie_core::LiteTie;
///
/// let tie = LiteTie::builder("./portable")
///     .link_dir("./portable/bin")
///     .auto_create_dirs(true)
///     .build()?;
/// ```
pub struct LiteTieBuilder {
    home: PathBuf,
    link_dir: Option<PathBuf>,
    link_kind: Option<LinkKind>,
    link_manager: Option<Arc<dyn LinkManager>>,
    auto_create_dirs: bool,
    keep_backup: bool,
}

impl LiteTieBuilder {
    /// Create a new builder with the home directory holding the registry.
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            link_dir: None,
            link_kind: None,
            link_manager: None,
            auto_create_dirs: false,
            keep_backup: RegistryConfig::KEEP_BACKUP,
        }
    }

    /// Create links somewhere other than the home directory.
    ///
    /// Default: the home directory
    pub fn link_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.link_dir = Some(dir.into());
        self
    }

    /// Force a link artifact kind instead of probing the platform.
    ///
    /// Default: probed once in the link directory
    pub fn link_kind(mut self, kind: LinkKind) -> Self {
        self.link_kind = Some(kind);
        self
    }

    /// Use a custom link manager. Takes precedence over [`link_kind`](Self::link_kind).
    pub fn link_manager(mut self, manager: Arc<dyn LinkManager>) -> Self {
        self.link_manager = Some(manager);
        self
    }

    /// Copy the previous registry document to `.registry.json.bak` before
    /// every write.
    ///
    /// Default: `false`
    pub fn keep_backup(mut self, enable: bool) -> Self {
        self.keep_backup = enable;
        self
    }

    /// Create the home and link directories if they don't exist.
    ///
    /// Default: `false` (directories must exist)
    pub fn auto_create_dirs(mut self, enable: bool) -> Self {
        self.auto_create_dirs = enable;
        self
    }

    fn prepare_dir(dir: &Path, create: bool) -> Result<PathBuf> {
        let dir = platform::absolute_path(dir)?;
        if create && !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| TieError::Io {
                message: format!("Failed to create directory: {}", dir.display()),
                path: Some(dir.clone()),
                source: Some(e),
            })?;
        }
        if !dir.is_dir() {
            return Err(TieError::Config {
                message: format!("Directory does not exist: {}", dir.display()),
            });
        }
        Ok(dir)
    }

    /// Build the LiteTie instance and load the registry.
    ///
    /// # Errors
    ///
    /// - [`TieError::Config`] if the home or link directory is missing
    /// - [`TieError::RegistryCorrupt`] if the registry can't be parsed
    /// - [`TieError::PersistFailure`] if a new registry can't be created
    pub fn build(self) -> Result<LiteTie> {
        let home = Self::prepare_dir(&self.home, self.auto_create_dirs)?;
        let link_dir = match self.link_dir {
            Some(dir) => Self::prepare_dir(&dir, self.auto_create_dirs)?,
            None => home.clone(),
        };

        let linker = match (self.link_manager, self.link_kind) {
            (Some(manager), _) => manager,
            (None, Some(kind)) => kind.manager(),
            (None, None) => platform::probe_link_manager(&link_dir),
        };

        let store = Arc::new(RegistryStore::in_dir(&home).with_backup(self.keep_backup));
        store.initialize()?;

        debug!(
            "lite-tie ready on {}: registry {}, links in {} ({})",
            platform::current_platform(),
            store.path().display(),
            link_dir.display(),
            linker.kind()
        );

        Ok(LiteTie::from_parts(home, link_dir, store, linker))
    }
}
