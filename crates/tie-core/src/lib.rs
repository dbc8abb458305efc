//! lite-tie core - registry and link management for portable executables.
//!
//! Keeps a directory of links (symlinks, or indirection scripts where
//! symlinks need elevation) pointing at portable executables, plus a JSON
//! registry recording each link's source, owner, content fingerprint, and
//! availability.
//!
//! # Example
//!
//! ```rust,ignore
//! use tie_core::LiteTie;
//!
//! fn main() -> tie_core::Result<()> {
//!     let tie = LiteTie::builder("/opt/portable/bin").build()?;
//!
//!     let added = tie.add("/opt/portable/ripgrep/rg", Some("rg"))?;
//!     println!("{} -> {}", added.alias, added.source.display());
//!
//!     let report = tie.update()?;
//!     println!("{} unavailable", report.unavailable.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod platform;
pub mod registry;

mod api;

pub use api::{AddOutcome, LiteTieBuilder, RemoveReport, RemoveStatus};
pub use error::{Result, TieError};
pub use fingerprint::{compute_fingerprint, fingerprint_matches};
pub use platform::{LinkKind, LinkManager, ScriptFallback, SymlinkCapable};
pub use registry::{Entry, ReconcileReport, RegistryStore};

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Main entry point for lite-tie operations.
///
/// Owns the registry store and the link manager chosen for the link
/// directory. Cloning is cheap and clones share the same store and locks.
#[derive(Debug, Clone)]
pub struct LiteTie {
    /// Directory holding the registry document
    home: PathBuf,
    /// Directory where link artifacts are created
    link_dir: PathBuf,
    /// Alias registry
    store: Arc<RegistryStore>,
    /// Creates and removes link artifacts
    linker: Arc<dyn LinkManager>,
    /// Serializes artifact changes in the link directory
    links: Arc<Mutex<()>>,
}

impl LiteTie {
    /// Create a builder rooted at `home`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let tie = LiteTie::builder("./bin")
    ///     .auto_create_dirs(true)
    ///     .link_kind(LinkKind::Script)
    ///     .build()?;
    /// ```
    pub fn builder(home: impl Into<PathBuf>) -> LiteTieBuilder {
        LiteTieBuilder::new(home)
    }

    /// Open lite-tie in `home` with default options.
    pub fn open(home: impl Into<PathBuf>) -> Result<Self> {
        Self::builder(home).build()
    }

    /// Open lite-tie in the home resolved from `LITE_TIE_HOME` or the
    /// executable's directory.
    pub fn from_env() -> Result<Self> {
        Self::open(platform::resolve_home(None)?)
    }

    pub(crate) fn from_parts(
        home: PathBuf,
        link_dir: PathBuf,
        store: Arc<RegistryStore>,
        linker: Arc<dyn LinkManager>,
    ) -> Self {
        Self {
            home,
            link_dir,
            store,
            linker,
            links: Arc::new(Mutex::new(())),
        }
    }

    /// Hold while checking, deleting, or creating link artifacts, so two adds
    /// of one alias can't race between the existence check and the create.
    pub(crate) fn lock_links(&self) -> Result<MutexGuard<'_, ()>> {
        self.links
            .lock()
            .map_err(|_| TieError::Other("Failed to acquire link directory lock".to_string()))
    }

    /// Directory holding the registry document.
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Directory where link artifacts are created.
    pub fn link_dir(&self) -> &Path {
        &self.link_dir
    }

    /// Path of the registry document.
    pub fn registry_path(&self) -> &Path {
        self.store.path()
    }

    /// Kind of artifact created by [`add`](Self::add).
    pub fn link_kind(&self) -> LinkKind {
        self.linker.kind()
    }

    /// The underlying registry store.
    pub fn store(&self) -> &RegistryStore {
        &self.store
    }
}
