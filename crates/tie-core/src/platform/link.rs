//! Link artifact creation.
//!
//! A link artifact is either a real symbolic link to the source executable or,
//! where symlinks need privileges the user doesn't have, a small script that
//! forwards its arguments to the source. The variant is chosen once by
//! [`probe_link_manager`]; callers only talk to the [`LinkManager`] trait.

use super::paths::script_suffix;
use super::permissions::set_executable;
use crate::error::{Result, TieError};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
#[cfg(windows)]
use tracing::warn;

/// Kind of artifact a [`LinkManager`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Symbolic link to the source
    Symlink,
    /// Indirection script forwarding arguments to the source
    Script,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Symlink => "symlink",
            LinkKind::Script => "script",
        }
    }

    /// Link manager producing this kind of artifact.
    pub fn manager(self) -> Arc<dyn LinkManager> {
        match self {
            LinkKind::Symlink => Arc::new(SymlinkCapable),
            LinkKind::Script => Arc::new(ScriptFallback),
        }
    }
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Creates and removes link artifacts.
pub trait LinkManager: Send + Sync + std::fmt::Debug {
    /// Kind of artifact this manager creates.
    fn kind(&self) -> LinkKind;

    /// Where the artifact for a requested `link_path` is placed.
    fn artifact_path(&self, link_path: &Path) -> PathBuf;

    /// Create an artifact at `link_path` pointing at `source`.
    ///
    /// Returns the artifact's actual path, which may differ from `link_path`
    /// (see [`artifact_path`](Self::artifact_path)). Nothing may already exist
    /// there.
    ///
    /// # Errors
    ///
    /// [`TieError::LinkCreationFailed`] if the artifact can't be written.
    fn create(&self, source: &Path, link_path: &Path) -> Result<PathBuf>;

    /// Delete an artifact. A missing artifact is not an error.
    fn remove(&self, artifact: &Path) -> Result<()> {
        remove_artifact(artifact)
    }
}

/// Creates true symbolic links.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymlinkCapable;

impl LinkManager for SymlinkCapable {
    fn kind(&self) -> LinkKind {
        LinkKind::Symlink
    }

    fn artifact_path(&self, link_path: &Path) -> PathBuf {
        link_path.to_path_buf()
    }

    fn create(&self, source: &Path, link_path: &Path) -> Result<PathBuf> {
        symlink_file(source, link_path).map_err(|e| TieError::LinkCreationFailed {
            src: source.to_path_buf(),
            dest: link_path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("Symlinked {} -> {}", link_path.display(), source.display());
        Ok(link_path.to_path_buf())
    }
}

/// Writes an indirection script in place of a symlink.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptFallback;

impl ScriptFallback {
    /// Script body forwarding all arguments to `source`.
    ///
    /// # Platform Behavior
    /// - **Windows**: `@"<source>" %*`
    /// - **Linux/macOS**: `/bin/sh` script that `exec`s the source with `"$@"`
    pub fn script_content(source: &Path) -> String {
        #[cfg(windows)]
        {
            format!("@\"{}\" %*", source.display())
        }
        #[cfg(not(windows))]
        {
            let quoted = source.display().to_string().replace('\'', "'\\''");
            format!("#!/bin/sh\nexec '{}' \"$@\"\n", quoted)
        }
    }

    /// Whether `path` is a regular file holding an indirection script.
    pub fn is_script(path: &Path) -> bool {
        let Ok(content) = fs::read_to_string(path) else {
            return false;
        };
        #[cfg(windows)]
        {
            content.starts_with("@\"") && content.ends_with("\" %*")
        }
        #[cfg(not(windows))]
        {
            content.starts_with("#!/bin/sh\nexec '") && content.ends_with("\"$@\"\n")
        }
    }
}

impl LinkManager for ScriptFallback {
    fn kind(&self) -> LinkKind {
        LinkKind::Script
    }

    fn artifact_path(&self, link_path: &Path) -> PathBuf {
        let mut name: OsString = link_path.as_os_str().to_os_string();
        name.push(script_suffix());
        PathBuf::from(name)
    }

    fn create(&self, source: &Path, link_path: &Path) -> Result<PathBuf> {
        let artifact = self.artifact_path(link_path);
        let failed = |reason: String| TieError::LinkCreationFailed {
            src: source.to_path_buf(),
            dest: artifact.clone(),
            reason,
        };

        fs::write(&artifact, Self::script_content(source)).map_err(|e| failed(e.to_string()))?;
        if let Err(e) = set_executable(&artifact) {
            let _ = fs::remove_file(&artifact);
            return Err(failed(e.to_string()));
        }

        info!(
            "Created indirection script {} -> {}",
            artifact.display(),
            source.display()
        );
        Ok(artifact)
    }
}

/// Whether anything (including a dangling symlink) exists at `path`.
pub fn artifact_exists(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Delete a link artifact, treating a missing one as already removed.
pub fn remove_artifact(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed link artifact {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(TieError::io_with_path(e, path)),
    }
}

/// Pick the link manager for `link_dir`, probing the platform once.
///
/// # Platform Behavior
/// - **Linux/macOS**: always [`SymlinkCapable`]
/// - **Windows**: tries a throw-away symlink in `link_dir`; if the OS refuses
///   with `ERROR_PRIVILEGE_NOT_HELD`, returns [`ScriptFallback`]
pub fn probe_link_manager(link_dir: &Path) -> Arc<dyn LinkManager> {
    #[cfg(windows)]
    {
        let probe = link_dir.join(crate::config::LinkConfig::PROBE_FILE_NAME);
        let _ = fs::remove_file(&probe);
        match symlink_file(link_dir, &probe) {
            Ok(()) => {
                let _ = fs::remove_file(&probe);
                debug!("Symlinks available in {}", link_dir.display());
                Arc::new(SymlinkCapable)
            }
            Err(e) if is_privilege_error(&e) => {
                info!("Symlinks need elevation here, using indirection scripts");
                Arc::new(ScriptFallback)
            }
            Err(e) => {
                warn!("Symlink probe in {} failed: {}", link_dir.display(), e);
                Arc::new(SymlinkCapable)
            }
        }
    }

    #[cfg(not(windows))]
    {
        debug!("Using symlinks in {}", link_dir.display());
        Arc::new(SymlinkCapable)
    }
}

fn symlink_file(source: &Path, link_path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(source, link_path)
    }
    #[cfg(windows)]
    {
        std::os::windows::fs::symlink_file(source, link_path)
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = (source, link_path);
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "symbolic links are not supported on this platform",
        ))
    }
}

#[cfg(windows)]
fn is_privilege_error(err: &std::io::Error) -> bool {
    use windows_sys::Win32::Foundation::ERROR_PRIVILEGE_NOT_HELD;
    err.raw_os_error() == Some(ERROR_PRIVILEGE_NOT_HELD as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_source(dir: &Path) -> PathBuf {
        let source = dir.join("tool.exe");
        fs::write(&source, b"binary").unwrap();
        source
    }

    #[test]
    fn test_link_kind_display() {
        assert_eq!(LinkKind::Symlink.to_string(), "symlink");
        assert_eq!(LinkKind::Script.manager().kind(), LinkKind::Script);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_create_and_remove() {
        let temp = TempDir::new().unwrap();
        let source = write_source(temp.path());
        let link = temp.path().join("tool");

        let artifact = SymlinkCapable.create(&source, &link).unwrap();

        assert_eq!(artifact, link);
        assert_eq!(fs::read_link(&artifact).unwrap(), source);
        assert_eq!(fs::read(&artifact).unwrap(), b"binary");

        SymlinkCapable.remove(&artifact).unwrap();
        assert!(!artifact_exists(&artifact));
        assert!(source.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_over_existing_fails() {
        let temp = TempDir::new().unwrap();
        let source = write_source(temp.path());
        let link = temp.path().join("tool");
        fs::write(&link, b"occupied").unwrap();

        let err = SymlinkCapable.create(&source, &link).unwrap_err();
        assert!(matches!(err, TieError::LinkCreationFailed { .. }));
    }

    #[test]
    fn test_script_fallback_writes_forwarding_script() {
        let temp = TempDir::new().unwrap();
        let source = write_source(temp.path());
        let link = temp.path().join("tool");

        let artifact = ScriptFallback.create(&source, &link).unwrap();

        assert_eq!(artifact, ScriptFallback.artifact_path(&link));
        let content = fs::read_to_string(&artifact).unwrap();
        assert!(content.contains(&source.display().to_string()));
        assert!(super::super::permissions::is_executable(&artifact));

        #[cfg(windows)]
        assert!(artifact.to_string_lossy().ends_with("tool.bat"));
        #[cfg(not(windows))]
        {
            assert_eq!(artifact, link);
            assert!(content.starts_with("#!/bin/sh\n"));
            assert!(content.contains("\"$@\""));
        }
    }

    #[cfg(not(windows))]
    #[test]
    fn test_script_content_quotes_single_quotes() {
        let content = ScriptFallback::script_content(Path::new("/opt/it's here/tool"));
        assert!(content.contains("exec '/opt/it'\\''s here/tool' \"$@\""));
    }

    #[test]
    fn test_is_script() {
        let temp = TempDir::new().unwrap();
        let source = write_source(temp.path());
        let artifact = ScriptFallback
            .create(&source, &temp.path().join("tool"))
            .unwrap();

        assert!(ScriptFallback::is_script(&artifact));
        assert!(!ScriptFallback::is_script(&source));
        assert!(!ScriptFallback::is_script(&temp.path().join("missing")));
    }

    #[test]
    fn test_remove_missing_artifact_is_ok() {
        let temp = TempDir::new().unwrap();
        assert!(remove_artifact(&temp.path().join("never-created")).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_artifact_exists_sees_dangling_symlink() {
        let temp = TempDir::new().unwrap();
        let link = temp.path().join("dangling");
        std::os::unix::fs::symlink(temp.path().join("gone"), &link).unwrap();

        assert!(!link.exists());
        assert!(artifact_exists(&link));
    }

    #[test]
    fn test_probe_link_manager() {
        let temp = TempDir::new().unwrap();
        let manager = probe_link_manager(temp.path());

        #[cfg(unix)]
        assert_eq!(manager.kind(), LinkKind::Symlink);
        #[cfg(windows)]
        assert!(!temp
            .path()
            .join(crate::config::LinkConfig::PROBE_FILE_NAME)
            .exists());
        let _ = manager;
    }
}
