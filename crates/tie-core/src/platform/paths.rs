//! Home directory resolution.
//!
//! The registry document and the link artifacts live next to the running
//! executable unless `LITE_TIE_HOME` or an explicit directory says otherwise.

use crate::config::RegistryConfig;
use crate::error::{Result, TieError};
use std::path::{Path, PathBuf};

/// Directory containing the running executable.
pub fn exe_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| TieError::Config {
        message: format!("Could not determine executable path: {}", e),
    })?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| TieError::Config {
            message: format!("Executable has no parent directory: {}", exe.display()),
        })
}

/// Resolve the lite-tie home directory.
///
/// Order: `explicit`, then the `LITE_TIE_HOME` environment variable, then the
/// executable's directory. The result is made absolute.
pub fn resolve_home(explicit: Option<PathBuf>) -> Result<PathBuf> {
    let home = match explicit {
        Some(dir) => dir,
        None => match std::env::var_os(RegistryConfig::HOME_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => exe_dir()?,
        },
    };
    absolute_path(&home)
}

/// Make `path` absolute against the current directory without resolving
/// symlinks.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| TieError::InvalidPath {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Canonical location of `path` with only its parent directory resolved, so
/// a symlink in the last component is not followed.
///
/// Returns `None` if the parent can't be resolved.
pub fn resolve_location(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::canonicalize(parent).ok().map(|dir| dir.join(name))
}

/// Whether `entry_path` is the directory entry `target` names, either as
/// written or after following every symlink in `target`.
///
/// `..` components and symlinked directories are resolved on both sides.
/// Unresolvable paths never match.
pub fn occupies(entry_path: &Path, target: &Path) -> bool {
    let Some(location) = resolve_location(entry_path) else {
        return false;
    };
    resolve_location(target).as_ref() == Some(&location)
        || std::fs::canonicalize(target).is_ok_and(|resolved| resolved == location)
}

/// Suffix appended to a link path when an indirection script stands in for a
/// symlink.
///
/// # Platform Behavior
/// - **Windows**: `.bat`
/// - **Linux/macOS**: none (the shell script takes the link's own name)
pub fn script_suffix() -> &'static str {
    #[cfg(windows)]
    {
        crate::config::LinkConfig::WINDOWS_SCRIPT_SUFFIX
    }
    #[cfg(not(windows))]
    {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exe_dir_exists() {
        let dir = exe_dir().unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn test_resolve_home_prefers_explicit() {
        let temp = tempfile::TempDir::new().unwrap();
        let home = resolve_home(Some(temp.path().to_path_buf())).unwrap();
        assert_eq!(home, temp.path());
    }

    #[test]
    fn test_absolute_path_keeps_absolute() {
        let temp = tempfile::TempDir::new().unwrap();
        assert_eq!(absolute_path(temp.path()).unwrap(), temp.path());
    }

    #[test]
    fn test_absolute_path_joins_relative() {
        let abs = absolute_path(Path::new("some-tool")).unwrap();
        assert!(abs.is_absolute());
        assert!(abs.ends_with("some-tool"));
    }

    #[test]
    fn test_occupies_resolves_parent_dirs() {
        let temp = tempfile::TempDir::new().unwrap();
        let home = temp.path().join("home");
        std::fs::create_dir(&home).unwrap();
        let tool = home.join("tool");
        std::fs::write(&tool, b"bin").unwrap();

        let dotted = home.join("..").join("home").join("tool");
        assert!(occupies(&tool, &dotted));
        assert!(occupies(&dotted, &tool));
        assert!(!occupies(&home.join("other"), &tool));
        assert!(!occupies(&temp.path().join("missing/tool"), &tool));
    }

    #[cfg(unix)]
    #[test]
    fn test_occupies_follows_target_symlink_only() {
        let temp = tempfile::TempDir::new().unwrap();
        let real = temp.path().join("real");
        let alias = temp.path().join("alias");
        std::fs::write(&real, b"bin").unwrap();
        std::os::unix::fs::symlink(&real, &alias).unwrap();

        // `alias` resolves to `real`, so `real` is what it occupies
        assert!(occupies(&real, &alias));
        // but the symlink entry itself is not the file it points at
        assert!(!occupies(&alias, &real));
        assert!(occupies(&alias, &alias));
    }

    #[test]
    fn test_script_suffix() {
        #[cfg(windows)]
        assert_eq!(script_suffix(), ".bat");
        #[cfg(not(windows))]
        assert_eq!(script_suffix(), "");
    }
}
