//! Platform-specific file permission handling.

use crate::error::Result;
#[cfg(unix)]
use crate::error::TieError;
use std::path::Path;
use tracing::debug;

/// Make a file executable.
///
/// # Platform Behavior
/// - **Linux/macOS**: Sets mode 0o755
/// - **Windows**: No-op (executability is determined by file extension)
pub fn set_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = std::fs::metadata(path).map_err(|e| TieError::io_with_path(e, path))?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(0o755);
        std::fs::set_permissions(path, permissions).map_err(|e| TieError::io_with_path(e, path))?;
        debug!("Set executable permissions on: {}", path.display());
    }

    #[cfg(not(unix))]
    {
        debug!("Skipping executable bit for: {}", path.display());
    }

    Ok(())
}

/// Check if a file has executable permissions.
///
/// # Platform Behavior
/// - **Linux/macOS**: Checks if any execute bit is set
/// - **Windows**: True for common executable extensions (.exe, .bat, .cmd, .ps1, .com)
pub fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|metadata| metadata.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    {
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .map(|ext| matches!(ext.as_str(), "exe" | "bat" | "cmd" | "ps1" | "com"))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_set_executable() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("tool.bat");
        File::create(&file_path).unwrap();

        set_executable(&file_path).unwrap();

        assert!(is_executable(&file_path));
    }

    #[test]
    fn test_set_executable_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");

        #[cfg(unix)]
        assert!(set_executable(&missing).is_err());
        #[cfg(not(unix))]
        assert!(set_executable(&missing).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_is_executable_unix() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("plain");
        File::create(&file_path).unwrap();
        let mut perms = std::fs::metadata(&file_path).unwrap().permissions();
        perms.set_mode(0o644);
        std::fs::set_permissions(&file_path, perms).unwrap();

        assert!(!is_executable(&file_path));
    }
}
