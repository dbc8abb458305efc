//! Platform abstraction layer for cross-platform compatibility.
//!
//! All `#[cfg]` blocks for OS-specific behavior live here rather than being
//! scattered through the registry code.
//!
//! - `link` - Link artifact creation (symlink or indirection script)
//! - `paths` - Home directory resolution and absolute paths
//! - `permissions` - Executable bits

pub mod link;
pub mod paths;
pub mod permissions;

pub use link::{
    artifact_exists, probe_link_manager, remove_artifact, LinkKind, LinkManager, ScriptFallback,
    SymlinkCapable,
};
pub use paths::{absolute_path, exe_dir, occupies, resolve_home, resolve_location};
pub use permissions::set_executable;

use crate::config::OWNER_ENV_VARS;

/// Returns the current platform name.
pub fn current_platform() -> &'static str {
    #[cfg(target_os = "linux")]
    {
        "linux"
    }
    #[cfg(target_os = "windows")]
    {
        "windows"
    }
    #[cfg(target_os = "macos")]
    {
        "macos"
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
    {
        "unknown"
    }
}

/// Best-effort name of the user running the process.
///
/// Checks `USERNAME` then `USER`; returns an empty string when neither is set.
pub fn current_owner() -> String {
    OWNER_ENV_VARS
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}
