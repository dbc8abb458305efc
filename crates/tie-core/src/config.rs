//! Centralized configuration for lite-tie.
//!
//! File names, environment variables, and tuning constants used by the
//! registry, fingerprinting, and link creation.

/// Registry document location and format.
pub struct RegistryConfig;

impl RegistryConfig {
    /// Fixed base name of the registry document.
    pub const FILE_NAME: &'static str = ".registry.json";
    /// Overrides the executable directory as registry and link home.
    pub const HOME_ENV: &'static str = "LITE_TIE_HOME";
    /// Default for keeping a `.bak` copy of the previous document on every
    /// write (see `LiteTieBuilder::keep_backup`).
    pub const KEEP_BACKUP: bool = false;
}

/// Content fingerprinting.
pub struct FingerprintConfig;

impl FingerprintConfig {
    /// Read buffer size when streaming a file through the hasher (1MB).
    pub const CHUNK_SIZE: usize = 1024 * 1024;
    /// Length of a hex-encoded SHA-256 digest.
    pub const HEX_LEN: usize = 64;
}

/// Link artifact creation.
pub struct LinkConfig;

impl LinkConfig {
    /// Suffix appended to the link path for Windows indirection scripts.
    pub const WINDOWS_SCRIPT_SUFFIX: &'static str = ".bat";
    /// Name of the throw-away symlink used to probe link capability.
    pub const PROBE_FILE_NAME: &'static str = ".lite-tie-probe";
}

/// Environment variables consulted for the entry owner, in order.
pub const OWNER_ENV_VARS: [&str; 2] = ["USERNAME", "USER"];
