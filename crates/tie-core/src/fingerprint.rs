//! Streaming content fingerprints for link sources.
//!
//! A fingerprint is the lowercase hex SHA-256 of the full file bytes. Files
//! are read in fixed-size chunks so large executables are never held in
//! memory at once.

use crate::config::FingerprintConfig;
use crate::error::{Result, TieError};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Compute the fingerprint of the file at `path`.
///
/// # Errors
///
/// Returns [`TieError::HashFailure`] if the file cannot be opened or a read
/// fails part way through. No retry is attempted.
pub fn compute_fingerprint(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let hash_err = |source: std::io::Error| TieError::HashFailure {
        path: path.to_path_buf(),
        source,
    };

    let mut file = std::fs::File::open(path).map_err(hash_err)?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; FingerprintConfig::CHUNK_SIZE];
    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(hash_err(e)),
        };
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Check whether the file at `path` still has the `expected` fingerprint.
///
/// The digests are compared byte for byte. I/O errors are returned, not
/// folded into `false`; callers decide what an unreadable file means.
pub fn fingerprint_matches(path: impl AsRef<Path>, expected: &str) -> Result<bool> {
    let actual = compute_fingerprint(path)?;
    Ok(actual == expected)
}
