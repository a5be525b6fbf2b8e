//! File integrity verification.
//!
//! Computes the SHA-256 digest of a file and compares it to the expected
//! lowercase hex string declared in the manifest.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;

/// Compute the full-file SHA-256 digest, hex-encoded in lowercase.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("opening {} for hashing", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("hashing {}", path.display()))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Whether a file's digest matches the expected value, byte-for-byte.
pub fn matches(path: &Path, expected: &str) -> Result<bool> {
    Ok(sha256_file(path)? == expected)
}
