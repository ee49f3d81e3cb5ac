// src/watch/hash.rs

//! Content hashing for output files.
//!
//! The task runner compares the hash of a freshly transformed output with
//! the file already on disk and skips the write when they match. Unchanged
//! outputs keep their mtime and do not trigger a browser reload.

use std::path::Path;

use anyhow::Result;
use blake3::Hasher;

use crate::fs::FileSystem;

/// Hex-encoded blake3 hash of a byte slice.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize().to_hex().to_string()
}

/// Compute the hash of a single file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let contents = fs.read(path)?;
    Ok(hash_bytes(&contents))
}

/// True when `path` exists and already holds exactly `contents`.
pub fn is_unchanged(fs: &dyn FileSystem, path: &Path, contents: &[u8]) -> bool {
    if !fs.is_file(path) {
        return false;
    }
    match compute_file_hash(fs, path) {
        Ok(existing) => existing == hash_bytes(contents),
        Err(_) => false,
    }
}
