// src/source.rs

//! Source archive acquisition and integrity verification

use crate::error::{Error, Result};
use crate::http::HttpClient;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Base name of a source URL, ignoring any query string or fragment
pub fn file_name_from_url(url: &str) -> Result<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let name = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("");

    if name.is_empty() || name.contains(':') || name == "." || name == ".." {
        return Err(Error::Network(format!(
            "Cannot derive a file name from source URL {}",
            url
        )));
    }
    Ok(name.to_string())
}

/// Download `url` into `dest_dir` and return the local path.
///
/// An existing file with the same name is reused unless `force` is set.
pub fn acquire(client: &HttpClient, url: &str, dest_dir: &Path, force: bool) -> Result<PathBuf> {
    let path = dest_dir.join(file_name_from_url(url)?);

    if path.exists() && !force {
        info!(
            "Source already present at {}, skipping download (use --force to re-download)",
            path.display()
        );
        return Ok(path);
    }

    if force && path.exists() {
        info!("Force flag set, re-downloading source from {}", url);
    }

    client.download_file(url, &path)?;
    Ok(path)
}

/// Hex-encoded SHA-256 of a file's contents
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| {
        Error::IoError(format!("Failed to open {} for hashing: {}", path.display(), e))
    })?;

    let mut hasher = Sha256::new();
    io::copy(&mut BufReader::new(file), &mut hasher).map_err(|e| {
        Error::IoError(format!("Failed to read {} for hashing: {}", path.display(), e))
    })?;

    Ok(hex::encode(hasher.finalize()))
}

/// Whether the file hashes to `expected_hex` (case-insensitive).
/// An empty expectation never matches.
pub fn verify(expected_hex: &str, path: &Path) -> Result<bool> {
    let expected = expected_hex.trim();
    if expected.is_empty() {
        debug!("No checksum declared for {}", path.display());
        return Ok(false);
    }

    let actual = sha256_file(path)?;
    Ok(actual.eq_ignore_ascii_case(expected))
}

/// Fail with a checksum mismatch unless the file hashes to `expected_hex`
pub fn ensure_integrity(expected_hex: &str, path: &Path) -> Result<()> {
    if verify(expected_hex, path)? {
        debug!("Checksum verified for {}", path.display());
        return Ok(());
    }

    Err(Error::ChecksumMismatch {
        path: path.display().to_string(),
        expected: expected_hex.trim().to_string(),
        actual: sha256_file(path)?,
    })
}
