// src/error.rs

use thiserror::Error;

/// Core error types for Blink
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// I/O errors with path context
    #[error("I/O error: {0}")]
    IoError(String),

    /// Another instance holds the lock, or the lock could not be created/removed
    #[error("Lock error: {0}")]
    Lock(String),

    /// Missing or malformed application/repository configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure or non-success HTTP status
    #[error("Network error: {0}")]
    Network(String),

    /// Downloaded source does not hash to the recipe's declared digest
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    /// Corrupt or unsafe archive stream
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Archive type tag not known to the extractor
    #[error("Unsupported archive type: {0}")]
    UnsupportedArchive(String),

    /// A lifecycle or version-control command exited unsuccessfully
    #[error("Command failed: {command} {args:?} ({status})\nstderr: {stderr}")]
    CommandFailed {
        command: String,
        args: Vec<String>,
        status: String,
        stderr: String,
    },

    /// I/O or decode failure on the manifest document
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Recipe document could not be decoded
    #[error("Recipe error: {0}")]
    Recipe(String),

    /// Package is already recorded in the manifest
    #[error("Package {name} already installed (version={version} release={release})")]
    AlreadyInstalled {
        name: String,
        version: String,
        release: u32,
    },

    /// Package is not recorded in the manifest
    #[error("Package '{0}' is not installed")]
    NotInstalled(String),
}

/// Result type alias using Blink's Error type
pub type Result<T> = std::result::Result<T, Error>;
