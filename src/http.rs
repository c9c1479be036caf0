// src/http.rs

//! Blocking HTTP client used for recipe and source downloads

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Connection establishment timeout. Transfers themselves are unbounded.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum attempts for transport-level failures
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds, multiplied by the attempt number
const RETRY_DELAY_MS: u64 = 1000;

/// HTTP client wrapper with retry support
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
}

impl HttpClient {
    /// Create a new client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(None)
            .user_agent(concat!("blink/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
        })
    }

    /// Stream `url` into `dest_path`.
    ///
    /// The body is written to a temp file next to the destination and renamed
    /// into place once complete, so an interrupted transfer never leaves a
    /// truncated file at `dest_path`. Non-success statuses fail immediately;
    /// transport errors are retried.
    pub fn download_file(&self, url: &str, dest_path: &Path) -> Result<()> {
        info!("Downloading {} to {}", url, dest_path.display());

        let dir = dest_path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(|e| {
            Error::IoError(format!("Failed to create directory {}: {}", dir.display(), e))
        })?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url).send() {
                Ok(mut response) => {
                    if !response.status().is_success() {
                        return Err(Error::Network(format!(
                            "HTTP {} from {}",
                            response.status(),
                            url
                        )));
                    }

                    let mut tmp = tempfile::Builder::new()
                        .prefix(".download-")
                        .tempfile_in(dir)
                        .map_err(|e| {
                            Error::IoError(format!(
                                "Failed to create temp file in {}: {}",
                                dir.display(),
                                e
                            ))
                        })?;

                    let bytes = io::copy(&mut response, &mut tmp).map_err(|e| {
                        Error::Network(format!("Failed to read body of {}: {}", url, e))
                    })?;

                    tmp.persist(dest_path).map_err(|e| {
                        Error::IoError(format!(
                            "Failed to move download into place at {}: {}",
                            dest_path.display(),
                            e.error
                        ))
                    })?;

                    debug!("Wrote {} bytes to {}", bytes, dest_path.display());
                    return Ok(());
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::Network(format!(
                            "Failed to download {} after {} attempts: {}",
                            url, attempt, e
                        )));
                    }
                    warn!("Download attempt {} failed: {}, retrying...", attempt, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }
}
