// src/repository/config.rs

//! Repository config document
//!
//! `etc/config.toml` holds one table per repository:
//!
//! ```toml
//! [pseudoRepository]
//! git_url = "https://github.com/Aperture-OS/testing-blink-repo.git"
//! branch = "main"
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Written when no repository config exists yet
pub const DEFAULT_REPO_CONFIG: &str = r#"[pseudoRepository]
git_url = "https://github.com/Aperture-OS/testing-blink-repo.git"
branch = "main"
"#;

/// One version-controlled recipe source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    pub name: String,
    pub url: String,
    /// Branch (or other ref) to track
    pub git_ref: String,
}

/// On-disk shape of a repository table
#[derive(Debug, Serialize, Deserialize)]
struct RawRepo {
    git_url: String,
    branch: String,
}

/// Load the repository mapping from `path`, writing the default document
/// first when the file does not exist. Keys are iterated in name order.
pub fn load_repos(path: &Path) -> Result<BTreeMap<String, RepoConfig>> {
    if !path.exists() {
        info!("No repository config at {}, writing default", path.display());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Config(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        fs::write(path, DEFAULT_REPO_CONFIG).map_err(|e| {
            Error::Config(format!("Failed to write {}: {}", path.display(), e))
        })?;
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    let raw: BTreeMap<String, RawRepo> = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    if raw.is_empty() {
        return Err(Error::Config(format!(
            "No repositories configured in {}",
            path.display()
        )));
    }

    let repos: BTreeMap<_, _> = raw
        .into_iter()
        .map(|(name, repo)| {
            let config = RepoConfig {
                name: name.clone(),
                url: repo.git_url,
                git_ref: repo.branch,
            };
            (name, config)
        })
        .collect();

    debug!("Loaded {} repositories from {}", repos.len(), path.display());
    Ok(repos)
}

/// Write the repository mapping to `path`
pub fn save_repos(path: &Path, repos: &BTreeMap<String, RepoConfig>) -> Result<()> {
    let raw: BTreeMap<&str, RawRepo> = repos
        .iter()
        .map(|(name, repo)| {
            (
                name.as_str(),
                RawRepo {
                    git_url: repo.url.clone(),
                    branch: repo.git_ref.clone(),
                },
            )
        })
        .collect();

    let content = toml::to_string_pretty(&raw)
        .map_err(|e| Error::Config(format!("Failed to serialize repositories: {}", e)))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            Error::Config(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }
    fs::write(path, content)
        .map_err(|e| Error::Config(format!("Failed to write {}: {}", path.display(), e)))?;

    info!("Saved {} repositories to {}", repos.len(), path.display());
    Ok(())
}
