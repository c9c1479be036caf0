// src/config.rs

//! Application configuration
//!
//! A `Config` is built once at startup from the install root (and the
//! optional `<root>/etc/blink.toml` settings document) and handed by
//! reference to every component. All on-disk locations are derived from it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default install root
pub const DEFAULT_ROOT: &str = "/var/blink";

/// Raw recipe index the fetcher downloads `<name>.<ext>` documents from
pub const DEFAULT_INDEX_URL: &str =
    "https://raw.githubusercontent.com/Aperture-OS/testing-blink-repo/refs/heads/main/pseudoRepo/";

/// Human-facing location of the recipe index
pub const DEFAULT_INDEX_DISPLAY_URL: &str =
    "https://github.com/Aperture-OS/testing-blink-repo/blob/main/pseudoRepo";

/// On-disk encoding of recipe documents in the index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeFormat {
    #[default]
    Json,
    Toml,
}

impl RecipeFormat {
    /// File extension used both remotely and in the recipe cache
    pub fn extension(&self) -> &'static str {
        match self {
            RecipeFormat::Json => "json",
            RecipeFormat::Toml => "toml",
        }
    }
}

impl fmt::Display for RecipeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Optional overrides read from `<root>/etc/blink.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Settings {
    index_url: Option<String>,
    index_display_url: Option<String>,
    recipe_format: Option<RecipeFormat>,
}

/// Process-wide configuration, read-only after construction
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub index_url: String,
    pub index_display_url: String,
    pub recipe_format: RecipeFormat,
}

impl Config {
    /// Configuration with built-in defaults rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index_url: DEFAULT_INDEX_URL.to_string(),
            index_display_url: DEFAULT_INDEX_DISPLAY_URL.to_string(),
            recipe_format: RecipeFormat::default(),
        }
    }

    /// Load configuration for `root`, applying `<root>/etc/blink.toml` if present
    pub fn load(root: &Path) -> Result<Self> {
        let mut config = Self::new(root);
        let settings_path = config.settings_path();

        if !settings_path.exists() {
            debug!("No settings file at {}, using defaults", settings_path.display());
            return Ok(config);
        }

        let content = std::fs::read_to_string(&settings_path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", settings_path.display(), e))
        })?;
        let settings: Settings = toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Invalid settings in {}: {}", settings_path.display(), e))
        })?;

        if let Some(url) = settings.index_url {
            config.index_url = url;
        }
        if let Some(url) = settings.index_display_url {
            config.index_display_url = url;
        }
        if let Some(format) = settings.recipe_format {
            config.recipe_format = format;
        }

        debug!("Loaded settings from {}", settings_path.display());
        Ok(config)
    }

    /// Point the recipe fetcher at a different index
    #[must_use]
    pub fn with_index_url(mut self, url: &str) -> Self {
        self.index_url = url.to_string();
        self
    }

    pub fn etc_dir(&self) -> PathBuf {
        self.root.join("etc")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.etc_dir().join("blink.toml")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.etc_dir().join("blink.lock")
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.etc_dir().join("manifest.toml")
    }

    /// Repository config document (name -> git_url/branch)
    pub fn repo_config_path(&self) -> PathBuf {
        self.etc_dir().join("config.toml")
    }

    pub fn repo_cache_dir(&self) -> PathBuf {
        self.root.join("repositories")
    }

    pub fn source_dir(&self) -> PathBuf {
        self.root.join("sources")
    }

    pub fn build_root(&self) -> PathBuf {
        self.root.join("build")
    }

    /// Recipe cache under the given cache directory (`--path`, defaults to root)
    pub fn recipe_dir(&self, cache_dir: &Path) -> PathBuf {
        cache_dir.join("recipes")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}
