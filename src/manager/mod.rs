// src/manager/mod.rs

//! Command boundary
//!
//! [`PackageManager`] exposes one method per user-facing operation. Every
//! state-mutating operation takes the instance lock for its whole duration
//! through a [`LockGuard`], so the lock is released however the operation
//! ends. Read-only operations never touch it.

mod install;

pub use install::InstallStage;

use crate::archive;
use crate::build::BuildExecutor;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::lock::LockGuard;
use crate::manifest::{InstalledEntry, Manifest, ManifestStore};
use crate::process::{CommandRunner, SystemRunner};
use crate::recipe::{Recipe, RecipeCache};
use crate::repository::{RepositorySync, load_repos};
use crate::source;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Facade over the lock, manifest, recipe cache, pipeline and repositories
pub struct PackageManager<'a, R: CommandRunner = SystemRunner> {
    config: &'a Config,
    cache_dir: PathBuf,
    client: HttpClient,
    runner: R,
}

impl<'a> PackageManager<'a, SystemRunner> {
    /// Manager running real subprocesses. `cache_dir` defaults to the root.
    pub fn new(config: &'a Config, cache_dir: Option<&Path>) -> Result<Self> {
        Self::with_runner(config, cache_dir, SystemRunner)
    }
}

impl<'a, R: CommandRunner> PackageManager<'a, R> {
    pub fn with_runner(config: &'a Config, cache_dir: Option<&Path>, runner: R) -> Result<Self> {
        Ok(Self {
            config,
            cache_dir: cache_dir
                .map(Path::to_path_buf)
                .unwrap_or_else(|| config.root.clone()),
            client: HttpClient::new()?,
            runner,
        })
    }

    pub fn config(&self) -> &Config {
        self.config
    }

    fn lock(&self) -> Result<LockGuard> {
        info!("Acquiring lock at {}", self.config.lock_path().display());
        LockGuard::acquire(self.config.lock_path())
    }

    fn manifest(&self) -> ManifestStore {
        ManifestStore::new(self.config.manifest_path())
    }

    fn recipes(&self) -> RecipeCache {
        RecipeCache::new(self.config, &self.cache_dir, self.client.clone())
    }

    /// Download a recipe into the cache without decoding it
    pub fn get(&self, name: &str) -> Result<PathBuf> {
        let _lock = self.lock()?;
        self.recipes().fetch(name)
    }

    /// Load (fetching if needed) and summarize a recipe
    pub fn info(&self, name: &str, force: bool) -> Result<Recipe> {
        self.recipes().load(name, force)
    }

    /// Run the full install pipeline for `name`.
    ///
    /// Without `force`, a package already in the manifest fails fast with
    /// [`Error::AlreadyInstalled`] before any network or build work. With
    /// `force`, everything is fetched, extracted and built again and the
    /// manifest entry replaced.
    pub fn install(&self, name: &str, force: bool) -> Result<InstalledEntry> {
        let _lock = self.lock()?;
        self.install_locked(name, None, force)
    }

    /// Run a package's uninstall commands and drop it from the manifest
    pub fn uninstall(&self, name: &str) -> Result<()> {
        let _lock = self.lock()?;

        let store = self.manifest();
        let installed = store
            .has(name)?
            .ok_or_else(|| Error::NotInstalled(name.to_string()))?;
        info!(
            "Uninstalling {} {}-{}",
            installed.name, installed.version, installed.release
        );

        let recipe = self.recipes().load(name, false)?;
        let dir = self.uninstall_dir(&recipe)?;

        BuildExecutor::new(&self.runner).run_uninstall(&recipe.build, &dir)?;
        store.remove(name)
    }

    /// Directory uninstall commands run in: the package's build directory
    /// when it is still around, the build root otherwise
    fn uninstall_dir(&self, recipe: &Recipe) -> Result<PathBuf> {
        let build_root = self.config.build_root();
        let archive_name = source::file_name_from_url(&recipe.source.url)?;
        let extract_root = build_root.join(archive::extraction_dir_name(Path::new(&archive_name)));

        if extract_root.is_dir() {
            return archive::resolve_build_dir(&extract_root);
        }

        debug!(
            "{} not present, running uninstall from {}",
            extract_root.display(),
            build_root.display()
        );
        fs::create_dir_all(&build_root).map_err(|e| {
            Error::IoError(format!("Failed to create {}: {}", build_root.display(), e))
        })?;
        Ok(build_root)
    }

    /// Clone or update every configured repository
    pub fn sync(&self, force: bool) -> Result<()> {
        let _lock = self.lock()?;
        self.sync_locked(force)
    }

    fn sync_locked(&self, force: bool) -> Result<()> {
        let repos = load_repos(&self.config.repo_config_path())?;
        RepositorySync::new(&repos, &self.config.repo_cache_dir(), &self.runner).sync(force)
    }

    /// Sync repositories, then reinstall every installed package whose
    /// recipe now names a different version or release.
    ///
    /// Returns the entries that were reinstalled.
    pub fn update(&self, force: bool) -> Result<Vec<InstalledEntry>> {
        let _lock = self.lock()?;
        self.sync_locked(force)?;

        let manifest = self.manifest().load()?;
        let recipes = self.recipes();
        let mut updated = Vec::new();

        for entry in &manifest.installed {
            let recipe = recipes.load(&entry.name, true)?;
            if !entry.differs_from(&recipe) {
                info!("{} {}-{} is up to date", entry.name, entry.version, entry.release);
                continue;
            }

            info!(
                "Updating {} {}-{} -> {}-{}",
                entry.name, entry.version, entry.release, recipe.version, recipe.release
            );
            updated.push(self.install_locked(&entry.name, Some(recipe), true)?);
        }

        info!("{} package(s) updated", updated.len());
        Ok(updated)
    }

    /// Remove and recreate the recipe cache, source and build directories
    pub fn clean(&self) -> Result<()> {
        let _lock = self.lock()?;

        for dir in [
            self.config.recipe_dir(&self.cache_dir),
            self.config.source_dir(),
            self.config.build_root(),
        ] {
            info!("Cleaning {}", dir.display());
            match fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(Error::IoError(format!(
                        "Failed to remove {}: {}",
                        dir.display(),
                        e
                    )));
                }
            }
            fs::create_dir_all(&dir).map_err(|e| {
                Error::IoError(format!("Failed to create {}: {}", dir.display(), e))
            })?;
        }

        Ok(())
    }

    /// Installed packages, in manifest order
    pub fn list(&self) -> Result<Manifest> {
        self.manifest().load()
    }
}
