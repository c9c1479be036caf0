// src/repository/mod.rs

//! Repository synchronization
//!
//! Each configured repository is a git checkout under the repository cache.
//! A missing checkout is cloned at its configured ref; an existing one is
//! pulled, or with `force` fetched and hard-reset to `origin/<ref>`,
//! discarding local changes.

pub mod config;

pub use config::{DEFAULT_REPO_CONFIG, RepoConfig, load_repos, save_repos};

use crate::error::Result;
use crate::process::CommandRunner;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Keeps local checkouts of the configured repositories current
pub struct RepositorySync<'a, R: CommandRunner> {
    repos: &'a BTreeMap<String, RepoConfig>,
    cache_dir: PathBuf,
    runner: R,
}

impl<'a, R: CommandRunner> RepositorySync<'a, R> {
    pub fn new(repos: &'a BTreeMap<String, RepoConfig>, cache_dir: &Path, runner: R) -> Self {
        Self {
            repos,
            cache_dir: cache_dir.to_path_buf(),
            runner,
        }
    }

    /// Local checkout path for a repository
    pub fn repo_path(&self, repo: &RepoConfig) -> PathBuf {
        self.cache_dir.join(&repo.name)
    }

    /// Sync every repository in name order. The first failure aborts the run.
    pub fn sync(&self, force: bool) -> Result<()> {
        for repo in self.repos.values() {
            self.sync_one(repo, force)?;
        }
        Ok(())
    }

    fn sync_one(&self, repo: &RepoConfig, force: bool) -> Result<()> {
        let path = self.repo_path(repo);
        let path_str = path.to_string_lossy();

        if !path.exists() {
            info!("Cloning {} ({}) into {}", repo.name, repo.git_ref, path.display());
            std::fs::create_dir_all(&self.cache_dir)?;
            return self.git(&["clone", "-b", &repo.git_ref, &repo.url, &path_str]);
        }

        if force {
            info!("Resetting {} to origin/{}", repo.name, repo.git_ref);
            self.git(&["-C", &path_str, "fetch", "--all"])?;
            let target = format!("origin/{}", repo.git_ref);
            return self.git(&["-C", &path_str, "reset", "--hard", &target]);
        }

        info!("Pulling {}", repo.name);
        self.git(&["-C", &path_str, "pull"])
    }

    fn git(&self, args: &[&str]) -> Result<()> {
        self.runner.run("git", args, None, &BTreeMap::new())
    }
}
