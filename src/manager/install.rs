// src/manager/install.rs

//! Install pipeline
//!
//! Runs under a lock already held by the caller:
//! ensure manifest, load recipe, acquire and verify source, extract,
//! resolve build dir, run prepare and install, record the package.
//! Any failing stage aborts the rest; side effects of earlier build
//! commands are not rolled back.

use super::PackageManager;
use crate::archive;
use crate::build::{BuildExecutor, Phase};
use crate::error::{Error, Result};
use crate::manifest::InstalledEntry;
use crate::process::CommandRunner;
use crate::recipe::Recipe;
use crate::source;
use std::fmt;
use tracing::{debug, error, info};

/// Last stage the install pipeline completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStage {
    LockHeld,
    ManifestEnsured,
    RecipeLoaded,
    SourceAcquired,
    IntegrityVerified,
    Extracted,
    BuildDirResolved,
    EnvApplied,
    PrepareRun,
    InstallRun,
    ManifestUpdated,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstallStage::LockHeld => "lock held",
            InstallStage::ManifestEnsured => "manifest ensured",
            InstallStage::RecipeLoaded => "recipe loaded",
            InstallStage::SourceAcquired => "source acquired",
            InstallStage::IntegrityVerified => "integrity verified",
            InstallStage::Extracted => "extracted",
            InstallStage::BuildDirResolved => "build dir resolved",
            InstallStage::EnvApplied => "env applied",
            InstallStage::PrepareRun => "prepare run",
            InstallStage::InstallRun => "install run",
            InstallStage::ManifestUpdated => "manifest updated",
        };
        f.write_str(name)
    }
}

/// Tracks progress through the pipeline for failure reporting
struct Progress<'n> {
    name: &'n str,
    stage: InstallStage,
}

impl Progress<'_> {
    fn reach(&mut self, stage: InstallStage) {
        debug!("{}: {}", self.name, stage);
        self.stage = stage;
    }
}

impl<R: CommandRunner> PackageManager<'_, R> {
    /// Install `name`; the caller holds the lock.
    ///
    /// `recipe` short-circuits the recipe load when the caller already
    /// fetched it (as `update` does).
    pub(super) fn install_locked(
        &self,
        name: &str,
        recipe: Option<Recipe>,
        force: bool,
    ) -> Result<InstalledEntry> {
        info!("===== INSTALL START ===== pkg={} force={}", name, force);

        let mut progress = Progress {
            name,
            stage: InstallStage::LockHeld,
        };

        match self.run_pipeline(name, recipe, force, &mut progress) {
            Ok(entry) => {
                info!(
                    "===== INSTALL COMPLETE ===== {} {}-{}",
                    entry.name, entry.version, entry.release
                );
                Ok(entry)
            }
            Err(e) => {
                error!(
                    "Install of {} failed after stage '{}': {}",
                    name, progress.stage, e
                );
                Err(e)
            }
        }
    }

    fn run_pipeline(
        &self,
        name: &str,
        recipe: Option<Recipe>,
        force: bool,
        progress: &mut Progress<'_>,
    ) -> Result<InstalledEntry> {
        let store = self.manifest();
        store.ensure()?;
        progress.reach(InstallStage::ManifestEnsured);

        if !force && let Some(installed) = store.has(name)? {
            return Err(Error::AlreadyInstalled {
                name: installed.name,
                version: installed.version,
                release: installed.release,
            });
        }

        let recipe = match recipe {
            Some(recipe) => recipe,
            None => self.recipes().load(name, force)?,
        };
        if !force
            && recipe.name != name
            && let Some(installed) = store.has(&recipe.name)?
        {
            return Err(Error::AlreadyInstalled {
                name: installed.name,
                version: installed.version,
                release: installed.release,
            });
        }
        progress.reach(InstallStage::RecipeLoaded);

        let archive_path = source::acquire(
            &self.client,
            &recipe.source.url,
            &self.config.source_dir(),
            force,
        )?;
        progress.reach(InstallStage::SourceAcquired);

        source::ensure_integrity(&recipe.source.expected_sha256, &archive_path)?;
        progress.reach(InstallStage::IntegrityVerified);

        let extract_root = archive::extract(
            &archive_path,
            recipe.source.archive_type,
            &self.config.build_root(),
            force,
        )?;
        progress.reach(InstallStage::Extracted);

        let build_dir = archive::resolve_build_dir(&extract_root)?;
        info!("Build dir = {}", build_dir.display());
        progress.reach(InstallStage::BuildDirResolved);

        // The env table is passed to every spawned command rather than
        // written into this process's environment.
        progress.reach(InstallStage::EnvApplied);

        let executor = BuildExecutor::new(&self.runner);
        executor.run_phase(Phase::Prepare, &recipe.build, &build_dir)?;
        progress.reach(InstallStage::PrepareRun);

        executor.run_phase(Phase::Install, &recipe.build, &build_dir)?;
        progress.reach(InstallStage::InstallRun);

        let entry = InstalledEntry::from_recipe(&recipe);
        if force {
            store.replace(entry.clone())?;
        } else {
            store.add(entry.clone())?;
        }
        progress.reach(InstallStage::ManifestUpdated);

        Ok(entry)
    }
}
