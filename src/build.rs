// src/build.rs

//! Build lifecycle execution
//!
//! Recipe commands are opaque shell strings. Each one is handed to `sh -c`
//! with the build directory as working directory and the recipe's `env`
//! table added to the environment. The first failing command stops the
//! phase; nothing is retried.

use crate::error::Result;
use crate::process::CommandRunner;
use crate::recipe::BuildSpec;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Lifecycle command lists a recipe declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Prepare,
    Install,
    Uninstall,
}

impl Phase {
    fn commands(self, spec: &BuildSpec) -> &[String] {
        match self {
            Phase::Prepare => &spec.prepare,
            Phase::Install => &spec.install,
            Phase::Uninstall => &spec.uninstall,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Prepare => write!(f, "prepare"),
            Phase::Install => write!(f, "install"),
            Phase::Uninstall => write!(f, "uninstall"),
        }
    }
}

/// Runs recipe lifecycle phases through a [`CommandRunner`]
pub struct BuildExecutor<R: CommandRunner> {
    runner: R,
}

impl<R: CommandRunner> BuildExecutor<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Run prepare then install in `build_dir`
    pub fn run(&self, spec: &BuildSpec, build_dir: &Path) -> Result<()> {
        self.run_phase(Phase::Prepare, spec, build_dir)?;
        self.run_phase(Phase::Install, spec, build_dir)
    }

    /// Run the uninstall commands in `dir`
    pub fn run_uninstall(&self, spec: &BuildSpec, dir: &Path) -> Result<()> {
        self.run_phase(Phase::Uninstall, spec, dir)
    }

    /// Run one phase's commands in order, stopping at the first failure
    pub fn run_phase(&self, phase: Phase, spec: &BuildSpec, dir: &Path) -> Result<()> {
        let commands = phase.commands(spec);
        if commands.is_empty() {
            debug!("No {} commands", phase);
            return Ok(());
        }

        for (key, value) in &spec.env {
            debug!("env {}={}", key, value);
        }

        for cmd in commands {
            info!("{} → {}", phase, cmd);
            self.runner
                .run("sh", &["-c", cmd.as_str()], Some(dir), &spec.env)?;
        }

        Ok(())
    }
}
