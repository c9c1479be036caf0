// src/process.rs

//! External process execution
//!
//! Build lifecycle commands and git invocations go through [`CommandRunner`]
//! so the components that issue them can be exercised without spawning real
//! processes.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Capability to run one external program to completion
pub trait CommandRunner {
    /// Run `program` with `args`, optionally in `dir`, with `env` added to
    /// the inherited environment. A non-zero exit is an error carrying the
    /// captured stderr.
    fn run(
        &self,
        program: &str,
        args: &[&str],
        dir: Option<&Path>,
        env: &BTreeMap<String, String>,
    ) -> Result<()>;
}

/// Runs commands as real child processes.
///
/// Stdout streams straight to the terminal; stderr is captured so it can be
/// attached to the error, and echoed once the command finishes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        dir: Option<&Path>,
        env: &BTreeMap<String, String>,
    ) -> Result<()> {
        debug!("Running {} {:?}", program, args);

        let mut command = Command::new(program);
        command
            .args(args)
            .envs(env)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped());
        if let Some(dir) = dir {
            command.current_dir(dir);
        }

        let output = command.output().map_err(|e| Error::CommandFailed {
            command: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            status: format!("failed to start: {}", e),
            stderr: String::new(),
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !stderr.is_empty() {
            let _ = std::io::stderr().write_all(stderr.as_bytes());
        }

        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: program.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
                status: output.status.to_string(),
                stderr: stderr.trim_end().to_string(),
            });
        }

        Ok(())
    }
}

impl<R: CommandRunner + ?Sized> CommandRunner for &R {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        dir: Option<&Path>,
        env: &BTreeMap<String, String>,
    ) -> Result<()> {
        (**self).run(program, args, dir, env)
    }
}
