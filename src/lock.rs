// src/lock.rs

//! Single-instance lock
//!
//! The lock is a plain file whose existence is the state. It is created with
//! an exclusive-create open so two invocations can never both succeed, and
//! carries the owner's pid purely for humans debugging a leftover lock. The
//! pid is never read back: a lock left behind by a crashed process has to be
//! removed by hand.

use crate::error::{Error, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Whether a lock file exists at `lock_path`
pub fn is_locked(lock_path: &Path) -> bool {
    lock_path.exists()
}

/// Create the lock file, failing if it already exists
pub fn acquire(lock_path: &Path) -> Result<()> {
    if let Some(parent) = lock_path.parent()
        && !parent.exists()
    {
        info!("Lock directory does not exist, creating {}", parent.display());
        fs::create_dir_all(parent).map_err(|e| {
            Error::Lock(format!("Failed to create lock directory {}: {}", parent.display(), e))
        })?;
    }

    debug!("Inserting lock file at {}", lock_path.display());
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o644)
        .open(lock_path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => held_error(lock_path),
            _ => Error::Lock(format!(
                "Failed to create lock file at {}: {}",
                lock_path.display(),
                e
            )),
        })?;

    writeln!(file, "{}", std::process::id()).map_err(|e| {
        Error::Lock(format!("Failed to write lock file {}: {}", lock_path.display(), e))
    })?;

    debug!("Lock inserted at {}", lock_path.display());
    Ok(())
}

/// Remove the lock file
pub fn release(lock_path: &Path) -> Result<()> {
    fs::remove_file(lock_path).map_err(|e| {
        Error::Lock(format!(
            "Failed to remove lock file {}: {}. Remove it manually before running blink again",
            lock_path.display(),
            e
        ))
    })?;
    debug!("Lock at {} released", lock_path.display());
    Ok(())
}

fn held_error(lock_path: &Path) -> Error {
    Error::Lock(format!(
        "Another blink instance holds the lock at {}. If no blink process is running \
         (check with 'ps aux | grep blink'), remove the file manually",
        lock_path.display()
    ))
}

/// Scoped ownership of the lock for one command invocation.
///
/// Released when dropped, so every exit path of the owning command
/// (success, `?` early return, or unwinding panic) removes the file.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    /// Check-then-acquire the lock at `lock_path`
    pub fn acquire(lock_path: impl Into<PathBuf>) -> Result<Self> {
        let path = lock_path.into();
        if is_locked(&path) {
            return Err(held_error(&path));
        }
        acquire(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = release(&self.path) {
            error!("{}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use tempfile::TempDir;

    #[test]
    fn test_acquire_writes_pid_and_creates_parent() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("etc/blink.lock");

        assert!(!is_locked(&lock_path));
        acquire(&lock_path).unwrap();
        assert!(is_locked(&lock_path));

        let content = fs::read_to_string(&lock_path).unwrap();
        assert_eq!(content.trim(), std::process::id().to_string());
    }

    #[test]
    fn test_second_acquire_fails() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("blink.lock");

        acquire(&lock_path).unwrap();
        let result = acquire(&lock_path);
        assert!(matches!(result, Err(Error::Lock(_))));

        release(&lock_path).unwrap();
        assert!(!is_locked(&lock_path));
    }

    #[test]
    fn test_release_missing_lock_is_error() {
        let dir = TempDir::new().unwrap();
        let result = release(&dir.path().join("blink.lock"));
        assert!(matches!(result, Err(Error::Lock(_))));
    }

    #[test]
    fn test_guard_released_on_drop() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("blink.lock");

        {
            let guard = LockGuard::acquire(&lock_path).unwrap();
            assert_eq!(guard.path(), lock_path.as_path());
            assert!(is_locked(&lock_path));
            assert!(LockGuard::acquire(&lock_path).is_err());
        }

        assert!(!is_locked(&lock_path));
    }

    #[test]
    fn test_guard_released_on_panic() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("blink.lock");

        let path = lock_path.clone();
        let result = std::panic::catch_unwind(move || {
            let _guard = LockGuard::acquire(&path).unwrap();
            panic!("build blew up");
        });

        assert!(result.is_err());
        assert!(!is_locked(&lock_path));
    }

    #[test]
    fn test_stale_lock_is_not_reclaimed() {
        let dir = TempDir::new().unwrap();
        let lock_path = dir.path().join("blink.lock");
        // Pid of a process that no longer exists still blocks.
        fs::write(&lock_path, "999999999\n").unwrap();

        assert!(LockGuard::acquire(&lock_path).is_err());
        assert!(is_locked(&lock_path));
    }

    #[test]
    fn test_concurrent_acquire_exactly_one_wins() {
        let dir = TempDir::new().unwrap();
        let lock_path = Arc::new(dir.path().join("blink.lock"));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lock_path = Arc::clone(&lock_path);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    acquire(&lock_path).is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert!(is_locked(&lock_path));
    }
}
