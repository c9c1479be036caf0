// src/manifest/mod.rs

//! Manifest store
//!
//! Durable record of installed packages, kept as a TOML document. Every
//! mutation is a full load-modify-save round trip; nothing is cached in
//! memory between operations. Saves go through a temp file in the same
//! directory followed by a rename, so readers only ever see the previous
//! or the new document, never a partial one.

pub mod models;

pub use models::{InstalledEntry, Manifest};

use crate::error::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Owner of the manifest document at a fixed path
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create an empty manifest if none exists. Idempotent.
    pub fn ensure(&self) -> Result<()> {
        debug!("Ensuring manifest exists at {}", self.path.display());
        if self.path.exists() {
            return Ok(());
        }
        self.save(&Manifest::default())
    }

    /// Read the manifest; a missing file is an empty manifest
    pub fn load(&self) -> Result<Manifest> {
        debug!("Loading manifest from {}", self.path.display());

        if !self.path.exists() {
            return Ok(Manifest::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            Error::Manifest(format!("Failed to read {}: {}", self.path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            Error::Manifest(format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }

    /// Atomically replace the manifest document
    pub fn save(&self, manifest: &Manifest) -> Result<()> {
        debug!("Saving manifest ({} packages)", manifest.len());

        let dir = self.path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(|e| {
            Error::Manifest(format!("Failed to create directory {}: {}", dir.display(), e))
        })?;

        let content = toml::to_string_pretty(manifest)
            .map_err(|e| Error::Manifest(format!("Failed to serialize manifest: {}", e)))?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".manifest-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| {
                Error::Manifest(format!("Failed to create temp file in {}: {}", dir.display(), e))
            })?;
        tmp.write_all(content.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| Error::Manifest(format!("Failed to write manifest: {}", e)))?;

        tmp.persist(&self.path).map_err(|e| {
            Error::Manifest(format!(
                "Failed to move manifest into place at {}: {}",
                self.path.display(),
                e.error
            ))
        })?;

        // Make the rename itself durable.
        if let Ok(d) = fs::File::open(dir) {
            let _ = d.sync_all();
        }

        Ok(())
    }

    /// Look up an installed package by name
    pub fn has(&self, name: &str) -> Result<Option<InstalledEntry>> {
        Ok(self.load()?.get(name).cloned())
    }

    /// Record a package. An entry with the same name is left untouched.
    pub fn add(&self, entry: InstalledEntry) -> Result<()> {
        info!("Adding {} to manifest", entry.name);

        let mut manifest = self.load()?;
        if manifest.contains(&entry.name) {
            warn!("{} already recorded in manifest", entry.name);
            return Ok(());
        }

        manifest.installed.push(entry);
        self.save(&manifest)
    }

    /// Record a package, overwriting any entry with the same name in place
    pub fn replace(&self, entry: InstalledEntry) -> Result<()> {
        info!("Recording {} {}-{} in manifest", entry.name, entry.version, entry.release);

        let mut manifest = self.load()?;
        match manifest.installed.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => manifest.installed.push(entry),
        }
        self.save(&manifest)
    }

    /// Drop a package's entry. Removing an absent package succeeds.
    pub fn remove(&self, name: &str) -> Result<()> {
        info!("Removing {} from manifest", name);

        let mut manifest = self.load()?;
        let before = manifest.len();
        manifest.installed.retain(|entry| entry.name != name);

        if manifest.len() == before {
            warn!("{} not found in manifest", name);
            return Ok(());
        }

        self.save(&manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ManifestStore) {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::new(dir.path().join("etc/manifest.toml"));
        (dir, store)
    }

    fn entry(name: &str, version: &str, release: u32) -> InstalledEntry {
        InstalledEntry::new(name.to_string(), version.to_string(), release)
    }

    #[test]
    fn test_load_missing_is_empty() {
        let (_dir, store) = store();
        let manifest = store.load().unwrap();
        assert!(manifest.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let (_dir, store) = store();
        store.ensure().unwrap();
        assert!(store.path().exists());

        store.add(entry("foo", "1.0", 1)).unwrap();
        store.ensure().unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_load_malformed_is_manifest_error() {
        let (_dir, store) = store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "[[installed]]\nname = ").unwrap();

        assert!(matches!(store.load(), Err(Error::Manifest(_))));
    }

    #[test]
    fn test_add_preserves_order() {
        let (_dir, store) = store();
        store.add(entry("zlib", "1.3", 1)).unwrap();
        store.add(entry("bash", "5.2", 2)).unwrap();
        store.add(entry("make", "4.4", 1)).unwrap();

        let names: Vec<_> = store
            .load()
            .unwrap()
            .installed
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["zlib", "bash", "make"]);
    }

    #[test]
    fn test_repeated_add_keeps_single_entry() {
        let (_dir, store) = store();
        for release in 1..=5 {
            store.add(entry("foo", "1.0", release)).unwrap();
        }

        let manifest = store.load().unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get("foo").unwrap().release, 1);
    }

    #[test]
    fn test_has() {
        let (_dir, store) = store();
        store.add(entry("foo", "1.0", 3)).unwrap();

        let found = store.has("foo").unwrap().unwrap();
        assert_eq!(found.version, "1.0");
        assert_eq!(found.release, 3);
        assert!(store.has("bar").unwrap().is_none());
    }

    #[test]
    fn test_replace_overwrites_in_place() {
        let (_dir, store) = store();
        store.add(entry("foo", "1.0", 1)).unwrap();
        store.add(entry("bar", "2.0", 1)).unwrap();

        store.replace(entry("foo", "1.1", 2)).unwrap();

        let manifest = store.load().unwrap();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.installed[0].name, "foo");
        assert_eq!(manifest.installed[0].version, "1.1");
        assert_eq!(manifest.installed[0].release, 2);
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let (_dir, store) = store();
        store.add(entry("foo", "1.0", 1)).unwrap();

        store.remove("bar").unwrap();
        assert_eq!(store.load().unwrap().len(), 1);

        store.remove("foo").unwrap();
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_interrupted_save_leaves_previous_manifest() {
        let (_dir, store) = store();
        store.add(entry("foo", "1.0", 1)).unwrap();
        let before = store.load().unwrap();

        // A writer that died before the rename leaves only a stray temp file.
        let dir = store.path().parent().unwrap();
        let mut partial = tempfile::Builder::new()
            .prefix(".manifest-")
            .suffix(".tmp")
            .tempfile_in(dir)
            .unwrap();
        partial.write_all(b"[[installed]]\nname = \"tru").unwrap();
        let _ = partial.into_temp_path().keep().unwrap();

        assert_eq!(store.load().unwrap(), before);
    }

    #[test]
    fn test_saved_document_is_readable_toml() {
        let (_dir, store) = store();
        store.add(entry("foo", "1.0", 1)).unwrap();

        let content = fs::read_to_string(store.path()).unwrap();
        assert!(content.contains("[[installed]]"));
        assert!(content.contains("name = \"foo\""));
    }
}
