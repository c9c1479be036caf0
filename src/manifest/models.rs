// src/manifest/models.rs

//! Data models for the installed-package manifest

use crate::recipe::Recipe;
use serde::{Deserialize, Serialize};

/// A package recorded as installed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledEntry {
    pub name: String,
    pub version: String,
    pub release: u32,
    /// Unix timestamp (seconds)
    #[serde(default)]
    pub installed_at: i64,
}

impl InstalledEntry {
    /// Create an entry stamped with the current time
    pub fn new(name: String, version: String, release: u32) -> Self {
        Self {
            name,
            version,
            release,
            installed_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Entry for a freshly installed recipe
    pub fn from_recipe(recipe: &Recipe) -> Self {
        Self::new(recipe.name.clone(), recipe.version.clone(), recipe.release)
    }

    /// Whether `recipe` describes a different build than this entry
    pub fn differs_from(&self, recipe: &Recipe) -> bool {
        self.version != recipe.version || self.release != recipe.release
    }

    /// Install time formatted for humans
    pub fn installed_at_display(&self) -> String {
        chrono::DateTime::from_timestamp(self.installed_at, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Installed package database
///
/// At most one entry per package name. Order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub installed: Vec<InstalledEntry>,
}

impl Manifest {
    pub fn get(&self, name: &str) -> Option<&InstalledEntry> {
        self.installed.iter().find(|entry| entry.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.installed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.installed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_is_timestamped() {
        let before = chrono::Utc::now().timestamp();
        let entry = InstalledEntry::new("foo".to_string(), "1.0".to_string(), 1);
        assert!(entry.installed_at >= before);
    }

    #[test]
    fn test_installed_at_display() {
        let mut entry = InstalledEntry::new("foo".to_string(), "1.0".to_string(), 1);
        entry.installed_at = 0;
        assert_eq!(entry.installed_at_display(), "1970-01-01 00:00:00 UTC");
    }

    #[test]
    fn test_manifest_lookup() {
        let manifest = Manifest {
            installed: vec![
                InstalledEntry::new("foo".to_string(), "1.0".to_string(), 1),
                InstalledEntry::new("bar".to_string(), "2.3".to_string(), 4),
            ],
        };

        assert_eq!(manifest.len(), 2);
        assert!(manifest.contains("bar"));
        assert_eq!(manifest.get("bar").unwrap().release, 4);
        assert!(manifest.get("baz").is_none());
    }
}
