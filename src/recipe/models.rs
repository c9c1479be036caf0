// src/recipe/models.rs

//! Recipe document model
//!
//! A recipe describes one package version: where its source lives, how to
//! verify it, and which shell commands build, install and uninstall it.

use crate::archive::ArchiveKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Package recipe as published in the index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub version: String,
    pub release: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub license: String,
    pub source: Source,
    /// Declared dependencies (name -> version constraint). Recorded only;
    /// nothing resolves or installs them.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(rename = "opt_dependencies", default)]
    pub optional_dependency_groups: Vec<OptionalDependencyGroup>,
    pub build: BuildSpec,
}

/// Where the source archive comes from and what it must hash to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(rename = "type")]
    pub archive_type: ArchiveKind,
    /// Lowercase hex SHA-256 of the archive
    #[serde(rename = "sha256", default)]
    pub expected_sha256: String,
}

/// A named choice among optional dependencies. Carried for display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionalDependencyGroup {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub default: String,
}

/// Build lifecycle: environment plus ordered shell command lists
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub prepare: Vec<String>,
    #[serde(default)]
    pub install: Vec<String>,
    #[serde(default)]
    pub uninstall: Vec<String>,
}

impl Recipe {
    /// `name-version-release`
    pub fn nvr(&self) -> String {
        format!("{}-{}-{}", self.name, self.version, self.release)
    }
}

/// Human-readable recipe summary printed after a recipe is loaded
pub struct RecipeSummary<'a> {
    pub repository: &'a str,
    pub recipe: &'a Recipe,
}

impl fmt::Display for RecipeSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let recipe = self.recipe;
        writeln!(f, "Repository:  {}", self.repository)?;
        writeln!(f, "Name:        {}", recipe.name)?;
        writeln!(f, "Version:     {}-{}", recipe.version, recipe.release)?;
        writeln!(f, "Description: {}", recipe.description)?;
        writeln!(f, "Author:      {}", recipe.author)?;
        write!(f, "License:     {}", recipe.license)?;

        if !recipe.dependencies.is_empty() {
            let deps: Vec<String> = recipe
                .dependencies
                .iter()
                .map(|(name, constraint)| {
                    if constraint.is_empty() {
                        name.clone()
                    } else {
                        format!("{} {}", name, constraint)
                    }
                })
                .collect();
            write!(f, "\nDepends:     {}", deps.join(", "))?;
        }

        for group in &recipe.optional_dependency_groups {
            write!(
                f,
                "\nOptional:    {} [{}] (default: {})",
                group.id,
                group.options.join(" | "),
                group.default
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "name": "foo",
        "version": "1.0",
        "release": 2,
        "description": "A test package",
        "author": "Someone",
        "license": "MIT",
        "source": {
            "url": "https://example.com/foo-1.0.tar.gz",
            "type": "tar.gz",
            "sha256": "abc123"
        },
        "dependencies": { "zlib": ">=1.2" },
        "opt_dependencies": [
            { "id": "tls", "description": "TLS backend", "options": ["openssl", "libressl"], "default": "openssl" }
        ],
        "build": {
            "env": { "CFLAGS": "-O2" },
            "prepare": ["./configure --prefix=/usr"],
            "install": ["make", "make install"],
            "uninstall": ["make uninstall"]
        }
    }"#;

    #[test]
    fn test_decode_json_recipe() {
        let recipe: Recipe = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(recipe.nvr(), "foo-1.0-2");
        assert_eq!(recipe.source.archive_type, ArchiveKind::TarGz);
        assert_eq!(recipe.source.expected_sha256, "abc123");
        assert_eq!(recipe.dependencies.get("zlib").unwrap(), ">=1.2");
        assert_eq!(recipe.optional_dependency_groups[0].options.len(), 2);
        assert_eq!(recipe.build.env.get("CFLAGS").unwrap(), "-O2");
        assert_eq!(recipe.build.install, vec!["make", "make install"]);
    }

    #[test]
    fn test_decode_rejects_unknown_archive_type() {
        let doc = SAMPLE.replace("\"tar.gz\"", "\"rar\"");
        let err = serde_json::from_str::<Recipe>(&doc).unwrap_err();
        assert!(err.to_string().contains("rar"));
    }

    #[test]
    fn test_decode_toml_recipe_with_defaults() {
        let doc = r#"
            name = "bar"
            version = "0.3"
            release = 1

            [source]
            url = "https://example.com/bar.zip"
            type = "zip"

            [build]
            install = ["cp bar /usr/bin/"]
        "#;

        let recipe: Recipe = toml::from_str(doc).unwrap();
        assert_eq!(recipe.source.archive_type, ArchiveKind::Zip);
        assert!(recipe.source.expected_sha256.is_empty());
        assert!(recipe.build.prepare.is_empty());
        assert!(recipe.dependencies.is_empty());
    }

    #[test]
    fn test_summary_display() {
        let recipe: Recipe = serde_json::from_str(SAMPLE).unwrap();
        let text = RecipeSummary {
            repository: "https://example.com/index",
            recipe: &recipe,
        }
        .to_string();

        assert!(text.starts_with("Repository:  https://example.com/index\n"));
        assert!(text.contains("Version:     1.0-2"));
        assert!(text.contains("Depends:     zlib >=1.2"));
        assert!(text.contains("Optional:    tls [openssl | libressl] (default: openssl)"));
    }
}
