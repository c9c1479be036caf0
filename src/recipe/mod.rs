// src/recipe/mod.rs

//! Recipe cache and fetcher
//!
//! Recipes are fetched from the index as `<index_url><name>.<ext>` and kept
//! under `<cache_dir>/recipes/`. A cached copy is reused until a forced load
//! deletes it.

pub mod models;

pub use models::{BuildSpec, OptionalDependencyGroup, Recipe, RecipeSummary, Source};

use crate::config::{Config, RecipeFormat};
use crate::error::{Error, Result};
use crate::http::HttpClient;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Downloads recipes from the index and decodes cached copies
#[derive(Debug, Clone)]
pub struct RecipeCache {
    index_url: String,
    display_url: String,
    format: RecipeFormat,
    recipe_dir: PathBuf,
    client: HttpClient,
}

impl RecipeCache {
    pub fn new(config: &Config, cache_dir: &Path, client: HttpClient) -> Self {
        Self {
            index_url: config.index_url.clone(),
            display_url: config.index_display_url.clone(),
            format: config.recipe_format,
            recipe_dir: config.recipe_dir(cache_dir),
            client,
        }
    }

    /// Remote location of the recipe for `name`
    pub fn recipe_url(&self, name: &str) -> String {
        let base = self.index_url.trim_end_matches('/');
        format!("{}/{}.{}", base, name, self.format.extension())
    }

    /// Where the cached recipe for `name` lives
    pub fn cached_path(&self, name: &str) -> PathBuf {
        self.recipe_dir
            .join(format!("{}.{}", name, self.format.extension()))
    }

    /// Download the recipe for `name` into the cache without decoding it
    pub fn fetch(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;

        let url = self.recipe_url(name);
        let path = self.cached_path(name);
        info!("Fetching recipe for {} from {}", name, url);

        self.client.download_file(&url, &path)?;

        info!("Recipe for {} saved to {}", name, path.display());
        Ok(path)
    }

    /// Load the recipe for `name`, fetching it first when not cached.
    ///
    /// With `force`, any cached copy is discarded and the recipe fetched
    /// again. Prints a summary of the recipe on success.
    pub fn load(&self, name: &str, force: bool) -> Result<Recipe> {
        validate_name(name)?;
        let path = self.cached_path(name);

        if force {
            match fs::remove_file(&path) {
                Ok(()) => info!("Force flag set, removed cached recipe at {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove cached recipe {}: {}", path.display(), e),
            }
        }

        if !path.exists() {
            debug!("Recipe for {} not cached, downloading", name);
            self.fetch(name)?;
        }

        let recipe = self.decode(&path)?;
        println!("{}", self.summary(&recipe));
        Ok(recipe)
    }

    /// Summary block for `recipe`, labelled with this index
    pub fn summary<'a>(&'a self, recipe: &'a Recipe) -> RecipeSummary<'a> {
        RecipeSummary {
            repository: &self.display_url,
            recipe,
        }
    }

    fn decode(&self, path: &Path) -> Result<Recipe> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Recipe(format!("Failed to read {}: {}", path.display(), e)))?;

        match self.format {
            RecipeFormat::Json => serde_json::from_str(&content).map_err(|e| {
                Error::Recipe(format!("Failed to parse {}: {}", path.display(), e))
            }),
            RecipeFormat::Toml => toml::from_str(&content).map_err(|e| {
                Error::Recipe(format!("Failed to parse {}: {}", path.display(), e))
            }),
        }
    }
}

/// Package names become file names and URL path segments
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(Error::Recipe(format!("Invalid package name '{}'", name)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RECIPE: &str = r#"{
        "name": "foo",
        "version": "1.0",
        "release": 1,
        "description": "Foo",
        "author": "Dev",
        "license": "MIT",
        "source": { "url": "https://example.com/foo.tar.gz", "type": "tar.gz", "sha256": "00" },
        "build": { "install": ["echo done"] }
    }"#;

    fn cache(server: &mockito::ServerGuard, dir: &TempDir) -> RecipeCache {
        let config = Config::new(dir.path()).with_index_url(&format!("{}/index/", server.url()));
        RecipeCache::new(&config, dir.path(), HttpClient::new().unwrap())
    }

    #[test]
    fn test_recipe_url_handles_trailing_slash() {
        let dir = TempDir::new().unwrap();
        let with = Config::new(dir.path()).with_index_url("https://idx.example/recipes/");
        let without = Config::new(dir.path()).with_index_url("https://idx.example/recipes");
        let client = HttpClient::new().unwrap();

        let a = RecipeCache::new(&with, dir.path(), client.clone());
        let b = RecipeCache::new(&without, dir.path(), client);
        assert_eq!(a.recipe_url("foo"), "https://idx.example/recipes/foo.json");
        assert_eq!(b.recipe_url("foo"), "https://idx.example/recipes/foo.json");
        assert_eq!(a.cached_path("foo"), dir.path().join("recipes/foo.json"));
    }

    #[test]
    fn test_load_fetches_then_uses_cache() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/index/foo.json")
            .with_status(200)
            .with_body(RECIPE)
            .expect(1)
            .create();

        let dir = TempDir::new().unwrap();
        let cache = cache(&server, &dir);

        let first = cache.load("foo", false).unwrap();
        let second = cache.load("foo", false).unwrap();

        mock.assert();
        assert_eq!(first, second);
        assert_eq!(first.version, "1.0");
        assert!(cache.cached_path("foo").exists());
    }

    #[test]
    fn test_force_load_refetches() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/index/foo.json")
            .with_status(200)
            .with_body(RECIPE)
            .expect(2)
            .create();

        let dir = TempDir::new().unwrap();
        let cache = cache(&server, &dir);

        cache.load("foo", false).unwrap();
        cache.load("foo", true).unwrap();
        mock.assert();
    }

    #[test]
    fn test_fetch_missing_recipe_is_network_error() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/index/nope.json").with_status(404).create();

        let dir = TempDir::new().unwrap();
        let cache = cache(&server, &dir);

        assert!(matches!(cache.load("nope", false), Err(Error::Network(_))));
        assert!(!cache.cached_path("nope").exists());
    }

    #[test]
    fn test_malformed_cached_recipe_is_recipe_error() {
        let server = mockito::Server::new();
        let dir = TempDir::new().unwrap();
        let cache = cache(&server, &dir);

        fs::create_dir_all(dir.path().join("recipes")).unwrap();
        fs::write(cache.cached_path("foo"), "{ \"name\": ").unwrap();

        assert!(matches!(cache.load("foo", false), Err(Error::Recipe(_))));
    }

    #[test]
    fn test_toml_index() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/index/bar.toml")
            .with_status(200)
            .with_body(
                "name = \"bar\"\nversion = \"2.0\"\nrelease = 3\n\n[source]\nurl = \"https://e.x/bar.tar\"\ntype = \"tar\"\n\n[build]\n",
            )
            .create();

        let dir = TempDir::new().unwrap();
        let mut config =
            Config::new(dir.path()).with_index_url(&format!("{}/index/", server.url()));
        config.recipe_format = RecipeFormat::Toml;
        let cache = RecipeCache::new(&config, dir.path(), HttpClient::new().unwrap());

        let recipe = cache.load("bar", false).unwrap();
        assert_eq!(recipe.release, 3);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let server = mockito::Server::new();
        let dir = TempDir::new().unwrap();
        let cache = cache(&server, &dir);

        assert!(matches!(cache.fetch(""), Err(Error::Recipe(_))));
        assert!(matches!(cache.fetch("../etc/passwd"), Err(Error::Recipe(_))));
    }
}
