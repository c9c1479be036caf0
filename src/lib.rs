// src/lib.rs

//! Blink Package Manager
//!
//! Lightweight source-based package manager. A package is described by a
//! recipe fetched from a remote index; installing it downloads and verifies
//! the source archive, unpacks it, runs the recipe's shell lifecycle and
//! records the result in a local manifest.
//!
//! # Architecture
//!
//! - Single instance: every mutating command holds a presence-only lock file
//! - Manifest: TOML document rewritten atomically (temp file + rename)
//! - Recipes: JSON or TOML documents cached per package name
//! - Archives: tar (plain, gz, xz, bz2, zst) and zip unpacked in-process
//! - Repositories: git checkouts kept current with clone/pull/reset

pub mod archive;
pub mod build;
pub mod config;
mod error;
pub mod http;
pub mod lock;
pub mod manager;
pub mod manifest;
pub mod process;
pub mod recipe;
pub mod repository;
pub mod source;

pub use config::Config;
pub use error::{Error, Result};
pub use manager::PackageManager;
