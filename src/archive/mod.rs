// src/archive/mod.rs

//! Source archive extraction
//!
//! Archives are unpacked in-process. The decoder is chosen from the type the
//! recipe declares, never sniffed from the bytes. Extraction is staged in a
//! temporary directory beside the target and renamed into place only after
//! the whole stream decoded, so a corrupt archive never leaves behind a
//! half-populated directory that a later run would mistake for a finished one.

mod tar;
mod zip;

use crate::error::{Error, Result};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};
use xz2::read::XzDecoder;

/// Supported source archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ArchiveKind {
    Tar,
    TarGz,
    TarXz,
    TarBz2,
    TarZst,
    Zip,
}

/// File name suffixes stripped when naming the extraction directory
const KNOWN_SUFFIXES: &[&str] = &[
    ".tar.gz", ".tar.xz", ".tar.bz2", ".tar.zst", ".tgz", ".txz", ".tbz2", ".tzst", ".tar",
    ".zip",
];

impl ArchiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveKind::Tar => "tar",
            ArchiveKind::TarGz => "tar.gz",
            ArchiveKind::TarXz => "tar.xz",
            ArchiveKind::TarBz2 => "tar.bz2",
            ArchiveKind::TarZst => "tar.zst",
            ArchiveKind::Zip => "zip",
        }
    }
}

impl FromStr for ArchiveKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "tar" => Ok(ArchiveKind::Tar),
            "tar.gz" | "tgz" => Ok(ArchiveKind::TarGz),
            "tar.xz" | "txz" => Ok(ArchiveKind::TarXz),
            "tar.bz2" | "tbz2" => Ok(ArchiveKind::TarBz2),
            "tar.zst" | "tzst" => Ok(ArchiveKind::TarZst),
            "zip" => Ok(ArchiveKind::Zip),
            _ => Err(Error::UnsupportedArchive(s.to_string())),
        }
    }
}

impl TryFrom<String> for ArchiveKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ArchiveKind> for String {
    fn from(kind: ArchiveKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory name an archive extracts into: its file name minus the
/// longest known archive suffix
pub fn extraction_dir_name(archive_path: &Path) -> String {
    let file_name = archive_path
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "source".to_string());
    let lower = file_name.to_ascii_lowercase();

    let suffix_len = KNOWN_SUFFIXES
        .iter()
        .filter(|suffix| lower.ends_with(*suffix) && lower.len() > suffix.len())
        .map(|suffix| suffix.len())
        .max()
        .unwrap_or(0);

    file_name[..file_name.len() - suffix_len].to_string()
}

/// Extract `archive_path` under `dest_root` and return the extraction directory.
///
/// An existing extraction directory is reused as-is unless `force` is set,
/// in which case it is removed and the archive unpacked again.
pub fn extract(
    archive_path: &Path,
    kind: ArchiveKind,
    dest_root: &Path,
    force: bool,
) -> Result<PathBuf> {
    let target = dest_root.join(extraction_dir_name(archive_path));

    if target.exists() {
        if !force {
            info!(
                "{} already extracted at {}, skipping (use --force to re-extract)",
                archive_path.display(),
                target.display()
            );
            return Ok(target);
        }
        info!("Removing previous extraction at {}", target.display());
        remove_path(&target)?;
    }

    fs::create_dir_all(dest_root).map_err(|e| {
        Error::IoError(format!("Failed to create directory {}: {}", dest_root.display(), e))
    })?;

    let file = File::open(archive_path).map_err(|e| {
        Error::Extraction(format!("Cannot open {}: {}", archive_path.display(), e))
    })?;

    let staging = tempfile::Builder::new()
        .prefix(".extract-")
        .tempdir_in(dest_root)
        .map_err(|e| {
            Error::IoError(format!(
                "Failed to create staging directory in {}: {}",
                dest_root.display(),
                e
            ))
        })?;

    info!(
        "Extracting {} ({}) into {}",
        archive_path.display(),
        kind,
        target.display()
    );

    match kind {
        ArchiveKind::Zip => zip::unpack(file, staging.path())?,
        _ => tar::unpack(open_tar_stream(kind, file)?, staging.path())?,
    }

    fs::rename(staging.path(), &target).map_err(|e| {
        Error::IoError(format!(
            "Failed to move extracted tree to {}: {}",
            target.display(),
            e
        ))
    })?;

    debug!("Extraction of {} complete", archive_path.display());
    Ok(target)
}

/// Wrap the archive file in the decompressor for `kind`
fn open_tar_stream(kind: ArchiveKind, file: File) -> Result<Box<dyn Read>> {
    let reader = BufReader::new(file);
    let stream: Box<dyn Read> = match kind {
        ArchiveKind::Tar => Box::new(reader),
        ArchiveKind::TarGz => Box::new(GzDecoder::new(reader)),
        ArchiveKind::TarXz => Box::new(XzDecoder::new(reader)),
        ArchiveKind::TarBz2 => Box::new(BzDecoder::new(reader)),
        ArchiveKind::TarZst => {
            let decoder = zstd::Decoder::with_buffer(reader).map_err(|e| {
                Error::Extraction(format!("Failed to create zstd decoder: {}", e))
            })?;
            Box::new(decoder)
        }
        ArchiveKind::Zip => {
            return Err(Error::UnsupportedArchive(
                "zip is not a tar stream".to_string(),
            ));
        }
    };
    Ok(stream)
}

/// Directory the build runs in.
///
/// Tarballs usually wrap everything in one top-level folder; when the
/// extraction root holds exactly one entry and it is a directory, that
/// directory is the build root. Otherwise the extraction root is.
pub fn resolve_build_dir(extract_root: &Path) -> Result<PathBuf> {
    debug!("Scanning extract root {}", extract_root.display());

    let entries = fs::read_dir(extract_root)
        .map_err(|e| {
            Error::IoError(format!("Failed to read {}: {}", extract_root.display(), e))
        })?
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| {
            Error::IoError(format!("Failed to read {}: {}", extract_root.display(), e))
        })?;

    if let [only] = entries.as_slice()
        && only.file_type().map(|t| t.is_dir()).unwrap_or(false)
    {
        let dir = only.path();
        debug!("Using single top-level directory {}", dir.display());
        return Ok(dir);
    }

    debug!("Using extract root as build directory");
    Ok(extract_root.to_path_buf())
}

/// Normalise an archive member path relative to the extraction root.
///
/// Absolute paths and `..` components are refused. Returns `None` for
/// entries naming the root itself (`./`).
pub(crate) fn safe_relative_path(path: &Path) -> Result<Option<PathBuf>> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(Error::Extraction(format!(
                    "Refusing unsafe path in archive: {}",
                    path.display()
                )));
            }
        }
    }

    if out.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(out))
    }
}

/// Refuse to write `path` if any directory between `root` and it is a symlink
pub(crate) fn ensure_no_symlink_ancestors(root: &Path, path: &Path) -> Result<()> {
    let rel = path.strip_prefix(root).map_err(|_| {
        Error::Extraction(format!(
            "{} is outside {}",
            path.display(),
            root.display()
        ))
    })?;

    let mut current = root.to_path_buf();
    let mut components = rel.components().peekable();
    while let Some(component) = components.next() {
        if components.peek().is_none() {
            break;
        }
        current.push(component);
        if let Ok(meta) = fs::symlink_metadata(&current)
            && meta.file_type().is_symlink()
        {
            return Err(Error::Extraction(format!(
                "Refusing to write {} through symlink {}",
                path.display(),
                current.display()
            )));
        }
    }
    Ok(())
}

/// Create the parent of `path` and clear whatever non-directory currently
/// sits at `path`, so a later entry replaces an earlier one rather than
/// writing through it
pub(crate) fn prepare_leaf(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            Error::Extraction(format!("{}: {}", parent.display(), e))
        })?;
    }
    if let Ok(meta) = fs::symlink_metadata(path)
        && !meta.is_dir()
    {
        fs::remove_file(path)
            .map_err(|e| Error::Extraction(format!("{}: {}", path.display(), e)))?;
    }
    Ok(())
}

fn remove_path(path: &Path) -> Result<()> {
    let result = if fs::symlink_metadata(path)?.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| Error::IoError(format!("Failed to remove {}: {}", path.display(), e)))
}
