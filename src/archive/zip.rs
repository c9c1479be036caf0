// src/archive/zip.rs

//! Zip archive unpacking

use super::{ensure_no_symlink_ancestors, prepare_leaf, safe_relative_path};
use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{self, Read};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::debug;
use zip::ZipArchive;

const S_IFMT: u32 = 0o170000;
const S_IFLNK: u32 = 0o120000;

pub(super) fn unpack(file: File, dest: &Path) -> Result<()> {
    let mut archive = ZipArchive::new(file)
        .map_err(|e| Error::Extraction(format!("Failed to open zip archive: {}", e)))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| Error::Extraction(format!("Failed to read zip entry {}: {}", i, e)))?;

        let raw_name = entry.name().to_string();
        let Some(rel) = safe_relative_path(Path::new(&raw_name))? else {
            continue;
        };
        let full_path = dest.join(&rel);
        ensure_no_symlink_ancestors(dest, &full_path)?;

        let mode = entry.unix_mode();

        if entry.is_dir() {
            fs::create_dir_all(&full_path).map_err(|e| io_error(&full_path, e))?;
        } else if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
            let mut target = String::new();
            entry.read_to_string(&mut target).map_err(|e| {
                Error::Extraction(format!("Failed to read symlink {}: {}", raw_name, e))
            })?;

            prepare_leaf(&full_path)?;
            std::os::unix::fs::symlink(PathBuf::from(target), &full_path)
                .map_err(|e| io_error(&full_path, e))?;
        } else {
            prepare_leaf(&full_path)?;
            let mut out = File::create(&full_path).map_err(|e| io_error(&full_path, e))?;
            io::copy(&mut entry, &mut out).map_err(|e| {
                Error::Extraction(format!("Failed to unpack {}: {}", raw_name, e))
            })?;

            if let Some(mode) = mode {
                fs::set_permissions(&full_path, fs::Permissions::from_mode(mode & 0o7777))
                    .map_err(|e| io_error(&full_path, e))?;
            }
        }
    }

    debug!("Unpacked {} zip entries", archive.len());
    Ok(())
}

fn io_error(path: &Path, e: io::Error) -> Error {
    Error::Extraction(format!("{}: {}", path.display(), e))
}
