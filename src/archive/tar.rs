// src/archive/tar.rs

//! Tar stream unpacking

use super::{ensure_no_symlink_ancestors, prepare_leaf, safe_relative_path};
use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{self, Read};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tar::{Archive, EntryType};
use tracing::debug;

/// Unpack a (decompressed) tar stream into `dest`
pub(super) fn unpack<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|e| Error::Extraction(format!("Failed to read tar archive: {}", e)))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| Error::Extraction(format!("Failed to read tar entry: {}", e)))?;

        let raw_path = entry
            .path()
            .map_err(|e| Error::Extraction(format!("Invalid path in tar entry: {}", e)))?
            .into_owned();

        let Some(rel) = safe_relative_path(&raw_path)? else {
            continue;
        };
        let full_path = dest.join(&rel);
        ensure_no_symlink_ancestors(dest, &full_path)?;

        match entry.header().entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(&full_path).map_err(|e| io_error(&full_path, e))?;
            }
            EntryType::Regular | EntryType::Continuous => {
                prepare_leaf(&full_path)?;
                let mut out = File::create(&full_path).map_err(|e| io_error(&full_path, e))?;
                io::copy(&mut entry, &mut out).map_err(|e| {
                    Error::Extraction(format!("Failed to unpack {}: {}", raw_path.display(), e))
                })?;

                if let Ok(mode) = entry.header().mode() {
                    fs::set_permissions(&full_path, fs::Permissions::from_mode(mode & 0o7777))
                        .map_err(|e| io_error(&full_path, e))?;
                }
            }
            EntryType::Symlink => {
                let target = entry
                    .link_name()
                    .map_err(|e| Error::Extraction(format!("Invalid symlink target: {}", e)))?
                    .ok_or_else(|| {
                        Error::Extraction(format!("Symlink {} has no target", raw_path.display()))
                    })?
                    .into_owned();

                prepare_leaf(&full_path)?;
                std::os::unix::fs::symlink(&target, &full_path)
                    .map_err(|e| io_error(&full_path, e))?;
            }
            EntryType::Link => {
                let target = entry
                    .link_name()
                    .map_err(|e| Error::Extraction(format!("Invalid hard link target: {}", e)))?
                    .ok_or_else(|| {
                        Error::Extraction(format!("Hard link {} has no target", raw_path.display()))
                    })?
                    .into_owned();

                let Some(target_rel) = safe_relative_path(&target)? else {
                    return Err(Error::Extraction(format!(
                        "Hard link {} points at the archive root",
                        raw_path.display()
                    )));
                };
                let source = dest.join(target_rel);
                ensure_no_symlink_ancestors(dest, &source)?;

                prepare_leaf(&full_path)?;
                fs::hard_link(&source, &full_path).map_err(|e| {
                    Error::Extraction(format!(
                        "Failed to link {} to {}: {}",
                        raw_path.display(),
                        target.display(),
                        e
                    ))
                })?;
            }
            other => {
                debug!("Skipping {:?} entry {}", other, raw_path.display());
            }
        }
    }

    Ok(())
}

fn io_error(path: &Path, e: io::Error) -> Error {
    Error::Extraction(format!("{}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::MetadataExt;
    use tar::{Builder, Header};

    fn header(entry_type: EntryType, size: u64, mode: u32) -> Header {
        let mut header = Header::new_gnu();
        header.set_entry_type(entry_type);
        header.set_size(size);
        header.set_mode(mode);
        header
    }

    fn append_file(builder: &mut Builder<Vec<u8>>, path: &str, content: &[u8], mode: u32) {
        let mut h = header(EntryType::Regular, content.len() as u64, mode);
        builder.append_data(&mut h, path, content).unwrap();
    }

    /// Write a raw path into the header, bypassing the builder's own checks
    fn append_raw_path(builder: &mut Builder<Vec<u8>>, path: &str, content: &[u8]) {
        let mut h = header(EntryType::Regular, content.len() as u64, 0o644);
        let name = &mut h.as_old_mut().name;
        name[..path.len()].copy_from_slice(path.as_bytes());
        h.set_cksum();
        builder.append(&h, content).unwrap();
    }

    #[test]
    fn test_unpack_files_dirs_and_modes() {
        let mut builder = Builder::new(Vec::new());
        let mut dir = header(EntryType::Directory, 0, 0o755);
        builder.append_data(&mut dir, "pkg/bin/", io::empty()).unwrap();
        append_file(&mut builder, "pkg/bin/tool", b"#!/bin/sh\n", 0o755);
        append_file(&mut builder, "pkg/README", b"docs", 0o644);
        let data = builder.into_inner().unwrap();

        let dest = tempfile::tempdir().unwrap();
        unpack(&data[..], dest.path()).unwrap();

        let tool = dest.path().join("pkg/bin/tool");
        assert_eq!(fs::read_to_string(&tool).unwrap(), "#!/bin/sh\n");
        assert_eq!(fs::metadata(&tool).unwrap().mode() & 0o777, 0o755);
        assert_eq!(fs::read_to_string(dest.path().join("pkg/README")).unwrap(), "docs");
    }

    #[test]
    fn test_unpack_symlink() {
        let mut builder = Builder::new(Vec::new());
        append_file(&mut builder, "pkg/lib/libfoo.so.1", b"ELF", 0o755);
        let mut link = header(EntryType::Symlink, 0, 0o777);
        builder
            .append_link(&mut link, "pkg/lib/libfoo.so", "libfoo.so.1")
            .unwrap();
        let data = builder.into_inner().unwrap();

        let dest = tempfile::tempdir().unwrap();
        unpack(&data[..], dest.path()).unwrap();

        let link_path = dest.path().join("pkg/lib/libfoo.so");
        assert_eq!(fs::read_link(&link_path).unwrap(), Path::new("libfoo.so.1"));
        assert_eq!(fs::read_to_string(&link_path).unwrap(), "ELF");
    }

    #[test]
    fn test_unpack_hard_link() {
        let mut builder = Builder::new(Vec::new());
        append_file(&mut builder, "pkg/bin/gzip", b"binary", 0o755);
        let mut link = header(EntryType::Link, 0, 0o755);
        builder
            .append_link(&mut link, "pkg/bin/gunzip", "pkg/bin/gzip")
            .unwrap();
        let data = builder.into_inner().unwrap();

        let dest = tempfile::tempdir().unwrap();
        unpack(&data[..], dest.path()).unwrap();

        let original = fs::metadata(dest.path().join("pkg/bin/gzip")).unwrap();
        let linked = fs::metadata(dest.path().join("pkg/bin/gunzip")).unwrap();
        assert_eq!(original.ino(), linked.ino());
    }

    #[test]
    fn test_unpack_rejects_parent_traversal() {
        let mut builder = Builder::new(Vec::new());
        append_raw_path(&mut builder, "../escape.txt", b"owned");
        let data = builder.into_inner().unwrap();

        let outer = tempfile::tempdir().unwrap();
        let dest = outer.path().join("dest");
        fs::create_dir(&dest).unwrap();

        let result = unpack(&data[..], &dest);
        assert!(matches!(result, Err(Error::Extraction(_))));
        assert!(!outer.path().join("escape.txt").exists());
    }

    #[test]
    fn test_unpack_rejects_absolute_path() {
        let mut builder = Builder::new(Vec::new());
        append_raw_path(&mut builder, "/tmp/blink-absolute-escape", b"owned");
        let data = builder.into_inner().unwrap();

        let dest = tempfile::tempdir().unwrap();
        let result = unpack(&data[..], dest.path());
        assert!(matches!(result, Err(Error::Extraction(_))));
    }

    #[test]
    fn test_unpack_rejects_write_through_symlink() {
        let outside = tempfile::tempdir().unwrap();

        let mut builder = Builder::new(Vec::new());
        let mut link = header(EntryType::Symlink, 0, 0o777);
        builder
            .append_link(&mut link, "pkg/out", outside.path())
            .unwrap();
        append_file(&mut builder, "pkg/out/payload", b"owned", 0o644);
        let data = builder.into_inner().unwrap();

        let dest = tempfile::tempdir().unwrap();
        let result = unpack(&data[..], dest.path());

        assert!(matches!(result, Err(Error::Extraction(_))));
        assert!(!outside.path().join("payload").exists());
    }

    #[test]
    fn test_unpack_rejects_hard_link_outside_dest() {
        let mut builder = Builder::new(Vec::new());
        let mut link = header(EntryType::Link, 0, 0o644);
        builder
            .append_link(&mut link, "pkg/pass", "../../etc/passwd")
            .unwrap();
        let data = builder.into_inner().unwrap();

        let dest = tempfile::tempdir().unwrap();
        let result = unpack(&data[..], dest.path());
        assert!(matches!(result, Err(Error::Extraction(_))));
        assert!(!dest.path().join("pkg/pass").exists());
    }
}
