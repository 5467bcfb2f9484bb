//! Destination file handling for Beam.
//!
//! This module handles:
//! - Collision-free destination naming
//! - Exclusive file creation
//! - Permission preservation
//!
//! ## Permission preservation
//!
//! - Unix: mode bits travel with the file and are reapplied on receipt
//! - Other platforms: mode bits are carried but application is a no-op

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Get Unix file permissions from metadata.
///
/// Returns the full raw mode on Unix systems, or 0 elsewhere.
#[cfg(unix)]
pub fn get_mode(metadata: &std::fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

/// Get Unix file permissions from metadata.
///
/// Returns 0 on non-Unix platforms as they don't use mode bits.
#[cfg(not(unix))]
pub fn get_mode(_metadata: &std::fs::Metadata) -> u32 {
    0
}

/// Apply transferred permission bits to a received file.
///
/// On Unix, sets the permission portion of the mode (`0o7777` mask) so
/// the destination ends up with the source's bits regardless of the
/// local umask. On other platforms this is a no-op.
#[cfg(unix)]
pub fn apply_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let perms = std::fs::Permissions::from_mode(mode & 0o7777);
    std::fs::set_permissions(path, perms)?;
    Ok(())
}

/// Apply transferred permission bits to a received file.
///
/// No-op on non-Unix platforms.
#[cfg(not(unix))]
pub fn apply_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Resolve a collision-free destination path for `file_name` in `dir`.
///
/// If nothing exists at the candidate path it is returned unchanged.
/// Otherwise the name splits at the last `.` into stem and extension
/// (a dotless name is all stem) and `stem(1)ext`, `stem(2)ext`, ... are
/// probed in order until a free name turns up:
///
/// - `report.pdf` -> `report(1).pdf`
/// - `README` -> `README(1)`
#[must_use]
pub fn unique_destination(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, extension) = match file_name.rfind('.') {
        Some(dot) => file_name.split_at(dot),
        None => (file_name, ""),
    };

    let mut n = 1u64;
    loop {
        let numbered = dir.join(format!("{stem}({n}){extension}"));
        if !numbered.exists() {
            return numbered;
        }
        n += 1;
    }
}

/// Create the destination file exclusively.
///
/// The resolver already picked an unused name; creation still insists on
/// the exclusive-create flag so a racing process surfaces as an error
/// instead of a silent overwrite.
pub async fn create_exclusive(path: &Path) -> Result<tokio::fs::File> {
    match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(Error::DestinationExists(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Format a file size for display.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_unique_destination_free_name_unchanged() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = unique_destination(temp_dir.path(), "report.pdf");
        assert_eq!(path, temp_dir.path().join("report.pdf"));
    }

    #[test]
    fn test_unique_destination_numbers_before_extension() {
        let temp_dir = TempDir::new().expect("create temp dir");
        std::fs::write(temp_dir.path().join("report.pdf"), b"x").unwrap();

        let path = unique_destination(temp_dir.path(), "report.pdf");
        assert_eq!(path, temp_dir.path().join("report(1).pdf"));
    }

    #[test]
    fn test_unique_destination_counts_past_existing_numbers() {
        let temp_dir = TempDir::new().expect("create temp dir");
        std::fs::write(temp_dir.path().join("name.ext"), b"x").unwrap();
        std::fs::write(temp_dir.path().join("name(1).ext"), b"x").unwrap();

        let path = unique_destination(temp_dir.path(), "name.ext");
        assert_eq!(path, temp_dir.path().join("name(2).ext"));
    }

    #[test]
    fn test_unique_destination_no_extension() {
        let temp_dir = TempDir::new().expect("create temp dir");
        std::fs::write(temp_dir.path().join("README"), b"x").unwrap();

        let path = unique_destination(temp_dir.path(), "README");
        assert_eq!(path, temp_dir.path().join("README(1)"));
    }

    #[test]
    fn test_unique_destination_splits_at_last_dot() {
        let temp_dir = TempDir::new().expect("create temp dir");
        std::fs::write(temp_dir.path().join("archive.tar.gz"), b"x").unwrap();

        let path = unique_destination(temp_dir.path(), "archive.tar.gz");
        assert_eq!(path, temp_dir.path().join("archive.tar(1).gz"));
    }

    #[tokio::test]
    async fn test_create_exclusive_refuses_existing() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("taken.txt");
        std::fs::write(&path, b"first").unwrap();

        let result = create_exclusive(&path).await;
        assert!(matches!(result, Err(Error::DestinationExists(_))));

        let content = std::fs::read(&path).unwrap();
        assert_eq!(content, b"first", "existing file must not be touched");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_mode_round_trip() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let source = temp_dir.path().join("script.sh");
        std::fs::write(&source, b"#!/bin/sh\n").unwrap();
        apply_mode(&source, 0o755).unwrap();

        let mode = get_mode(&std::fs::metadata(&source).unwrap());

        let dest = temp_dir.path().join("copy.sh");
        let file = create_exclusive(&dest).await.unwrap();
        drop(file);
        apply_mode(&dest, mode).unwrap();

        let dest_mode = get_mode(&std::fs::metadata(&dest).unwrap());
        assert_eq!(dest_mode & 0o7777, mode & 0o7777);
    }
}
