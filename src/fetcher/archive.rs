//! Zip extraction for downloaded packages.
//!
//! Archive entry names are untrusted. Entries with a `..` path segment are skipped
//! without error, and names that would resolve outside the destination (absolute
//! paths, drive prefixes) are dropped as well.

use crate::core::AgpkgError;
use crate::utils::fs::ensure_dir;
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Extracts `archive_path` into `dest` and returns the number of files written.
///
/// # Errors
///
/// - [`AgpkgError::ExtractionFailed`] if the archive is unreadable or corrupt
/// - I/O errors while creating directories or files under `dest`
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| extraction_failed(archive_path, &e))?;

    ensure_dir(dest)?;

    let mut written = 0;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| extraction_failed(archive_path, &e))?;

        if has_parent_segment(entry.name()) {
            debug!("Skipping archive entry with parent directory segment: {}", entry.name());
            continue;
        }

        let Some(relative) = entry.enclosed_name() else {
            debug!("Skipping archive entry outside extraction root: {}", entry.name());
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            ensure_dir(&target)?;
            continue;
        }

        if let Some(parent) = target.parent() {
            ensure_dir(parent)?;
        }

        let mut out = File::create(&target)
            .with_context(|| format!("Failed to create file: {}", target.display()))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| extraction_failed(archive_path, &e))?;
        written += 1;
    }

    debug!("Extracted {} files from {} into {}", written, archive_path.display(), dest.display());
    Ok(written)
}

fn has_parent_segment(name: &str) -> bool {
    name.split(['/', '\\']).any(|segment| segment == "..")
}

fn extraction_failed(path: &Path, err: &dyn std::fmt::Display) -> anyhow::Error {
    AgpkgError::ExtractionFailed {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
    .into()
}
