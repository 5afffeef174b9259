//! File system helpers with atomic write semantics.
//!
//! Writes go through a temp-and-rename strategy so readers never observe a
//! half-written project manifest or cache sidecar.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Creates a directory and all of its parents if missing.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or if `path` exists but is
/// not a directory.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).with_context(|| {
            format!(
                "Failed to create directory: {}\n\nCheck directory permissions and path validity",
                path.display()
            )
        })?;
    } else if !path.is_dir() {
        return Err(anyhow::anyhow!("Path exists but is not a directory: {}", path.display()));
    }
    Ok(())
}

/// Atomically writes bytes to a file using a write-then-rename strategy.
///
/// 1. Write content to a sibling temporary file
/// 2. Sync the temporary file to disk
/// 3. Rename it over the target path
///
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns an error if any step of the atomic write fails.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let temp_path = temp_sibling(path);

    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;

        file.sync_all().with_context(|| "Failed to sync file to disk")?;
    }

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to: {}", path.display()))?;

    Ok(())
}

/// Removes a directory tree if it exists.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be removed.
pub fn remove_dir_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_parents() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("a/b/c.json");

        atomic_write(&target, b"{}").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"{}");
        assert!(!temp.path().join("a/b/c.json.tmp").exists());
    }

    #[test]
    fn test_ensure_dir_rejects_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("file");
        fs::write(&file, "x").unwrap();

        assert!(ensure_dir(&file).is_err());
        ensure_dir(&temp.path().join("new/dir")).unwrap();
        assert!(temp.path().join("new/dir").is_dir());
    }

    #[test]
    fn test_remove_dir_if_exists_is_noop_when_absent() {
        let temp = TempDir::new().unwrap();
        remove_dir_if_exists(&temp.path().join("missing")).unwrap();
    }
}
