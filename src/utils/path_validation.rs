//! Path validation and security utilities for AGPKG.
//!
//! Package file lists and archive entry names come from untrusted sources. These
//! helpers decide whether such a path may be joined onto a package or install root.

use std::path::{Component, Path};

/// Returns `true` when `path` is relative and stays below whatever root it is joined to.
///
/// Any occurrence of `..` in the string is rejected, not only whole `..` components,
/// matching how package manifests are screened. Absolute paths, Windows drive prefixes
/// and leading separators are rejected too.
#[must_use]
pub fn is_safe_relative_path(path: &str) -> bool {
    if path.is_empty() || path.contains("..") {
        return false;
    }

    let path = Path::new(path);
    if path.is_absolute() {
        return false;
    }

    path.components().all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}
