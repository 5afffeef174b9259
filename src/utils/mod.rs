//! Cross-platform utilities shared by the fetcher, cache, installer and CLI.
//!
//! - [`fs`] - directory creation, atomic writes and directory removal
//! - [`path_validation`] - safety checks for package-relative paths
//! - [`progress`] - terminal spinners

pub mod fs;
pub mod path_validation;
pub mod progress;

pub use fs::{atomic_write, ensure_dir, remove_dir_if_exists};
pub use path_validation::is_safe_relative_path;
pub use progress::Spinner;
