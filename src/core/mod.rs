//! Core types for AGPKG
//!
//! This module holds the error taxonomy shared by every stage of the pipeline.
//!
//! - [`AgpkgError`] - Enumerated error types covering all AGPKG failure modes
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format
//!
//! ```rust
//! use agpkg_cli::core::{AgpkgError, user_friendly_error};
//!
//! fn example_operation() -> anyhow::Result<()> {
//!     Err(AgpkgError::EmptySource.into())
//! }
//!
//! if let Err(e) = example_operation() {
//!     let friendly = user_friendly_error(e);
//!     assert!(friendly.details.is_some());
//! }
//! ```

pub mod error;

pub use error::{AgpkgError, ErrorContext, user_friendly_error};
