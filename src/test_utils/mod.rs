//! Test utilities for AGPKG
//!
//! Helpers shared by unit tests and the integration suite:
//! - [`init_test_logging`] for tracing output inside tests
//! - [`fixtures`] for writing agent packages to disk, in memory or as zip archives
//! - [`server`] for a loopback HTTP server that serves archives
//!
//! # Example
//!
//! ```rust,ignore
//! use agpkg_cli::test_utils::AgentFixture;
//!
//! let temp = tempfile::TempDir::new().unwrap();
//! let dir = AgentFixture::new("my-agent")
//!     .file("index.ts", "export {};")
//!     .write_to(&temp.path().join("my-agent"));
//! assert!(dir.join("agent.yaml").exists());
//! ```

pub mod fixtures;
pub mod server;

pub use fixtures::{AgentFixture, write_agent, zip_archive};
pub use server::{TestResponse, TestServer};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Respects `RUST_LOG` when no level is given; does nothing when neither is set.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
