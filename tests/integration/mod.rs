//! Integration test suite for AGPKG
//!
//! End-to-end tests that drive the `agpkg` binary against temporary projects, plus
//! library-level tests that fetch archives from a loopback HTTP server.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **add**: installing local agents, conflicts, `--force` and `--as`
//! - **cache**: `cache info` and `cache clean`
//! - **fetch**: remote downloads, size limits and cache reuse
//! - **list_remove**: listing and uninstalling agents
//! - **validate**: the validate command

mod common;

mod add;
mod cache;
mod fetch;
mod list_remove;
mod validate;
