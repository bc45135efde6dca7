#![deny(unsafe_code)]

//! Shared test utilities for the Hermit workspace.
//!
//! Provides a config builder, a scripted mock image daemon that serves
//! HTTP over a temporary Unix socket, and a tracing helper, so that
//! individual crate tests stay concise and consistent.
//!
//! Add this crate as a `[dev-dependency]` in any workspace member:
//!
//! ```toml
//! [dev-dependencies]
//! hermit-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod daemon;

use tracing_subscriber::EnvFilter;

/// Initialise a tracing subscriber that writes to the test-harness
/// writer and respects the `RUST_LOG` environment variable.
///
/// Safe to call from every test function; subsequent calls are silently
/// ignored.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}
