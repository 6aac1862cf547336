//! Shared test fixtures for timeweave crates.
//!
//! - [`builder`] - terse construction of entity snapshots
//! - [`campus`] - ready-made campuses, including the reference scenarios
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! timeweave-test = { workspace = true }
//! ```
//!
//! ```
//! use timeweave_test::campus;
//!
//! let snapshot = campus::small_campus();
//! assert_eq!(snapshot.requirements().len(), 14);
//! ```

pub mod builder;
pub mod campus;

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

pub use builder::SnapshotBuilder;

static TRACING: OnceLock<()> = OnceLock::new();

/// Routes `tracing` output to the test harness, filtered by `RUST_LOG`.
///
/// Safe to call from every test; only the first call has effect.
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
