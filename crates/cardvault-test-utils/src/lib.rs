//! Shared test utilities for cardvault tests.
//!
//! This crate provides:
//! - PNG and card fixture builders ([`fixtures`])
//! - [`FailingStore`] and [`FailingArtifactStore`]: wrappers that fail chosen
//!   operations on demand and record what was called
//! - [`RecordingHook`]: an artifact hook that reports its invocations
//!
//! # Example
//!
//! ```rust
//! use cardvault_test_utils::{TestContext, card_upload, v2_definition};
//!
//! let ctx = TestContext::new();
//! let upload = card_upload("mira.png", &v2_definition("Mira"));
//! assert_eq!(upload.media_type, "image/png");
//! # let _ = ctx;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
// Test utilities use expect/unwrap for cleaner test code - panics are acceptable in tests
#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::missing_panics_doc)]

pub mod fixtures;
pub mod hooks;
pub mod storage;

pub use fixtures::*;
pub use hooks::*;
pub use storage::*;

/// Initialize test logging (call once per test module).
pub fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let _ = fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("cardvault=debug".parse().expect("valid directive")),
        )
        .with_test_writer()
        .try_init();
}
