//! Observability infrastructure for cardvault.
//!
//! Provides logging initialization and span constructors so that every
//! ingestion-related log line carries the same fields.

use std::fmt;
use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt as tfmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `cardvault_ingest=debug`)
///
/// # Example
///
/// ```rust
/// use cardvault_core::observability::{init_logging, LogFormat};
///
/// init_logging(LogFormat::Pretty);
/// ```
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let result = match format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(tfmt::layer().json())
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(env_filter)
                .with(tfmt::layer().pretty())
                .try_init(),
        };
        if let Err(error) = result {
            tracing::debug!(%error, "global subscriber already installed");
        }
    });
}

/// Creates a span for ingestion operations with standard fields.
///
/// `character` is empty until an identity has been assigned.
///
/// # Example
///
/// ```rust
/// use cardvault_core::observability::ingest_span;
///
/// let span = ingest_span("ingest", None);
/// let _guard = span.enter();
/// ```
#[must_use]
pub fn ingest_span(operation: &str, character: Option<&str>) -> Span {
    tracing::info_span!(
        "ingest",
        op = operation,
        character = character.unwrap_or(""),
    )
}

/// Wrapper that hides a value in `Debug`/`Display` output.
///
/// Used for owner identifiers and upload file names, which must not appear
/// verbatim in shared logs.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Redacted<T>(pub T);

impl<T> Redacted<T> {
    /// Returns the wrapped value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<T> fmt::Display for Redacted<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
