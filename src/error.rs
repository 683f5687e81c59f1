//! Error taxonomy for the tracing engine
//!
//! Soft diagnostics (unsupported variable-dump targets, non-current fibers)
//! are deliberately *not* errors: they are reported as formatted lines in
//! the output stream so the dump helpers keep their "always returns the
//! target" contract.

use std::io;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, TraceError>;

/// Errors surfaced by the tracing engine.
///
/// Output write failures propagate fail-fast to whichever caller triggered
/// the emission; swallowing them could mask the very bug being hunted.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The configured output sink rejected the writability probe.
    #[error("output sink is not writable: {0}")]
    Configuration(#[source] io::Error),

    /// Timer lookup by an id or name that matches no live timer.
    #[error("no timer matches {key:?}")]
    TimerNotFound { key: String },

    /// Writing a message block to the output sink failed.
    #[error("failed to write trace output: {0}")]
    Sink(#[from] io::Error),
}
