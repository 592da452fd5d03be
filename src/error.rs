//! Crate-wide error type.
//!
//! Scanners and analyzers surface failures through [`CoreError`]; the engine
//! is the only component that decides whether a given error is fatal (abort
//! the scan) or non-fatal (recorded as a [`crate::types::ScanError`] and
//! otherwise ignored). See spec §7 for the full taxonomy.

use thiserror::Error;

/// Errors produced anywhere in the scan engine core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The scan was cancelled via the supplied cancellation token.
    #[error("scan cancelled")]
    Cancelled,

    /// A scanner failed in a way that should be recorded, not propagated.
    #[error("scanner {scanner} failed: {message}")]
    Scanner { scanner: String, message: String },

    /// An analyzer failed in a way that should be recorded, not propagated.
    #[error("analyzer {analyzer} failed: {message}")]
    Analyzer { analyzer: String, message: String },

    /// Prioritisation failed; this is always fatal (spec §7.5).
    #[error("prioritization failed: {0}")]
    Prioritization(String),

    /// A formatter could not encode a report.
    #[error("formatter {formatter} failed: {message}")]
    Formatter { formatter: String, message: String },

    /// HTTP transport error talking to an external vulnerability database.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Underlying I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CoreResult<T> = Result<T, CoreError>;
