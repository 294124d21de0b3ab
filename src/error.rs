//! Error taxonomy for the mail-merge engine
//!
//! Only two failures are fatal to a batch:
//! - [`MergeError::SourceRead`]: the spreadsheet or template cannot be opened or parsed
//! - [`MergeError::OutputWrite`]: a generated document cannot be written
//!
//! Per-field anomalies (unrecognized date shapes, missing grid rows, missing
//! keyword cells) are absorbed by the engine and never surface here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// ERROR CODES
// =============================================================================

/// Stable codes reported to the caller alongside the error message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ErrorCode {
    /// Spreadsheet or template could not be opened or parsed
    SourceReadError = -32101,
    /// A generated document could not be written to the output directory
    OutputWriteError = -32102,
}

impl ErrorCode {
    /// Get the integer code
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Whether the same call can succeed later without changing its inputs.
    /// True only for output write failures, which depend on filesystem state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::OutputWriteError)
    }

    /// Get the error category for reporting
    pub fn category(&self) -> &'static str {
        match self {
            ErrorCode::SourceReadError => "input_error",
            ErrorCode::OutputWriteError => "io_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

// =============================================================================
// SOURCE KINDS
// =============================================================================

/// Which input failed to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Spreadsheet,
    Template,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Spreadsheet => write!(f, "spreadsheet"),
            SourceKind::Template => write!(f, "template"),
        }
    }
}

// =============================================================================
// MERGE ERROR
// =============================================================================

/// Fatal batch error returned to the caller
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("failed to read {kind} {}: {message}", display_origin(.path))]
    SourceRead {
        kind: SourceKind,
        path: Option<PathBuf>,
        message: String,
    },

    #[error("failed to write output for record {record_index} to {path:?}: {source}")]
    OutputWrite {
        record_index: usize,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn display_origin(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!("{:?}", path),
        None => "<in-memory>".to_string(),
    }
}

impl MergeError {
    pub fn source_read(
        kind: SourceKind,
        path: Option<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        MergeError::SourceRead {
            kind,
            path,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            MergeError::SourceRead { .. } => ErrorCode::SourceReadError,
            MergeError::OutputWrite { .. } => ErrorCode::OutputWriteError,
        }
    }

    /// Index of the record being written when the batch aborted, if any
    pub fn record_index(&self) -> Option<usize> {
        match self {
            MergeError::OutputWrite { record_index, .. } => Some(*record_index),
            MergeError::SourceRead { .. } => None,
        }
    }
}

pub type MergeResult<T> = std::result::Result<T, MergeError>;

// =============================================================================
// DOCUMENT PACKAGE ERRORS
// =============================================================================

/// Low-level failures while reading or writing a `.docx` package
#[derive(Debug, Error)]
pub enum DocxError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid zip container: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("malformed xml: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("part {0} is not valid utf-8")]
    Encoding(String),

    #[error("package has no {0} part")]
    MissingPart(String),

    #[error("unbalanced xml: {0}")]
    Structure(String),
}

impl DocxError {
    /// Collapse into an `io::Error` for output-write reporting
    pub fn into_io(self) -> io::Error {
        match self {
            DocxError::Io(err) => err,
            DocxError::Zip(zip::result::ZipError::Io(err)) => err,
            other => io::Error::other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_categories() {
        assert_eq!(ErrorCode::SourceReadError.code(), -32101);
        assert_eq!(ErrorCode::OutputWriteError.code(), -32102);
        assert_eq!(ErrorCode::SourceReadError.category(), "input_error");
        assert!(!ErrorCode::SourceReadError.is_retryable());
        assert!(ErrorCode::OutputWriteError.is_retryable());
    }

    #[test]
    fn output_write_carries_record_index() {
        let err = MergeError::OutputWrite {
            record_index: 7,
            path: PathBuf::from("out/output_7.docx"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.record_index(), Some(7));
        assert_eq!(err.code(), ErrorCode::OutputWriteError);
        assert!(err.to_string().contains("record 7"));
    }

    #[test]
    fn source_read_without_path_renders_in_memory() {
        let err = MergeError::source_read(SourceKind::Template, None, "bad zip");
        assert_eq!(err.record_index(), None);
        assert_eq!(
            err.to_string(),
            "failed to read template <in-memory>: bad zip"
        );
    }
}
