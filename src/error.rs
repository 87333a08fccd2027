//! Error types for the sparkify-etl library.
//!
//! Parse-class errors mean a record or file is unusable; sink errors mean the
//! warehouse rejected a write. Either one aborts the current file's
//! transaction and is reported to the batch driver, which moves on to the
//! next file.

use thiserror::Error;

/// Errors that can occur while loading source files into the warehouse.
#[derive(Error, Debug)]
pub enum EtlError {
    /// A line was not well-formed JSON, or not a JSON object
    #[error("Malformed JSON record on line {line}: {source}")]
    Parse {
        /// 1-based line number within the file
        line: usize,
        /// Underlying decoder error
        #[source]
        source: serde_json::Error,
    },

    /// A key or required attribute was absent or untypeable
    #[error("Missing required field `{field}` on line {line}")]
    MissingField {
        /// Source field name
        field: &'static str,
        /// 1-based line number within the file
        line: usize,
    },

    /// A line or file was not valid UTF-8 text
    #[error("Input is not valid UTF-8 text on line {line}")]
    InvalidText {
        /// 1-based line number within the file
        line: usize,
    },

    /// A catalog file contained no record at all
    #[error("Catalog file contains no record")]
    EmptyCatalog,

    /// Epoch milliseconds outside the representable calendar range
    #[error("Timestamp out of range: {0} ms")]
    InvalidTimestamp(i64),

    /// Warehouse read or write failed
    #[error("Warehouse error: {0}")]
    Sink(#[from] rusqlite::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl EtlError {
    /// True for errors caused by the input data rather than the environment.
    #[must_use]
    pub const fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. }
                | Self::MissingField { .. }
                | Self::InvalidText { .. }
                | Self::EmptyCatalog
                | Self::InvalidTimestamp(_)
        )
    }
}

/// Convenience type alias for Result with EtlError
pub type Result<T> = std::result::Result<T, EtlError>;
