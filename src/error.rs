use arrow::{datatypes::DataType, error::ArrowError};
use parquet::errors::ParquetError;

/// Error returned by bind and by every output-producing call of a scan.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The source patterns expanded to nothing.
    #[error("no sources matched the provided patterns: {patterns:?}")]
    NoMatchingSources {
        /// Patterns as given by the caller.
        patterns: Vec<String>,
    },
    /// Two sources expose the same column name with different types.
    #[error(
        "incompatible schema: column `{column}` is {expected} in `{first_source}` but {found} in \
         `{second_source}`"
    )]
    IncompatibleSchema {
        /// Name of the conflicting column.
        column: String,
        /// Source that introduced the column into the union schema.
        first_source: String,
        /// Type recorded for the column.
        expected: DataType,
        /// Source whose type disagrees.
        second_source: String,
        /// Type found in `second_source`.
        found: DataType,
    },
    /// Opening or decoding a source failed.
    #[error("failed to read source `{source_id}`: {error}")]
    SourceRead {
        /// Identifier of the failing source.
        source_id: String,
        /// Underlying decode failure.
        #[source]
        error: ReadError,
    },
    /// A source pattern could not be compiled.
    #[error("invalid source pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// Offending pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },
    /// Assembling an output batch failed.
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

impl ScanError {
    pub(crate) fn source_read(source_id: impl Into<String>, error: impl Into<ReadError>) -> Self {
        ScanError::SourceRead {
            source_id: source_id.into(),
            error: error.into(),
        }
    }
}

/// Failure reported by a [`SourceProvider`](crate::source::SourceProvider) or
/// [`SourceReader`](crate::source::SourceReader).
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// Filesystem error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Parquet decode error
    #[error("parquet error: {0}")]
    Parquet(#[from] ParquetError),
    /// Arrow conversion error
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
    /// The provider does not know the source.
    #[error("source not found")]
    NotFound,
}
