//! Decode-handle collaborators consumed by the merge engine.
//!
//! A [`SourceProvider`] is shared by every parallel scan instance and turns
//! identifiers into [`Source`] descriptions and fresh [`SourceReader`]s. A
//! reader is owned by exactly one cursor.

pub mod memory;
pub mod parquet;

use std::sync::Arc;

use arrow::{datatypes::SchemaRef, record_batch::RecordBatch};

use crate::error::{ReadError, ScanError};

/// One physical input and its native flat schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    id: Arc<str>,
    schema: SchemaRef,
}

impl Source {
    pub fn new(id: impl Into<Arc<str>>, schema: SchemaRef) -> Self {
        Self {
            id: id.into(),
            schema,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Native leaf-level columns in native order.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }
}

/// Resolves, describes and opens sources.
pub trait SourceProvider: Send + Sync {
    /// Concrete ids matched by `pattern`. Unknown literal ids expand to
    /// nothing.
    fn expand(&self, pattern: &str) -> Result<Vec<String>, ScanError>;

    /// Reads only the structural schema of `id`.
    fn describe(&self, id: &str) -> Result<Source, ReadError>;

    /// Starts a fresh scan of `source`.
    fn open(&self, source: &Source) -> Result<Box<dyn SourceReader>, ReadError>;
}

/// Sequential batch decoder over one source.
///
/// Every batch carries all native columns in native order, typed as in
/// [`Source::schema`]. `None` or a zero-row batch is end of input, and no
/// rows follow it.
pub trait SourceReader: Send {
    fn next_batch(&mut self) -> Result<Option<RecordBatch>, ReadError>;
}
