//! Streaming k-way merge over independently pre-sorted columnar sources.
//!
//! Sources are resolved from patterns, their flat schemas are unioned once at
//! bind time, and every scan instance merges its own cursors into a single
//! stream of arrow batches sorted ascending on the order-by column, NULL
//! first. Sources that lack the order-by column are emitted wholesale before
//! ordered merging resumes; columns a source lacks are NULL for its rows.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use mergetree_scan::{ordered_scan, ParquetProvider};
//!
//! # fn main() -> Result<(), mergetree_scan::ScanError> {
//! let scan = ordered_scan(Arc::new(ParquetProvider::new()), &["data/*.parquet"], "ts")?;
//! for batch in scan {
//!     println!("{} rows", batch?.num_rows());
//! }
//! # Ok(())
//! # }
//! ```

mod cursor;
mod merge;
mod observability;

pub mod error;
pub mod option;
pub mod resolve;
pub mod scan;
pub mod schema;
pub mod source;
pub mod types;

use std::sync::Arc;

pub use crate::{
    error::{ReadError, ScanError},
    option::ScanOptions,
    scan::{MergeScan, OrderedScan, ScanPlan},
    schema::UnionSchema,
    source::{
        memory::MemoryProvider, parquet::ParquetProvider, Source, SourceProvider, SourceReader,
    },
};

/// Binds `patterns` against `provider` and starts a single scan instance
/// ordered by `order_by`.
///
/// Use [`OrderedScan`] directly to run several instances off one bind.
pub fn ordered_scan<P>(
    provider: Arc<dyn SourceProvider>,
    patterns: &[P],
    order_by: &str,
) -> Result<MergeScan, ScanError>
where
    P: AsRef<str>,
{
    OrderedScan::new(provider)
        .bind(patterns, order_by)?
        .execute()
}
