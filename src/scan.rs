//! Bind-time planning and per-instance execution of an ordered scan.

use std::{fmt, sync::Arc};

use arrow::{
    compute::SortOptions,
    datatypes::SchemaRef,
    record_batch::RecordBatch,
    row::{RowConverter, SortField},
};

use crate::{
    cursor::Cursor,
    error::ScanError,
    merge::MergeCoordinator,
    observability::{log_debug, log_info, log_warn},
    option::ScanOptions,
    resolve::resolve_sources,
    schema::UnionSchema,
    source::{Source, SourceProvider},
};

/// Entry point for binding an ordered scan against a provider.
pub struct OrderedScan {
    provider: Arc<dyn SourceProvider>,
    options: ScanOptions,
}

impl OrderedScan {
    pub fn new(provider: Arc<dyn SourceProvider>) -> Self {
        Self {
            provider,
            options: ScanOptions::default(),
        }
    }

    pub fn with_options(self, options: ScanOptions) -> Self {
        Self { options, ..self }
    }

    /// Resolves `patterns`, reads every source's structural schema and builds
    /// the union schema. Runs once; the returned plan is shared read-only by
    /// every scan instance.
    pub fn bind<P>(&self, patterns: &[P], order_by: &str) -> Result<Arc<ScanPlan>, ScanError>
    where
        P: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .iter()
            .map(|pattern| pattern.as_ref().to_string())
            .collect();
        let ids = resolve_sources(self.provider.as_ref(), &patterns)?;
        let sources = ids
            .iter()
            .map(|id| {
                self.provider
                    .describe(id)
                    .map_err(|err| ScanError::source_read(id.as_str(), err))
            })
            .collect::<Result<Vec<Source>, _>>()?;
        let union = UnionSchema::reconcile(&sources)?;
        if union.order_key_type(order_by).is_none() {
            log_warn!(
                component = "scan",
                event = "order_by_not_found",
                order_by = %order_by,
                sources = sources.len(),
            );
        }

        Ok(Arc::new(ScanPlan {
            provider: self.provider.clone(),
            sources,
            union,
            order_by: order_by.to_string(),
            options: self.options,
        }))
    }
}

/// Immutable outcome of binding: resolved sources, union schema and the
/// order-by column.
pub struct ScanPlan {
    provider: Arc<dyn SourceProvider>,
    sources: Vec<Source>,
    union: UnionSchema,
    order_by: String,
    options: ScanOptions,
}

impl ScanPlan {
    pub fn schema(&self) -> &SchemaRef {
        self.union.schema()
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(Source::id)
    }

    pub fn order_by(&self) -> &str {
        &self.order_by
    }

    /// Starts one independent scan instance: every source is re-opened and
    /// primed with its first batch. Instances share nothing with each other.
    pub fn execute(&self) -> Result<MergeScan, ScanError> {
        let converter = self
            .union
            .order_key_type(&self.order_by)
            .map(|data_type| {
                RowConverter::new(vec![SortField::new_with_options(
                    data_type.clone(),
                    SortOptions {
                        descending: false,
                        nulls_first: true,
                    },
                )])
            })
            .transpose()?;

        let cursors = self
            .sources
            .iter()
            .map(|source| {
                Cursor::open(self.provider.as_ref(), source, &self.union, &self.order_by)
            })
            .collect::<Result<Vec<_>, _>>()?;
        let merge = MergeCoordinator::new(
            self.union.schema().clone(),
            cursors,
            converter,
            self.options,
        )?;

        log_debug!(
            component = "scan",
            event = "instance_started",
            sources = self.sources.len(),
            live = merge.live(),
        );
        Ok(MergeScan {
            merge,
            rows: 0,
            done: false,
        })
    }
}

impl PartialEq for ScanPlan {
    fn eq(&self, other: &Self) -> bool {
        self.order_by == other.order_by && self.sources().eq(other.sources())
    }
}

impl fmt::Debug for ScanPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanPlan")
            .field("sources", &self.sources().collect::<Vec<_>>())
            .field("order_by", &self.order_by)
            .field("schema", self.union.schema())
            .finish()
    }
}

/// One parallel instance of an ordered scan, yielding sorted batches.
///
/// After an error the instance is finished and yields nothing more.
pub struct MergeScan {
    merge: MergeCoordinator,
    rows: usize,
    done: bool,
}

impl Iterator for MergeScan {
    type Item = Result<RecordBatch, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.merge.next_batch() {
            Ok(Some(batch)) => {
                self.rows += batch.num_rows();
                Some(Ok(batch))
            }
            Ok(None) => {
                self.done = true;
                log_info!(component = "scan", event = "scan_finished", rows = self.rows);
                None
            }
            Err(err) => {
                self.done = true;
                log_warn!(
                    component = "scan",
                    event = "scan_failed",
                    rows = self.rows,
                    error = %err,
                );
                Some(Err(err))
            }
        }
    }
}

impl fmt::Debug for MergeScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergeScan")
            .field("live", &self.merge.live())
            .field("rows", &self.rows)
            .field("done", &self.done)
            .finish()
    }
}
