use arrow::{
    array::{new_null_array, Array, ArrayRef},
    buffer::NullBuffer,
    datatypes::SchemaRef,
    record_batch::{RecordBatch, RecordBatchOptions},
    row::{Row, RowConverter, Rows},
};

use crate::{
    error::ScanError,
    observability::log_debug,
    schema::{ColumnMapping, ColumnSlot, OrderKey, UnionSchema},
    source::{Source, SourceProvider, SourceReader},
};

/// Order key of one row. `None` is a NULL key.
pub(crate) type Key<'a> = Option<Row<'a>>;

/// NULL-first "less than". A NULL left side is always less, even against
/// another NULL.
pub(crate) fn lt(left: Key<'_>, right: Key<'_>) -> bool {
    match (left, right) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(left), Some(right)) => left < right,
    }
}

/// NULL-first "less or equal", with the same NULL rule as [`lt`].
pub(crate) fn le(left: Key<'_>, right: Key<'_>) -> bool {
    match (left, right) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(left), Some(right)) => left <= right,
    }
}

struct KeyColumn {
    /// Logical validity; a `Null`-typed column has no physical null buffer.
    nulls: Option<NullBuffer>,
    rows: Rows,
}

/// Streaming read state of one source inside one scan instance.
pub(crate) struct Cursor {
    source: Source,
    reader: Box<dyn SourceReader>,
    mapping: ColumnMapping,
    order_key: OrderKey,
    schema: SchemaRef,
    batch: RecordBatch,
    keys: Option<KeyColumn>,
    position: usize,
    exhausted: bool,
}

impl Cursor {
    pub(crate) fn open(
        provider: &dyn SourceProvider,
        source: &Source,
        union: &UnionSchema,
        order_by: &str,
    ) -> Result<Self, ScanError> {
        let reader = provider
            .open(source)
            .map_err(|err| ScanError::source_read(source.id(), err))?;
        let mapping = ColumnMapping::new(union, source.schema());
        if mapping.has_absent() {
            log_debug!(
                component = "cursor",
                event = "null_fill",
                source = %source.id(),
                native = source.schema().fields().len(),
                union = union.len(),
            );
        }
        Ok(Self {
            source: source.clone(),
            reader,
            mapping,
            order_key: OrderKey::locate(source, order_by),
            schema: union.schema().clone(),
            batch: RecordBatch::new_empty(union.schema().clone()),
            keys: None,
            position: 0,
            exhausted: false,
        })
    }

    pub(crate) fn source_id(&self) -> &str {
        self.source.id()
    }

    pub(crate) fn is_unordered(&self) -> bool {
        self.order_key == OrderKey::Unordered
    }

    /// Loads the next physical batch in union layout. Returns `false` once the
    /// source is exhausted; later calls keep returning `false` without
    /// touching the reader.
    pub(crate) fn fetch(&mut self, converter: Option<&RowConverter>) -> Result<bool, ScanError> {
        self.batch = RecordBatch::new_empty(self.schema.clone());
        self.keys = None;
        self.position = 0;
        if self.exhausted {
            return Ok(false);
        }

        let native = match self.reader.next_batch() {
            Ok(Some(native)) if native.num_rows() > 0 => native,
            Ok(_) => {
                self.exhausted = true;
                return Ok(false);
            }
            Err(err) => return Err(ScanError::source_read(self.source.id(), err)),
        };

        let num_rows = native.num_rows();
        let columns: Vec<ArrayRef> = self
            .mapping
            .slots()
            .iter()
            .zip(self.schema.fields())
            .map(|(slot, field)| match slot {
                ColumnSlot::Native(idx) => native.column(*idx).clone(),
                ColumnSlot::Absent => new_null_array(field.data_type(), num_rows),
            })
            .collect();
        let batch = RecordBatch::try_new_with_options(
            self.schema.clone(),
            columns,
            &RecordBatchOptions::new().with_row_count(Some(num_rows)),
        )?;

        if let (OrderKey::Native(idx), Some(converter)) = (self.order_key, converter) {
            let values = native.column(idx);
            let rows = converter.convert_columns(&[values.clone()])?;
            self.keys = Some(KeyColumn {
                nulls: values.logical_nulls(),
                rows,
            });
        }
        self.batch = batch;
        Ok(true)
    }

    /// Rows of the current batch, or 0 when none is buffered.
    pub(crate) fn len(&self) -> usize {
        self.batch.num_rows()
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub(crate) fn is_drained(&self) -> bool {
        self.position >= self.len()
    }

    pub(crate) fn advance(&mut self) {
        self.position += 1;
    }

    pub(crate) fn key_at(&self, row: usize) -> Key<'_> {
        let keys = self.keys.as_ref()?;
        if keys.nulls.as_ref().is_some_and(|nulls| nulls.is_null(row)) {
            return None;
        }
        Some(keys.rows.row(row))
    }

    pub(crate) fn current_key(&self) -> Key<'_> {
        self.key_at(self.position)
    }

    pub(crate) fn last_key(&self) -> Key<'_> {
        self.key_at(self.len().saturating_sub(1))
    }

    /// Buffered batch in union layout.
    pub(crate) fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Hands out every row from the read position to the end of the batch.
    pub(crate) fn take_remaining(&mut self) -> RecordBatch {
        let len = self.len();
        let remaining = self.batch.slice(self.position, len - self.position);
        self.position = len;
        remaining
    }
}
