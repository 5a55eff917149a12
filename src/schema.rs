//! Union schema reconciliation and per-source column mapping.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};

use crate::{
    error::ScanError,
    observability::{log_debug, log_info},
    source::Source,
};

/// Name-deduplicated output schema across all sources.
///
/// Every field is nullable since a source may not carry it.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionSchema {
    schema: SchemaRef,
}

impl UnionSchema {
    /// Walks `sources` in order, appending unseen columns and checking that
    /// repeated names carry the recorded type.
    pub fn reconcile(sources: &[Source]) -> Result<Self, ScanError> {
        let mut fields: Vec<Field> = Vec::new();
        // source that introduced each field
        let mut origins: Vec<usize> = Vec::new();

        for (source_idx, source) in sources.iter().enumerate() {
            for native in source.schema().fields() {
                match fields.iter().position(|field| field.name() == native.name()) {
                    None => {
                        fields.push(Field::new(native.name(), native.data_type().clone(), true));
                        origins.push(source_idx);
                    }
                    Some(existing) if fields[existing].data_type() != native.data_type() => {
                        return Err(ScanError::IncompatibleSchema {
                            column: native.name().clone(),
                            first_source: sources[origins[existing]].id().to_string(),
                            expected: fields[existing].data_type().clone(),
                            second_source: source.id().to_string(),
                            found: native.data_type().clone(),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        log_info!(
            component = "schema",
            event = "schema_reconciled",
            sources = sources.len(),
            columns = fields.len(),
        );
        Ok(Self {
            schema: Arc::new(Schema::new(fields)),
        })
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.schema.fields().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Type of the order-by column, if any source exposes it.
    pub fn order_key_type(&self, order_by: &str) -> Option<&DataType> {
        self.schema
            .fields()
            .iter()
            .find(|field| field.name() == order_by)
            .map(|field| field.data_type())
    }
}

/// Where one union column comes from for a given source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSlot {
    /// Native column index.
    Native(usize),
    /// Not present in the source; always NULL.
    Absent,
}

/// Union-to-native column mapping of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    slots: Vec<ColumnSlot>,
    has_absent: bool,
}

impl ColumnMapping {
    pub fn new(union: &UnionSchema, native: &Schema) -> Self {
        let slots: Vec<ColumnSlot> = union
            .schema()
            .fields()
            .iter()
            .map(|field| match native.index_of(field.name()) {
                Ok(idx) => ColumnSlot::Native(idx),
                Err(_) => ColumnSlot::Absent,
            })
            .collect();
        let has_absent = slots.contains(&ColumnSlot::Absent);
        Self { slots, has_absent }
    }

    /// One slot per union column, in union order.
    pub fn slots(&self) -> &[ColumnSlot] {
        &self.slots
    }

    pub fn has_absent(&self) -> bool {
        self.has_absent
    }
}

/// Position of the order-by column in a source's native schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKey {
    Native(usize),
    /// The source lacks the order-by column and must be drained wholesale.
    Unordered,
}

impl OrderKey {
    pub fn locate(source: &Source, order_by: &str) -> Self {
        match source.schema().index_of(order_by) {
            Ok(idx) => OrderKey::Native(idx),
            Err(_) => {
                log_debug!(
                    component = "schema",
                    event = "source_unordered",
                    source = %source.id(),
                    order_by = %order_by,
                );
                OrderKey::Unordered
            }
        }
    }
}
