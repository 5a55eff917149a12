use std::{fs::File, sync::Arc};

use arrow::{
    array::ArrayRef,
    compute::{cast_with_options, CastOptions},
    datatypes::{DataType, Field, Schema, SchemaRef},
    error::ArrowError,
    record_batch::{RecordBatch, RecordBatchOptions},
};
use parquet::{
    arrow::{
        arrow_reader::{
            ArrowReaderOptions, ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder,
        },
        ProjectionMask,
    },
    basic::Type as PhysicalType,
    schema::types::SchemaDescriptor,
};

use super::{Source, SourceProvider, SourceReader};
use crate::{
    error::{ReadError, ScanError},
    resolve::expand_path,
    types::logical_type,
};

/// Rows decoded per physical batch.
pub const DEFAULT_PARQUET_BATCH_SIZE: usize = 2048;

/// Provider over parquet files on the local filesystem.
#[derive(Debug, Clone)]
pub struct ParquetProvider {
    batch_size: usize,
    binary_as_string: bool,
}

impl Default for ParquetProvider {
    fn default() -> Self {
        ParquetProvider {
            batch_size: DEFAULT_PARQUET_BATCH_SIZE,
            binary_as_string: true,
        }
    }
}

impl ParquetProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_size(self, batch_size: usize) -> Self {
        ParquetProvider {
            batch_size: batch_size.max(1),
            ..self
        }
    }

    /// Decode unannotated `BYTE_ARRAY` columns as `Utf8` instead of `Binary`.
    pub fn binary_as_string(self, binary_as_string: bool) -> Self {
        ParquetProvider {
            binary_as_string,
            ..self
        }
    }

    fn builder(&self, path: &str) -> Result<ParquetRecordBatchReaderBuilder<File>, ReadError> {
        let file = File::open(path)?;
        // the type table is the single authority on column types
        let options = ArrowReaderOptions::new().with_skip_arrow_metadata(true);
        Ok(ParquetRecordBatchReaderBuilder::try_new_with_options(file, options)?)
    }

    /// Top-level, non-repeated leaves and their logical types.
    fn flat_leaves(&self, descriptor: &SchemaDescriptor) -> (Vec<usize>, SchemaRef) {
        let mut leaves = Vec::new();
        let mut fields = Vec::new();
        for (idx, column) in descriptor.columns().iter().enumerate() {
            if column.path().parts().len() != 1 || column.max_rep_level() > 0 {
                continue;
            }
            let mut data_type = logical_type(column);
            if self.binary_as_string
                && column.physical_type() == PhysicalType::BYTE_ARRAY
                && data_type == DataType::Binary
            {
                data_type = DataType::Utf8;
            }
            leaves.push(idx);
            fields.push(Field::new(column.name(), data_type, true));
        }
        (leaves, Arc::new(Schema::new(fields)))
    }
}

impl SourceProvider for ParquetProvider {
    fn expand(&self, pattern: &str) -> Result<Vec<String>, ScanError> {
        expand_path(pattern)
    }

    fn describe(&self, id: &str) -> Result<Source, ReadError> {
        let builder = self.builder(id)?;
        let (_, schema) = self.flat_leaves(builder.parquet_schema());
        Ok(Source::new(id, schema))
    }

    fn open(&self, source: &Source) -> Result<Box<dyn SourceReader>, ReadError> {
        let builder = self.builder(source.id())?;
        let (leaves, schema) = self.flat_leaves(builder.parquet_schema());
        let mask = ProjectionMask::leaves(builder.parquet_schema(), leaves);
        let reader = builder
            .with_projection(mask)
            .with_batch_size(self.batch_size)
            .build()?;
        Ok(Box::new(ParquetSourceReader { reader, schema }))
    }
}

struct ParquetSourceReader {
    reader: ParquetRecordBatchReader,
    schema: SchemaRef,
}

impl SourceReader for ParquetSourceReader {
    fn next_batch(&mut self) -> Result<Option<RecordBatch>, ReadError> {
        let Some(decoded) = self.reader.next().transpose()? else {
            return Ok(None);
        };
        let columns = decoded
            .columns()
            .iter()
            .zip(self.schema.fields())
            .map(|(column, field)| conform(column, field.data_type()))
            .collect::<Result<Vec<ArrayRef>, _>>()?;
        Ok(Some(RecordBatch::try_new_with_options(
            self.schema.clone(),
            columns,
            &RecordBatchOptions::new().with_row_count(Some(decoded.num_rows())),
        )?))
    }
}

/// Casts a decoded column to its adapter type. Values that do not convert
/// are an error, never NULL.
fn conform(column: &ArrayRef, target: &DataType) -> Result<ArrayRef, ArrowError> {
    if column.data_type() == target {
        return Ok(column.clone());
    }
    let options = CastOptions {
        safe: false,
        ..Default::default()
    };
    match (column.data_type(), target) {
        // no direct kernel from fixed-width bytes to strings
        (DataType::FixedSizeBinary(_), DataType::Utf8) => {
            let bytes = cast_with_options(column, &DataType::Binary, &options)?;
            cast_with_options(&bytes, target, &options)
        }
        _ => cast_with_options(column, target, &options),
    }
}
