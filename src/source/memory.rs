use std::{collections::BTreeMap, sync::Arc};

use arrow::{
    datatypes::{Schema, SchemaRef},
    record_batch::{RecordBatch, RecordBatchOptions},
};

use super::{Source, SourceProvider, SourceReader};
use crate::{
    error::{ReadError, ScanError},
    resolve::{is_glob, GlobPattern},
};

#[derive(Debug, Clone)]
struct MemorySource {
    schema: SchemaRef,
    leaves: Vec<usize>,
    batches: Arc<Vec<RecordBatch>>,
}

/// Provider over named, already-decoded arrow batches.
///
/// Nested columns are not part of a source's native schema. Every
/// [`SourceProvider::open`] replays the batches from the start.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    sources: BTreeMap<String, MemorySource>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `batches` under `name`. All batches must share `schema`.
    pub fn with_source(
        mut self,
        name: impl Into<String>,
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
    ) -> Self {
        let leaves: Vec<usize> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, field)| !field.data_type().is_nested())
            .map(|(idx, _)| idx)
            .collect();
        let native = Arc::new(Schema::new(
            leaves
                .iter()
                .map(|idx| schema.field(*idx).clone())
                .collect::<Vec<_>>(),
        ));
        self.sources.insert(
            name.into(),
            MemorySource {
                schema: native,
                leaves,
                batches: Arc::new(batches),
            },
        );
        self
    }
}

impl SourceProvider for MemoryProvider {
    fn expand(&self, pattern: &str) -> Result<Vec<String>, ScanError> {
        if !is_glob(pattern) {
            return Ok(self
                .sources
                .contains_key(pattern)
                .then(|| vec![pattern.to_string()])
                .unwrap_or_default());
        }
        let glob = GlobPattern::new(pattern)?;
        Ok(self
            .sources
            .keys()
            .filter(|name| glob.matches(name))
            .cloned()
            .collect())
    }

    fn describe(&self, id: &str) -> Result<Source, ReadError> {
        let source = self.sources.get(id).ok_or(ReadError::NotFound)?;
        Ok(Source::new(id, source.schema.clone()))
    }

    fn open(&self, source: &Source) -> Result<Box<dyn SourceReader>, ReadError> {
        let memory = self.sources.get(source.id()).ok_or(ReadError::NotFound)?;
        Ok(Box::new(MemoryReader {
            source: memory.clone(),
            offset: 0,
        }))
    }
}

struct MemoryReader {
    source: MemorySource,
    offset: usize,
}

impl SourceReader for MemoryReader {
    fn next_batch(&mut self) -> Result<Option<RecordBatch>, ReadError> {
        let Some(batch) = self.source.batches.get(self.offset) else {
            return Ok(None);
        };
        self.offset += 1;
        let projected = batch.project(&self.source.leaves)?;
        Ok(Some(RecordBatch::try_new_with_options(
            self.source.schema.clone(),
            projected.columns().to_vec(),
            &RecordBatchOptions::new().with_row_count(Some(batch.num_rows())),
        )?))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::{
        array::{Int64Array, StringArray, StructArray},
        datatypes::{DataType, Field, Fields, Schema},
        record_batch::RecordBatch,
    };

    use super::MemoryProvider;
    use crate::source::SourceProvider;

    #[test]
    fn nested_columns_are_not_native() {
        let inner = Fields::from(vec![Field::new("x", DataType::Int64, true)]);
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("nested", DataType::Struct(inner.clone()), true),
            Field::new("name", DataType::Utf8, true),
        ]));
        let nested = StructArray::new(
            inner,
            vec![Arc::new(Int64Array::from(vec![7, 8])) as _],
            None,
        );
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(vec![1, 2])),
                Arc::new(nested),
                Arc::new(StringArray::from(vec!["a", "b"])),
            ],
        )
        .unwrap();

        let provider = MemoryProvider::new().with_source("t", schema, vec![batch]);
        let source = provider.describe("t").unwrap();
        let names: Vec<_> = source
            .schema()
            .fields()
            .iter()
            .map(|field| field.name().as_str())
            .collect();
        assert_eq!(names, vec!["id", "name"]);

        let mut reader = provider.open(&source).unwrap();
        let decoded = reader.next_batch().unwrap().unwrap();
        assert_eq!(decoded.num_columns(), 2);
        assert_eq!(decoded.num_rows(), 2);
        assert!(reader.next_batch().unwrap().is_none());
    }

    #[test]
    fn expand_matches_registered_names() {
        let schema = Arc::new(Schema::new(vec![Field::new("v", DataType::Int64, true)]));
        let provider = MemoryProvider::new()
            .with_source("logs/b", schema.clone(), vec![])
            .with_source("logs/a", schema.clone(), vec![])
            .with_source("other", schema, vec![]);

        assert_eq!(provider.expand("logs/*").unwrap(), vec!["logs/a", "logs/b"]);
        assert_eq!(provider.expand("other").unwrap(), vec!["other"]);
        assert!(provider.expand("missing").unwrap().is_empty());
    }
}
