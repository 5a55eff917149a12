//! Winner-group k-way merge over per-source cursors.
//!
//! Before each output batch, drained cursors are refilled (or dropped once
//! their source is exhausted) and the winner group is recomputed. A group of
//! one is emitted by slicing its whole remaining batch; a larger group is
//! merged row by row until the chosen cursor runs dry or the batch cap is
//! hit.

use arrow::{
    array::{Array, ArrayRef},
    compute::kernels::interleave::interleave,
    datatypes::SchemaRef,
    record_batch::{RecordBatch, RecordBatchOptions},
    row::RowConverter,
};

use crate::{
    cursor::{le, lt, Cursor},
    error::ScanError,
    observability::log_debug,
    option::ScanOptions,
};

pub(crate) struct MergeCoordinator {
    schema: SchemaRef,
    cursors: Vec<Cursor>,
    winners: Vec<usize>,
    converter: Option<RowConverter>,
    options: ScanOptions,
    stale: bool,
}

impl MergeCoordinator {
    /// Takes ownership of `cursors` and performs their initial fetch.
    pub(crate) fn new(
        schema: SchemaRef,
        mut cursors: Vec<Cursor>,
        converter: Option<RowConverter>,
        options: ScanOptions,
    ) -> Result<Self, ScanError> {
        for cursor in cursors.iter_mut() {
            cursor.fetch(converter.as_ref())?;
        }
        Ok(Self {
            schema,
            winners: Vec::with_capacity(cursors.len()),
            cursors,
            converter,
            options,
            stale: true,
        })
    }

    pub(crate) fn live(&self) -> usize {
        self.cursors.len()
    }

    /// Next sorted output batch, or `None` once every source is exhausted.
    pub(crate) fn next_batch(&mut self) -> Result<Option<RecordBatch>, ScanError> {
        self.refill()?;
        if self.cursors.is_empty() {
            return Ok(None);
        }
        if self.winners.len() == 1 {
            let cursor = &mut self.cursors[self.winners[0]];
            return Ok(Some(cursor.take_remaining()));
        }
        self.merge_winners().map(Some)
    }

    fn refill(&mut self) -> Result<(), ScanError> {
        // walk backwards so swap_remove only moves cursors already visited
        for idx in (0..self.cursors.len()).rev() {
            if !self.cursors[idx].is_drained() {
                continue;
            }
            self.stale = true;
            if !self.cursors[idx].fetch(self.converter.as_ref())? {
                let cursor = self.cursors.swap_remove(idx);
                log_debug!(
                    component = "merge",
                    event = "cursor_exhausted",
                    source = %cursor.source_id(),
                    live = self.cursors.len(),
                );
            }
        }
        if self.stale {
            self.recompute_winners();
            self.stale = false;
        }
        Ok(())
    }

    fn recompute_winners(&mut self) {
        self.winners.clear();
        if self.cursors.is_empty() {
            return;
        }

        if let Some(unordered) = self.cursors.iter().position(Cursor::is_unordered) {
            log_debug!(
                component = "merge",
                event = "unordered_source_selected",
                source = %self.cursors[unordered].source_id(),
            );
            self.winners.push(unordered);
            return;
        }

        let mut winner = 0;
        for idx in 1..self.cursors.len() {
            if lt(
                self.cursors[idx].current_key(),
                self.cursors[winner].current_key(),
            ) {
                winner = idx;
            }
        }
        self.winners.push(winner);

        let tail = self.cursors[winner].last_key();
        for (idx, cursor) in self.cursors.iter().enumerate() {
            if idx != winner && le(cursor.current_key(), tail) {
                self.winners.push(idx);
            }
        }
    }

    /// Tournament merge across the winner group.
    fn merge_winners(&mut self) -> Result<RecordBatch, ScanError> {
        let max_rows = self.options.max_batch_rows;
        let mut capacity = self.options.starting_capacity();
        // (winner slot, row) per output row
        let mut picks: Vec<(usize, usize)> = Vec::with_capacity(capacity);

        loop {
            let mut slot = 0;
            for candidate in 1..self.winners.len() {
                if lt(
                    self.cursors[self.winners[candidate]].current_key(),
                    self.cursors[self.winners[slot]].current_key(),
                ) {
                    slot = candidate;
                }
            }

            let cursor = &mut self.cursors[self.winners[slot]];
            picks.push((slot, cursor.position()));
            cursor.advance();
            if cursor.is_drained() || picks.len() >= max_rows {
                break;
            }
            if picks.len() >= capacity {
                capacity = (capacity * 2).min(max_rows);
                picks.reserve(capacity - picks.len());
            }
        }

        let batches: Vec<&RecordBatch> = self
            .winners
            .iter()
            .map(|idx| self.cursors[*idx].batch())
            .collect();
        let columns = (0..self.schema.fields().len())
            .map(|column| {
                let values: Vec<&dyn Array> = batches
                    .iter()
                    .map(|batch| batch.column(column).as_ref())
                    .collect();
                interleave(&values, &picks)
            })
            .collect::<Result<Vec<ArrayRef>, _>>()?;

        Ok(RecordBatch::try_new_with_options(
            self.schema.clone(),
            columns,
            &RecordBatchOptions::new().with_row_count(Some(picks.len())),
        )?)
    }
}
