/// Hard upper bound on rows emitted by one tournament-merge call.
pub const DEFAULT_MAX_BATCH_ROWS: usize = 2048;

/// Capacity an output batch starts with before doubling.
pub const DEFAULT_INITIAL_BATCH_CAPACITY: usize = 1024;

/// Tuning knobs for a merge scan instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub(crate) max_batch_rows: usize,
    pub(crate) initial_batch_capacity: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            max_batch_rows: DEFAULT_MAX_BATCH_ROWS,
            initial_batch_capacity: DEFAULT_INITIAL_BATCH_CAPACITY,
        }
    }
}

impl ScanOptions {
    /// Cap on rows produced per call while more than one source interleaves.
    /// The bulk path is not bounded by it.
    pub fn max_batch_rows(self, max_batch_rows: usize) -> Self {
        ScanOptions {
            max_batch_rows: max_batch_rows.max(1),
            ..self
        }
    }

    pub fn initial_batch_capacity(self, initial_batch_capacity: usize) -> Self {
        ScanOptions {
            initial_batch_capacity: initial_batch_capacity.max(1),
            ..self
        }
    }

    pub(crate) fn starting_capacity(&self) -> usize {
        self.initial_batch_capacity.min(self.max_batch_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_limits() {
        let options = ScanOptions::default();
        assert_eq!(options.max_batch_rows, 2048);
        assert_eq!(options.starting_capacity(), 1024);
    }

    #[test]
    fn starting_capacity_never_exceeds_cap() {
        let options = ScanOptions::default().max_batch_rows(16);
        assert_eq!(options.starting_capacity(), 16);

        let options = ScanOptions::default().max_batch_rows(0).initial_batch_capacity(0);
        assert_eq!(options.max_batch_rows, 1);
        assert_eq!(options.starting_capacity(), 1);
    }
}
