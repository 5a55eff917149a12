//! `tracing` macros for scan events.
//!
//! Every event is emitted under [`SCAN_TARGET`] with a `component` naming
//! the stage and an `event` naming what happened:
//!
//! | component | events |
//! |---|---|
//! | `resolve` | `pattern_expanded`, `sources_resolved` |
//! | `schema` | `schema_reconciled`, `source_unordered` |
//! | `scan` | `order_by_not_found`, `instance_started`, `scan_finished`, `scan_failed` |
//! | `cursor` | `null_fill` |
//! | `merge` | `cursor_exhausted`, `unordered_source_selected` |
//!
//! Bind-time and end-of-scan events are `info`/`warn`; per-batch and
//! per-cursor events are `debug`. No subscriber is installed here.

pub(crate) const SCAN_TARGET: &str = "mergetree_scan";

/// Info-level event, e.g.
/// `log_info!(component = "scan", event = "scan_finished", rows = n)`.
macro_rules! log_info {
    ($($field:tt)*) => {
        ::tracing::info!(target: $crate::observability::SCAN_TARGET, $($field)*)
    };
}

macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::SCAN_TARGET, $($field)*)
    };
}

macro_rules! log_warn {
    ($($field:tt)*) => {
        ::tracing::warn!(target: $crate::observability::SCAN_TARGET, $($field)*)
    };
}

pub(crate) use log_debug;
pub(crate) use log_info;
pub(crate) use log_warn;
