use serde::Serialize;

/// Per-run counters, reset only at plugin construction and monotonically
/// incremented while the run progresses. Carried by the plugin instance so
/// concurrent or successive runs never share counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunCounters {
    /// Elements selected for a targeted (updater) run.
    pub targeted_elements: u64,
    /// Imports bound to at least one element.
    pub matched_imports: u64,
    /// Elements with at least one bound import.
    pub matched_elements: u64,
    /// Elements that cleared the minimal score in a targeted run.
    pub updatable_elements: u64,
    /// Imports with no counterpart in the store, eligible for creation.
    pub makable_imports: u64,
    /// Imports actually written as new elements.
    pub made_imports: u64,
    /// Elements whose tags were written this run.
    pub updated_elements: u64,
    /// Elements replaced wholesale this run.
    pub remade_elements: u64,
    /// Individual element writes that failed; never aborts the batch.
    pub write_failures: u64,
}
