//! `geosync-recon` — Building conflation engine.
//!
//! Matches imports to reference elements, scores the pairings and
//! synchronizes the decision set through injected collaborator ports.
//! Pure engine crate: no CLI, no network, no filesystem.

pub mod cache;
pub mod config;
pub mod counters;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod plugin;
pub mod report;
pub mod scorer;
pub mod sync;
pub mod wkt;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::ElementCache;
pub use config::{AggregationPolicy, RunConfig, SyncMode};
pub use counters::RunCounters;
pub use error::ReconError;
pub use plugin::{run, MakerPlugin, Plugin, RemakerPlugin, UpdaterPlugin};
pub use report::RunReport;
