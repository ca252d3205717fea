//! Plugin lifecycle: `load → process → synchronize`, linear and
//! non-resumable. A plugin instance runs the sequence exactly once; the
//! three variants specialize matching direction, scoring aggregation and
//! the write decision.

mod maker;
mod remaker;
mod updater;

pub use maker::MakerPlugin;
pub use remaker::RemakerPlugin;
pub use updater::UpdaterPlugin;

use crate::cache::ElementCache;
use crate::config::RunConfig;
use crate::counters::RunCounters;
use crate::error::ReconError;
use crate::report::{score_histogram, RunReport};

pub trait Plugin {
    fn name(&self) -> &'static str;
    fn config(&self) -> &RunConfig;
    fn counters(&self) -> &RunCounters;
    fn cache(&self) -> &ElementCache;

    /// Populate the run inputs from the external sources.
    fn load(&mut self) -> Result<(), ReconError>;

    /// Build the import↔element association graph, score it and mark
    /// actionable items.
    fn process(&mut self) -> Result<(), ReconError>;

    /// Write the decision set through the configured mode.
    fn synchronize(&mut self) -> Result<(), ReconError>;
}

/// Drive one full run and assemble the closing report.
pub fn run(plugin: &mut dyn Plugin) -> Result<RunReport, ReconError> {
    log::info!("=== Loading inputs ({}) ===", plugin.name());
    plugin.load()?;
    log::info!("=== Processing ({}) ===", plugin.name());
    plugin.process()?;
    plugin.synchronize()?;

    let config = plugin.config();
    let report = RunReport {
        plugin: plugin.name().to_string(),
        config_name: config.name.clone(),
        mode: config.mode,
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        run_at: chrono::Utc::now().to_rfc3339(),
        counters: plugin.counters().clone(),
        score_histogram: score_histogram(plugin.cache().iter()),
    };
    report.log();
    Ok(report)
}

/// Placeholder ids for elements that do not exist yet, decreasing from -1
/// so they can never collide with real ids.
pub(crate) struct IdSequence {
    next: i64,
}

impl IdSequence {
    pub(crate) fn new() -> Self {
        Self { next: -1 }
    }

    pub(crate) fn next(&mut self) -> i64 {
        let id = self.next;
        self.next -= 1;
        id
    }
}

/// Append a new way built from a closed polygon ring to `document`,
/// together with its nodes. Candidate tags are applied on top of the
/// building marker.
pub(crate) fn push_new_way(
    document: &mut geosync_core::document::OsmDocument,
    ids: &mut IdSequence,
    ring: &[(f64, f64)],
    tags: &std::collections::BTreeMap<String, String>,
) {
    use geosync_core::document::{OsmNode, OsmWay};
    use geosync_core::tags as tag_names;

    let mut node_refs = Vec::with_capacity(ring.len());
    // The ring repeats its first point; create one node per distinct point
    // and close the way by repeating the first reference.
    for (lon, lat) in &ring[..ring.len() - 1] {
        let id = ids.next();
        document.nodes.push(OsmNode {
            id,
            version: 0,
            changeset: 0,
            lat: *lat,
            lon: *lon,
            tags: Vec::new(),
        });
        node_refs.push(id);
    }
    node_refs.push(node_refs[0]);

    let mut way = OsmWay {
        id: ids.next(),
        version: 0,
        changeset: 0,
        node_refs,
        tags: Vec::new(),
    };
    way.set_tag(tag_names::BUILDING, "yes");
    for (key, value) in tags {
        way.set_tag(key, value);
    }
    document.ways.push(way);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn id_sequence_decreases() {
        let mut ids = IdSequence::new();
        assert_eq!(ids.next(), -1);
        assert_eq!(ids.next(), -2);
    }

    #[test]
    fn push_new_way_builds_closed_way() {
        let mut document = geosync_core::document::OsmDocument::default();
        let mut ids = IdSequence::new();
        let ring = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)];
        let tags = BTreeMap::from([("height".to_string(), "12".to_string())]);
        push_new_way(&mut document, &mut ids, &ring, &tags);

        assert_eq!(document.nodes.len(), 3);
        let way = &document.ways[0];
        assert_eq!(way.id, -4);
        assert_eq!(way.node_refs, vec![-1, -2, -3, -1]);
        assert_eq!(way.tag("building"), Some("yes"));
        assert_eq!(way.tag("height"), Some("12"));
    }
}
