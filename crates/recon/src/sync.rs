use std::collections::BTreeMap;

use geosync_core::document::OsmDocument;
use geosync_core::model::Element;
use geosync_core::ports::{BatchExporter, ReferenceApi};
use geosync_core::tags;

use crate::cache::ElementCache;
use crate::config::{RunConfig, SyncMode};
use crate::counters::RunCounters;
use crate::error::ReconError;

/// What the step writes for each element clearing the minimal score:
/// reconciled tags on the element's own snapshot, or a precomputed
/// replacement document.
pub enum SyncSource<'a> {
    TagUpdate { updatable_tags: &'a [String] },
    Remake { documents: &'a BTreeMap<i64, OsmDocument> },
}

/// Walks the final decision set and dispatches each element to the
/// reference API or the batch exporter, depending on the configured mode.
pub struct SynchronizationStep<'a> {
    config: &'a RunConfig,
    api: &'a dyn ReferenceApi,
    exporter: &'a mut dyn BatchExporter,
    /// Opened lazily before the first write; opening it any earlier risks
    /// the session idling out during a long matching phase.
    changeset_id: Option<u64>,
}

impl<'a> SynchronizationStep<'a> {
    pub fn new(
        config: &'a RunConfig,
        api: &'a dyn ReferenceApi,
        exporter: &'a mut dyn BatchExporter,
    ) -> Self {
        Self {
            config,
            api,
            exporter,
            changeset_id: None,
        }
    }

    /// Synchronize every element above the minimal score. A single
    /// element's write failure is counted and the walk continues; only a
    /// changeset that cannot be opened aborts the step.
    pub fn synchronize_all(
        mut self,
        cache: &mut ElementCache,
        source: SyncSource<'_>,
        counters: &mut RunCounters,
    ) -> Result<(u64, u64), ReconError> {
        log::info!("=== Synchronizing elements ===");
        let mut updated = 0;
        let mut remade = 0;
        for element in cache.iter_mut() {
            if element.matching_score < self.config.minimal_matching_score {
                log::info!(
                    "element {} skipped, score {:.3} is below the minimum {:.3}",
                    element.osm_id,
                    element.matching_score,
                    self.config.minimal_matching_score
                );
                continue;
            }
            match &source {
                SyncSource::TagUpdate { updatable_tags } => {
                    if self.update_element(element, updatable_tags, counters)? {
                        updated += 1;
                        counters.updated_elements += 1;
                    }
                }
                SyncSource::Remake { documents } => {
                    let Some(document) = documents.get(&element.osm_id) else {
                        log::warn!(
                            "element {} has no remaking document, skipped",
                            element.osm_id
                        );
                        continue;
                    };
                    if self.dispatch(&format!("id{}", element.osm_id), document, counters)? {
                        element.remade = true;
                        remade += 1;
                        counters.remade_elements += 1;
                    }
                }
            }
        }
        Ok((updated, remade))
    }

    /// Reconcile the updatable tags on one element and write it if at
    /// least one tag actually changed.
    fn update_element(
        &mut self,
        element: &mut Element,
        updatable_tags: &[String],
        counters: &mut RunCounters,
    ) -> Result<bool, ReconError> {
        let mut changed = false;
        for tag_name in updatable_tags {
            if !element.is_tag_updatable(tag_name) {
                log::info!(
                    "tag {tag_name} on element {} keeps its original value",
                    element.osm_id
                );
                continue;
            }
            if apply_best_value(element, tag_name) {
                changed = true;
            }
        }
        if !changed {
            log::info!("element {} has nothing to update", element.osm_id);
            return Ok(false);
        }
        let document = element.api_data().clone();
        let ok = self.dispatch(&format!("id{}", element.osm_id), &document, counters)?;
        if ok {
            element.updated = true;
        }
        Ok(ok)
    }

    fn dispatch(
        &mut self,
        name: &str,
        document: &OsmDocument,
        counters: &mut RunCounters,
    ) -> Result<bool, ReconError> {
        let ok = match self.config.mode {
            SyncMode::Api => {
                let changeset_id = self.ensure_changeset()?;
                self.api.write_element(document, changeset_id)
            }
            SyncMode::Gen => self.exporter.write(name, document),
        };
        if !ok {
            counters.write_failures += 1;
            log::error!("write of {name} failed");
        }
        Ok(ok)
    }

    fn ensure_changeset(&mut self) -> Result<u64, ReconError> {
        if let Some(id) = self.changeset_id {
            return Ok(id);
        }
        let id = self
            .api
            .open_changeset(&self.config.changeset.source, &self.config.changeset.comment)?;
        log::info!("changeset {id} opened for writing");
        self.changeset_id = Some(id);
        Ok(id)
    }
}

/// Apply the best candidate value for one tag. Numeric tags are validated
/// before being written into the snapshot.
fn apply_best_value(element: &mut Element, tag_name: &str) -> bool {
    let Some(value) = element.best_tag_value(tag_name) else {
        log::warn!(
            "no candidate value for tag {tag_name} on element {}",
            element.osm_id
        );
        return false;
    };
    let valid = match tag_name {
        tags::HEIGHT => value.parse::<f32>().is_ok(),
        tags::BUILDING_LEVELS => value.parse::<u32>().is_ok(),
        _ => true,
    };
    if !valid {
        log::warn!("candidate value '{value}' for tag {tag_name} is not numeric, not applied");
        return false;
    }
    if element.tag_value(tag_name) == Some(value.as_str()) {
        return false;
    }
    log::info!(
        "updating tag {tag_name} to '{value}' on element {}",
        element.osm_id
    );
    element.set_tag_value(tag_name, &value);
    true
}
