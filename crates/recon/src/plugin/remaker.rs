use std::collections::BTreeMap;

use geosync_core::document::OsmDocument;
use geosync_core::model::Import;
use geosync_core::ports::{BatchExporter, ReferenceApi, SpatialStore};

use crate::cache::ElementCache;
use crate::config::{RunConfig, SyncMode};
use crate::counters::RunCounters;
use crate::error::ReconError;
use crate::loader;
use crate::matcher::SpatialMatcher;
use crate::plugin::{push_new_way, IdSequence, Plugin};
use crate::scorer;
use crate::sync::{SyncSource, SynchronizationStep};
use crate::wkt;

/// Element-remaking variant: elements strongly matched by imports are
/// replaced wholesale, their footprint and tags rebuilt from the import.
pub struct RemakerPlugin<'a> {
    config: &'a RunConfig,
    store: &'a dyn SpatialStore,
    api: &'a dyn ReferenceApi,
    exporter: &'a mut dyn BatchExporter,
    import_csv: &'a str,
    loaded_imports: Vec<Import>,
    cache: ElementCache,
    /// Replacement document per remakable element, keyed by osm id.
    remake_documents: BTreeMap<i64, OsmDocument>,
    data_for_creation: Option<OsmDocument>,
    data_for_deletion: Option<OsmDocument>,
    counters: RunCounters,
}

impl<'a> RemakerPlugin<'a> {
    pub fn new(
        config: &'a RunConfig,
        store: &'a dyn SpatialStore,
        api: &'a dyn ReferenceApi,
        exporter: &'a mut dyn BatchExporter,
        import_csv: &'a str,
    ) -> Self {
        Self {
            config,
            store,
            api,
            exporter,
            import_csv,
            loaded_imports: Vec::new(),
            cache: ElementCache::new(),
            remake_documents: BTreeMap::new(),
            data_for_creation: None,
            data_for_deletion: None,
            counters: RunCounters::default(),
        }
    }

    pub fn remake_document(&self, osm_id: i64) -> Option<&OsmDocument> {
        self.remake_documents.get(&osm_id)
    }
}

impl Plugin for RemakerPlugin<'_> {
    fn name(&self) -> &'static str {
        "remaker"
    }

    fn config(&self) -> &RunConfig {
        self.config
    }

    fn counters(&self) -> &RunCounters {
        &self.counters
    }

    fn cache(&self) -> &ElementCache {
        &self.cache
    }

    fn load(&mut self) -> Result<(), ReconError> {
        self.loaded_imports = loader::load_imports(self.import_csv, &self.config.columns)?;
        Ok(())
    }

    fn process(&mut self) -> Result<(), ReconError> {
        let matcher = SpatialMatcher::new(self.store);

        // Bind each import to the first candidate element that resolves.
        // Unresolved relation sentinels and unreadable elements are
        // skipped without aborting the loop.
        for index in 0..self.loaded_imports.len() {
            if self.loaded_imports[index].lon.is_none()
                && self.loaded_imports[index].geometry.is_none()
            {
                log::warn!("import {} has no location, skipped", self.loaded_imports[index].id);
                continue;
            }
            let candidates = matcher.find_matching_elements(&self.loaded_imports[index]);
            for matching_id in candidates {
                if !matching_id.is_resolved() {
                    log::debug!(
                        "skipping unresolved relation sentinel {}",
                        matching_id.osm_id
                    );
                    continue;
                }
                let element = match self.cache.get_or_create(
                    &matching_id,
                    self.api,
                    &self.config.updatable_tags,
                ) {
                    Ok(element) => element,
                    Err(err) => {
                        log::error!("skipping element {}: {err}", matching_id.osm_id);
                        continue;
                    }
                };
                let import = self.loaded_imports[index].clone();
                if element.bind(import) {
                    let osm_id = element.osm_id;
                    self.loaded_imports[index].bind_to(osm_id);
                    self.counters.matched_imports += 1;
                    // An import binds to at most one element.
                    break;
                }
            }
        }
        self.counters.matched_elements += self.cache.len() as u64;

        // Score every matched element and build the replacement documents
        // for those clearing the remake threshold.
        let mut ids = IdSequence::new();
        let mut creation = OsmDocument::default();
        let mut deletion = OsmDocument::default();
        for element in self.cache.iter_mut() {
            scorer::score_element(element, self.store, self.config.aggregation);
            if element.matching_score < self.config.minimal_matching_score {
                continue;
            }
            let best = element
                .matching_imports()
                .iter()
                .max_by(|a, b| a.matching_score.total_cmp(&b.matching_score));
            let ring = best
                .and_then(|import| import.geometry.as_deref())
                .and_then(wkt::polygon_outer_ring);
            let Some(ring) = ring else {
                log::warn!(
                    "element {} clears the remake threshold but no bound import has a polygon",
                    element.osm_id
                );
                continue;
            };
            let tags = best.map(|import| import.tags.clone()).unwrap_or_default();

            let mut document = OsmDocument::default();
            push_new_way(&mut document, &mut ids, &ring, &tags);
            creation.nodes.extend(document.nodes.iter().cloned());
            creation.ways.extend(document.ways.iter().cloned());
            if let Some(old_way) = element.api_data().primary_way() {
                deletion.ways.push(old_way.clone());
            }
            self.remake_documents.insert(element.osm_id, document);
            log::info!("element {} is remakable", element.osm_id);
        }
        self.data_for_creation = Some(creation);
        self.data_for_deletion = Some(deletion);
        Ok(())
    }

    /// Batch mode writes the global creation and deletion documents; api
    /// mode dispatches each remakable element through the synchronization
    /// step.
    fn synchronize(&mut self) -> Result<(), ReconError> {
        match self.config.mode {
            SyncMode::Gen => {
                let (Some(creation), Some(deletion)) =
                    (self.data_for_creation.as_ref(), self.data_for_deletion.as_ref())
                else {
                    log::warn!(
                        "creation/deletion documents are absent, nothing to synchronize"
                    );
                    return Ok(());
                };
                let creation_ok = self.exporter.write("genfile-creation", creation);
                let deletion_ok = self.exporter.write("genfile-deletion", deletion);
                for ok in [creation_ok, deletion_ok] {
                    if !ok {
                        self.counters.write_failures += 1;
                    }
                }
                if creation_ok && deletion_ok {
                    for element in self.cache.iter_mut() {
                        if element.matching_score >= self.config.minimal_matching_score
                            && self.remake_documents.contains_key(&element.osm_id)
                        {
                            element.remade = true;
                            self.counters.remade_elements += 1;
                        }
                    }
                }
            }
            SyncMode::Api => {
                let step = SynchronizationStep::new(self.config, self.api, &mut *self.exporter);
                step.synchronize_all(
                    &mut self.cache,
                    SyncSource::Remake {
                        documents: &self.remake_documents,
                    },
                    &mut self.counters,
                )?;
            }
        }
        Ok(())
    }
}
