use geosync_core::model::Import;
use geosync_core::ports::{BatchExporter, ReferenceApi, SpatialStore};

use crate::cache::ElementCache;
use crate::config::RunConfig;
use crate::counters::RunCounters;
use crate::error::ReconError;
use crate::loader;
use crate::matcher::SpatialMatcher;
use crate::plugin::Plugin;
use crate::scorer;
use crate::sync::{SyncSource, SynchronizationStep};

/// Tag-updating variant: targets existing elements inside the filter
/// area, matches imports against each element's footprint and patches the
/// updatable tags that carry no original value.
pub struct UpdaterPlugin<'a> {
    config: &'a RunConfig,
    store: &'a dyn SpatialStore,
    api: &'a dyn ReferenceApi,
    exporter: &'a mut dyn BatchExporter,
    import_csv: &'a str,
    loaded_imports: Vec<Import>,
    targeted_ids: Vec<i64>,
    cache: ElementCache,
    counters: RunCounters,
}

impl<'a> UpdaterPlugin<'a> {
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
            targeted_ids: Vec::new(),
            cache: ElementCache::new(),
            counters: RunCounters::default(),
        }
    }
}

impl Plugin for UpdaterPlugin<'_> {
    fn name(&self) -> &'static str {
        "updater"
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

    /// Load the imports and materialize every element targeted by the
    /// filter area. An element the API cannot resolve is skipped, not
    /// fatal.
    fn load(&mut self) -> Result<(), ReconError> {
        self.loaded_imports = loader::load_imports(self.import_csv, &self.config.columns)?;

        let Some(filter_wkt) = self.config.filter_area.as_deref() else {
            return Err(ReconError::ConfigValidation(
                "a targeted run requires a filter_area".into(),
            ));
        };
        for osm_id in self.store.find_targeted_ids(filter_wkt)? {
            let matching_id = geosync_core::model::MatchingElementId::plain(osm_id);
            match self
                .cache
                .get_or_create(&matching_id, self.api, &self.config.updatable_tags)
            {
                Ok(_) => {
                    self.targeted_ids.push(osm_id);
                    self.counters.targeted_elements += 1;
                }
                Err(err) => log::error!("skipping targeted element {osm_id}: {err}"),
            }
        }
        log::info!("{} element(s) targeted", self.targeted_ids.len());
        Ok(())
    }

    fn process(&mut self) -> Result<(), ReconError> {
        let matcher = SpatialMatcher::new(self.store);
        for osm_id in self.targeted_ids.clone() {
            let footprint = match self.store.element_footprint(osm_id) {
                Ok(Some(wkt)) => wkt,
                Ok(None) => {
                    log::warn!("element {osm_id} has no footprint in the store, skipped");
                    continue;
                }
                Err(err) => {
                    log::error!("footprint lookup failed for element {osm_id}: {err}");
                    continue;
                }
            };
            let indices = matcher.find_matching_import_indices(&footprint, &self.loaded_imports);
            if indices.is_empty() {
                continue;
            }
            self.counters.matched_elements += 1;

            let Some(element) = self.cache.get_mut(osm_id) else {
                log::warn!("element {osm_id} vanished from the cache, skipped");
                continue;
            };
            for index in indices {
                if self.loaded_imports[index].element_id().is_some() {
                    continue;
                }
                let import = self.loaded_imports[index].clone();
                if element.bind(import) {
                    self.loaded_imports[index].bind_to(osm_id);
                    self.counters.matched_imports += 1;
                }
            }
            scorer::score_element(element, self.store, self.config.aggregation);

            // Strong matches get a fresh snapshot so reconciliation works
            // against current data, with protection recomputed from it.
            if element.matching_score >= self.config.minimal_matching_score {
                self.counters.updatable_elements += 1;
                match self.api.read_element(osm_id) {
                    Ok(Some(snapshot)) => element.refresh(snapshot, &self.config.updatable_tags),
                    Ok(None) => log::warn!("element {osm_id} no longer readable, kept as loaded"),
                    Err(err) => log::error!("snapshot refresh failed for element {osm_id}: {err}"),
                }
            }
        }
        Ok(())
    }

    fn synchronize(&mut self) -> Result<(), ReconError> {
        let step = SynchronizationStep::new(self.config, self.api, &mut *self.exporter);
        step.synchronize_all(
            &mut self.cache,
            SyncSource::TagUpdate {
                updatable_tags: &self.config.updatable_tags,
            },
            &mut self.counters,
        )?;
        Ok(())
    }
}
