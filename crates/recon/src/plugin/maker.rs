use geosync_core::document::OsmDocument;
use geosync_core::model::Import;
use geosync_core::ports::{BatchExporter, SpatialStore};

use crate::cache::ElementCache;
use crate::config::{RunConfig, SyncMode};
use crate::counters::RunCounters;
use crate::error::ReconError;
use crate::loader;
use crate::matcher::SpatialMatcher;
use crate::plugin::{push_new_way, IdSequence, Plugin};
use crate::wkt;

/// Element-creating variant: imports with no plausible counterpart in the
/// store are collected into a creation document written as a batch.
pub struct MakerPlugin<'a> {
    config: &'a RunConfig,
    store: &'a dyn SpatialStore,
    exporter: &'a mut dyn BatchExporter,
    import_csv: &'a str,
    loaded_imports: Vec<Import>,
    data_for_creation: Option<OsmDocument>,
    data_for_deletion: Option<OsmDocument>,
    cache: ElementCache,
    counters: RunCounters,
}

impl<'a> MakerPlugin<'a> {
    pub fn new(
        config: &'a RunConfig,
        store: &'a dyn SpatialStore,
        exporter: &'a mut dyn BatchExporter,
        import_csv: &'a str,
    ) -> Self {
        Self {
            config,
            store,
            exporter,
            import_csv,
            loaded_imports: Vec::new(),
            data_for_creation: None,
            data_for_deletion: None,
            cache: ElementCache::new(),
            counters: RunCounters::default(),
        }
    }

    pub fn data_for_creation(&self) -> Option<&OsmDocument> {
        self.data_for_creation.as_ref()
    }
}

impl Plugin for MakerPlugin<'_> {
    fn name(&self) -> &'static str {
        "maker"
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

    /// Score every import against the store; those below the no-duplicate
    /// threshold become part of the creation document.
    fn process(&mut self) -> Result<(), ReconError> {
        let matcher = SpatialMatcher::new(self.store);
        let mut ids = IdSequence::new();
        let mut creation = OsmDocument::default();

        for index in 0..self.loaded_imports.len() {
            let import = &self.loaded_imports[index];
            if import.lon.is_none() && import.geometry.is_none() {
                log::warn!("import {} has no location, skipped", import.id);
                continue;
            }
            let score = matcher.import_score(import);
            log::info!("import {} duplicate score is {score:.3}", import.id);
            self.loaded_imports[index].matching_score = score;
            if score >= self.config.no_duplicate_score {
                log::info!(
                    "import {} likely already exists in the store, not makable",
                    self.loaded_imports[index].id
                );
                continue;
            }
            let ring = self.loaded_imports[index]
                .geometry
                .as_deref()
                .and_then(wkt::polygon_outer_ring);
            let Some(ring) = ring else {
                log::warn!(
                    "import {} is makable but has no polygon footprint, skipped",
                    self.loaded_imports[index].id
                );
                continue;
            };
            let tags = self.loaded_imports[index].tags.clone();
            self.counters.makable_imports += 1;
            push_new_way(&mut creation, &mut ids, &ring, &tags);
        }

        self.data_for_creation = Some(creation);
        // Nothing to supersede in a plain creation run.
        self.data_for_deletion = Some(OsmDocument::default());
        Ok(())
    }

    /// Write the creation and deletion documents as one batch. Both
    /// absent makes this a warned no-op, and the api mode has no direct
    /// write path for creation documents.
    fn synchronize(&mut self) -> Result<(), ReconError> {
        let (Some(creation), Some(deletion)) =
            (self.data_for_creation.as_ref(), self.data_for_deletion.as_ref())
        else {
            log::warn!("creation/deletion documents are absent, nothing to synchronize");
            return Ok(());
        };
        match self.config.mode {
            SyncMode::Api => {
                log::warn!("api mode does not support creation documents, nothing written");
            }
            SyncMode::Gen => {
                let creation_ok = self.exporter.write("genfile-creation", creation);
                let deletion_ok = self.exporter.write("genfile-deletion", deletion);
                for ok in [creation_ok, deletion_ok] {
                    if !ok {
                        self.counters.write_failures += 1;
                    }
                }
                if creation_ok && deletion_ok {
                    self.counters.made_imports += self.counters.makable_imports;
                    log::info!("all makable imports have been synchronized");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::run;
    use crate::testing::{gen_config, FakeExporter, FakeStore};
    use std::collections::BTreeMap;

    const IMPORT_CSV: &str = "\
id,lon,lat,area,geom,HAUTEUR
new1,2.35,48.85,100,\"POLYGON((2.35 48.85, 2.36 48.85, 2.36 48.86, 2.35 48.85))\",12
dup1,2.40,48.90,100,\"POLYGON((2.40 48.90, 2.41 48.90, 2.41 48.91, 2.40 48.90))\",15
";

    fn config_with_columns() -> RunConfig {
        let mut config = gen_config();
        config.columns.lon = Some("lon".into());
        config.columns.lat = Some("lat".into());
        config.columns.area = Some("area".into());
        config.columns.geometry = Some("geom".into());
        config.columns.tags =
            BTreeMap::from([("height".to_string(), "HAUTEUR".to_string())]);
        config
    }

    #[test]
    fn unmatched_import_is_made() {
        let config = config_with_columns();
        // No candidates anywhere in the store.
        let store = FakeStore::default();
        let mut exporter = FakeExporter::default();

        let report = {
            let mut plugin = MakerPlugin::new(&config, &store, &mut exporter, IMPORT_CSV);
            run(&mut plugin).unwrap()
        };

        assert_eq!(report.counters.makable_imports, 2);
        assert_eq!(report.counters.made_imports, 2);
        assert_eq!(exporter.written.len(), 2);
        assert_eq!(exporter.written[0].0, "genfile-creation");
        assert_eq!(exporter.written[1].0, "genfile-deletion");
        let creation = &exporter.written[0].1;
        assert_eq!(creation.ways.len(), 2);
        assert_eq!(creation.ways[0].tag("building"), Some("yes"));
        assert_eq!(creation.ways[0].tag("height"), Some("12"));
        assert!(creation.ways.iter().all(|w| w.id < 0));
    }

    #[test]
    fn duplicate_import_is_not_made() {
        let config = config_with_columns();
        let mut store = FakeStore::default();
        // Every point query finds element 555 whose area equals the
        // imports' area, so the duplicate score is 1.0 for both.
        store.ids_by_point = vec![555];
        store.areas.insert(555, 100.0);
        let mut exporter = FakeExporter::default();

        let report = {
            let mut plugin = MakerPlugin::new(&config, &store, &mut exporter, IMPORT_CSV);
            run(&mut plugin).unwrap()
        };

        assert_eq!(report.counters.makable_imports, 0);
        assert_eq!(report.counters.made_imports, 0);
        // The documents are still written, both empty.
        assert_eq!(exporter.written.len(), 2);
        assert!(exporter.written[0].1.is_empty());
    }

    #[test]
    fn gen_mode_always_writes_both_documents() {
        let config = config_with_columns();
        let store = FakeStore::default();
        let mut exporter = FakeExporter::default();
        let report = {
            let mut plugin = MakerPlugin::new(&config, &store, &mut exporter, "id\n");
            run(&mut plugin).unwrap()
        };
        assert_eq!(report.counters.makable_imports, 0);
        assert_eq!(
            exporter.written.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            vec!["genfile-creation", "genfile-deletion"]
        );
    }

    #[test]
    fn export_failure_is_counted() {
        let config = config_with_columns();
        let store = FakeStore::default();
        let mut exporter = FakeExporter {
            fail: true,
            ..Default::default()
        };
        let report = {
            let mut plugin = MakerPlugin::new(&config, &store, &mut exporter, IMPORT_CSV);
            run(&mut plugin).unwrap()
        };
        assert_eq!(report.counters.write_failures, 2);
        assert_eq!(report.counters.made_imports, 0);
    }

    #[test]
    fn api_mode_is_a_warned_noop() {
        let mut config = config_with_columns();
        config.mode = SyncMode::Api;
        config.changeset.source = "src".into();
        let store = FakeStore::default();
        let mut exporter = FakeExporter::default();
        let report = {
            let mut plugin = MakerPlugin::new(&config, &store, &mut exporter, IMPORT_CSV);
            run(&mut plugin).unwrap()
        };
        assert!(exporter.written.is_empty());
        assert_eq!(report.counters.made_imports, 0);
    }
}
