//! In-memory collaborator fakes shared by the engine tests.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

use geosync_core::document::{OsmDocument, OsmWay};
use geosync_core::ports::{
    ApiError, BatchExporter, ReferenceApi, RelationMember, SpatialStore, StoreError,
};

use crate::config::{AggregationPolicy, ChangesetConfig, ImportColumns, RunConfig, SyncMode};

// ---------------------------------------------------------------------------
// Spatial store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeStore {
    /// Raw ids returned for any point query.
    pub ids_by_point: Vec<i64>,
    /// Raw ids returned for any geometry query.
    pub ids_by_geometry: Vec<i64>,
    pub areas: BTreeMap<i64, f64>,
    pub members: BTreeMap<i64, Vec<RelationMember>>,
    pub footprints: BTreeMap<i64, String>,
    /// Points reported as lying inside any footprint.
    pub inside: Vec<(f64, f64)>,
    pub targeted: Vec<i64>,
    pub fail_queries: bool,
}

impl FakeStore {
    fn check(&self) -> Result<(), StoreError> {
        if self.fail_queries {
            Err(StoreError::Query("injected failure".into()))
        } else {
            Ok(())
        }
    }
}

impl SpatialStore for FakeStore {
    fn find_ids_by_point(&self, _lon: f64, _lat: f64) -> Result<Vec<i64>, StoreError> {
        self.check()?;
        Ok(self.ids_by_point.clone())
    }

    fn find_ids_by_geometry(&self, _wkt: &str) -> Result<Vec<i64>, StoreError> {
        self.check()?;
        Ok(self.ids_by_geometry.clone())
    }

    fn polygon_area(&self, signed_id: i64) -> Result<Option<f64>, StoreError> {
        self.check()?;
        Ok(self.areas.get(&signed_id).copied())
    }

    fn relation_members(&self, relation_id: i64) -> Result<Vec<RelationMember>, StoreError> {
        self.check()?;
        Ok(self.members.get(&relation_id).cloned().unwrap_or_default())
    }

    fn element_footprint(&self, osm_id: i64) -> Result<Option<String>, StoreError> {
        self.check()?;
        Ok(self.footprints.get(&osm_id).cloned())
    }

    fn point_within(&self, _wkt: &str, lon: f64, lat: f64) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.inside.contains(&(lon, lat)))
    }

    fn find_targeted_ids(&self, _filter_wkt: &str) -> Result<Vec<i64>, StoreError> {
        self.check()?;
        Ok(self.targeted.clone())
    }
}

// ---------------------------------------------------------------------------
// Reference API
// ---------------------------------------------------------------------------

pub struct FakeApi {
    pub documents: BTreeMap<i64, OsmDocument>,
    pub write_ok: bool,
    pub changeset_ok: bool,
    fetches: Cell<u64>,
    writes: RefCell<Vec<i64>>,
    changesets: Cell<u64>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            documents: BTreeMap::new(),
            write_ok: true,
            changeset_ok: true,
            fetches: Cell::new(0),
            writes: RefCell::new(Vec::new()),
            changesets: Cell::new(0),
        }
    }
}

impl FakeApi {
    pub fn fetches(&self) -> u64 {
        self.fetches.get()
    }

    pub fn written_ids(&self) -> Vec<i64> {
        self.writes.borrow().clone()
    }

    pub fn changesets_opened(&self) -> u64 {
        self.changesets.get()
    }
}

impl ReferenceApi for FakeApi {
    fn read_element(&self, osm_id: i64) -> Result<Option<OsmDocument>, ApiError> {
        self.fetches.set(self.fetches.get() + 1);
        Ok(self.documents.get(&osm_id).cloned())
    }

    fn write_element(&self, document: &OsmDocument, _changeset_id: u64) -> bool {
        if !self.write_ok {
            return false;
        }
        let id = document.primary_way().map(|w| w.id).unwrap_or(0);
        self.writes.borrow_mut().push(id);
        true
    }

    fn open_changeset(&self, _source: &str, _comment: &str) -> Result<u64, ApiError> {
        if !self.changeset_ok {
            return Err(ApiError::Network("injected failure".into()));
        }
        self.changesets.set(self.changesets.get() + 1);
        Ok(1234)
    }
}

// ---------------------------------------------------------------------------
// Batch exporter
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeExporter {
    pub written: Vec<(String, OsmDocument)>,
    pub fail: bool,
}

impl BatchExporter for FakeExporter {
    fn write(&mut self, name: &str, document: &OsmDocument) -> bool {
        if self.fail {
            return false;
        }
        self.written.push((name.to_string(), document.clone()));
        true
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A one-way API snapshot with the given tags.
pub fn way_snapshot(osm_id: i64, tags: &[(&str, &str)]) -> OsmDocument {
    let mut way = OsmWay {
        id: osm_id,
        version: 1,
        ..Default::default()
    };
    for (k, v) in tags {
        way.set_tag(k, v);
    }
    OsmDocument {
        ways: vec![way],
        ..Default::default()
    }
}

pub fn gen_config() -> RunConfig {
    RunConfig {
        name: "Test run".into(),
        mode: SyncMode::Gen,
        minimal_matching_score: 0.8,
        no_duplicate_score: 0.5,
        aggregation: AggregationPolicy::Max,
        updatable_tags: vec!["height".to_string(), "building:levels".to_string()],
        filter_area: None,
        changeset: ChangesetConfig::default(),
        columns: ImportColumns::default(),
    }
}

pub fn api_config() -> RunConfig {
    RunConfig {
        mode: SyncMode::Api,
        changeset: ChangesetConfig {
            source: "Test source".into(),
            comment: "Test comment".into(),
        },
        ..gen_config()
    }
}
