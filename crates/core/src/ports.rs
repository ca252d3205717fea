//! Collaborator ports consumed by the conflation engine.
//!
//! The engine only ever sees these traits; the io and api_client crates
//! provide the SQLite and HTTP backed implementations.

use std::fmt;

use crate::document::OsmDocument;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for spatial store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Connection / open failure.
    Connection(String),
    /// Query execution failure.
    Query(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "store connection error: {msg}"),
            Self::Query(msg) => write!(f, "store query error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Error type for reference API operations.
#[derive(Debug)]
pub enum ApiError {
    /// No credentials configured for a write operation.
    NotAuthenticated,
    /// Network error.
    Network(String),
    /// HTTP error with status code.
    Http(u16, String),
    /// Response body could not be parsed.
    Parse(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "not authenticated for write access"),
            Self::Network(msg) => write!(f, "network error: {msg}"),
            Self::Http(code, msg) => write!(f, "HTTP {code}: {msg}"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

// ---------------------------------------------------------------------------
// Spatial store
// ---------------------------------------------------------------------------

/// One entry of a relation's ordered member list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationMember {
    /// Typed reference, e.g. `w123` for a way, `n5` for a node.
    pub member_ref: String,
    pub role: String,
}

impl RelationMember {
    pub fn new(member_ref: &str, role: &str) -> Self {
        Self {
            member_ref: member_ref.to_string(),
            role: role.to_string(),
        }
    }

    pub fn is_way(&self) -> bool {
        self.member_ref.starts_with('w')
    }

    /// Numeric id of a way reference, if this member is one.
    pub fn way_id(&self) -> Option<i64> {
        if !self.is_way() {
            return None;
        }
        self.member_ref[1..].parse().ok()
    }
}

/// Read-side geospatial store holding the reference elements.
///
/// Raw candidate ids are signed: a positive id addresses an element
/// directly, a negative id denotes the multipolygon relation `-id`.
pub trait SpatialStore {
    /// Ids of elements whose footprint contains the point.
    fn find_ids_by_point(&self, lon: f64, lat: f64) -> Result<Vec<i64>, StoreError>;

    /// Ids of elements whose footprint intersects the WKT geometry.
    fn find_ids_by_geometry(&self, wkt: &str) -> Result<Vec<i64>, StoreError>;

    /// Footprint area indexed under the signed id, if known.
    fn polygon_area(&self, signed_id: i64) -> Result<Option<f64>, StoreError>;

    /// Ordered member list of a relation.
    fn relation_members(&self, relation_id: i64) -> Result<Vec<RelationMember>, StoreError>;

    /// WKT footprint of a directly addressable element.
    fn element_footprint(&self, osm_id: i64) -> Result<Option<String>, StoreError>;

    /// Whether the point lies within the WKT polygon, evaluated in the
    /// store's native coordinate system.
    fn point_within(&self, wkt: &str, lon: f64, lat: f64) -> Result<bool, StoreError>;

    /// Ids of elements intersecting the filter area, for targeted runs.
    fn find_targeted_ids(&self, filter_wkt: &str) -> Result<Vec<i64>, StoreError>;
}

// ---------------------------------------------------------------------------
// Reference API
// ---------------------------------------------------------------------------

/// Write session + element access on the reference database.
pub trait ReferenceApi {
    /// Current snapshot of an element, or `None` when the API has no
    /// record for the id.
    fn read_element(&self, osm_id: i64) -> Result<Option<OsmDocument>, ApiError>;

    /// Write one element under an open changeset. Failures are reported
    /// as `false`; the caller counts them and continues.
    fn write_element(&self, document: &OsmDocument, changeset_id: u64) -> bool;

    /// Open a changeset for this run. Called lazily, right before the
    /// first write, so an idle timeout cannot expire it during matching.
    fn open_changeset(&self, source: &str, comment: &str) -> Result<u64, ApiError>;
}

// ---------------------------------------------------------------------------
// Batch exporter
// ---------------------------------------------------------------------------

/// Sink for batch-mode synchronization documents.
pub trait BatchExporter {
    /// Write one document under the caller-chosen name. Failures are
    /// reported as `false` and must not abort the batch.
    fn write(&mut self, name: &str, document: &OsmDocument) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_member_way_ids() {
        assert_eq!(RelationMember::new("w123", "outer").way_id(), Some(123));
        assert_eq!(RelationMember::new("n5", "admin_centre").way_id(), None);
        assert!(!RelationMember::new("r7", "subarea").is_way());
    }
}
