//! SQLite/SpatiaLite backed spatial store.
//!
//! Expects an osm2pgsql-style flattened schema:
//!
//! - `planet_osm_polygon(osm_id, building, way, way_area)` where `way`
//!   carries the footprint geometry in the store srid and relations are
//!   flattened under negated ids;
//! - `relation_members(relation_id, seq, member_ref, role)` with typed
//!   member references (`w123`, `n5`), ordered by `seq`.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use geosync_core::ports::{RelationMember, SpatialStore, StoreError};

/// Default srid of the polygon table geometry (web mercator).
pub const DEFAULT_SRID: i32 = 3857;

pub struct SqliteSpatialStore {
    conn: Connection,
    srid: i32,
}

impl SqliteSpatialStore {
    pub fn open(path: &Path, srid: i32) -> Result<Self, StoreError> {
        let conn =
            Connection::open(path).map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { conn, srid })
    }

    pub fn from_connection(conn: Connection, srid: i32) -> Self {
        Self { conn, srid }
    }

    pub fn srid(&self) -> i32 {
        self.srid
    }

    fn query_ids(&self, sql: &str, wkt: &str) -> Result<Vec<i64>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| StoreError::Query(e.to_string()))?;
        let rows = stmt
            .query_map(params![wkt, self.srid], |row| row.get(0))
            .map_err(|e| StoreError::Query(e.to_string()))?;
        rows.collect::<Result<Vec<i64>, _>>()
            .map_err(|e| StoreError::Query(e.to_string()))
    }
}

impl SpatialStore for SqliteSpatialStore {
    fn find_ids_by_point(&self, lon: f64, lat: f64) -> Result<Vec<i64>, StoreError> {
        // The point comes in as WGS84 and is reprojected into the srid
        // the polygon index is built on.
        self.query_ids(
            "SELECT osm_id FROM planet_osm_polygon \
             WHERE building <> '' \
             AND ST_Contains(way, ST_Transform(GeomFromText(?1, 4326), ?2))",
            &format!("POINT({lon} {lat})"),
        )
    }

    fn find_ids_by_geometry(&self, wkt: &str) -> Result<Vec<i64>, StoreError> {
        self.query_ids(
            "SELECT osm_id FROM planet_osm_polygon \
             WHERE building <> '' \
             AND ST_Intersects(way, ST_Transform(GeomFromText(?1, 4326), ?2))",
            wkt,
        )
    }

    fn polygon_area(&self, signed_id: i64) -> Result<Option<f64>, StoreError> {
        self.conn
            .query_row(
                "SELECT way_area FROM planet_osm_polygon WHERE osm_id = ?1",
                params![signed_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    fn relation_members(&self, relation_id: i64) -> Result<Vec<RelationMember>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT member_ref, role FROM relation_members \
                 WHERE relation_id = ?1 ORDER BY seq",
            )
            .map_err(|e| StoreError::Query(e.to_string()))?;
        let rows = stmt
            .query_map(params![relation_id], |row| {
                Ok(RelationMember {
                    member_ref: row.get(0)?,
                    role: row.get(1)?,
                })
            })
            .map_err(|e| StoreError::Query(e.to_string()))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    fn element_footprint(&self, osm_id: i64) -> Result<Option<String>, StoreError> {
        self.conn
            .query_row(
                "SELECT ST_AsText(way) FROM planet_osm_polygon WHERE osm_id = ?1",
                params![osm_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    fn point_within(&self, wkt: &str, lon: f64, lat: f64) -> Result<bool, StoreError> {
        self.conn
            .query_row(
                "SELECT ST_Contains(GeomFromText(?1, ?2), \
                 ST_Transform(GeomFromText(?3, 4326), ?2))",
                params![wkt, self.srid, format!("POINT({lon} {lat})")],
                |row| row.get::<_, i64>(0),
            )
            .map(|v| v != 0)
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    fn find_targeted_ids(&self, filter_wkt: &str) -> Result<Vec<i64>, StoreError> {
        self.query_ids(
            "SELECT osm_id FROM planet_osm_polygon \
             WHERE building <> '' \
             AND ST_Intersects(way, ST_Transform(GeomFromText(?1, 4326), ?2))",
            filter_wkt,
        )
    }
}
