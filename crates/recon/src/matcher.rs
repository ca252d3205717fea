use geosync_core::model::{Import, MatchingElementId};
use geosync_core::ports::SpatialStore;

use crate::scorer;

/// Resolves imports to candidate elements through the spatial store.
pub struct SpatialMatcher<'a> {
    store: &'a dyn SpatialStore,
}

impl<'a> SpatialMatcher<'a> {
    pub fn new(store: &'a dyn SpatialStore) -> Self {
        Self { store }
    }

    /// Candidate element ids for an import: containment lookup for point
    /// imports, intersection lookup for polygon imports. Store failures
    /// yield an empty candidate list; the run continues with the next item.
    pub fn find_matching_elements(&self, import: &Import) -> Vec<MatchingElementId> {
        let raw_ids = if let (Some(lon), Some(lat)) = (import.lon, import.lat) {
            self.store.find_ids_by_point(lon, lat)
        } else if let Some(wkt) = import.geometry.as_deref() {
            self.store.find_ids_by_geometry(wkt)
        } else {
            log::error!(
                "import {} has neither coordinates nor geometry, no candidates",
                import.id
            );
            return Vec::new();
        };
        let raw_ids = match raw_ids {
            Ok(ids) => ids,
            Err(err) => {
                log::error!("candidate lookup failed for import {}: {err}", import.id);
                return Vec::new();
            }
        };
        raw_ids
            .into_iter()
            .map(|raw| {
                if raw > 0 {
                    MatchingElementId::plain(raw)
                } else {
                    // Negative raw ids denote multipolygon relations.
                    self.resolve_outer_member(-raw)
                }
            })
            .collect()
    }

    /// Resolve a multipolygon relation to its single outer way. Zero or
    /// several outer ways produce the unresolved sentinel.
    fn resolve_outer_member(&self, relation_id: i64) -> MatchingElementId {
        let members = match self.store.relation_members(relation_id) {
            Ok(members) => members,
            Err(err) => {
                log::error!("member lookup failed for relation {relation_id}: {err}");
                return MatchingElementId::unresolved(relation_id);
            }
        };
        let outer_ways: Vec<i64> = members
            .iter()
            .filter(|m| m.role == "outer")
            .filter_map(|m| m.way_id())
            .collect();
        if outer_ways.len() == 1 {
            log::debug!(
                "relation {relation_id} resolved to outer way {}",
                outer_ways[0]
            );
            MatchingElementId::resolved(outer_ways[0], relation_id)
        } else {
            log::warn!(
                "relation {relation_id} has {} outer way member(s), cannot resolve",
                outer_ways.len()
            );
            MatchingElementId::unresolved(relation_id)
        }
    }

    /// Reverse direction, for targeted runs: indices of the imports whose
    /// point lies within the element footprint. Imports without a point
    /// are not considered in this direction.
    pub fn find_matching_import_indices(
        &self,
        footprint_wkt: &str,
        imports: &[Import],
    ) -> Vec<usize> {
        let mut indices = Vec::new();
        for (index, import) in imports.iter().enumerate() {
            let (Some(lon), Some(lat)) = (import.lon, import.lat) else {
                log::debug!("import {} has no point, skipped for targeting", import.id);
                continue;
            };
            match self.store.point_within(footprint_wkt, lon, lat) {
                Ok(true) => indices.push(index),
                Ok(false) => {}
                Err(err) => {
                    log::error!("containment check failed for import {}: {err}", import.id);
                }
            }
        }
        indices
    }

    /// Duplicate score of an unbound import: the best area ratio against
    /// all resolvable candidates already covering its footprint. 0.0 means
    /// nothing comparable exists in the store.
    pub fn import_score(&self, import: &Import) -> f32 {
        let Some(import_area) = import.area.filter(|a| *a > 0.0) else {
            log::warn!("import {} has no usable area, scoring 0", import.id);
            return 0.0;
        };
        let mut best = 0.0f32;
        for candidate in self.find_matching_elements(import) {
            if !candidate.is_resolved() {
                continue;
            }
            let area_key = if candidate.relation_id > 0 {
                -candidate.relation_id
            } else {
                candidate.osm_id
            };
            match self.store.polygon_area(area_key) {
                Ok(Some(area)) if area > 0.0 => {
                    best = best.max(scorer::area_ratio(import_area, area));
                }
                Ok(_) => {}
                Err(err) => {
                    log::warn!("area lookup failed for candidate {area_key}: {err}");
                }
            }
        }
        best
    }
}
