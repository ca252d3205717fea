use geosync_core::model::{Element, Import};
use geosync_core::ports::SpatialStore;

use crate::config::AggregationPolicy;

/// Symmetric area ratio: tends to 1.0 as the areas converge, 0.0 as they
/// diverge. Callers guarantee both areas are positive.
pub(crate) fn area_ratio(a: f64, b: f64) -> f32 {
    (a.min(b) / a.max(b)) as f32
}

/// Area key under which the store indexes an element's footprint. Outer
/// members of a relation are indexed under the negated relation id; store
/// schemas that flatten relations only carry the relation key.
fn area_key(element: &Element) -> i64 {
    if element.relation_id > 0 {
        -element.relation_id
    } else {
        element.osm_id
    }
}

/// Pairwise confidence in [0, 1] that an import and an element denote the
/// same feature. 0.0 whenever either area is missing or non-positive.
pub fn pair_score(import: &Import, element: &Element, store: &dyn SpatialStore) -> f32 {
    let Some(import_area) = import.area.filter(|a| *a > 0.0) else {
        log::warn!("import {} has no usable area, scoring 0", import.id);
        return 0.0;
    };
    match element_area(element, store) {
        Some(area) => area_ratio(import_area, area),
        None => 0.0,
    }
}

fn element_area(element: &Element, store: &dyn SpatialStore) -> Option<f64> {
    let key = area_key(element);
    match store.polygon_area(key) {
        Ok(Some(area)) if area > 0.0 => Some(area),
        Ok(_) => {
            log::warn!("element {} has no usable area under key {key}", element.osm_id);
            None
        }
        Err(err) => {
            log::warn!("area lookup failed for element {}: {err}", element.osm_id);
            None
        }
    }
}

/// Combine the bound imports' pair scores into the element decision score.
pub fn aggregate_score(element: &Element, policy: AggregationPolicy) -> f32 {
    let imports = element.matching_imports();
    if imports.is_empty() {
        return 0.0;
    }
    match policy {
        AggregationPolicy::Max => imports
            .iter()
            .map(|i| i.matching_score)
            .fold(0.0, f32::max),
        AggregationPolicy::Mean => {
            imports.iter().map(|i| i.matching_score).sum::<f32>() / imports.len() as f32
        }
    }
}

/// Score one element in place: a pair score per bound import (the element
/// area is looked up once), then the aggregate decision score.
pub fn score_element(element: &mut Element, store: &dyn SpatialStore, policy: AggregationPolicy) {
    let element_area = element_area(element, store);
    for import in element.matching_imports_mut() {
        import.matching_score = match (import.area.filter(|a| *a > 0.0), element_area) {
            (Some(a), Some(b)) => area_ratio(a, b),
            _ => 0.0,
        };
    }
    element.matching_score = aggregate_score(element, policy);
    log::info!(
        "element {} aggregate score is {:.3} ({} bound import(s), {policy})",
        element.osm_id,
        element.matching_score,
        element.matching_imports().len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeStore;
    use geosync_core::document::{OsmDocument, OsmWay};

    fn element(osm_id: i64, relation_id: i64) -> Element {
        let doc = OsmDocument {
            ways: vec![OsmWay {
                id: osm_id,
                version: 1,
                ..Default::default()
            }],
            ..Default::default()
        };
        Element::new(osm_id, relation_id, doc, &[])
    }

    fn import_with_area(id: &str, area: f64) -> Import {
        let mut import = Import::new(id);
        import.area = Some(area);
        import
    }

    #[test]
    fn ratio_is_min_over_max() {
        let mut store = FakeStore::default();
        store.areas.insert(555, 90.0);
        let score = pair_score(&import_with_area("i1", 100.0), &element(555, -1), &store);
        assert!((score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn ratio_is_symmetric() {
        let mut store = FakeStore::default();
        store.areas.insert(555, 100.0);
        let swapped = pair_score(&import_with_area("i1", 90.0), &element(555, -1), &store);
        assert!((swapped - 0.9).abs() < 1e-6);
    }

    #[test]
    fn equal_areas_score_one() {
        let mut store = FakeStore::default();
        store.areas.insert(555, 100.0);
        let score = pair_score(&import_with_area("i1", 100.0), &element(555, -1), &store);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn missing_or_non_positive_areas_score_zero() {
        let mut store = FakeStore::default();
        store.areas.insert(555, 90.0);
        assert_eq!(pair_score(&Import::new("i1"), &element(555, -1), &store), 0.0);
        assert_eq!(
            pair_score(&import_with_area("i1", 0.0), &element(555, -1), &store),
            0.0
        );
        // Element area unknown to the store.
        assert_eq!(
            pair_score(&import_with_area("i1", 100.0), &element(777, -1), &store),
            0.0
        );
    }

    #[test]
    fn store_failure_scores_zero() {
        let mut store = FakeStore::default();
        store.fail_queries = true;
        let score = pair_score(&import_with_area("i1", 100.0), &element(555, -1), &store);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn relation_member_area_is_looked_up_under_negated_relation_id() {
        let mut store = FakeStore::default();
        // Area indexed under the relation key only, not under the way id.
        store.areas.insert(-42, 100.0);
        let score = pair_score(&import_with_area("i1", 100.0), &element(1, 42), &store);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn aggregate_max_and_mean() {
        let mut store = FakeStore::default();
        store.areas.insert(555, 100.0);
        let mut el = element(555, -1);
        el.bind(import_with_area("i1", 50.0));
        el.bind(import_with_area("i2", 100.0));
        score_element(&mut el, &store, AggregationPolicy::Max);
        assert_eq!(el.matching_score, 1.0);
        score_element(&mut el, &store, AggregationPolicy::Mean);
        assert!((el.matching_score - 0.75).abs() < 1e-6);
    }

    #[test]
    fn aggregate_of_unmatched_element_is_zero() {
        assert_eq!(aggregate_score(&element(555, -1), AggregationPolicy::Max), 0.0);
        assert_eq!(aggregate_score(&element(555, -1), AggregationPolicy::Mean), 0.0);
    }
}
