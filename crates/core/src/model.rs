use std::collections::BTreeMap;

use serde::Serialize;

use crate::document::OsmDocument;

// ---------------------------------------------------------------------------
// Matching element id
// ---------------------------------------------------------------------------

/// A resolved reference to a candidate element.
///
/// `relation_id == -1` marks a plain element. A positive `relation_id` means
/// the id was resolved through a multipolygon's outer member. A negative
/// `osm_id` means outer-member resolution failed; callers skip such ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchingElementId {
    pub osm_id: i64,
    pub relation_id: i64,
}

impl MatchingElementId {
    pub fn plain(osm_id: i64) -> Self {
        Self {
            osm_id,
            relation_id: -1,
        }
    }

    pub fn resolved(osm_id: i64, relation_id: i64) -> Self {
        Self { osm_id, relation_id }
    }

    /// Sentinel for a relation whose single outer member could not be found.
    pub fn unresolved(relation_id: i64) -> Self {
        Self {
            osm_id: -relation_id,
            relation_id,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.osm_id > 0
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// An externally sourced candidate record to reconcile against the store.
///
/// The payload is immutable after loading; only the matching score and the
/// element back-reference change, and the back-reference is set once.
#[derive(Debug, Clone)]
pub struct Import {
    pub id: String,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    /// WKT polygon, for imports that carry a footprint instead of a point.
    pub geometry: Option<String>,
    /// Footprint area in the store's native unit.
    pub area: Option<f64>,
    /// Candidate tag values, keyed by tag name.
    pub tags: BTreeMap<String, String>,
    pub matching_score: f32,
    element_id: Option<i64>,
}

impl Import {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            lon: None,
            lat: None,
            geometry: None,
            area: None,
            tags: BTreeMap::new(),
            matching_score: 0.0,
            element_id: None,
        }
    }

    /// The element this import was bound to, if any.
    pub fn element_id(&self) -> Option<i64> {
        self.element_id
    }

    /// Bind the import to an element. The binding is set once; a second
    /// bind is refused and returns false.
    pub fn bind_to(&mut self, osm_id: i64) -> bool {
        if self.element_id.is_some() {
            return false;
        }
        self.element_id = Some(osm_id);
        true
    }
}

// ---------------------------------------------------------------------------
// Element
// ---------------------------------------------------------------------------

/// An entity already present in the reference store, materialized for one
/// run. Owned exclusively by the run's element cache.
#[derive(Debug, Clone)]
pub struct Element {
    pub osm_id: i64,
    /// Enclosing multipolygon relation id, -1 when addressed directly.
    pub relation_id: i64,
    api_data: OsmDocument,
    /// Pre-run values of every updatable tag, captured at construction.
    /// A captured `Some` protects the tag from being overwritten.
    original_values: BTreeMap<String, Option<String>>,
    matching_imports: Vec<Import>,
    pub matching_score: f32,
    pub updated: bool,
    pub remade: bool,
}

impl Element {
    /// Instantiate from an API snapshot. Original values for all updatable
    /// tags are captured here, before any import can be bound.
    pub fn new(
        osm_id: i64,
        relation_id: i64,
        api_data: OsmDocument,
        updatable_tags: &[String],
    ) -> Self {
        let mut element = Self {
            osm_id,
            relation_id,
            api_data,
            original_values: BTreeMap::new(),
            matching_imports: Vec::new(),
            matching_score: 0.0,
            updated: false,
            remade: false,
        };
        element.capture_original_values(updatable_tags);
        element
    }

    pub fn api_data(&self) -> &OsmDocument {
        &self.api_data
    }

    pub fn api_data_mut(&mut self) -> &mut OsmDocument {
        &mut self.api_data
    }

    /// Replace the API snapshot and re-capture original values. Used by the
    /// updater after an element clears the minimal matching score.
    pub fn refresh(&mut self, api_data: OsmDocument, updatable_tags: &[String]) {
        self.api_data = api_data;
        self.original_values.clear();
        self.capture_original_values(updatable_tags);
    }

    fn capture_original_values(&mut self, updatable_tags: &[String]) {
        for tag_name in updatable_tags {
            let value = self.tag_value(tag_name).map(str::to_string);
            self.original_values.insert(tag_name.clone(), value);
        }
    }

    /// Current value of a tag on the element's snapshot.
    pub fn tag_value(&self, tag_name: &str) -> Option<&str> {
        self.api_data.primary_way().and_then(|w| w.tag(tag_name))
    }

    pub fn set_tag_value(&mut self, tag_name: &str, value: &str) {
        if let Some(way) = self.api_data.primary_way_mut() {
            way.set_tag(tag_name, value);
        }
    }

    /// The pre-run value captured for a tag, if one existed.
    pub fn original_value(&self, tag_name: &str) -> Option<&str> {
        self.original_values
            .get(tag_name)
            .and_then(|v| v.as_deref())
    }

    /// A tag may be written only when no original value was captured for
    /// it, so human-authored values are never overwritten.
    pub fn is_tag_updatable(&self, tag_name: &str) -> bool {
        !matches!(self.original_values.get(tag_name), Some(Some(_)))
    }

    /// Bind an import to this element. Refused (false) when the import is
    /// already bound elsewhere.
    pub fn bind(&mut self, mut import: Import) -> bool {
        if !import.bind_to(self.osm_id) {
            return false;
        }
        self.matching_imports.push(import);
        true
    }

    pub fn matching_imports(&self) -> &[Import] {
        &self.matching_imports
    }

    pub fn matching_imports_mut(&mut self) -> &mut [Import] {
        &mut self.matching_imports
    }

    /// Best candidate value for a tag among the bound imports: the most
    /// frequent value, ties broken by the earliest-bound import.
    pub fn best_tag_value(&self, tag_name: &str) -> Option<String> {
        let mut counts: Vec<(&str, usize, usize)> = Vec::new();
        for (index, import) in self.matching_imports.iter().enumerate() {
            let Some(value) = import.tags.get(tag_name) else {
                continue;
            };
            match counts.iter_mut().find(|(v, _, _)| *v == value.as_str()) {
                Some(entry) => entry.1 += 1,
                None => counts.push((value, 1, index)),
            }
        }
        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(b.2.cmp(&a.2)))
            .map(|(value, _, _)| value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{OsmDocument, OsmWay};

    fn snapshot(tags: &[(&str, &str)]) -> OsmDocument {
        let mut way = OsmWay {
            id: 555,
            version: 3,
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

    fn updatable() -> Vec<String> {
        vec!["height".to_string(), "building:levels".to_string()]
    }

    fn import_with_tag(id: &str, tag: &str, value: &str) -> Import {
        let mut import = Import::new(id);
        import.tags.insert(tag.to_string(), value.to_string());
        import
    }

    #[test]
    fn original_values_captured_at_construction() {
        let element = Element::new(555, -1, snapshot(&[("height", "20")]), &updatable());
        assert_eq!(element.original_value("height"), Some("20"));
        assert_eq!(element.original_value("building:levels"), None);
    }

    #[test]
    fn tag_with_original_value_is_protected() {
        let element = Element::new(555, -1, snapshot(&[("height", "20")]), &updatable());
        assert!(!element.is_tag_updatable("height"));
        assert!(element.is_tag_updatable("building:levels"));
    }

    #[test]
    fn binding_does_not_touch_original_values() {
        let mut element = Element::new(555, -1, snapshot(&[]), &updatable());
        assert!(element.is_tag_updatable("height"));
        element.set_tag_value("height", "31");
        assert!(element.bind(import_with_tag("i1", "height", "12")));
        // The snapshot changed, the captured originals did not.
        assert_eq!(element.original_value("height"), None);
        assert!(element.is_tag_updatable("height"));
    }

    #[test]
    fn import_binds_at_most_once() {
        let mut a = Element::new(1, -1, snapshot(&[]), &[]);
        let mut b = Element::new(2, -1, snapshot(&[]), &[]);
        let import = Import::new("i1");
        assert!(a.bind(import.clone()));
        let mut bound = a.matching_imports()[0].clone();
        assert!(!b.bind(bound.clone()));
        assert!(!bound.bind_to(2));
        assert_eq!(bound.element_id(), Some(1));
    }

    #[test]
    fn best_tag_value_majority_wins() {
        let mut element = Element::new(555, -1, snapshot(&[]), &updatable());
        element.bind(import_with_tag("i1", "height", "12"));
        element.bind(import_with_tag("i2", "height", "15"));
        element.bind(import_with_tag("i3", "height", "15"));
        assert_eq!(element.best_tag_value("height"), Some("15".to_string()));
    }

    #[test]
    fn best_tag_value_tie_goes_to_earliest_bound() {
        let mut element = Element::new(555, -1, snapshot(&[]), &updatable());
        element.bind(import_with_tag("i1", "height", "12"));
        element.bind(import_with_tag("i2", "height", "15"));
        assert_eq!(element.best_tag_value("height"), Some("12".to_string()));
    }

    #[test]
    fn best_tag_value_without_candidates() {
        let element = Element::new(555, -1, snapshot(&[]), &updatable());
        assert_eq!(element.best_tag_value("height"), None);
    }

    #[test]
    fn refresh_recaptures_original_values() {
        let mut element = Element::new(555, -1, snapshot(&[]), &updatable());
        assert!(element.is_tag_updatable("height"));
        element.refresh(snapshot(&[("height", "9")]), &updatable());
        assert_eq!(element.original_value("height"), Some("9"));
        assert!(!element.is_tag_updatable("height"));
    }

    #[test]
    fn unresolved_sentinel() {
        let id = MatchingElementId::unresolved(42);
        assert_eq!(id.osm_id, -42);
        assert_eq!(id.relation_id, 42);
        assert!(!id.is_resolved());
        assert!(MatchingElementId::plain(7).is_resolved());
    }
}
