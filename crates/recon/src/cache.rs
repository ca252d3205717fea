use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use geosync_core::model::{Element, MatchingElementId};
use geosync_core::ports::ReferenceApi;

use crate::error::ReconError;

/// Registry of the elements touched during one run, keyed by osm id.
///
/// Sole owner of `Element` instances; plugins and the synchronization step
/// only hold references into it. Lifetime is exactly one plugin invocation.
#[derive(Debug, Default)]
pub struct ElementCache {
    elements: BTreeMap<i64, Element>,
}

impl ElementCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached element, materializing it from the reference API
    /// on first reference. Idempotent: a hit never re-fetches and never
    /// touches the captured original values.
    pub fn get_or_create(
        &mut self,
        matching_id: &MatchingElementId,
        api: &dyn ReferenceApi,
        updatable_tags: &[String],
    ) -> Result<&mut Element, ReconError> {
        let osm_id = matching_id.osm_id;
        match self.elements.entry(osm_id) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let snapshot = api
                    .read_element(osm_id)?
                    .ok_or(ReconError::Fetch { osm_id })?;
                log::debug!("element {osm_id} materialized from the reference API");
                Ok(entry.insert(Element::new(
                    osm_id,
                    matching_id.relation_id,
                    snapshot,
                    updatable_tags,
                )))
            }
        }
    }

    pub fn get(&self, osm_id: i64) -> Option<&Element> {
        self.elements.get(&osm_id)
    }

    pub fn get_mut(&mut self, osm_id: i64) -> Option<&mut Element> {
        self.elements.get_mut(&osm_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.elements.values_mut()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
