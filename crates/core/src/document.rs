use serde::Serialize;

// ---------------------------------------------------------------------------
// OSM document model
// ---------------------------------------------------------------------------

/// A single `k`/`v` tag on a node, way or relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OsmTag {
    pub key: String,
    pub value: String,
}

impl OsmTag {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OsmNode {
    pub id: i64,
    pub version: u32,
    pub changeset: u64,
    pub lat: f64,
    pub lon: f64,
    pub tags: Vec<OsmTag>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OsmWay {
    pub id: i64,
    pub version: u32,
    pub changeset: u64,
    /// Ordered node references forming the way geometry.
    pub node_refs: Vec<i64>,
    pub tags: Vec<OsmTag>,
}

impl OsmWay {
    /// Value of the tag named `key`, if present.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }

    /// Set a tag, replacing an existing value for the same key.
    pub fn set_tag(&mut self, key: &str, value: &str) {
        if let Some(tag) = self.tags.iter_mut().find(|t| t.key == key) {
            tag.value = value.to_string();
        } else {
            self.tags.push(OsmTag::new(key, value));
        }
    }
}

/// A relation member reference, e.g. the outer way of a multipolygon.
#[derive(Debug, Clone, Serialize)]
pub struct OsmMember {
    /// "way", "node" or "relation".
    pub member_type: String,
    pub member_ref: i64,
    pub role: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OsmRelation {
    pub id: i64,
    pub version: u32,
    pub changeset: u64,
    pub members: Vec<OsmMember>,
    pub tags: Vec<OsmTag>,
}

/// An OSM document: the shape of an API element snapshot and of the
/// creation/deletion payloads written during synchronization.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OsmDocument {
    pub nodes: Vec<OsmNode>,
    pub ways: Vec<OsmWay>,
    pub relations: Vec<OsmRelation>,
}

impl OsmDocument {
    /// The element's own way. Snapshots fetched from the reference API
    /// carry exactly one.
    pub fn primary_way(&self) -> Option<&OsmWay> {
        self.ways.first()
    }

    pub fn primary_way_mut(&mut self) -> Option<&mut OsmWay> {
        self.ways.first_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.ways.is_empty() && self.relations.is_empty()
    }
}
