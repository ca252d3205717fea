//! `geosync-core` — Shared conflation types.
//!
//! Data model for imports and reference elements, the OSM document model,
//! and the collaborator ports the engine talks through. No IO dependencies.

pub mod document;
pub mod model;
pub mod ports;
pub mod tags;

pub use document::{OsmDocument, OsmMember, OsmNode, OsmRelation, OsmTag, OsmWay};
pub use model::{Element, Import, MatchingElementId};
pub use ports::{ApiError, BatchExporter, ReferenceApi, RelationMember, SpatialStore, StoreError};
