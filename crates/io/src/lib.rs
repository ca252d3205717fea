//! `geosync-io` — Disk-backed collaborators.
//!
//! The SQLite spatial store and the OSM XML codec + batch file exporter.

pub mod exporter;
pub mod spatial;
pub mod xml;

pub use exporter::XmlFileExporter;
pub use spatial::{SqliteSpatialStore, DEFAULT_SRID};
pub use xml::XmlError;
