//! `geosync-api-client` — Reference API client.
//!
//! Blocking reqwest client for the OSM-style 0.6 API: element reads,
//! element writes under an open changeset, changeset creation. Implements
//! the engine's `ReferenceApi` port.

mod client;

pub use client::{ApiCredentials, OsmApiClient};
