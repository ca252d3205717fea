use std::fmt;

use geosync_core::ports::{ApiError, StoreError};

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, missing changeset, etc.).
    ConfigValidation(String),
    /// The reference API has no record for an element id.
    Fetch { osm_id: i64 },
    /// Spatial store failure surfaced to the caller.
    Store(String),
    /// Reference API failure surfaced to the caller.
    Api(String),
    /// Missing required column in import data.
    MissingColumn { column: String },
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Fetch { osm_id } => {
                write!(f, "no record in the reference API for element {osm_id}")
            }
            Self::Store(msg) => write!(f, "spatial store error: {msg}"),
            Self::Api(msg) => write!(f, "reference API error: {msg}"),
            Self::MissingColumn { column } => write!(f, "missing column '{column}'"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

impl From<StoreError> for ReconError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<ApiError> for ReconError {
    fn from(err: ApiError) -> Self {
        Self::Api(err.to_string())
    }
}
