use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RunConfig {
    pub name: String,
    pub mode: SyncMode,
    /// Minimum aggregate score for an element to be updated or remade.
    pub minimal_matching_score: f32,
    /// Maker threshold: an import whose duplicate score stays below this
    /// is considered absent from the store and can be created.
    #[serde(default = "default_no_duplicate_score")]
    pub no_duplicate_score: f32,
    #[serde(default)]
    pub aggregation: AggregationPolicy,
    #[serde(default)]
    pub updatable_tags: Vec<String>,
    /// WKT area restricting which elements a targeted run touches.
    #[serde(default)]
    pub filter_area: Option<String>,
    #[serde(default)]
    pub changeset: ChangesetConfig,
    #[serde(default)]
    pub columns: ImportColumns,
}

fn default_no_duplicate_score() -> f32 {
    0.5
}

// ---------------------------------------------------------------------------
// Synchronization mode
// ---------------------------------------------------------------------------

/// Where decisions are written: directly through the reference API, or
/// into batch export files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    Api,
    Gen,
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Api => write!(f, "api"),
            Self::Gen => write!(f, "gen"),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation policy
// ---------------------------------------------------------------------------

/// How the pair scores of an element's bound imports combine into its
/// decision score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// An element is matched if any single import is a strong match.
    Max,
    Mean,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self::Max
    }
}

impl std::fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Max => write!(f, "max"),
            Self::Mean => write!(f, "mean"),
        }
    }
}

// ---------------------------------------------------------------------------
// Changeset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangesetConfig {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub comment: String,
}

// ---------------------------------------------------------------------------
// Import column mapping
// ---------------------------------------------------------------------------

/// Maps import CSV headers onto the import fields. Only `id` is required;
/// `tags` maps tag names onto the columns carrying their candidate values.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportColumns {
    #[serde(default = "default_id_column")]
    pub id: String,
    #[serde(default)]
    pub lon: Option<String>,
    #[serde(default)]
    pub lat: Option<String>,
    #[serde(default)]
    pub geometry: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

fn default_id_column() -> String {
    "id".to_string()
}

impl Default for ImportColumns {
    fn default() -> Self {
        Self {
            id: default_id_column(),
            lon: None,
            lat: None,
            geometry: None,
            area: None,
            tags: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl RunConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: RunConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.name.is_empty() {
            return Err(ReconError::ConfigValidation("name must not be empty".into()));
        }
        if !(0.0..=1.0).contains(&self.minimal_matching_score) {
            return Err(ReconError::ConfigValidation(format!(
                "minimal_matching_score must be within [0, 1], got {}",
                self.minimal_matching_score
            )));
        }
        if !(0.0..=1.0).contains(&self.no_duplicate_score) {
            return Err(ReconError::ConfigValidation(format!(
                "no_duplicate_score must be within [0, 1], got {}",
                self.no_duplicate_score
            )));
        }
        // Direct API writes open a changeset, which requires a source label.
        if self.mode == SyncMode::Api && self.changeset.source.is_empty() {
            return Err(ReconError::ConfigValidation(
                "api mode requires a changeset source label".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_GEN: &str = r#"
name = "Paris buildings"
mode = "gen"
minimal_matching_score = 0.8
updatable_tags = ["height", "building:levels"]

[columns]
id = "ID"
lon = "LON"
lat = "LAT"
area = "SURFACE"

[columns.tags]
"height" = "HAUTEUR"
"building:levels" = "NIVEAUX"
"#;

    #[test]
    fn parse_valid_gen() {
        let config = RunConfig::from_toml(VALID_GEN).unwrap();
        assert_eq!(config.name, "Paris buildings");
        assert_eq!(config.mode, SyncMode::Gen);
        assert_eq!(config.minimal_matching_score, 0.8);
        assert_eq!(config.no_duplicate_score, 0.5);
        assert_eq!(config.aggregation, AggregationPolicy::Max);
        assert_eq!(config.updatable_tags.len(), 2);
        assert_eq!(config.columns.id, "ID");
        assert_eq!(config.columns.tags["height"], "HAUTEUR");
    }

    #[test]
    fn parse_api_mode_with_changeset() {
        let input = r#"
name = "Direct run"
mode = "api"
minimal_matching_score = 0.9
aggregation = "mean"

[changeset]
source = "Open data"
comment = "Building heights"
"#;
        let config = RunConfig::from_toml(input).unwrap();
        assert_eq!(config.mode, SyncMode::Api);
        assert_eq!(config.aggregation, AggregationPolicy::Mean);
        assert_eq!(config.changeset.source, "Open data");
    }

    #[test]
    fn reject_unknown_mode() {
        let input = r#"
name = "Bad"
mode = "stream"
minimal_matching_score = 0.8
"#;
        assert!(RunConfig::from_toml(input).is_err());
    }

    #[test]
    fn reject_score_out_of_range() {
        let input = r#"
name = "Bad"
mode = "gen"
minimal_matching_score = 1.5
"#;
        let err = RunConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("minimal_matching_score"));
    }

    #[test]
    fn reject_api_mode_without_changeset_source() {
        let input = r#"
name = "Bad"
mode = "api"
minimal_matching_score = 0.8
"#;
        let err = RunConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("changeset source"));
    }

    #[test]
    fn default_columns() {
        let input = r#"
name = "Defaults"
mode = "gen"
minimal_matching_score = 0.8
"#;
        let config = RunConfig::from_toml(input).unwrap();
        assert_eq!(config.columns.id, "id");
        assert!(config.columns.lon.is_none());
        assert!(config.columns.tags.is_empty());
    }
}
