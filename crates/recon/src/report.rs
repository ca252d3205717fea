use serde::Serialize;

use geosync_core::model::Element;

use crate::config::SyncMode;
use crate::counters::RunCounters;

/// Number of score bands in the report histogram: [0.0, 0.1) … [0.9, 1.0].
const SCORE_BANDS: usize = 10;

/// Reporting surface of one run, serializable for external display.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub plugin: String,
    pub config_name: String,
    pub mode: SyncMode,
    pub engine_version: String,
    pub run_at: String,
    pub counters: RunCounters,
    /// Aggregate-score distribution over matched elements, 0.1-wide bands.
    pub score_histogram: Vec<u64>,
}

impl RunReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Log the closing statistics banner.
    pub fn log(&self) {
        log::info!("=== {} run statistics ===", self.plugin);
        let c = &self.counters;
        log::info!("Total of targeted elements: {}", c.targeted_elements);
        log::info!("Total of matched imports: {}", c.matched_imports);
        log::info!("Total of matched elements: {}", c.matched_elements);
        log::info!("Total of updatable elements: {}", c.updatable_elements);
        log::info!("Total of makable imports: {}", c.makable_imports);
        log::info!("Total of made imports: {}", c.made_imports);
        log::info!("Total of updated elements: {}", c.updated_elements);
        log::info!("Total of remade elements: {}", c.remade_elements);
        log::info!("Total of write failures: {}", c.write_failures);
        for (band, count) in self.score_histogram.iter().enumerate() {
            log::info!(
                "Elements with score within [{:.1}, {:.1}{}: {count}",
                band as f32 / 10.0,
                (band + 1) as f32 / 10.0,
                if band + 1 == SCORE_BANDS { "]" } else { ")" },
            );
        }
    }
}

/// Distribution of aggregate scores across elements, one 0.1-wide band
/// each; a score of exactly 1.0 lands in the last band.
pub fn score_histogram<'a>(elements: impl Iterator<Item = &'a Element>) -> Vec<u64> {
    let mut bands = vec![0u64; SCORE_BANDS];
    for element in elements {
        let band = ((element.matching_score * SCORE_BANDS as f32) as usize).min(SCORE_BANDS - 1);
        bands[band] += 1;
    }
    bands
}

#[cfg(test)]
mod tests {
    use super::*;
    use geosync_core::document::OsmDocument;

    fn scored_element(score: f32) -> Element {
        let mut element = Element::new(1, -1, OsmDocument::default(), &[]);
        element.matching_score = score;
        element
    }

    #[test]
    fn histogram_bands() {
        let elements = vec![
            scored_element(0.0),
            scored_element(0.05),
            scored_element(0.95),
            scored_element(1.0),
        ];
        let bands = score_histogram(elements.iter());
        assert_eq!(bands[0], 2);
        assert_eq!(bands[9], 2);
        assert_eq!(bands.iter().sum::<u64>(), 4);
    }

    #[test]
    fn report_serializes_to_json() {
        let report = RunReport {
            plugin: "updater".into(),
            config_name: "Test".into(),
            mode: SyncMode::Gen,
            engine_version: "0.0.0".into(),
            run_at: "2026-01-01T00:00:00Z".into(),
            counters: RunCounters::default(),
            score_histogram: vec![0; 10],
        };
        let json = report.to_json();
        assert!(json.contains("\"mode\": \"gen\""));
        assert!(json.contains("\"updated_elements\": 0"));
    }
}
