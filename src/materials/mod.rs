pub mod dedup;
pub mod noise;

pub use dedup::*;
pub use noise::*;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::models::{ClassificationReport, ClassifiedMaterials, MaterialCard, MaterialItem};

/// Configuration for the material classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialConfig {
    /// Regex denylist of promotional boilerplate
    pub noise_patterns: Vec<String>,
    /// Jaccard similarity above which the shorter item of a pair is dropped
    pub similarity_threshold: f64,
    /// Items longer than this many characters are long-form
    pub long_form_threshold: usize,
    /// Which item survives among items sharing a source
    pub source_ranking: SourceRanking,
    /// Characters kept in a card summary
    pub summary_chars: usize,
}

impl Default for MaterialConfig {
    fn default() -> Self {
        Self {
            noise_patterns: DEFAULT_NOISE_PATTERNS.iter().map(|p| p.to_string()).collect(),
            similarity_threshold: 0.85,
            long_form_threshold: 200,
            source_ranking: SourceRanking::MostRecent,
            summary_chars: 100,
        }
    }
}

impl MaterialConfig {
    pub fn noise_filter(&self) -> Result<NoiseFilter, regex::Error> {
        NoiseFilter::new(&self.noise_patterns)
    }
}

fn to_card(item: MaterialItem, summary_chars: usize) -> MaterialCard {
    let content = item.text().unwrap_or_default().to_string();
    let content_length = content.chars().count();
    let summary = if content_length > summary_chars {
        let head: String = content.chars().take(summary_chars).collect();
        format!("{}...", head)
    } else {
        content.clone()
    };
    MaterialCard {
        id: item.id,
        kind: item.kind,
        source: item.source,
        content,
        content_length,
        summary,
        tags: item.tags,
    }
}

/// Run the full material pipeline
///
/// 1. Drop malformed items (no content), counting them
/// 2. Drop items matching the noise denylist
/// 3. Keep one item per source label
/// 4. Drop the shorter item of every near-duplicate pair
/// 5. Split survivors into long-form and fragment buckets
///
/// The result depends only on the input set, not its order.
pub fn classify_materials(
    items: Vec<MaterialItem>,
    noise: &NoiseFilter,
    config: &MaterialConfig,
) -> ClassifiedMaterials {
    let mut report = ClassificationReport {
        input_count: items.len(),
        ..Default::default()
    };

    let (well_formed, malformed): (Vec<_>, Vec<_>) =
        items.into_iter().partition(|item| item.text().is_some());
    report.malformed_dropped = malformed.len();
    if !malformed.is_empty() {
        warn!(
            "Dropped {} malformed material items (missing content)",
            malformed.len()
        );
    }

    let (items, dropped) = noise.apply(well_formed);
    report.noise_dropped = dropped;

    let (items, dropped) = dedupe_by_source(items, config.source_ranking);
    report.source_duplicates = dropped;

    let (items, dropped) = dedupe_by_content(items, config.similarity_threshold);
    report.content_duplicates = dropped;

    let mut result = ClassifiedMaterials {
        report,
        ..Default::default()
    };
    for item in items {
        let card = to_card(item, config.summary_chars);
        if card.content_length > config.long_form_threshold {
            result.long_form.push(card);
        } else {
            result.fragments.push(card);
        }
    }

    info!(
        "Materials: {} in, {} long-form, {} fragments, {} dropped",
        result.report.input_count,
        result.long_form.len(),
        result.fragments.len(),
        result.report.total_dropped()
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(id: &str, source: Option<&str>, content: Option<&str>) -> MaterialItem {
        MaterialItem {
            id: id.to_string(),
            channel_id: None,
            kind: Default::default(),
            source: source.map(str::to_string),
            content: content.map(str::to_string),
            tags: vec![],
            relevance: None,
            ingested_at: Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
        }
    }

    fn classify(items: Vec<MaterialItem>, config: &MaterialConfig) -> ClassifiedMaterials {
        let noise = config.noise_filter().unwrap();
        classify_materials(items, &noise, config)
    }

    #[test]
    fn test_empty_input_is_valid() {
        let result = classify(vec![], &MaterialConfig::default());
        assert!(result.is_empty());
        assert_eq!(result.report, ClassificationReport::default());
    }

    #[test]
    fn test_full_pipeline() {
        let long_text = "During the spring term we started every class with ten minutes of quiet reading. ".repeat(4);
        let items = vec![
            item("m1", Some("spring term"), Some(&long_text)),
            item("m2", None, Some("Buy now and get the full reading list!")),
            item("m3", None, None),
            item("m4", None, Some("   ")),
            item("m5", None, Some("A parent said her son now asks for a story every night.")),
        ];

        let result = classify(items, &MaterialConfig::default());
        assert_eq!(result.report.input_count, 5);
        assert_eq!(result.report.malformed_dropped, 2);
        assert_eq!(result.report.noise_dropped, 1);
        assert_eq!(result.long_form.len(), 1);
        assert_eq!(result.long_form[0].id, "m1");
        assert!(result.long_form[0].summary.ends_with("..."));
        assert_eq!(result.fragments.len(), 1);
        assert_eq!(result.fragments[0].id, "m5");
    }

    #[test]
    fn test_classification_is_order_independent() {
        let items = vec![
            item("a", Some("s1"), Some("reading routines build calm classrooms every single day")),
            item("b", Some("s2"), Some("reading routines build calm classrooms every single day too")),
            item("c", Some("s1"), Some("another note from the same source")),
            item("d", None, Some("math games for fractions")),
        ];
        let mut reversed = items.clone();
        reversed.reverse();

        let config = MaterialConfig::default();
        let first = classify(items, &config);
        let second = classify(reversed, &config);
        assert_eq!(first, second);

        let again = classify(
            first
                .fragments
                .iter()
                .map(|card| item(&card.id, card.source.as_deref(), Some(&card.content)))
                .collect(),
            &config,
        );
        assert_eq!(again.fragments, first.fragments);
    }

    #[test]
    fn test_threshold_is_configurable() {
        let items = vec![
            item("a", None, Some("one two three four")),
            item("b", None, Some("one two three five")),
        ];
        let strict = MaterialConfig {
            similarity_threshold: 0.5,
            ..Default::default()
        };
        assert_eq!(classify(items.clone(), &strict).len(), 1);
        assert_eq!(classify(items, &MaterialConfig::default()).len(), 2);
    }
}
