pub mod keywords;

pub use keywords::*;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{ScoredExemplar, StyleExemplar, StyleMatch};

/// Weights of the two-tier exemplar scorer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleWeights {
    /// Added per keyword that equals a curated tag
    pub tag_weight: u32,
    /// Added per keyword occurrence inside the feature descriptions
    pub feature_weight: u32,
    /// Upper bound on the total feature contribution of one exemplar
    ///
    /// Kept below `tag_weight` so a single tag hit outranks any amount of
    /// description text.
    pub feature_cap: u32,
}

impl Default for StyleWeights {
    fn default() -> Self {
        Self {
            tag_weight: 10,
            feature_weight: 1,
            feature_cap: 9,
        }
    }
}

/// Score one exemplar against a normalized keyword set
pub fn score_exemplar(
    exemplar: &StyleExemplar,
    keywords: &HashSet<String>,
    weights: &StyleWeights,
) -> ScoredExemplar {
    let tags: HashSet<String> = exemplar.tags.iter().map(|t| normalize_term(t)).collect();
    let tag_hits = keywords.iter().filter(|k| tags.contains(*k)).count();

    let phrases: Vec<String> = keywords
        .iter()
        .filter(|k| k.contains(char::is_whitespace))
        .map(|k| collapse_whitespace(k))
        .collect();

    // Count every occurrence, so repeated description terms add up
    let mut feature_hits = 0;
    for text in exemplar.profile.feature_texts() {
        if !phrases.is_empty() {
            let lowered = collapse_whitespace(&text.to_lowercase());
            feature_hits += phrases
                .iter()
                .map(|phrase| lowered.matches(phrase.as_str()).count())
                .sum::<usize>();
        }
        for word in text.split(|c: char| !c.is_alphanumeric()) {
            if word.is_empty() {
                continue;
            }
            let word = word.to_lowercase();
            if keywords.contains(&word) {
                feature_hits += 1;
            } else if !word.is_ascii() {
                // CJK text has no separators; match keywords as substrings
                feature_hits += keywords.iter().filter(|k| word.contains(k.as_str())).count();
            }
        }
    }

    let feature_score = (feature_hits as u32)
        .saturating_mul(weights.feature_weight)
        .min(weights.feature_cap);
    let score = (tag_hits as u32).saturating_mul(weights.tag_weight) + feature_score;

    ScoredExemplar {
        exemplar_id: exemplar.id.clone(),
        title: exemplar.title.clone(),
        score,
        tag_hits,
        feature_hits,
        ingested_at: exemplar.ingested_at,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Rank a channel's exemplars against a keyword set
///
/// Every exemplar is returned, zero scores last. Ties go to the most recently
/// ingested exemplar. The top entry is the recommendation.
pub fn match_style(
    exemplars: &[StyleExemplar],
    keywords: &[String],
    weights: &StyleWeights,
) -> StyleMatch {
    let keyword_set: HashSet<String> = keywords
        .iter()
        .map(|k| normalize_term(k))
        .filter(|k| !k.is_empty())
        .collect();

    let mut ranked: Vec<ScoredExemplar> = exemplars
        .iter()
        .map(|e| score_exemplar(e, &keyword_set, weights))
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.ingested_at.cmp(&a.ingested_at))
            .then_with(|| a.exemplar_id.cmp(&b.exemplar_id))
    });

    for entry in &ranked {
        debug!(
            "Exemplar {} scored {} ({} tag hits, {} feature hits)",
            entry.exemplar_id, entry.score, entry.tag_hits, entry.feature_hits
        );
    }

    let recommended = ranked
        .first()
        .and_then(|top| exemplars.iter().find(|e| e.id == top.exemplar_id));

    let mut keywords: Vec<String> = keyword_set.into_iter().collect();
    keywords.sort();

    StyleMatch {
        keywords,
        recommended_id: recommended.map(|e| e.id.clone()),
        recommended_profile: recommended.map(|e| e.profile.clone()),
        ranked,
    }
}

/// Keywords for the style matcher from a confirmed topic plus extras
pub fn topic_keywords(topic: &str, extra: &[String]) -> Vec<String> {
    let from_topic = extract_keywords(topic);
    merge_keywords([from_topic.as_slice(), extra])
}
