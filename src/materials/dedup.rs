use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::MaterialItem;

/// Which item wins when several share a source label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRanking {
    /// Most recently ingested item wins
    #[default]
    MostRecent,
    /// Highest retrieval relevance wins
    Relevance,
}

/// Canonical presentation order: newest first, then by id
pub fn canonical_order(a: &MaterialItem, b: &MaterialItem) -> Ordering {
    b.ingested_at
        .cmp(&a.ingested_at)
        .then_with(|| a.id.cmp(&b.id))
}

fn relevance(item: &MaterialItem) -> f64 {
    item.relevance.unwrap_or(0.0)
}

/// `Greater` when `a` should be kept over `b`
fn source_preference(a: &MaterialItem, b: &MaterialItem, ranking: SourceRanking) -> Ordering {
    let primary = match ranking {
        SourceRanking::MostRecent => a
            .ingested_at
            .cmp(&b.ingested_at)
            .then_with(|| relevance(a).total_cmp(&relevance(b))),
        SourceRanking::Relevance => relevance(a)
            .total_cmp(&relevance(b))
            .then_with(|| a.ingested_at.cmp(&b.ingested_at)),
    };
    // Lower id wins a full tie so the result never depends on input order
    primary.then_with(|| b.id.cmp(&a.id))
}

/// Keep one item per source label
///
/// Items without a source are never grouped together.
pub fn dedupe_by_source(
    items: Vec<MaterialItem>,
    ranking: SourceRanking,
) -> (Vec<MaterialItem>, usize) {
    let before = items.len();
    let mut best: HashMap<String, MaterialItem> = HashMap::new();

    for item in items {
        let key = match item.source.as_deref().map(str::trim) {
            Some(source) if !source.is_empty() => format!("source:{}", source),
            _ => format!("id:{}", item.id),
        };
        match best.get(&key) {
            Some(existing)
                if source_preference(&item, existing, ranking) != Ordering::Greater => {}
            _ => {
                best.insert(key, item);
            }
        }
    }

    let mut kept: Vec<MaterialItem> = best.into_values().collect();
    kept.sort_by(canonical_order);
    let dropped = before - kept.len();
    if dropped > 0 {
        debug!("Source dedup: {} -> {} items", before, kept.len());
    }
    (kept, dropped)
}

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{AC00}'..='\u{D7AF}')
}

/// Token set used for similarity
///
/// Latin text splits into lowercase alphanumeric words. Runs of CJK
/// characters, which have no word separators, become character bigrams.
pub fn token_set(text: &str) -> HashSet<String> {
    let mut tokens = HashSet::new();
    let mut word = String::new();
    let mut cjk_run: Vec<char> = Vec::new();

    let flush_cjk = |run: &mut Vec<char>, tokens: &mut HashSet<String>| {
        match run.len() {
            0 => {}
            1 => {
                tokens.insert(run[0].to_string());
            }
            _ => {
                for pair in run.windows(2) {
                    tokens.insert(pair.iter().collect());
                }
            }
        }
        run.clear();
    };

    for c in text.chars() {
        if is_cjk(c) {
            if !word.is_empty() {
                tokens.insert(std::mem::take(&mut word));
            }
            cjk_run.push(c);
        } else if c.is_alphanumeric() {
            flush_cjk(&mut cjk_run, &mut tokens);
            word.extend(c.to_lowercase());
        } else {
            flush_cjk(&mut cjk_run, &mut tokens);
            if !word.is_empty() {
                tokens.insert(std::mem::take(&mut word));
            }
        }
    }
    flush_cjk(&mut cjk_run, &mut tokens);
    if !word.is_empty() {
        tokens.insert(word);
    }
    tokens
}

/// Jaccard coefficient of two token sets; 0.0 when either is empty
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Drop the shorter item of every pair whose similarity exceeds `threshold`
///
/// Items are visited longest first, so each kept item is at least as long as
/// anything it suppresses. Equal lengths fall back to canonical order.
pub fn dedupe_by_content(items: Vec<MaterialItem>, threshold: f64) -> (Vec<MaterialItem>, usize) {
    let before = items.len();
    if before <= 1 {
        return (items, 0);
    }

    let mut ordered = items;
    ordered.sort_by(|a, b| {
        b.length()
            .cmp(&a.length())
            .then_with(|| canonical_order(a, b))
    });

    let mut kept: Vec<(MaterialItem, HashSet<String>)> = Vec::with_capacity(before);
    for item in ordered {
        let tokens = token_set(item.text().unwrap_or_default());
        let duplicate_of = kept
            .iter()
            .find(|(_, existing)| jaccard(&tokens, existing) > threshold)
            .map(|(existing, _)| existing.id.clone());

        match duplicate_of {
            Some(longer) => debug!("Content dedup: {} duplicates {}", item.id, longer),
            None => kept.push((item, tokens)),
        }
    }

    let mut kept: Vec<MaterialItem> = kept.into_iter().map(|(item, _)| item).collect();
    kept.sort_by(canonical_order);
    let dropped = before - kept.len();
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn item(id: &str, source: Option<&str>, content: &str, age_days: i64) -> MaterialItem {
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        MaterialItem {
            id: id.to_string(),
            channel_id: Some("c".to_string()),
            kind: Default::default(),
            source: source.map(str::to_string),
            content: Some(content.to_string()),
            tags: vec![],
            relevance: None,
            ingested_at: base - Duration::days(age_days),
        }
    }

    #[test]
    fn test_token_set_mixed_scripts() {
        let tokens = token_set("Reading, reading! 阅读习惯");
        assert!(tokens.contains("reading"));
        assert!(tokens.contains("阅读"));
        assert!(tokens.contains("读习"));
        assert!(tokens.contains("习惯"));
        assert_eq!(tokens.len(), 4);
    }

    #[test]
    fn test_jaccard() {
        let a = token_set("the cat sat");
        let b = token_set("the cat ran");
        assert!((jaccard(&a, &b) - 0.5).abs() < 1e-9);
        assert_eq!(jaccard(&a, &HashSet::new()), 0.0);
    }

    #[test]
    fn test_source_dedup_keeps_most_recent() {
        let items = vec![
            item("old", Some("spring class"), "first note", 10),
            item("new", Some("spring class"), "second note", 1),
            item("solo", None, "no source", 5),
            item("solo2", None, "also no source", 5),
        ];
        let (kept, dropped) = dedupe_by_source(items, SourceRanking::MostRecent);
        assert_eq!(dropped, 1);
        let ids: Vec<&str> = kept.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "solo", "solo2"]);
    }

    #[test]
    fn test_source_dedup_by_relevance() {
        let mut a = item("a", Some("s"), "x", 1);
        a.relevance = Some(0.2);
        let mut b = item("b", Some("s"), "y", 5);
        b.relevance = Some(0.9);
        let (kept, _) = dedupe_by_source(vec![a, b], SourceRanking::Relevance);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "b");
    }

    #[test]
    fn test_content_dedup_drops_shorter() {
        let long = "children read aloud every morning before class starts and discuss the story together";
        let short = "children read aloud every morning before class starts and discuss the story";
        let items = vec![
            item("short", None, short, 0),
            item("long", None, long, 3),
            item("other", None, "a completely different note about math games", 2),
        ];
        let (kept, dropped) = dedupe_by_content(items, 0.85);
        assert_eq!(dropped, 1);
        assert!(kept.iter().any(|i| i.id == "long"));
        assert!(!kept.iter().any(|i| i.id == "short"));
    }

    #[test]
    fn test_content_dedup_respects_threshold() {
        let items = vec![
            item("a", None, "one two three four", 0),
            item("b", None, "one two three five", 0),
        ];
        // Jaccard = 3/5 = 0.6
        let (kept, _) = dedupe_by_content(items.clone(), 0.85);
        assert_eq!(kept.len(), 2);
        let (kept, _) = dedupe_by_content(items, 0.5);
        assert_eq!(kept.len(), 1);
    }
}
