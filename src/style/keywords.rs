use std::collections::BTreeSet;

use crate::materials::token_set;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "how", "in", "into", "is",
    "it", "its", "of", "on", "or", "our", "the", "their", "this", "to", "what", "when", "why",
    "with", "your", "you", "word", "words", "article", "about",
];

/// Lowercase a tag or keyword and strip a leading '#'
pub fn normalize_term(term: &str) -> String {
    term.trim().trim_start_matches('#').trim().to_lowercase()
}

/// Keyword set for style matching, derived from a topic
///
/// Stopwords, pure numbers and single Latin letters are dropped. The set is
/// sorted so the same topic always yields the same keywords.
pub fn extract_keywords(topic: &str) -> Vec<String> {
    let set: BTreeSet<String> = token_set(topic)
        .into_iter()
        .filter(|token| !STOPWORDS.contains(&token.as_str()))
        .filter(|token| !token.chars().all(|c| c.is_ascii_digit()))
        .filter(|token| token.chars().count() > 1 || !token.is_ascii())
        .collect();
    set.into_iter().collect()
}

/// Merge keyword lists, normalized and deduplicated
pub fn merge_keywords<'a, I>(lists: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let set: BTreeSet<String> = lists
        .into_iter()
        .flatten()
        .map(|k| normalize_term(k))
        .filter(|k| !k.is_empty())
        .collect();
    set.into_iter().collect()
}
