use serde::{Deserialize, Serialize};

/// Named configuration bundle that parameterizes every stage prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// Channel identifier (slug)
    pub id: String,
    /// Display name
    pub name: String,
    /// Writing persona used as the role line of stage prompts
    pub persona: String,
    /// Description of the intended readers
    #[serde(default)]
    pub target_audience: Option<String>,
    /// Short description of the brand voice
    #[serde(default)]
    pub brand_personality: Option<String>,
    /// Positive style rules ("short paragraphs", "open with a scene")
    #[serde(default)]
    pub style_rules: Vec<String>,
    /// Rules that must always be followed
    #[serde(default)]
    pub must_do: Vec<String>,
    /// Rules that must never be broken
    #[serde(default)]
    pub must_not_do: Vec<String>,
    /// Phrases that must not appear in generated text
    #[serde(default)]
    pub forbidden_phrases: Vec<String>,
    /// Tag vocabulary used to describe material for this channel
    #[serde(default)]
    pub tag_vocabulary: Vec<String>,
}

impl Channel {
    /// Forbidden phrases present in `text` (case-insensitive)
    pub fn forbidden_hits(&self, text: &str) -> Vec<String> {
        let haystack = text.to_lowercase();
        self.forbidden_phrases
            .iter()
            .filter(|phrase| !phrase.trim().is_empty())
            .filter(|phrase| haystack.contains(&phrase.to_lowercase()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_hits_case_insensitive() {
        let channel = Channel {
            id: "deep_reading".to_string(),
            name: "Deep Reading".to_string(),
            persona: "A patient reading teacher".to_string(),
            target_audience: None,
            brand_personality: None,
            style_rules: vec![],
            must_do: vec![],
            must_not_do: vec![],
            forbidden_phrases: vec!["In today's fast-paced world".to_string(), " ".to_string()],
            tag_vocabulary: vec![],
        };

        let hits = channel.forbidden_hits("in TODAY'S fast-paced world, kids read less.");
        assert_eq!(hits, vec!["In today's fast-paced world".to_string()]);
        assert!(channel.forbidden_hits("A calm opening.").is_empty());
    }
}
