use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How an article opens
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpeningStyle {
    /// Short label, e.g. "story_intro" or "question"
    pub approach: String,
    #[serde(default)]
    pub description: String,
}

/// Sentence rhythm statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SentenceRhythm {
    /// Average sentence length in characters
    #[serde(default)]
    pub avg_length: f64,
    /// Share of short sentences (0.0 - 1.0)
    #[serde(default)]
    pub short_ratio: f64,
    #[serde(default)]
    pub description: String,
}

/// Paragraph rhythm descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphRhythm {
    /// "low", "medium" or "high" variation between paragraph lengths
    #[serde(default)]
    pub variation: String,
    #[serde(default)]
    pub avg_paragraph_length: u32,
    #[serde(default)]
    pub description: String,
}

/// Tone descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    /// Short label, e.g. "warm_friend"
    pub kind: String,
    /// 0.0 = conversational, 1.0 = formal
    #[serde(default)]
    pub formality: f64,
    #[serde(default)]
    pub description: String,
}

/// How an article closes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClosingStyle {
    pub approach: String,
    #[serde(default)]
    pub description: String,
}

/// Preferred and forbidden vocabulary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    #[serde(default)]
    pub preferred: Vec<String>,
    #[serde(default)]
    pub transitions: Vec<String>,
    #[serde(default)]
    pub forbidden: Vec<String>,
}

/// The six categorical style features of an exemplar
///
/// Once confirmed this becomes the style constraint set for drafting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleProfile {
    pub opening: OpeningStyle,
    pub sentence_rhythm: SentenceRhythm,
    pub paragraph_rhythm: ParagraphRhythm,
    pub tone: Tone,
    pub closing: ClosingStyle,
    pub vocabulary: Vocabulary,
}

impl StyleProfile {
    /// All free text inside the six features, one entry per field
    pub fn feature_texts(&self) -> Vec<&str> {
        let mut texts = vec![
            self.opening.approach.as_str(),
            self.opening.description.as_str(),
            self.sentence_rhythm.description.as_str(),
            self.paragraph_rhythm.variation.as_str(),
            self.paragraph_rhythm.description.as_str(),
            self.tone.kind.as_str(),
            self.tone.description.as_str(),
            self.closing.approach.as_str(),
            self.closing.description.as_str(),
        ];
        texts.extend(self.vocabulary.preferred.iter().map(String::as_str));
        texts.extend(self.vocabulary.transitions.iter().map(String::as_str));
        texts.extend(self.vocabulary.forbidden.iter().map(String::as_str));
        texts
    }

    /// Render as bullet lines for a prompt
    pub fn to_prompt_lines(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "- Opening: {} {}\n",
            self.opening.approach, self.opening.description
        ));
        out.push_str(&format!(
            "- Sentences: avg {:.0} chars, {:.0}% short. {}\n",
            self.sentence_rhythm.avg_length,
            self.sentence_rhythm.short_ratio * 100.0,
            self.sentence_rhythm.description
        ));
        out.push_str(&format!(
            "- Paragraphs: {} variation. {}\n",
            self.paragraph_rhythm.variation, self.paragraph_rhythm.description
        ));
        out.push_str(&format!(
            "- Tone: {} (formality {:.1}). {}\n",
            self.tone.kind, self.tone.formality, self.tone.description
        ));
        out.push_str(&format!(
            "- Closing: {} {}\n",
            self.closing.approach, self.closing.description
        ));
        if !self.vocabulary.preferred.is_empty() {
            out.push_str(&format!(
                "- Preferred words: {}\n",
                self.vocabulary.preferred.join(", ")
            ));
        }
        if !self.vocabulary.forbidden.is_empty() {
            out.push_str(&format!(
                "- Avoid: {}\n",
                self.vocabulary.forbidden.join(", ")
            ));
        }
        out
    }
}

/// Reference document whose features guide generation; immutable once ingested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleExemplar {
    pub id: String,
    pub channel_id: String,
    pub title: String,
    /// Curated free-text tags (the strongest relevance signal)
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub profile: StyleProfile,
    #[serde(default)]
    pub body: String,
    pub ingested_at: DateTime<Utc>,
}

/// An exemplar with its match score against a keyword set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredExemplar {
    pub exemplar_id: String,
    pub title: String,
    pub score: u32,
    /// Keywords that matched a curated tag exactly
    pub tag_hits: usize,
    /// Keyword occurrences inside the feature descriptions
    pub feature_hits: usize,
    pub ingested_at: DateTime<Utc>,
}

/// Ranked exemplars plus the recommended one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleMatch {
    pub keywords: Vec<String>,
    /// Highest score first; zero-score exemplars are kept at the end
    pub ranked: Vec<ScoredExemplar>,
    pub recommended_id: Option<String>,
    /// Feature set of the recommended exemplar
    pub recommended_profile: Option<StyleProfile>,
}
