use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type tag of a material snippet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    /// Reference documents: papers, curricula, reports
    Reference,
    /// Concrete teaching or parenting scenes
    CaseStudy,
    /// Retrospectives and personal reflections
    Reflection,
    /// Feedback from students and parents
    Feedback,
    #[default]
    Other,
}

/// A candidate reference snippet
///
/// Never mutated by the core; only filtered and partitioned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialItem {
    pub id: String,
    /// Owning channel; `None` means visible to every channel
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub kind: MaterialKind,
    /// Source label, e.g. "2024 spring classroom"
    #[serde(default)]
    pub source: Option<String>,
    /// Snippet text; missing content makes the item malformed
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Retrieval relevance, when the item came from a ranked search
    #[serde(default)]
    pub relevance: Option<f64>,
    pub ingested_at: DateTime<Utc>,
}

impl MaterialItem {
    /// Non-empty content, or `None` for malformed items
    pub fn text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .filter(|content| !content.trim().is_empty())
    }

    /// Length in characters (not bytes)
    pub fn length(&self) -> usize {
        self.text().map(|t| t.chars().count()).unwrap_or(0)
    }
}

/// A surviving material item prepared for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialCard {
    pub id: String,
    pub kind: MaterialKind,
    pub source: Option<String>,
    pub content: String,
    pub content_length: usize,
    /// Leading characters of the content, with an ellipsis when cut
    pub summary: String,
    pub tags: Vec<String>,
}

/// Counts of what each classification step removed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub input_count: usize,
    pub malformed_dropped: usize,
    pub noise_dropped: usize,
    pub source_duplicates: usize,
    pub content_duplicates: usize,
}

impl ClassificationReport {
    pub fn total_dropped(&self) -> usize {
        self.malformed_dropped + self.noise_dropped + self.source_duplicates + self.content_duplicates
    }
}

/// Output of the material classifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedMaterials {
    /// Items longer than the long-form threshold
    pub long_form: Vec<MaterialCard>,
    /// Short items and fragments
    pub fragments: Vec<MaterialCard>,
    pub report: ClassificationReport,
}

impl ClassifiedMaterials {
    pub fn len(&self) -> usize {
        self.long_form.len() + self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
