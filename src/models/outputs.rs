use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ClassifiedMaterials, Stage, StyleMatch, StyleProfile};

/// S1: structured reading of the author's request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BriefAnalysis {
    pub analysis: String,
    /// Keywords parsed from the analysis
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// S2: research points and a short summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchNotes {
    pub report: String,
    pub summary: String,
}

/// S3: candidate topics for the author to choose from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicProposals {
    pub proposals: String,
    /// Titles parsed from the proposals, in order
    #[serde(default)]
    pub titles: Vec<String>,
}

/// S4: who does what
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollaborationChecklist {
    pub checklist: String,
    /// Unchecked items ("- [ ] ...") in the checklist
    #[serde(default)]
    pub open_items: Vec<String>,
}

/// S5: style recommendation and classified reference material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleAndMaterials {
    pub style: StyleMatch,
    pub materials: ClassifiedMaterials,
}

/// S6: what must be ready before drafting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessChecklist {
    pub checklist: String,
}

/// S7: first draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub content: String,
    #[serde(default)]
    pub forbidden_hits: Vec<String>,
}

/// S8: review report and the revised article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub report: String,
    pub final_content: String,
    /// Forbidden phrases still present after review
    #[serde(default)]
    pub forbidden_hits: Vec<String>,
}

/// S9: illustration suggestions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IllustrationPlan {
    pub plan: String,
}

/// Output of one stage, one variant per stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageOutput {
    BriefAnalysis(BriefAnalysis),
    Research(ResearchNotes),
    TopicProposals(TopicProposals),
    Collaboration(CollaborationChecklist),
    StyleAndMaterials(StyleAndMaterials),
    MaterialReadiness(ReadinessChecklist),
    Drafting(Draft),
    Review(ReviewResult),
    Illustration(IllustrationPlan),
}

impl StageOutput {
    /// The stage that produces this variant
    pub fn stage(&self) -> Stage {
        match self {
            StageOutput::BriefAnalysis(_) => Stage::BriefAnalysis,
            StageOutput::Research(_) => Stage::Research,
            StageOutput::TopicProposals(_) => Stage::TopicProposals,
            StageOutput::Collaboration(_) => Stage::Collaboration,
            StageOutput::StyleAndMaterials(_) => Stage::StyleAndMaterials,
            StageOutput::MaterialReadiness(_) => Stage::MaterialReadiness,
            StageOutput::Drafting(_) => Stage::Drafting,
            StageOutput::Review(_) => Stage::Review,
            StageOutput::Illustration(_) => Stage::Illustration,
        }
    }

    /// Main text of the output, for display and logging
    pub fn text(&self) -> &str {
        match self {
            StageOutput::BriefAnalysis(o) => &o.analysis,
            StageOutput::Research(o) => &o.report,
            StageOutput::TopicProposals(o) => &o.proposals,
            StageOutput::Collaboration(o) => &o.checklist,
            StageOutput::StyleAndMaterials(_) => "",
            StageOutput::MaterialReadiness(o) => &o.checklist,
            StageOutput::Drafting(o) => &o.content,
            StageOutput::Review(o) => &o.final_content,
            StageOutput::Illustration(o) => &o.plan,
        }
    }
}

/// Human-supplied data for a checkpoint, as sent by the caller
///
/// Every field is optional here; which one is required depends on the
/// checkpoint stage and is checked before anything is written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfirmationPayload {
    #[serde(default)]
    pub selected_topic: Option<String>,
    #[serde(default)]
    pub research_summary: Option<String>,
    #[serde(default)]
    pub style_profile: Option<StyleProfile>,
    #[serde(default)]
    pub materials: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

/// Validated confirmation stored next to the checkpoint stage output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfirmationRecord {
    ResearchReview { research_summary: String },
    TopicSelection { selected_topic: String },
    StyleProfile { profile: StyleProfile, edited: bool },
    MaterialReadiness { materials: String },
    /// Checkpoint with no stage-specific data
    Acknowledged,
}

/// Everything persisted for one executed stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub output: StageOutput,
    #[serde(default)]
    pub confirmation: Option<ConfirmationRecord>,
    #[serde(default)]
    pub note: Option<String>,
    pub executed_at: DateTime<Utc>,
    #[serde(default)]
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Caller-supplied inputs for a single stage execution
///
/// Values here take precedence over confirmed values for that call only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageParams {
    #[serde(default)]
    pub selected_topic: Option<String>,
    #[serde(default)]
    pub materials: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_output_is_tagged() {
        let output = StageOutput::Drafting(Draft {
            content: "Once upon a time".to_string(),
            forbidden_hits: vec![],
        });
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["kind"], "drafting");
        assert_eq!(value["content"], "Once upon a time");

        let back: StageOutput = serde_json::from_value(value).unwrap();
        assert_eq!(back.stage(), Stage::Drafting);
    }

    #[test]
    fn test_confirmation_record_shape() {
        let json = r#"{"kind": "topic_selection", "selected_topic": "Morning reading circles"}"#;
        let record: ConfirmationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(
            record,
            ConfirmationRecord::TopicSelection {
                selected_topic: "Morning reading circles".to_string()
            }
        );
    }
}
