pub mod stage1_brief;
pub mod stage2_research;
pub mod stage3_topics;
pub mod stage4_collaboration;
pub mod stage5_style_materials;
pub mod stage6_readiness;
pub mod stage7_drafting;
pub mod stage8_review;
pub mod stage9_illustration;

pub use stage1_brief::*;
pub use stage2_research::*;
pub use stage3_topics::*;
pub use stage4_collaboration::*;
pub use stage5_style_materials::*;
pub use stage6_readiness::*;
pub use stage7_drafting::*;
pub use stage8_review::*;
pub use stage9_illustration::*;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{BackendError, OrchestratorError, Result};
use crate::llm::{GenerationRequest, TextBackend};
use crate::materials::{MaterialConfig, NoiseFilter};
use crate::models::{
    Channel, MaterialItem, Stage, StageOutput, StageParams, StyleExemplar, Task,
};
use crate::style::StyleWeights;

/// Sampling settings for one model-backed stage
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl GenerationSettings {
    pub const fn new(temperature: f64, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

/// Per-stage sampling settings
///
/// Stages 5 and 6 make no model call and have no entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationTable {
    pub brief_analysis: GenerationSettings,
    pub research: GenerationSettings,
    pub topic_proposals: GenerationSettings,
    pub collaboration: GenerationSettings,
    pub drafting: GenerationSettings,
    pub review: GenerationSettings,
    pub illustration: GenerationSettings,
}

impl Default for GenerationTable {
    fn default() -> Self {
        Self {
            brief_analysis: GenerationSettings::new(0.3, 4096),
            research: GenerationSettings::new(0.3, 4096),
            topic_proposals: GenerationSettings::new(0.8, 6000),
            collaboration: GenerationSettings::new(0.3, 4096),
            drafting: GenerationSettings::new(0.7, 8000),
            review: GenerationSettings::new(0.3, 10000),
            illustration: GenerationSettings::new(0.5, 4096),
        }
    }
}

impl GenerationTable {
    pub fn for_stage(&self, stage: Stage) -> Option<GenerationSettings> {
        match stage {
            Stage::BriefAnalysis => Some(self.brief_analysis),
            Stage::Research => Some(self.research),
            Stage::TopicProposals => Some(self.topic_proposals),
            Stage::Collaboration => Some(self.collaboration),
            Stage::StyleAndMaterials | Stage::MaterialReadiness => None,
            Stage::Drafting => Some(self.drafting),
            Stage::Review => Some(self.review),
            Stage::Illustration => Some(self.illustration),
        }
    }
}

/// Everything the stage executors need besides their inputs
#[derive(Debug, Clone)]
pub struct StageConfig {
    pub generation: GenerationTable,
    pub materials: MaterialConfig,
    pub style: StyleWeights,
    /// Characters of the article passed to the illustration stage
    pub illustration_excerpt_chars: usize,
    noise: NoiseFilter,
}

impl StageConfig {
    /// Compile the material denylist and bundle the settings
    pub fn new(
        generation: GenerationTable,
        materials: MaterialConfig,
        style: StyleWeights,
    ) -> std::result::Result<Self, regex::Error> {
        let noise = materials.noise_filter()?;
        Ok(Self {
            generation,
            materials,
            style,
            illustration_excerpt_chars: 2000,
            noise,
        })
    }

    pub fn noise_filter(&self) -> &NoiseFilter {
        &self.noise
    }
}

/// Inputs for one stage execution
///
/// `exemplars` and `materials` are only read by the style and materials stage
/// and may be empty otherwise.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    pub task: &'a Task,
    pub channel: &'a Channel,
    pub params: &'a StageParams,
    pub exemplars: &'a [StyleExemplar],
    pub materials: &'a [MaterialItem],
}

impl<'a> StageContext<'a> {
    /// S1 analysis text, or the raw brief when S1 has no output
    pub fn brief_analysis_text(&self) -> &'a str {
        self.task
            .brief_data
            .brief_analysis()
            .map(|o| o.analysis.as_str())
            .unwrap_or(self.task.brief_data.brief.as_str())
    }

    /// Topic for this execution
    ///
    /// Call params win over the confirmed topic. Without either, the first
    /// proposed title is used.
    pub fn selected_topic(&self) -> Result<String> {
        let from_params = self
            .params
            .selected_topic
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        if let Some(topic) = from_params {
            return Ok(topic.to_string());
        }
        if let Some(topic) = self.task.brief_data.selected_topic() {
            return Ok(topic.to_string());
        }
        let proposed = match self.task.brief_data.output(Stage::TopicProposals) {
            Some(StageOutput::TopicProposals(o)) => o.titles.first().cloned(),
            _ => None,
        };
        match proposed {
            Some(title) => {
                warn!(
                    "Task {}: no confirmed topic, using first proposal \"{}\"",
                    self.task.id, title
                );
                Ok(title)
            }
            None => Err(OrchestratorError::validation(
                "selected_topic",
                "no topic has been selected or proposed",
            )),
        }
    }

    /// Author-supplied material text: params first, then the confirmed value
    pub fn supplied_materials(&self) -> Option<&'a str> {
        self.params
            .materials
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| self.task.brief_data.supplied_materials())
    }
}

/// Result of one stage executor
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub output: StageOutput,
    /// Progress note appended to the task's think-aloud log
    pub think_aloud: String,
}

impl StageOutcome {
    pub fn new(output: StageOutput, think_aloud: impl Into<String>) -> Self {
        Self {
            output,
            think_aloud: think_aloud.into(),
        }
    }

    /// Copy the output's headline fields onto the task
    pub fn apply_to(&self, task: &mut Task) {
        match &self.output {
            StageOutput::Research(o) => task.research_summary = Some(o.summary.clone()),
            StageOutput::Drafting(o) => task.draft_content = Some(o.content.clone()),
            StageOutput::Review(o) => task.final_content = Some(o.final_content.clone()),
            _ => {}
        }
    }
}

/// Call the backend with the stage's sampling settings
pub(crate) async fn generate(
    backend: &dyn TextBackend,
    settings: GenerationSettings,
    system: impl Into<String>,
    user: impl Into<String>,
) -> std::result::Result<String, BackendError> {
    backend
        .generate(GenerationRequest {
            system: system.into(),
            user: user.into(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
        .await
}

/// Run the executor for `stage`
///
/// Executors never touch the store; the caller persists the outcome.
pub async fn execute_stage(
    stage: Stage,
    backend: &dyn TextBackend,
    ctx: &StageContext<'_>,
    config: &StageConfig,
) -> Result<StageOutcome> {
    info!("Task {}: executing {}", ctx.task.id, stage);
    let outcome = match stage {
        Stage::BriefAnalysis => execute_stage1(backend, ctx, config).await?,
        Stage::Research => execute_stage2(backend, ctx, config).await?,
        Stage::TopicProposals => execute_stage3(backend, ctx, config).await?,
        Stage::Collaboration => execute_stage4(backend, ctx, config).await?,
        Stage::StyleAndMaterials => execute_stage5(ctx, config)?,
        Stage::MaterialReadiness => execute_stage6(ctx),
        Stage::Drafting => execute_stage7(backend, ctx, config).await?,
        Stage::Review => execute_stage8(backend, ctx, config).await?,
        Stage::Illustration => execute_stage9(backend, ctx, config).await?,
    };
    info!(
        "Task {}: {} produced {} chars",
        ctx.task.id,
        stage,
        outcome.output.text().chars().count()
    );
    Ok(outcome)
}

/// Body of the first markdown section whose heading contains `heading`
///
/// Matching is case-insensitive. The section ends at the next heading of the
/// same or a higher level.
pub fn section_after(text: &str, heading: &str) -> Option<String> {
    let needle = heading.to_lowercase();
    let mut lines = text.lines();
    let mut level = 0;
    for line in lines.by_ref() {
        let trimmed = line.trim_start();
        let hashes = trimmed.chars().take_while(|c| *c == '#').count();
        if hashes > 0 && trimmed[hashes..].to_lowercase().contains(&needle) {
            level = hashes;
            break;
        }
    }
    if level == 0 {
        return None;
    }

    let mut body = Vec::new();
    for line in lines {
        let trimmed = line.trim_start();
        let hashes = trimmed.chars().take_while(|c| *c == '#').count();
        if hashes > 0 && hashes <= level && trimmed[hashes..].starts_with(' ') {
            break;
        }
        body.push(line);
    }
    let body = body.join("\n").trim().to_string();
    (!body.is_empty()).then_some(body)
}

/// First `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Value of a `Label: value` line, ignoring list numbering and emphasis
pub fn labelled_value<'t>(line: &'t str, label: &str) -> Option<&'t str> {
    let trimmed = line
        .trim()
        .trim_start_matches(|c: char| c.is_ascii_digit() || matches!(c, '.' | ')' | '-' | '#' | ' '))
        .trim_start_matches('*');
    let (head, rest) = trimmed.split_once([':', '：'])?;
    let head = head.trim().trim_end_matches('*').trim();
    if !head.eq_ignore_ascii_case(label) {
        return None;
    }
    let value = rest.trim().trim_start_matches('*').trim();
    (!value.is_empty()).then_some(value)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_after() {
        let text = "## Review report\n### Issues found\n1. x\n### Revised version\nFirst line.\n\nSecond line.\n## Appendix\nignored";
        assert_eq!(
            section_after(text, "revised version").as_deref(),
            Some("First line.\n\nSecond line.")
        );
        assert_eq!(section_after(text, "missing"), None);
    }

    #[test]
    fn test_labelled_value() {
        assert_eq!(labelled_value("5. Keywords: a, b", "keywords"), Some("a, b"));
        assert_eq!(labelled_value("**Title**: Morning circles", "title"), Some("Morning circles"));
        assert_eq!(labelled_value("- Title：晨读", "title"), Some("晨读"));
        assert_eq!(labelled_value("Subtitle: x", "title"), None);
        assert_eq!(labelled_value("Title:", "title"), None);
    }

    #[test]
    fn test_generation_table_defaults() {
        let table = GenerationTable::default();
        assert_eq!(table.for_stage(Stage::TopicProposals), Some(GenerationSettings::new(0.8, 6000)));
        assert_eq!(table.for_stage(Stage::MaterialReadiness), None);
        assert_eq!(table.for_stage(Stage::Review).map(|s| s.max_tokens), Some(10000));
    }

    #[test]
    fn test_context_topic_precedence() {
        let channel = fixtures::channel();
        let task = fixtures::analysed_task();
        let params = StageParams {
            selected_topic: Some("From params".to_string()),
            ..Default::default()
        };
        let ctx = StageContext {
            task: &task,
            channel: &channel,
            params: &params,
            exemplars: &[],
            materials: &[],
        };
        assert_eq!(ctx.selected_topic().unwrap(), "From params");

        let empty = StageParams::default();
        let ctx = StageContext {
            params: &empty,
            ..ctx
        };
        assert!(matches!(
            ctx.selected_topic(),
            Err(OrchestratorError::Validation { field: "selected_topic", .. })
        ));
        assert_eq!(ctx.brief_analysis_text(), "1. Topic: classroom reading routines");
    }
}
