use tracing::{info, warn};

use super::{generate, section_after, StageConfig, StageContext, StageOutcome};
use crate::error::{OrchestratorError, Result};
use crate::llm::{build_review_prompt, build_review_system_prompt, TextBackend};
use crate::models::{ReviewResult, StageOutput};

/// The revised article inside a review report
///
/// Falls back to the whole report when no "Revised version" section exists.
pub fn extract_revised(report: &str) -> String {
    section_after(report, "revised version")
        .or_else(|| section_after(report, "revised article"))
        .unwrap_or_else(|| report.trim().to_string())
}

/// Execute Stage 8: three-pass review of the draft
pub async fn execute_stage8(
    backend: &dyn TextBackend,
    ctx: &StageContext<'_>,
    config: &StageConfig,
) -> Result<StageOutcome> {
    let draft = ctx
        .task
        .draft_content
        .as_deref()
        .or_else(|| ctx.task.brief_data.draft().map(|d| d.content.as_str()))
        .ok_or_else(|| OrchestratorError::validation("draft_content", "no draft to review"))?;

    let report = generate(
        backend,
        config.generation.review,
        build_review_system_prompt(ctx.channel),
        build_review_prompt(draft),
    )
    .await?;

    let final_content = extract_revised(&report);
    let forbidden_hits = ctx.channel.forbidden_hits(&final_content);
    if !forbidden_hits.is_empty() {
        warn!(
            "Task {}: reviewed article still contains forbidden phrases: {:?}",
            ctx.task.id, forbidden_hits
        );
    }
    info!("Review: final article {} chars", final_content.chars().count());

    Ok(StageOutcome::new(
        StageOutput::Review(ReviewResult {
            report,
            final_content,
            forbidden_hits,
        }),
        "Reviewing in three passes...\nPass 1: content\nPass 2: style\nPass 3: polish",
    ))
}
