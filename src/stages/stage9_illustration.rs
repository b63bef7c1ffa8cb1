use super::{generate, truncate_chars, StageConfig, StageContext, StageOutcome};
use crate::error::{OrchestratorError, Result};
use crate::llm::{build_illustration_prompt, TextBackend, ILLUSTRATION_PROMPT};
use crate::models::{IllustrationPlan, StageOutput};

/// Execute Stage 9: illustration plan for the final article
pub async fn execute_stage9(
    backend: &dyn TextBackend,
    ctx: &StageContext<'_>,
    config: &StageConfig,
) -> Result<StageOutcome> {
    let article = ctx
        .task
        .final_content
        .as_deref()
        .or(ctx.task.draft_content.as_deref())
        .ok_or_else(|| {
            OrchestratorError::validation("final_content", "no article to illustrate")
        })?;

    let mut excerpt = truncate_chars(article, config.illustration_excerpt_chars);
    if excerpt.len() < article.len() {
        excerpt.push_str("...");
    }

    let plan = generate(
        backend,
        config.generation.illustration,
        ILLUSTRATION_PROMPT,
        build_illustration_prompt(&excerpt),
    )
    .await?;

    Ok(StageOutcome::new(
        StageOutput::Illustration(IllustrationPlan { plan }),
        "Planning illustrations...",
    ))
}
