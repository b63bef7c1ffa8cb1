use tracing::{info, warn};

use super::{generate, StageConfig, StageContext, StageOutcome};
use crate::error::Result;
use crate::llm::{build_drafting_prompt, build_drafting_system_prompt, TextBackend};
use crate::models::{Draft, StageOutput};

/// Execute Stage 7: first draft
///
/// Uses the channel persona and rules, the confirmed style profile (or the
/// recommended one), the author's material and the classified material cards.
pub async fn execute_stage7(
    backend: &dyn TextBackend,
    ctx: &StageContext<'_>,
    config: &StageConfig,
) -> Result<StageOutcome> {
    let topic = ctx.selected_topic()?;
    let brief_data = &ctx.task.brief_data;
    let style = brief_data.style_constraints();
    let classified = brief_data.style_and_materials().map(|o| &o.materials);

    let content = generate(
        backend,
        config.generation.drafting,
        build_drafting_system_prompt(ctx.channel),
        build_drafting_prompt(&topic, style, ctx.supplied_materials(), classified),
    )
    .await?;

    let forbidden_hits = ctx.channel.forbidden_hits(&content);
    if !forbidden_hits.is_empty() {
        warn!(
            "Task {}: draft contains forbidden phrases: {:?}",
            ctx.task.id, forbidden_hits
        );
    }
    info!("Draft: {} chars", content.chars().count());

    let think_aloud = format!(
        "Writing the first draft...\nChannel: {}\nPersonality: {}\nWeaving in the channel style and the real material...",
        ctx.channel.name,
        ctx.channel.brand_personality.as_deref().unwrap_or("-")
    );

    Ok(StageOutcome::new(
        StageOutput::Drafting(Draft {
            content,
            forbidden_hits,
        }),
        think_aloud,
    ))
}
