use super::{generate, StageConfig, StageContext, StageOutcome};
use crate::error::Result;
use crate::llm::{build_collaboration_prompt, TextBackend, COLLABORATION_PROMPT};
use crate::models::{CollaborationChecklist, StageOutput};

/// Unchecked `- [ ]` items of a markdown checklist
pub fn parse_open_items(checklist: &str) -> Vec<String> {
    checklist
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            line.strip_prefix("- [ ]")
                .or_else(|| line.strip_prefix("* [ ]"))
        })
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Execute Stage 4: collaboration checklist for the selected topic
pub async fn execute_stage4(
    backend: &dyn TextBackend,
    ctx: &StageContext<'_>,
    config: &StageConfig,
) -> Result<StageOutcome> {
    let topic = ctx.selected_topic()?;
    let checklist = generate(
        backend,
        config.generation.collaboration,
        COLLABORATION_PROMPT,
        build_collaboration_prompt(&topic),
    )
    .await?;
    let open_items = parse_open_items(&checklist);

    Ok(StageOutcome::new(
        StageOutput::Collaboration(CollaborationChecklist {
            checklist,
            open_items,
        }),
        "Building the collaboration checklist...",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_open_items() {
        let checklist = "## AI tasks\n- [ ] Outline\n- [x] Title\n## Provided by the author\n  * [ ] Real case: a morning circle\n- [ ]   \n";
        assert_eq!(
            parse_open_items(checklist),
            vec!["Outline", "Real case: a morning circle"]
        );
    }
}
