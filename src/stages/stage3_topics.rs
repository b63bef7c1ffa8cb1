use super::{generate, labelled_value, StageConfig, StageContext, StageOutcome};
use crate::error::Result;
use crate::llm::{build_topic_prompt, build_topic_system_prompt, TextBackend};
use crate::models::{StageOutput, TopicProposals};

/// Proposal titles in the order they appear
///
/// Reads `Title:` lines; when there are none, falls back to level 2 and 3
/// headings.
pub fn parse_titles(proposals: &str) -> Vec<String> {
    let clean = |s: &str| {
        s.trim()
            .trim_matches(|c: char| matches!(c, '*' | '"' | '“' | '”' | '《' | '》'))
            .trim()
            .to_string()
    };

    let titles: Vec<String> = proposals
        .lines()
        .filter_map(|line| labelled_value(line, "title"))
        .map(clean)
        .filter(|t| !t.is_empty())
        .collect();
    if !titles.is_empty() {
        return titles;
    }

    proposals
        .lines()
        .map(str::trim_start)
        .filter(|line| line.starts_with("## ") || line.starts_with("### "))
        .map(|line| clean(line.trim_start_matches('#')))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Execute Stage 3: topic proposals
pub async fn execute_stage3(
    backend: &dyn TextBackend,
    ctx: &StageContext<'_>,
    config: &StageConfig,
) -> Result<StageOutcome> {
    let proposals = generate(
        backend,
        config.generation.topic_proposals,
        build_topic_system_prompt(ctx.channel),
        build_topic_prompt(ctx.brief_analysis_text()),
    )
    .await?;
    let titles = parse_titles(&proposals);

    Ok(StageOutcome::new(
        StageOutput::TopicProposals(TopicProposals { proposals, titles }),
        format!(
            "Proposing topics for the '{}' channel...\nFocus: fit the channel voice, avoid filler, find a distinct angle",
            ctx.channel.name
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles_from_title_lines() {
        let text = "### Proposal 1\n1. Title: **Ten quiet minutes**\n2. Core idea: x\n\n### Proposal 2\n1. Title: \"Reading aloud at home\"\n";
        assert_eq!(
            parse_titles(text),
            vec!["Ten quiet minutes", "Reading aloud at home"]
        );
    }

    #[test]
    fn test_titles_fall_back_to_headings() {
        let text = "# Proposals\n## Ten quiet minutes\nbody\n### Reading aloud at home\n";
        assert_eq!(
            parse_titles(text),
            vec!["Ten quiet minutes", "Reading aloud at home"]
        );
    }
}
