use super::{generate, labelled_value, section_after, truncate_chars, StageConfig, StageContext, StageOutcome};
use crate::error::Result;
use crate::llm::{build_research_prompt, TextBackend, RESEARCH_PROMPT};
use crate::models::{ResearchNotes, StageOutput};

/// Longest research summary kept on the task
pub const RESEARCH_SUMMARY_CHARS: usize = 300;

/// Short summary of a research report
///
/// Prefers a `Summary:` line, then a `## Summary` section, then the head of
/// the report. Always at most `RESEARCH_SUMMARY_CHARS` characters.
pub fn parse_summary(report: &str) -> String {
    let summary = report
        .lines()
        .find_map(|line| labelled_value(line, "summary"))
        .map(str::to_string)
        .or_else(|| section_after(report, "summary"))
        .unwrap_or_else(|| report.trim().to_string());
    truncate_chars(&summary, RESEARCH_SUMMARY_CHARS)
}

/// Execute Stage 2: research
pub async fn execute_stage2(
    backend: &dyn TextBackend,
    ctx: &StageContext<'_>,
    config: &StageConfig,
) -> Result<StageOutcome> {
    let report = generate(
        backend,
        config.generation.research,
        RESEARCH_PROMPT,
        build_research_prompt(ctx.brief_analysis_text()),
    )
    .await?;
    let summary = parse_summary(&report);

    Ok(StageOutcome::new(
        StageOutput::Research(ResearchNotes { report, summary }),
        "Working out what needs to be researched...",
    ))
}
