use tracing::info;

use super::{generate, labelled_value, StageConfig, StageContext, StageOutcome};
use crate::error::Result;
use crate::llm::{build_brief_analysis_prompt, TextBackend, BRIEF_ANALYSIS_PROMPT};
use crate::models::{BriefAnalysis, StageOutput};
use crate::style::normalize_term;

/// Pull the keyword list out of a brief analysis
///
/// Reads the first `Keywords:` line and splits it on commas, semicolons and
/// CJK list separators.
pub fn parse_keywords(analysis: &str) -> Vec<String> {
    let Some(line) = analysis
        .lines()
        .find_map(|line| labelled_value(line, "keywords"))
    else {
        return Vec::new();
    };

    let mut keywords: Vec<String> = Vec::new();
    for raw in line.split([',', ';', '，', '；', '、']) {
        let keyword = normalize_term(raw.trim_matches(|c: char| c == '*' || c == '"' || c == '.'));
        if !keyword.is_empty() && !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }
    keywords
}

/// Execute Stage 1: brief analysis
///
/// Extracts topic, audience, length, special requirements and keywords from
/// the raw brief.
pub async fn execute_stage1(
    backend: &dyn TextBackend,
    ctx: &StageContext<'_>,
    config: &StageConfig,
) -> Result<StageOutcome> {
    let brief = &ctx.task.brief_data.brief;
    let preview: String = brief.chars().take(100).collect();

    let analysis = generate(
        backend,
        config.generation.brief_analysis,
        BRIEF_ANALYSIS_PROMPT,
        build_brief_analysis_prompt(brief),
    )
    .await?;

    let keywords = parse_keywords(&analysis);
    info!("Brief analysis found {} keywords", keywords.len());

    Ok(StageOutcome::new(
        StageOutput::BriefAnalysis(BriefAnalysis { analysis, keywords }),
        format!("Analysing the request...\nInput: {}...", preview),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedBackend;
    use crate::materials::MaterialConfig;
    use crate::models::{StageParams, Task};
    use crate::stages::{fixtures, GenerationTable};
    use crate::style::StyleWeights;

    #[test]
    fn test_parse_keywords() {
        let analysis = "1. Topic: reading\n2. Target readers: parents\n5. **Keywords**: Classroom, reading routines; #habits、阅读";
        assert_eq!(
            parse_keywords(analysis),
            vec!["classroom", "reading routines", "habits", "阅读"]
        );
        assert!(parse_keywords("no keyword line").is_empty());
    }

    #[tokio::test]
    async fn test_stage1_sends_brief_with_analysis_settings() {
        let backend = ScriptedBackend::new();
        backend.push_text("1. Topic: routines\n5. Keywords: classroom, reading");
        let channel = fixtures::channel();
        let task = Task::new("deep_reading", "3000-word article on classroom reading routines");
        let params = StageParams::default();
        let ctx = StageContext {
            task: &task,
            channel: &channel,
            params: &params,
            exemplars: &[],
            materials: &[],
        };
        let config = StageConfig::new(
            GenerationTable::default(),
            MaterialConfig::default(),
            StyleWeights::default(),
        )
        .unwrap();

        let outcome = execute_stage1(&backend, &ctx, &config).await.unwrap();
        match outcome.output {
            StageOutput::BriefAnalysis(o) => assert_eq!(o.keywords, vec!["classroom", "reading"]),
            other => panic!("unexpected output {:?}", other),
        }

        let request = backend.last_request().unwrap();
        assert!(request.user.contains("classroom reading routines"));
        assert_eq!(request.temperature, 0.3);
    }
}
