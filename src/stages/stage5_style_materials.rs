use tracing::info;

use super::{StageConfig, StageContext, StageOutcome};
use crate::error::Result;
use crate::materials::classify_materials;
use crate::models::{StageOutput, StyleAndMaterials};
use crate::style::{match_style, merge_keywords, topic_keywords};

/// Execute Stage 5: style recommendation and material classification
///
/// Runs locally: the exemplars and material items in the context are the
/// channel's catalog, already scoped by the caller. No model call is made.
pub fn execute_stage5(ctx: &StageContext<'_>, config: &StageConfig) -> Result<StageOutcome> {
    let topic = ctx.selected_topic()?;
    let brief_keywords = ctx
        .task
        .brief_data
        .brief_analysis()
        .map(|o| o.keywords.clone())
        .unwrap_or_default();
    let keywords = merge_keywords([
        topic_keywords(&topic, &ctx.params.keywords).as_slice(),
        brief_keywords.as_slice(),
    ]);

    let style = match_style(ctx.exemplars, &keywords, &config.style);
    let materials = classify_materials(
        ctx.materials.to_vec(),
        config.noise_filter(),
        &config.materials,
    );

    info!(
        "Style match: {} exemplars ranked, recommended {:?}",
        style.ranked.len(),
        style.recommended_id
    );

    let think_aloud = format!(
        "Matching style exemplars and sorting material...\nKeywords: {}\nExemplars considered: {}\nMaterial kept: {} of {}",
        keywords.join(", "),
        style.ranked.len(),
        materials.len(),
        materials.report.input_count
    );

    Ok(StageOutcome::new(
        StageOutput::StyleAndMaterials(StyleAndMaterials { style, materials }),
        think_aloud,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::MaterialConfig;
    use crate::models::{MaterialItem, StageParams, StyleExemplar, StyleProfile};
    use crate::stages::{fixtures, GenerationTable};
    use crate::style::StyleWeights;
    use chrono::Utc;

    #[test]
    fn test_stage5_ranks_and_classifies() {
        let channel = fixtures::channel();
        let task = fixtures::analysed_task();
        let params = StageParams {
            selected_topic: Some("Ten quiet minutes of classroom reading".to_string()),
            ..Default::default()
        };
        let exemplars = vec![
            StyleExemplar {
                id: "e1".to_string(),
                channel_id: "deep_reading".to_string(),
                title: "Math games".to_string(),
                tags: vec!["math".to_string()],
                profile: StyleProfile::default(),
                body: String::new(),
                ingested_at: Utc::now(),
            },
            StyleExemplar {
                id: "e2".to_string(),
                channel_id: "deep_reading".to_string(),
                title: "Quiet reading".to_string(),
                tags: vec!["#reading".to_string()],
                profile: StyleProfile::default(),
                body: String::new(),
                ingested_at: Utc::now(),
            },
        ];
        let materials = vec![
            MaterialItem {
                id: "m1".to_string(),
                channel_id: None,
                kind: Default::default(),
                source: None,
                content: Some("A child asked to keep reading after the bell.".to_string()),
                tags: vec![],
                relevance: None,
                ingested_at: Utc::now(),
            },
            MaterialItem {
                id: "m2".to_string(),
                channel_id: None,
                kind: Default::default(),
                source: None,
                content: None,
                tags: vec![],
                relevance: None,
                ingested_at: Utc::now(),
            },
        ];
        let ctx = StageContext {
            task: &task,
            channel: &channel,
            params: &params,
            exemplars: &exemplars,
            materials: &materials,
        };
        let config = StageConfig::new(
            GenerationTable::default(),
            MaterialConfig::default(),
            StyleWeights::default(),
        )
        .unwrap();

        let outcome = execute_stage5(&ctx, &config).unwrap();
        let StageOutput::StyleAndMaterials(result) = outcome.output else {
            panic!("wrong output variant");
        };
        assert_eq!(result.style.recommended_id.as_deref(), Some("e2"));
        assert_eq!(result.style.ranked.len(), 2);
        assert!(result.style.keywords.contains(&"classroom".to_string()));
        assert_eq!(result.materials.fragments.len(), 1);
        assert_eq!(result.materials.report.malformed_dropped, 1);
    }
}
