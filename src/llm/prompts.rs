use crate::models::{Channel, ClassifiedMaterials, StyleProfile};

/// S1 system prompt: requirement analysis
pub const BRIEF_ANALYSIS_PROMPT: &str = r#"You are a requirements analyst for a writing team. Read the author's request carefully and extract the key facts.

Output format:
1. Topic: ...
2. Target readers: ...
3. Expected length: ...
4. Special requirements: ...
5. Keywords: comma-separated list"#;

/// S2 system prompt: research planning
pub const RESEARCH_PROMPT: &str = r#"You are a research specialist. Based on the requirement analysis, list the facts that need to be researched before writing.

Rules:
- List only what genuinely needs research
- Never invent information
- Mark how authoritative each source must be

Output format:
Research needed:
1. ... (source: official documentation / academic paper / reputable media)
2. ...

Summary: one paragraph of at most 300 characters

If no extra research is needed, say why."#;

/// S4 system prompt: collaboration checklist
pub const COLLABORATION_PROMPT: &str = r#"You are a project manager. Create a collaboration checklist for the selected topic.

Output format:
## AI tasks
- [ ] task 1
- [ ] task 2

## Provided by the author
- [ ] Real case: ...
- [ ] Personal view: ...
- [ ] Supporting data: ...

## Notes
- Do not invent data
- Do not use filler phrases"#;

/// S6 checklist; no model call is made for this stage
pub const READINESS_CHECKLIST: &str = r#"## Readiness checklist

Confirm the following are ready:
- [ ] Real cases and experiences
- [ ] Personal views and stance
- [ ] Necessary supporting data
- [ ] Any other key information

Important:
- Never invent information
- Better to wait than to write blindly
- Every figure needs a source

Confirm once everything is in place to start drafting."#;

/// S9 system prompt: illustration plan
pub const ILLUSTRATION_PROMPT: &str = r#"You are an illustration planner. Suggest images for the article.

Output format:
## Illustration plan

### Image 1: title / position
- Description: ...
- Style: illustration / photo / chart
- Image generation prompt: ...

### Image 2: title / position
...

Notes:
- Images must relate to the content
- 5 to 8 images is ideal
- Give clear image generation prompts"#;

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_brief_analysis_prompt(brief: &str) -> String {
    format!("Analyse the following writing request:\n\n{}", brief)
}

pub fn build_research_prompt(brief_analysis: &str) -> String {
    format!(
        "Based on the following requirement analysis, list the information to research:\n\n{}",
        brief_analysis
    )
}

/// S3 system prompt, built from the channel persona
pub fn build_topic_system_prompt(channel: &Channel) -> String {
    let mut prompt = String::new();
    prompt.push_str(&channel.persona);
    prompt.push_str("\n\nPropose 3 to 4 topic directions for the request.\n\n");
    prompt.push_str("Each proposal contains:\n");
    prompt.push_str("1. Title: an engaging title without clickbait\n");
    prompt.push_str("2. Core idea\n");
    prompt.push_str("3. Outline (3 to 5 points)\n");
    prompt.push_str("4. Estimated effort (length, material needed)\n");
    prompt.push_str("5. Strengths and weaknesses\n");
    if !channel.style_rules.is_empty() {
        prompt.push_str("\nWriting style:\n");
        prompt.push_str(&bullet_list(&channel.style_rules));
        prompt.push('\n');
    }
    prompt
}

pub fn build_topic_prompt(brief_analysis: &str) -> String {
    format!(
        "Based on the following requirement analysis, propose 3 to 4 topic directions:\n\n{}",
        brief_analysis
    )
}

pub fn build_collaboration_prompt(selected_topic: &str) -> String {
    format!(
        "Create a collaboration checklist for the following topic:\n\n{}",
        selected_topic
    )
}

/// S7 system prompt: persona, channel rules, forbidden phrases
pub fn build_drafting_system_prompt(channel: &Channel) -> String {
    let mut prompt = String::new();
    prompt.push_str(&channel.persona);
    prompt.push_str("\n\n");

    if !channel.style_rules.is_empty() {
        prompt.push_str("## Writing style\n");
        prompt.push_str(&bullet_list(&channel.style_rules));
        prompt.push_str("\n\n");
    }

    if !channel.must_do.is_empty() || !channel.must_not_do.is_empty() {
        prompt.push_str("## Channel rules\n");
        if !channel.must_do.is_empty() {
            prompt.push_str("Always:\n");
            prompt.push_str(&bullet_list(&channel.must_do));
            prompt.push('\n');
        }
        if !channel.must_not_do.is_empty() {
            prompt.push_str("Never:\n");
            prompt.push_str(&bullet_list(&channel.must_not_do));
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    if !channel.forbidden_phrases.is_empty() {
        prompt.push_str("## Forbidden phrases\n");
        prompt.push_str("Never use any of these expressions:\n");
        prompt.push_str(&channel.forbidden_phrases.join(", "));
        prompt.push_str("\n\n");
    }

    prompt.push_str("## Requirements\n");
    prompt.push_str("1. Weave in real observations and cases\n");
    prompt.push_str("2. Show a personal stance and warmth\n");
    prompt.push_str("3. Avoid empty filler\n");
    prompt.push_str("4. Keep paragraphs moderate (150 to 200 characters)\n");
    prompt.push_str("5. Avoid sentences longer than 40 characters\n");
    prompt
}

/// S7 user prompt: topic, style constraints and material
pub fn build_drafting_prompt(
    selected_topic: &str,
    style: Option<&StyleProfile>,
    supplied_materials: Option<&str>,
    classified: Option<&ClassifiedMaterials>,
) -> String {
    let mut prompt = String::new();
    prompt.push_str("Write the first draft of the article.\n\n");
    prompt.push_str(&format!("## Topic\n{}\n\n", selected_topic));

    prompt.push_str("## Style guide\n");
    match style {
        Some(profile) => prompt.push_str(&profile.to_prompt_lines()),
        None => prompt.push_str("Follow the channel writing style.\n"),
    }
    prompt.push('\n');

    prompt.push_str("## Available material\n");
    if let Some(materials) = supplied_materials {
        prompt.push_str(materials);
        prompt.push_str("\n\n");
    }
    if let Some(classified) = classified {
        for card in classified.long_form.iter().chain(classified.fragments.iter()) {
            match &card.source {
                Some(source) => prompt.push_str(&format!("- [{}] {}\n", source, card.summary)),
                None => prompt.push_str(&format!("- {}\n", card.summary)),
            }
        }
    }
    if supplied_materials.is_none() && classified.is_none_or(|c| c.is_empty()) {
        prompt.push_str("(none)\n");
    }

    prompt.push_str("\nStart writing and output only the article.\n");
    prompt
}

/// S8 system prompt: three-pass review
pub fn build_review_system_prompt(channel: &Channel) -> String {
    let mut prompt = String::new();
    prompt.push_str("You are a professional editor. Review the article in three passes.\n\n");
    prompt.push_str("## Pass 1: content\n");
    prompt.push_str("- Factual accuracy\n- Logical clarity\n- Strength of argument\n- Any invented content\n\n");

    prompt.push_str("## Pass 2: style\n");
    if let Some(personality) = &channel.brand_personality {
        prompt.push_str(&format!("Channel personality: {}\n", personality));
    }
    if !channel.forbidden_phrases.is_empty() {
        prompt.push_str(&format!(
            "Forbidden phrases (remove every occurrence): {}\n",
            channel.forbidden_phrases.join(", ")
        ));
    }
    prompt.push('\n');

    prompt.push_str("## Pass 3: polish\n");
    prompt.push_str("- Split sentences over 40 characters\n- Paragraphs under 200 characters\n- Punctuation\n- Natural tone\n\n");

    prompt.push_str("Output format:\n");
    prompt.push_str("## Review report\n\n### Issues found\n1. [content] ...\n2. [style] ...\n3. [detail] ...\n\n");
    prompt.push_str("### Suggestions\n...\n\n");
    prompt.push_str("### Revised version\n(the complete revised article)\n");
    prompt
}

pub fn build_review_prompt(draft: &str) -> String {
    format!("Review the following article in three passes:\n\n{}", draft)
}

pub fn build_illustration_prompt(article_excerpt: &str) -> String {
    format!(
        "Suggest illustrations for the following article:\n\n{}",
        article_excerpt
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MaterialCard;

    fn channel() -> Channel {
        Channel {
            id: "deep_reading".to_string(),
            name: "Deep Reading".to_string(),
            persona: "You are a patient primary-school reading teacher.".to_string(),
            target_audience: Some("parents".to_string()),
            brand_personality: Some("warm, practical".to_string()),
            style_rules: vec!["Short paragraphs".to_string()],
            must_do: vec!["Cite a real classroom moment".to_string()],
            must_not_do: vec![],
            forbidden_phrases: vec!["In today's fast-paced world".to_string()],
            tag_vocabulary: vec![],
        }
    }

    #[test]
    fn test_drafting_system_prompt_carries_channel_rules() {
        let prompt = build_drafting_system_prompt(&channel());
        assert!(prompt.starts_with("You are a patient"));
        assert!(prompt.contains("- Short paragraphs"));
        assert!(prompt.contains("Always:\n- Cite a real classroom moment"));
        assert!(!prompt.contains("Never:"));
        assert!(prompt.contains("In today's fast-paced world"));
    }

    #[test]
    fn test_drafting_prompt_lists_material_summaries() {
        let classified = ClassifiedMaterials {
            fragments: vec![MaterialCard {
                id: "m1".to_string(),
                kind: Default::default(),
                source: Some("parent chat".to_string()),
                content: "He asked for another story.".to_string(),
                content_length: 27,
                summary: "He asked for another story.".to_string(),
                tags: vec![],
            }],
            ..Default::default()
        };
        let prompt = build_drafting_prompt("Bedtime reading", None, None, Some(&classified));
        assert!(prompt.contains("## Topic\nBedtime reading"));
        assert!(prompt.contains("- [parent chat] He asked for another story."));
        assert!(!prompt.contains("(none)"));
    }

    #[test]
    fn test_drafting_prompt_without_material() {
        let prompt = build_drafting_prompt("Bedtime reading", None, None, None);
        assert!(prompt.contains("(none)"));
    }

    #[test]
    fn test_review_prompt_asks_for_revised_version() {
        let prompt = build_review_system_prompt(&channel());
        assert!(prompt.contains("### Revised version"));
        assert!(prompt.contains("warm, practical"));
    }
}
