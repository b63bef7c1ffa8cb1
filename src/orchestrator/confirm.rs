use chrono::Utc;

use crate::error::{OrchestratorError, Result};
use crate::models::{ConfirmationPayload, ConfirmationRecord, Stage, Task};

fn required_text(value: Option<&String>, field: &'static str, message: &str) -> Result<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| OrchestratorError::validation(field, message))
}

/// Check a confirmation payload for the checkpoint at `stage`
///
/// Runs before anything is written. Returns the record to store, or a
/// validation error naming the missing field.
pub fn validate_confirmation(
    task: &Task,
    stage: Stage,
    payload: &ConfirmationPayload,
) -> Result<ConfirmationRecord> {
    match stage {
        Stage::Research => Ok(ConfirmationRecord::ResearchReview {
            research_summary: required_text(
                payload.research_summary.as_ref(),
                "research_summary",
                "the reviewed research summary is required",
            )?,
        }),
        Stage::TopicProposals => Ok(ConfirmationRecord::TopicSelection {
            selected_topic: required_text(
                payload.selected_topic.as_ref(),
                "selected_topic",
                "choose one of the proposed topics or supply your own",
            )?,
        }),
        Stage::StyleAndMaterials => {
            if let Some(profile) = &payload.style_profile {
                return Ok(ConfirmationRecord::StyleProfile {
                    profile: profile.clone(),
                    edited: true,
                });
            }
            task.brief_data
                .style_and_materials()
                .and_then(|o| o.style.recommended_profile.clone())
                .map(|profile| ConfirmationRecord::StyleProfile {
                    profile,
                    edited: false,
                })
                .ok_or_else(|| {
                    OrchestratorError::validation(
                        "style_profile",
                        "no exemplar was recommended; supply a style profile",
                    )
                })
        }
        Stage::MaterialReadiness => Ok(ConfirmationRecord::MaterialReadiness {
            materials: required_text(
                payload.materials.as_ref(),
                "materials",
                "supply the real cases, views and data the draft should use",
            )?,
        }),
        _ => Ok(ConfirmationRecord::Acknowledged),
    }
}

/// Store a validated confirmation on the task
///
/// Does not change status or step; the caller advances the task.
pub fn apply_confirmation(
    task: &mut Task,
    stage: Stage,
    record: ConfirmationRecord,
    note: Option<String>,
) -> Result<()> {
    match &record {
        ConfirmationRecord::ResearchReview { research_summary } => {
            task.research_summary = Some(research_summary.clone());
        }
        ConfirmationRecord::TopicSelection { selected_topic } => {
            task.title = Some(selected_topic.clone());
        }
        _ => {}
    }

    let entry = task.brief_data.stages.get_mut(&stage).ok_or_else(|| {
        OrchestratorError::CorruptState {
            task_id: task.id.clone(),
            detail: format!("awaiting confirmation of {} but no output recorded", stage),
        }
    })?;
    entry.confirmation = Some(record);
    entry.note = note.filter(|n| !n.trim().is_empty());
    entry.confirmed_at = Some(Utc::now());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        StageOutput, StageRecord, StyleAndMaterials, StyleMatch, StyleProfile, Tone,
    };

    fn task_with_style(recommended: Option<StyleProfile>) -> Task {
        let mut task = Task::new("c", "brief");
        task.brief_data.stages.insert(
            Stage::StyleAndMaterials,
            StageRecord {
                output: StageOutput::StyleAndMaterials(StyleAndMaterials {
                    style: StyleMatch {
                        recommended_profile: recommended,
                        ..Default::default()
                    },
                    materials: Default::default(),
                }),
                confirmation: None,
                note: None,
                executed_at: Utc::now(),
                confirmed_at: None,
            },
        );
        task
    }

    #[test]
    fn test_required_fields() {
        let task = Task::new("c", "brief");
        let empty = ConfirmationPayload::default();

        for (stage, field) in [
            (Stage::Research, "research_summary"),
            (Stage::TopicProposals, "selected_topic"),
            (Stage::MaterialReadiness, "materials"),
        ] {
            match validate_confirmation(&task, stage, &empty) {
                Err(OrchestratorError::Validation { field: f, .. }) => assert_eq!(f, field),
                other => panic!("expected validation error for {}, got {:?}", stage, other),
            }
        }

        let blank = ConfirmationPayload {
            selected_topic: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(validate_confirmation(&task, Stage::TopicProposals, &blank).is_err());

        assert_eq!(
            validate_confirmation(&task, Stage::Collaboration, &empty).unwrap(),
            ConfirmationRecord::Acknowledged
        );
    }

    #[test]
    fn test_style_defaults_to_recommendation() {
        let recommended = StyleProfile {
            tone: Tone {
                kind: "warm_friend".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let task = task_with_style(Some(recommended.clone()));
        let record =
            validate_confirmation(&task, Stage::StyleAndMaterials, &ConfirmationPayload::default())
                .unwrap();
        assert_eq!(
            record,
            ConfirmationRecord::StyleProfile {
                profile: recommended,
                edited: false
            }
        );

        let task = task_with_style(None);
        assert!(matches!(
            validate_confirmation(&task, Stage::StyleAndMaterials, &ConfirmationPayload::default()),
            Err(OrchestratorError::Validation { field: "style_profile", .. })
        ));
    }

    #[test]
    fn test_apply_sets_title_and_record() {
        let mut task = task_with_style(None);
        let record = task.brief_data.stages[&Stage::StyleAndMaterials].clone();
        task.brief_data.stages.insert(Stage::TopicProposals, record);
        apply_confirmation(
            &mut task,
            Stage::TopicProposals,
            ConfirmationRecord::TopicSelection {
                selected_topic: "Ten quiet minutes".to_string(),
            },
            Some("  ".to_string()),
        )
        .unwrap();

        assert_eq!(task.title.as_deref(), Some("Ten quiet minutes"));
        assert_eq!(task.brief_data.selected_topic(), Some("Ten quiet minutes"));
        let record = task.brief_data.record(Stage::TopicProposals).unwrap();
        assert!(record.confirmed_at.is_some());
        assert!(record.note.is_none());

        assert!(matches!(
            apply_confirmation(&mut task, Stage::Drafting, ConfirmationRecord::Acknowledged, None),
            Err(OrchestratorError::CorruptState { .. })
        ));
    }
}
