use super::{StageContext, StageOutcome};
use crate::llm::READINESS_CHECKLIST;
use crate::models::{ReadinessChecklist, Stage, StageOutput};

/// Execute Stage 6: material readiness
///
/// Produces a fixed checklist; the author answers it at the checkpoint.
pub fn execute_stage6(ctx: &StageContext<'_>) -> StageOutcome {
    let mut checklist = READINESS_CHECKLIST.to_string();
    if let Some(open) = ctx
        .task
        .brief_data
        .output(Stage::Collaboration)
        .and_then(|output| match output {
            StageOutput::Collaboration(o) if !o.open_items.is_empty() => Some(&o.open_items),
            _ => None,
        })
    {
        checklist.push_str("\n\n## Still open from the collaboration checklist\n");
        for item in open {
            checklist.push_str(&format!("- [ ] {}\n", item));
        }
    }

    StageOutcome::new(
        StageOutput::MaterialReadiness(ReadinessChecklist { checklist }),
        "Waiting for the author to confirm that all required material is ready...",
    )
}
