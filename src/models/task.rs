use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    BriefAnalysis, ConfirmationRecord, Draft, ResearchNotes, ReviewResult, Stage, StageOutput,
    StageRecord, StyleAndMaterials, StyleProfile,
};

/// Lifecycle status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, stage 1 not yet run
    Draft,
    /// Ready for (or running) the current stage
    Processing,
    /// Suspended at a checkpoint
    AwaitingConfirmation,
    Completed,
    Aborted,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Aborted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Draft => "draft",
            TaskStatus::Processing => "processing",
            TaskStatus::AwaitingConfirmation => "awaiting_confirmation",
            TaskStatus::Completed => "completed",
            TaskStatus::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(TaskStatus::Draft),
            "processing" => Ok(TaskStatus::Processing),
            "awaiting_confirmation" => Ok(TaskStatus::AwaitingConfirmation),
            "completed" => Ok(TaskStatus::Completed),
            "aborted" => Ok(TaskStatus::Aborted),
            other => Err(format!("unknown task status: {}", other)),
        }
    }
}

/// One think-aloud log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThinkAloudEntry {
    pub stage: Stage,
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

/// Per-stage outputs and confirmations, keyed by stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BriefData {
    /// The author's original request
    pub brief: String,
    #[serde(default)]
    pub stages: BTreeMap<Stage, StageRecord>,
}

impl BriefData {
    pub fn new(brief: impl Into<String>) -> Self {
        Self {
            brief: brief.into(),
            stages: BTreeMap::new(),
        }
    }

    pub fn record(&self, stage: Stage) -> Option<&StageRecord> {
        self.stages.get(&stage)
    }

    pub fn output(&self, stage: Stage) -> Option<&StageOutput> {
        self.record(stage).map(|r| &r.output)
    }

    pub fn confirmation(&self, stage: Stage) -> Option<&ConfirmationRecord> {
        self.record(stage).and_then(|r| r.confirmation.as_ref())
    }

    pub fn brief_analysis(&self) -> Option<&BriefAnalysis> {
        match self.output(Stage::BriefAnalysis)? {
            StageOutput::BriefAnalysis(o) => Some(o),
            _ => None,
        }
    }

    pub fn research(&self) -> Option<&ResearchNotes> {
        match self.output(Stage::Research)? {
            StageOutput::Research(o) => Some(o),
            _ => None,
        }
    }

    pub fn style_and_materials(&self) -> Option<&StyleAndMaterials> {
        match self.output(Stage::StyleAndMaterials)? {
            StageOutput::StyleAndMaterials(o) => Some(o),
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<&Draft> {
        match self.output(Stage::Drafting)? {
            StageOutput::Drafting(o) => Some(o),
            _ => None,
        }
    }

    pub fn review(&self) -> Option<&ReviewResult> {
        match self.output(Stage::Review)? {
            StageOutput::Review(o) => Some(o),
            _ => None,
        }
    }

    /// Topic confirmed at the topic checkpoint
    pub fn selected_topic(&self) -> Option<&str> {
        self.stages.values().find_map(|r| match &r.confirmation {
            Some(ConfirmationRecord::TopicSelection { selected_topic }) => {
                Some(selected_topic.as_str())
            }
            _ => None,
        })
    }

    /// Material text supplied at the readiness checkpoint
    pub fn supplied_materials(&self) -> Option<&str> {
        self.stages.values().find_map(|r| match &r.confirmation {
            Some(ConfirmationRecord::MaterialReadiness { materials }) => Some(materials.as_str()),
            _ => None,
        })
    }

    /// Style constraints for drafting
    ///
    /// A confirmed (possibly hand-edited) profile wins over the matcher's
    /// recommendation.
    pub fn style_constraints(&self) -> Option<&StyleProfile> {
        let confirmed = self.stages.values().find_map(|r| match &r.confirmation {
            Some(ConfirmationRecord::StyleProfile { profile, .. }) => Some(profile),
            _ => None,
        });
        confirmed.or_else(|| {
            self.style_and_materials()
                .and_then(|o| o.style.recommended_profile.as_ref())
        })
    }
}

/// The persisted unit of work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub current_step: Stage,
    pub status: TaskStatus,
    pub brief_data: BriefData,
    #[serde(default)]
    pub research_summary: Option<String>,
    #[serde(default)]
    pub draft_content: Option<String>,
    #[serde(default)]
    pub final_content: Option<String>,
    #[serde(default)]
    pub think_aloud: Vec<ThinkAloudEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Incremented on every save; used for optimistic concurrency
    #[serde(default)]
    pub version: u64,
}

impl Task {
    /// New task at stage 1 with status `draft`
    pub fn new(channel_id: impl Into<String>, brief: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            channel_id: channel_id.into(),
            title: None,
            current_step: Stage::FIRST,
            status: TaskStatus::Draft,
            brief_data: BriefData::new(brief),
            research_summary: None,
            draft_content: None,
            final_content: None,
            think_aloud: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
            version: 0,
        }
    }

    pub fn log_thought(&mut self, stage: Stage, text: impl Into<String>) {
        self.think_aloud.push(ThinkAloudEntry {
            stage,
            timestamp: Utc::now(),
            text: text.into(),
        });
    }

    /// Check the resumability contract
    ///
    /// Every stage before `current_step` must have an output, and so must the
    /// current stage while the task waits at its checkpoint. Stages after
    /// `current_step` must have none.
    pub fn check_consistency(&self) -> Result<(), String> {
        for stage in Stage::ALL {
            let has_output = self.brief_data.record(stage).is_some();
            let must_have = stage < self.current_step
                || (stage == self.current_step
                    && matches!(
                        self.status,
                        TaskStatus::AwaitingConfirmation | TaskStatus::Completed
                    ));
            if must_have && !has_output {
                return Err(format!("missing output for {}", stage));
            }
            if stage > self.current_step && has_output {
                return Err(format!("output recorded ahead of current step for {}", stage));
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id.clone(),
            channel_id: self.channel_id.clone(),
            title: self.title.clone(),
            current_step: self.current_step,
            status: self.status,
            brief: self.brief_data.brief.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Light view of a task for listings and change notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: String,
    pub channel_id: String,
    pub title: Option<String>,
    pub current_step: Stage,
    pub status: TaskStatus,
    pub brief: String,
    pub updated_at: DateTime<Utc>,
}
