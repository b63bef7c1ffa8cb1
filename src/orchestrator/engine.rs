use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{
    apply_confirmation, validate_confirmation, CheckpointTable, TaskEvent, TaskEventKind,
    TaskLocks, TaskNotifier,
};
use crate::error::{OrchestratorError, Result, StoreError};
use crate::llm::{TextBackend, TimeoutBackend};
use crate::models::{
    ConfirmationPayload, Stage, StageOutput, StageParams, StageRecord, Task, TaskStatus,
    TaskSummary,
};
use crate::stages::{execute_stage, StageConfig, StageContext, StageOutcome};
use crate::store::{Catalog, TaskStore};

/// Attempts an abort makes against concurrent writers before giving up
const ABORT_ATTEMPTS: usize = 5;

/// Construction-time settings of an `Orchestrator`
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub checkpoints: CheckpointTable,
    /// Limit on each backend call
    pub backend_timeout: Duration,
    pub stages: StageConfig,
}

/// Result of one successful stage execution
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub task_id: String,
    pub stage: Stage,
    pub output: StageOutput,
    /// The task now waits for `Confirm`
    pub is_checkpoint: bool,
    /// Stage the caller should execute next; `None` when waiting or complete
    pub next_stage: Option<Stage>,
    pub status: TaskStatus,
}

/// Result of `create_task`
///
/// The task exists once this is returned, even if stage 1 failed; stage 1
/// can then be retried with `execute_stage`.
#[derive(Debug)]
pub struct CreatedTask {
    pub task_id: String,
    pub stage_one: Result<StageReport>,
}

/// The task state machine
///
/// Holds no task state between calls: every operation loads the task, works
/// on a copy and saves it with a version check. Execute and confirm calls for
/// the same task are serialized; abort is not, and relies on the version
/// check instead so it never waits behind a slow backend call.
pub struct Orchestrator {
    tasks: Arc<dyn TaskStore>,
    catalog: Arc<dyn Catalog>,
    backend: TimeoutBackend,
    checkpoints: CheckpointTable,
    stages: StageConfig,
    notifier: Option<Arc<dyn TaskNotifier>>,
    locks: TaskLocks,
}

impl Orchestrator {
    pub fn new(
        tasks: Arc<dyn TaskStore>,
        catalog: Arc<dyn Catalog>,
        backend: Arc<dyn TextBackend>,
        settings: EngineSettings,
    ) -> Self {
        info!(
            "Orchestrator ready: checkpoints {}, backend timeout {:?}",
            settings.checkpoints, settings.backend_timeout
        );
        Self {
            tasks,
            catalog,
            backend: TimeoutBackend::new(backend, settings.backend_timeout),
            checkpoints: settings.checkpoints,
            stages: settings.stages,
            notifier: None,
            locks: TaskLocks::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn TaskNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn checkpoints(&self) -> &CheckpointTable {
        &self.checkpoints
    }

    /// Create a task at stage 1 and run stage 1 right away
    pub async fn create_task(&self, channel_id: &str, brief: &str) -> Result<CreatedTask> {
        let brief = brief.trim();
        if brief.is_empty() {
            return Err(OrchestratorError::validation("brief", "the brief is empty"));
        }
        if self.catalog.find_channel(channel_id).await?.is_none() {
            return Err(OrchestratorError::not_found("channel", channel_id));
        }

        let task = self.save(Task::new(channel_id, brief)).await?;
        info!("Created task {} in channel {}", task.id, channel_id);
        self.publish(TaskEventKind::Created, &task).await;

        let stage_one = self
            .execute_stage(&task.id, Stage::FIRST, StageParams::default())
            .await;
        if let Err(e) = &stage_one {
            warn!("Task {}: stage 1 failed, task left at draft: {}", task.id, e);
        }

        Ok(CreatedTask {
            task_id: task.id,
            stage_one,
        })
    }

    /// Run `stage` for the task
    ///
    /// `stage` must equal the task's current step. On any failure before the
    /// final save the stored task is left exactly as it was.
    pub async fn execute_stage(
        &self,
        task_id: &str,
        stage: Stage,
        params: StageParams,
    ) -> Result<StageReport> {
        let _guard = self.locks.acquire(task_id).await;
        let task = self.load(task_id).await?;

        match task.status {
            TaskStatus::Draft | TaskStatus::Processing => {}
            status => {
                return Err(OrchestratorError::InvalidState {
                    task_id: task.id,
                    status,
                    operation: "execute_stage",
                });
            }
        }
        if stage != task.current_step {
            return Err(OrchestratorError::invalid_stage(stage, task.current_step));
        }
        task.check_consistency()
            .map_err(|detail| OrchestratorError::CorruptState {
                task_id: task.id.clone(),
                detail,
            })?;

        let channel = self
            .catalog
            .find_channel(&task.channel_id)
            .await?
            .ok_or_else(|| OrchestratorError::not_found("channel", &task.channel_id))?;
        let (exemplars, materials) = if stage == Stage::StyleAndMaterials {
            (
                self.catalog.exemplars(&channel.id).await?,
                self.catalog.materials(&channel.id).await?,
            )
        } else {
            (Vec::new(), Vec::new())
        };

        let ctx = StageContext {
            task: &task,
            channel: &channel,
            params: &params,
            exemplars: &exemplars,
            materials: &materials,
        };
        let outcome = match execute_stage(stage, &self.backend, &ctx, &self.stages).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Task {}: {} failed: {}", task.id, stage, e);
                return Err(e);
            }
        };

        let is_checkpoint = self.checkpoints.is_checkpoint(stage);
        let mut updated = task.clone();
        let next_stage = commit_outcome(&mut updated, stage, outcome, is_checkpoint)?;

        let saved = match self.save(updated).await {
            Ok(saved) => saved,
            Err(e) => return Err(self.explain_failed_save(task_id, "execute_stage", e).await),
        };

        let event = match saved.status {
            TaskStatus::AwaitingConfirmation => {
                info!("Task {}: checkpoint reached at {}", saved.id, stage);
                TaskEventKind::AwaitingConfirmation { stage }
            }
            TaskStatus::Completed => {
                info!("Task {}: completed", saved.id);
                TaskEventKind::Completed
            }
            _ => TaskEventKind::StageCompleted { stage },
        };
        self.publish(event, &saved).await;

        let output = saved
            .brief_data
            .output(stage)
            .cloned()
            .ok_or_else(|| OrchestratorError::CorruptState {
                task_id: saved.id.clone(),
                detail: format!("output of {} missing after save", stage),
            })?;

        Ok(StageReport {
            task_id: saved.id,
            stage,
            output,
            is_checkpoint,
            next_stage,
            status: saved.status,
        })
    }

    /// Run whatever stage the task is currently at
    pub async fn execute_next(&self, task_id: &str, params: StageParams) -> Result<StageReport> {
        let task = self.load(task_id).await?;
        self.execute_stage(task_id, task.current_step, params).await
    }

    /// Supply the author's input for the checkpoint the task is waiting at
    ///
    /// The payload is validated before anything changes. A confirmed
    /// checkpoint is complete, so the task moves on to the following stage.
    pub async fn confirm(&self, task_id: &str, payload: ConfirmationPayload) -> Result<Task> {
        let _guard = self.locks.acquire(task_id).await;
        let mut task = self.load(task_id).await?;

        if task.status != TaskStatus::AwaitingConfirmation {
            return Err(OrchestratorError::InvalidState {
                task_id: task.id,
                status: task.status,
                operation: "confirm",
            });
        }

        let stage = task.current_step;
        let record = validate_confirmation(&task, stage, &payload)?;
        apply_confirmation(&mut task, stage, record, payload.note)?;
        task.log_thought(stage, format!("Author confirmed {}", stage));
        advance(&mut task, stage);

        let saved = match self.save(task).await {
            Ok(saved) => saved,
            Err(e) => return Err(self.explain_failed_save(task_id, "confirm", e).await),
        };
        info!(
            "Task {}: {} confirmed, now at {} ({})",
            saved.id, stage, saved.current_step, saved.status
        );
        self.publish(TaskEventKind::Confirmed { stage }, &saved).await;
        Ok(saved)
    }

    /// Mark the task aborted, keeping every output
    ///
    /// Does not wait for an in-flight stage; that stage's result is discarded
    /// when it tries to commit.
    pub async fn abort(&self, task_id: &str) -> Result<Task> {
        for attempt in 1..=ABORT_ATTEMPTS {
            let mut task = self.load(task_id).await?;
            match task.status {
                TaskStatus::Aborted => return Ok(task),
                TaskStatus::Completed => {
                    return Err(OrchestratorError::InvalidState {
                        task_id: task.id,
                        status: task.status,
                        operation: "abort",
                    });
                }
                _ => {}
            }

            task.status = TaskStatus::Aborted;
            task.updated_at = Utc::now();
            match self.tasks.save_task(&task).await {
                Ok(version) => {
                    task.version = version;
                    info!("Task {}: aborted at {}", task.id, task.current_step);
                    self.publish(TaskEventKind::Aborted, &task).await;
                    return Ok(task);
                }
                Err(StoreError::VersionConflict { .. }) => {
                    debug!("Task {}: abort attempt {} raced a write", task_id, attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(OrchestratorError::Conflict {
            task_id: task_id.to_string(),
        })
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task> {
        self.load(task_id).await
    }

    /// Task summaries newest first
    pub async fn list_tasks(
        &self,
        channel_id: Option<&str>,
        status: Option<TaskStatus>,
    ) -> Result<Vec<TaskSummary>> {
        let tasks = self.tasks.list_tasks(channel_id).await?;
        Ok(tasks
            .iter()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .map(Task::summary)
            .collect())
    }

    async fn load(&self, task_id: &str) -> Result<Task> {
        self.tasks
            .find_task(task_id)
            .await?
            .ok_or_else(|| OrchestratorError::not_found("task", task_id))
    }

    async fn save(&self, mut task: Task) -> Result<Task> {
        task.updated_at = Utc::now();
        task.version = self.tasks.save_task(&task).await?;
        Ok(task)
    }

    /// Turn a lost version race into the error the caller should see
    async fn explain_failed_save(
        &self,
        task_id: &str,
        operation: &'static str,
        err: OrchestratorError,
    ) -> OrchestratorError {
        if !matches!(err, OrchestratorError::Conflict { .. }) {
            warn!("Task {}: {} not saved: {}", task_id, operation, err);
            return err;
        }
        match self.tasks.find_task(task_id).await {
            Ok(Some(current)) if current.status == TaskStatus::Aborted => {
                warn!(
                    "Task {}: aborted while {} was running, discarding its result",
                    task_id, operation
                );
                OrchestratorError::InvalidState {
                    task_id: task_id.to_string(),
                    status: TaskStatus::Aborted,
                    operation,
                }
            }
            _ => err,
        }
    }

    async fn publish(&self, event: TaskEventKind, task: &Task) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let event = TaskEvent {
            event,
            task: task.summary(),
        };
        if let Err(e) = notifier.notify(&event).await {
            warn!("Task {}: {}", task.id, e);
        }
    }
}

/// Move the task past `stage`: to the next stage, or to completion
fn advance(task: &mut Task, stage: Stage) -> Option<Stage> {
    match stage.next() {
        Some(next) => {
            task.current_step = next;
            task.status = TaskStatus::Processing;
            Some(next)
        }
        None => {
            task.status = TaskStatus::Completed;
            task.completed_at = Some(Utc::now());
            None
        }
    }
}

/// Merge a stage outcome into the task and decide checkpoint or advance
///
/// The output must be the variant `stage` produces.
fn commit_outcome(
    task: &mut Task,
    stage: Stage,
    outcome: StageOutcome,
    is_checkpoint: bool,
) -> Result<Option<Stage>> {
    let produced = outcome.output.stage();
    if produced != stage {
        return Err(OrchestratorError::CorruptState {
            task_id: task.id.clone(),
            detail: format!("{} returned the output of {}", stage, produced),
        });
    }

    outcome.apply_to(task);
    task.log_thought(stage, outcome.think_aloud);
    task.brief_data.stages.insert(
        stage,
        StageRecord {
            output: outcome.output,
            confirmation: None,
            note: None,
            executed_at: Utc::now(),
            confirmed_at: None,
        },
    );

    if is_checkpoint {
        task.status = TaskStatus::AwaitingConfirmation;
        Ok(None)
    } else {
        Ok(advance(task, stage))
    }
}
