use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::NotifyError;
use crate::models::{Stage, TaskSummary};

/// What happened to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskEventKind {
    Created,
    StageCompleted { stage: Stage },
    AwaitingConfirmation { stage: Stage },
    Confirmed { stage: Stage },
    Completed,
    Aborted,
}

/// Published after every successful save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    pub event: TaskEventKind,
    pub task: TaskSummary,
}

/// Optional realtime side channel
///
/// Failures are logged by the orchestrator and never reach the caller.
#[async_trait]
pub trait TaskNotifier: Send + Sync {
    async fn notify(&self, event: &TaskEvent) -> Result<(), NotifyError>;
}

/// In-process fan-out over a tokio broadcast channel
pub struct BroadcastNotifier {
    sender: broadcast::Sender<TaskEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl TaskNotifier for BroadcastNotifier {
    async fn notify(&self, event: &TaskEvent) -> Result<(), NotifyError> {
        match self.sender.send(event.clone()) {
            Ok(receivers) => {
                debug!("Task {} event delivered to {} subscribers", event.task.id, receivers);
            }
            Err(_) => debug!("Task {} event dropped: no subscribers", event.task.id),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Task;

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let notifier = BroadcastNotifier::new(8);
        let mut rx = notifier.subscribe();
        let task = Task::new("c", "brief");
        let event = TaskEvent {
            event: TaskEventKind::Created,
            task: task.summary(),
        };

        notifier.notify(&event).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_no_subscribers_is_not_an_error() {
        let notifier = BroadcastNotifier::new(1);
        let event = TaskEvent {
            event: TaskEventKind::Aborted,
            task: Task::new("c", "brief").summary(),
        };
        assert!(notifier.notify(&event).await.is_ok());
    }
}
