pub mod json_dir;
pub mod memory;

pub use json_dir::*;
pub use memory::*;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Channel, MaterialItem, StyleExemplar, Task};

/// Durable task storage with optimistic versioning
///
/// `save_task` treats `task.version` as the version the caller read. Version 0
/// means "new task": the save fails if the id already exists. Any other
/// version must match the stored one. On success the stored copy carries
/// the next version, which is returned.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find_task(&self, id: &str) -> Result<Option<Task>, StoreError>;

    async fn save_task(&self, task: &Task) -> Result<u64, StoreError>;

    /// Tasks newest first, optionally limited to one channel
    async fn list_tasks(&self, channel_id: Option<&str>) -> Result<Vec<Task>, StoreError>;
}

/// Read-only reference data: channels, style exemplars, material items
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn find_channel(&self, id: &str) -> Result<Option<Channel>, StoreError>;

    async fn exemplars(&self, channel_id: &str) -> Result<Vec<StyleExemplar>, StoreError>;

    /// The channel's material items plus the global ones (no channel)
    async fn materials(&self, channel_id: &str) -> Result<Vec<MaterialItem>, StoreError>;
}

/// Version the caller expects to find in the store
pub(crate) fn expected_version(task: &Task) -> Option<u64> {
    (task.version > 0).then_some(task.version)
}

/// Check a save against the currently stored version
pub(crate) fn check_version(task: &Task, stored: Option<u64>) -> Result<u64, StoreError> {
    let expected = expected_version(task);
    match (expected, stored) {
        (None, None) => Ok(1),
        (Some(e), Some(s)) if e == s => Ok(s + 1),
        (None, Some(_)) => Err(StoreError::AlreadyExists(task.id.clone())),
        _ => Err(StoreError::VersionConflict {
            id: task.id.clone(),
            expected,
            found: stored,
        }),
    }
}

/// Newest first, then by id
pub(crate) fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_version() {
        let mut task = Task::new("c", "brief");
        assert_eq!(check_version(&task, None).unwrap(), 1);
        assert!(matches!(
            check_version(&task, Some(1)),
            Err(StoreError::AlreadyExists(_))
        ));

        task.version = 3;
        assert_eq!(check_version(&task, Some(3)).unwrap(), 4);
        assert!(matches!(
            check_version(&task, Some(4)),
            Err(StoreError::VersionConflict {
                expected: Some(3),
                found: Some(4),
                ..
            })
        ));
        assert!(matches!(
            check_version(&task, None),
            Err(StoreError::VersionConflict { found: None, .. })
        ));
    }
}
