use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{check_version, sort_newest_first, Catalog, TaskStore};
use crate::error::StoreError;
use crate::models::{Channel, MaterialItem, StyleExemplar, Task};

const GLOBAL_MATERIALS: &str = "global";

/// File-backed store: one JSON document per task, catalog files per channel
///
/// Directory structure:
/// ```text
/// root/
/// ├── tasks/<task-id>.json
/// ├── channels/<channel-id>.json
/// ├── exemplars/<channel-id>.json    (array of exemplars)
/// └── materials/
///     ├── <channel-id>.json          (array of material items)
///     └── global.json                (items visible to every channel)
/// ```
///
/// Task writes go to a temporary file that is renamed into place, so a crash
/// never leaves a half-written task behind.
pub struct JsonDirStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonDirStore {
    /// Open a store rooted at `root`, creating the task directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(root.join("tasks")).await?;
        debug!("Opened JSON store at {}", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entity_path(&self, dir: &str, id: &str) -> Option<PathBuf> {
        is_safe_id(id).then(|| self.root.join(dir).join(format!("{}.json", id)))
    }
}

/// Ids become file names; reject anything that could leave the directory
fn is_safe_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl TaskStore for JsonDirStore {
    async fn find_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        match self.entity_path("tasks", id) {
            Some(path) => read_json(&path).await,
            None => Ok(None),
        }
    }

    async fn save_task(&self, task: &Task) -> Result<u64, StoreError> {
        let path = self
            .entity_path("tasks", &task.id)
            .ok_or_else(|| {
                std::io::Error::new(
                    ErrorKind::InvalidInput,
                    format!("task id not usable as a file name: {}", task.id),
                )
            })?;

        let _guard = self.write_lock.lock().await;
        let stored: Option<Task> = read_json(&path).await?;
        let next = check_version(task, stored.map(|t| t.version))?;

        let mut copy = task.clone();
        copy.version = next;
        let json = serde_json::to_vec_pretty(&copy)?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("Saved task {} at version {}", task.id, next);
        Ok(next)
    }

    async fn list_tasks(&self, channel_id: Option<&str>) -> Result<Vec<Task>, StoreError> {
        let mut tasks = Vec::new();
        let mut entries = tokio::fs::read_dir(self.root.join("tasks")).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_json::<Task>(&path).await {
                Ok(Some(task)) => {
                    if channel_id.is_none_or(|c| task.channel_id == c) {
                        tasks.push(task);
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable task file {}: {}", path.display(), e),
            }
        }
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }
}

#[async_trait]
impl Catalog for JsonDirStore {
    async fn find_channel(&self, id: &str) -> Result<Option<Channel>, StoreError> {
        match self.entity_path("channels", id) {
            Some(path) => read_json(&path).await,
            None => Ok(None),
        }
    }

    async fn exemplars(&self, channel_id: &str) -> Result<Vec<StyleExemplar>, StoreError> {
        let Some(path) = self.entity_path("exemplars", channel_id) else {
            return Ok(Vec::new());
        };
        let exemplars: Vec<StyleExemplar> = read_json(&path).await?.unwrap_or_default();
        Ok(keep_owned(exemplars, &path, |e| e.channel_id == channel_id))
    }

    async fn materials(&self, channel_id: &str) -> Result<Vec<MaterialItem>, StoreError> {
        let global_path = self
            .root
            .join("materials")
            .join(format!("{}.json", GLOBAL_MATERIALS));
        let global: Vec<MaterialItem> = read_json(&global_path).await?.unwrap_or_default();
        let global = keep_owned(global, &global_path, |m| m.channel_id.is_none());

        // The global file is not a channel's own file
        if channel_id == GLOBAL_MATERIALS {
            return Ok(global);
        }
        let mut items: Vec<MaterialItem> = match self.entity_path("materials", channel_id) {
            Some(path) => {
                let own: Vec<MaterialItem> = read_json(&path).await?.unwrap_or_default();
                keep_owned(own, &path, |m| m.channel_id.as_deref() == Some(channel_id))
            }
            None => Vec::new(),
        };
        items.extend(global);
        Ok(items)
    }
}

/// Drop catalog entries whose own channel does not match the file they sit in
fn keep_owned<T>(items: Vec<T>, path: &Path, owned: impl Fn(&T) -> bool) -> Vec<T> {
    let total = items.len();
    let kept: Vec<T> = items.into_iter().filter(|item| owned(item)).collect();
    if kept.len() < total {
        warn!(
            "Ignoring {} entries in {} that belong to another channel",
            total - kept.len(),
            path.display()
        );
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_store() -> (JsonDirStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonDirStore::open(temp_dir.path()).await.unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_task_round_trip_and_versioning() {
        let (store, _dir) = create_test_store().await;
        let mut task = Task::new("deep_reading", "brief");
        task.version = store.save_task(&task).await.unwrap();

        let loaded = store.find_task(&task.id).await.unwrap().unwrap();
        assert_eq!(loaded, task);

        let stale = task.clone();
        task.version = store.save_task(&task).await.unwrap();
        assert!(matches!(
            store.save_task(&stale).await,
            Err(StoreError::VersionConflict { .. })
        ));
        assert!(!store.root().join("tasks").join(format!("{}.json.tmp", task.id)).exists());
    }

    #[tokio::test]
    async fn test_missing_and_unsafe_ids() {
        let (store, _dir) = create_test_store().await;
        assert!(store.find_task("nope").await.unwrap().is_none());
        assert!(store.find_task("../etc/passwd").await.unwrap().is_none());
        assert!(store.find_channel("x").await.unwrap().is_none());
        assert!(store.exemplars("x").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_files() {
        let (store, dir) = create_test_store().await;
        let task = Task::new("a", "brief");
        store.save_task(&task).await.unwrap();
        std::fs::write(dir.path().join("tasks").join("broken.json"), "{not json").unwrap();

        let listed = store.list_tasks(None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(store.list_tasks(Some("b")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_catalog_files() {
        let (store, dir) = create_test_store().await;
        let root = dir.path();
        std::fs::create_dir_all(root.join("channels")).unwrap();
        std::fs::create_dir_all(root.join("materials")).unwrap();
        std::fs::write(
            root.join("channels").join("deep_reading.json"),
            r#"{"id": "deep_reading", "name": "Deep Reading", "persona": "A reading teacher"}"#,
        )
        .unwrap();
        std::fs::write(
            root.join("materials").join("deep_reading.json"),
            r#"[{"id": "m1", "channel_id": "deep_reading", "content": "mine", "ingested_at": "2025-03-01T08:00:00Z"}]"#,
        )
        .unwrap();
        std::fs::write(
            root.join("materials").join("global.json"),
            r#"[{"id": "g1", "content": "shared", "ingested_at": "2025-03-01T08:00:00Z"}]"#,
        )
        .unwrap();

        let channel = store.find_channel("deep_reading").await.unwrap().unwrap();
        assert_eq!(channel.name, "Deep Reading");
        assert!(channel.forbidden_phrases.is_empty());

        let ids: Vec<String> = store
            .materials("deep_reading")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["m1", "g1"]);
        assert_eq!(store.materials("other").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_catalog_ignores_entries_of_other_channels() {
        let (store, dir) = create_test_store().await;
        let root = dir.path();
        std::fs::create_dir_all(root.join("materials")).unwrap();
        std::fs::create_dir_all(root.join("exemplars")).unwrap();
        std::fs::write(
            root.join("materials").join("deep_reading.json"),
            r#"[
                {"id": "m1", "channel_id": "deep_reading", "content": "mine", "ingested_at": "2025-03-01T08:00:00Z"},
                {"id": "foreign", "channel_id": "math_club", "content": "theirs", "ingested_at": "2025-03-01T08:00:00Z"},
                {"id": "unowned", "content": "no channel", "ingested_at": "2025-03-01T08:00:00Z"}
            ]"#,
        )
        .unwrap();
        std::fs::write(
            root.join("materials").join("global.json"),
            r#"[
                {"id": "g1", "content": "shared", "ingested_at": "2025-03-01T08:00:00Z"},
                {"id": "g_foreign", "channel_id": "math_club", "content": "theirs", "ingested_at": "2025-03-01T08:00:00Z"}
            ]"#,
        )
        .unwrap();
        std::fs::write(
            root.join("exemplars").join("deep_reading.json"),
            r#"[
                {"id": "ex1", "channel_id": "deep_reading", "title": "Mine", "ingested_at": "2025-03-01T08:00:00Z"},
                {"id": "ex_foreign", "channel_id": "math_club", "title": "Theirs", "ingested_at": "2025-03-01T08:00:00Z"}
            ]"#,
        )
        .unwrap();

        let ids = |items: Vec<MaterialItem>| -> Vec<String> { items.into_iter().map(|m| m.id).collect() };
        assert_eq!(ids(store.materials("deep_reading").await.unwrap()), vec!["m1", "g1"]);
        assert_eq!(ids(store.materials("global").await.unwrap()), vec!["g1"]);

        let exemplars: Vec<String> = store
            .exemplars("deep_reading")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(exemplars, vec!["ex1"]);
    }
}
