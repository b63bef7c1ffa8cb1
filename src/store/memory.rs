use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{check_version, sort_newest_first, Catalog, TaskStore};
use crate::error::StoreError;
use crate::models::{Channel, MaterialItem, StyleExemplar, Task};

/// In-process store for tests and embedding
#[derive(Default)]
pub struct MemoryStore {
    tasks: RwLock<HashMap<String, Task>>,
    channels: RwLock<HashMap<String, Channel>>,
    exemplars: RwLock<HashMap<String, Vec<StyleExemplar>>>,
    /// Keyed by channel id; `None` holds global items
    materials: RwLock<HashMap<Option<String>, Vec<MaterialItem>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_channel(&self, channel: Channel) {
        self.channels
            .write()
            .await
            .insert(channel.id.clone(), channel);
    }

    pub async fn add_exemplar(&self, exemplar: StyleExemplar) {
        self.exemplars
            .write()
            .await
            .entry(exemplar.channel_id.clone())
            .or_default()
            .push(exemplar);
    }

    pub async fn add_material(&self, item: MaterialItem) {
        self.materials
            .write()
            .await
            .entry(item.channel_id.clone())
            .or_default()
            .push(item);
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn find_task(&self, id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(id).cloned())
    }

    async fn save_task(&self, task: &Task) -> Result<u64, StoreError> {
        let mut tasks = self.tasks.write().await;
        let stored = tasks.get(&task.id).map(|t| t.version);
        let next = check_version(task, stored)?;

        let mut copy = task.clone();
        copy.version = next;
        tasks.insert(copy.id.clone(), copy);
        Ok(next)
    }

    async fn list_tasks(&self, channel_id: Option<&str>) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| channel_id.is_none_or(|c| t.channel_id == c))
            .cloned()
            .collect();
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }
}

#[async_trait]
impl Catalog for MemoryStore {
    async fn find_channel(&self, id: &str) -> Result<Option<Channel>, StoreError> {
        Ok(self.channels.read().await.get(id).cloned())
    }

    async fn exemplars(&self, channel_id: &str) -> Result<Vec<StyleExemplar>, StoreError> {
        Ok(self
            .exemplars
            .read()
            .await
            .get(channel_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn materials(&self, channel_id: &str) -> Result<Vec<MaterialItem>, StoreError> {
        let materials = self.materials.read().await;
        let mut items = materials
            .get(&Some(channel_id.to_string()))
            .cloned()
            .unwrap_or_default();
        if let Some(global) = materials.get(&None) {
            items.extend(global.iter().cloned());
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn material(id: &str, channel: Option<&str>) -> MaterialItem {
        MaterialItem {
            id: id.to_string(),
            channel_id: channel.map(str::to_string),
            kind: Default::default(),
            source: None,
            content: Some(format!("note {}", id)),
            tags: vec![],
            relevance: None,
            ingested_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_bumps_version_and_rejects_stale_writes() {
        let store = MemoryStore::new();
        let mut task = Task::new("deep_reading", "brief");

        task.version = store.save_task(&task).await.unwrap();
        assert_eq!(task.version, 1);

        let stale = task.clone();
        task.version = store.save_task(&task).await.unwrap();
        assert_eq!(task.version, 2);

        let err = store.save_task(&stale).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
        assert_eq!(store.find_task(&task.id).await.unwrap().unwrap().version, 2);
    }

    #[tokio::test]
    async fn test_list_filters_and_sorts() {
        let store = MemoryStore::new();
        let mut older = Task::new("a", "older");
        older.created_at = Utc::now() - Duration::hours(1);
        let newer = Task::new("a", "newer");
        let other = Task::new("b", "other channel");
        for task in [&older, &newer, &other] {
            store.save_task(task).await.unwrap();
        }

        let listed = store.list_tasks(Some("a")).await.unwrap();
        let briefs: Vec<&str> = listed.iter().map(|t| t.brief_data.brief.as_str()).collect();
        assert_eq!(briefs, vec!["newer", "older"]);
        assert_eq!(store.list_tasks(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_materials_include_global_only() {
        let store = MemoryStore::new();
        store.add_material(material("mine", Some("a"))).await;
        store.add_material(material("global", None)).await;
        store.add_material(material("theirs", Some("b"))).await;

        let mut ids: Vec<String> = store
            .materials("a")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["global", "mine"]);
    }
}
