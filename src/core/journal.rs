use std::sync::Arc;
use super::task::UploadTask;
use super::traits::KeyValueStore;

pub const DEFAULT_STORAGE_KEY: &str = "courier.upload-tasks";

/// Mirrors the task collection into one key of a [`KeyValueStore`].
///
/// Persistence is best-effort: nothing here returns an error to the caller.
#[derive(Clone)]
pub struct TaskJournal {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl TaskJournal {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the persisted tasks. Absent or unparseable data yields an empty list.
    pub async fn load(&self) -> Vec<UploadTask> {
        let data = match self.store.get(&self.key).await {
            Ok(Some(data)) => data,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!("Failed to read upload tasks from {}: {}", self.key, err);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<UploadTask>>(&data) {
            Ok(tasks) => {
                tracing::debug!("Restored {} upload tasks from {}", tasks.len(), self.key);
                tasks
            }
            Err(err) => {
                tracing::warn!("Discarding unparseable upload tasks in {}: {}", self.key, err);
                Vec::new()
            }
        }
    }

    /// Replace the persisted tasks with `tasks`.
    pub async fn save(&self, tasks: &[UploadTask]) {
        let data = match serde_json::to_string(tasks) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!("Failed to serialize upload tasks: {}", err);
                return;
            }
        };

        if let Err(err) = self.store.set(&self.key, &data).await {
            tracing::warn!("Failed to save upload tasks to {}: {}", self.key, err);
        }
    }
}
