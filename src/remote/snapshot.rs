use std::collections::HashMap;
use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::Method;
use crate::core::{ContainerId, FolderSnapshot, RemoteEntry, Result};
use super::client::RemoteClient;

/// Folder listings from `GET {endpoint}/folders/{container}/children`, cached per
/// container until invalidated. Cached reads may be stale.
pub struct HttpFolderSnapshot {
    remote: RemoteClient,
    cache: RwLock<HashMap<ContainerId, Vec<RemoteEntry>>>,
}

impl HttpFolderSnapshot {
    pub fn new(remote: RemoteClient) -> Self {
        Self {
            remote,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Seed the cache with a listing the caller already has.
    pub fn prime(&self, container: ContainerId, entries: Vec<RemoteEntry>) {
        self.cache.write().insert(container, entries);
    }

    pub fn is_cached(&self, container: &ContainerId) -> bool {
        self.cache.read().contains_key(container)
    }

    async fn fetch(&self, container: &ContainerId) -> Result<Vec<RemoteEntry>> {
        let url = self.remote.url(&["folders", container.as_str(), "children"])?;
        let entries = self.remote
            .request(Method::GET, url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<RemoteEntry>>()
            .await?;

        Ok(entries)
    }
}

#[async_trait]
impl FolderSnapshot for HttpFolderSnapshot {
    async fn snapshot(&self, container: &ContainerId) -> Result<Vec<RemoteEntry>> {
        if let Some(entries) = self.cache.read().get(container) {
            return Ok(entries.clone());
        }

        let entries = self.fetch(container).await?;
        tracing::debug!("Fetched {} entries of {}", entries.len(), container);
        self.cache.write().insert(container.clone(), entries.clone());
        Ok(entries)
    }

    async fn invalidate(&self, container: &ContainerId) {
        self.cache.write().remove(container);
    }
}
