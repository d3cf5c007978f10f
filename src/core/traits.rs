use std::sync::Arc;
use async_trait::async_trait;
use super::errors::{Result, StorageError, TransferError};
use super::types::{ContainerId, NotifyKind, RemoteEntry, TransferReceipt, TransferRequest};

/// Progress callback, invoked with an integer percent 0-100.
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Moves one local file to remote storage.
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Settles once, after zero or more progress callbacks.
    async fn transfer(
        &self,
        request: TransferRequest,
        progress: ProgressCallback,
    ) -> std::result::Result<TransferReceipt, TransferError>;
}

/// Cached listing of a container, used only to detect name collisions.
#[async_trait]
pub trait FolderSnapshot: Send + Sync {
    /// May be stale.
    async fn snapshot(&self, container: &ContainerId) -> Result<Vec<RemoteEntry>>;

    /// Drop whatever is cached for `container` so the next read is fresh.
    async fn invalidate(&self, _container: &ContainerId) {}
}

/// Fire-and-forget user notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotifyKind, text: &str);
}

/// The submission surface that started a batch.
pub trait UploadSurface: Send + Sync {
    fn close(&self);

    fn navigate_to(&self, container: &ContainerId);
}

/// 持久化键值存储
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> std::result::Result<Option<String>, StorageError>;

    /// Replaces any prior value.
    async fn set(&self, key: &str, value: &str) -> std::result::Result<(), StorageError>;

    async fn remove(&self, key: &str) -> std::result::Result<(), StorageError>;
}

/// Notifier that only logs.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: NotifyKind, text: &str) {
        match kind {
            NotifyKind::Success => tracing::info!("{}", text),
            NotifyKind::Error => tracing::warn!("{}", text),
        }
    }
}

/// Surface with nothing to close or navigate, e.g. a CLI.
pub struct DetachedSurface;

impl UploadSurface for DetachedSurface {
    fn close(&self) {}

    fn navigate_to(&self, _container: &ContainerId) {}
}
