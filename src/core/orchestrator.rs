use std::collections::HashMap;
use std::sync::Arc;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use super::errors::{Result, TransferError};
use super::manager::TaskManager;
use super::traits::{FolderSnapshot, Notifier, ProgressCallback, Transfer, UploadSurface};
use super::types::{
    ContainerId, LocalFile, NotifyKind, RemoteEntry, TaskId, TransferRequest, TransferTarget,
};

const CANCELLED_MESSAGE: &str = "Upload cancelled";

/// A user-selected batch of files plus where the caller is in the folder tree.
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    pub files: Vec<LocalFile>,
    /// Folder the caller is currently looking at, if any
    pub viewing: Option<ContainerId>,
    /// Folder explicitly picked as the destination, if any
    pub selected: Option<ContainerId>,
    pub metadata: HashMap<String, String>,
}

impl BatchRequest {
    pub fn new(files: Vec<LocalFile>) -> Self {
        Self {
            files,
            ..Default::default()
        }
    }

    pub fn viewing(mut self, container: ContainerId) -> Self {
        self.viewing = Some(container);
        self
    }

    pub fn selected(mut self, container: ContainerId) -> Self {
        self.selected = Some(container);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Per-file outcome of a batch, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Created,
    Updated,
    Failed(String),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub target: ContainerId,
    pub task_ids: Vec<TaskId>,
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn created(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Created))
    }

    pub fn updated(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Updated))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Failed(_)))
    }

    pub fn cancelled(&self) -> usize {
        self.count(|outcome| matches!(outcome, FileOutcome::Cancelled))
    }

    fn count(&self, predicate: impl Fn(&FileOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|outcome| predicate(outcome)).count()
    }
}

/// Resolve the destination of a batch.
///
/// The selected folder wins only while the caller is viewing a folder; otherwise root.
pub fn resolve_target(viewing: Option<&ContainerId>, selected: Option<&ContainerId>) -> ContainerId {
    match (viewing, selected) {
        (Some(_), Some(selected)) => selected.clone(),
        _ => ContainerId::Root,
    }
}

/// Decide between a new object and a new version of an existing one.
///
/// Names are compared case-insensitively; the first sibling that matches wins.
pub fn plan_target(file_name: &str, snapshot: &[RemoteEntry], container: &ContainerId) -> TransferTarget {
    let wanted = file_name.to_lowercase();
    snapshot
        .iter()
        .find(|entry| entry.display_name.to_lowercase() == wanted)
        .map(|entry| TransferTarget::AppendVersion(entry.remote_id.clone()))
        .unwrap_or_else(|| TransferTarget::CreateIn(container.clone()))
}

/// Turns a batch of local files into remote transfers and keeps the task store in step.
pub struct Orchestrator {
    manager: TaskManager,
    transfer: Arc<dyn Transfer>,
    snapshots: Arc<dyn FolderSnapshot>,
    notifier: Arc<dyn Notifier>,
    surface: Arc<dyn UploadSurface>,
    max_concurrent: usize,
    cancellation_token: Option<CancellationToken>,
}

impl Orchestrator {
    pub fn new(
        manager: TaskManager,
        transfer: Arc<dyn Transfer>,
        snapshots: Arc<dyn FolderSnapshot>,
        notifier: Arc<dyn Notifier>,
        surface: Arc<dyn UploadSurface>,
    ) -> Self {
        Self {
            manager,
            transfer,
            snapshots,
            notifier,
            surface,
            max_concurrent: 1,
            cancellation_token: None,
        }
    }

    /// Allow up to `limit` transfers in flight. `1` keeps the strictly sequential loop.
    pub fn with_max_concurrent(mut self, limit: usize) -> Self {
        self.max_concurrent = limit.max(1);
        self
    }

    /// Files that have not started once `token` is cancelled are marked failed.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn manager(&self) -> &TaskManager {
        &self.manager
    }

    /// Run a batch to completion. Per-file failures never abort the batch and
    /// never surface as an error here; they are recorded on the tasks.
    pub async fn upload_batch(&self, request: BatchRequest) -> BatchReport {
        let BatchRequest { files, viewing, selected, metadata } = request;
        let target = resolve_target(viewing.as_ref(), selected.as_ref());
        tracing::info!("Uploading {} files into {}", files.len(), target);

        let snapshot = match self.snapshots.snapshot(&target).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!("Snapshot of {} unavailable, uploading as new files: {}", target, err);
                Vec::new()
            }
        };

        let task_ids = match self.manager.create_batch(files.clone(), target.clone()).await {
            Ok(ids) => ids,
            Err(err) => {
                tracing::error!("Failed to register upload batch: {}", err);
                let outcomes = files.iter().map(|_| FileOutcome::Failed(err.to_string())).collect();
                return BatchReport { target, task_ids: Vec::new(), outcomes };
            }
        };

        let jobs = task_ids.iter().copied().zip(files);
        let mut outcomes: Vec<(usize, FileOutcome)> = futures::stream::iter(jobs.enumerate())
            .map(|(index, (task_id, file))| {
                let planned = plan_target(&file.name, &snapshot, &target);
                let metadata = metadata.clone();
                async move { (index, self.upload_one(task_id, file, planned, metadata).await) }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;
        outcomes.sort_by_key(|(index, _)| *index);

        self.snapshots.invalidate(&target).await;
        self.surface.close();
        if viewing.as_ref() != Some(&target) {
            self.surface.navigate_to(&target);
        }

        let report = BatchReport {
            target,
            task_ids,
            outcomes: outcomes.into_iter().map(|(_, outcome)| outcome).collect(),
        };
        tracing::info!(
            "Batch into {} finished: {} created, {} updated, {} failed",
            report.target,
            report.created(),
            report.updated(),
            report.failed()
        );
        report
    }

    async fn upload_one(
        &self,
        task_id: TaskId,
        file: LocalFile,
        target: TransferTarget,
        metadata: HashMap<String, String>,
    ) -> FileOutcome {
        if self.cancellation_token.as_ref().is_some_and(|token| token.is_cancelled()) {
            self.record(self.manager.mark_error(task_id, CANCELLED_MESSAGE).await);
            return FileOutcome::Cancelled;
        }

        tracing::debug!("{} -> {:?}", file.name, target);
        let is_new_version = target.is_new_version();
        let name = file.name.clone();

        self.record(self.manager.set_progress(task_id, 0));
        let progress: ProgressCallback = {
            let manager = self.manager.clone();
            Arc::new(move |percent: u8| {
                // 管理器关闭后进度会被丢弃
                let _ = manager.set_progress(task_id, percent);
            })
        };

        let request = TransferRequest { task_id, target, file, metadata };
        match self.transfer.transfer(request, progress).await {
            Ok(_) => {
                self.record(self.manager.mark_success(task_id).await);
                if is_new_version {
                    self.notifier.notify(NotifyKind::Success, &format!("\"{name}\" updated"));
                    FileOutcome::Updated
                } else {
                    self.notifier.notify(NotifyKind::Success, &format!("\"{name}\" uploaded"));
                    FileOutcome::Created
                }
            }
            Err(err) => self.fail(task_id, &name, err).await,
        }
    }

    async fn fail(&self, task_id: TaskId, name: &str, err: TransferError) -> FileOutcome {
        let message = err.to_string();
        tracing::warn!("Upload of {} failed: {}", name, message);
        self.record(self.manager.mark_error(task_id, message.clone()).await);
        self.notifier.notify(NotifyKind::Error, &format!("Failed to upload \"{name}\": {message}"));
        FileOutcome::Failed(message)
    }

    fn record<T>(&self, result: Result<T>) {
        if let Err(err) = result {
            tracing::warn!("Task store update dropped: {}", err);
        }
    }
}
