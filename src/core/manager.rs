use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use super::errors::{Result, UploadError};
use super::journal::TaskJournal;
use super::manager_worker::TaskManagerWorker;
use super::task::UploadTask;
use super::types::{ContainerId, LocalFile, RestorePolicy, TaskId, TaskRef, UploadEvent};

/// 任务管理器命令
pub(crate) enum ManagerCommand {
    CreateBatch {
        files: Vec<LocalFile>,
        target: ContainerId,
        reply: oneshot::Sender<Vec<TaskId>>,
    },

    /// 进度更新不需要回复
    SetProgress {
        task_ref: TaskRef,
        progress: u8,
    },

    MarkSuccess {
        task_ref: TaskRef,
        reply: oneshot::Sender<bool>,
    },

    MarkError {
        task_ref: TaskRef,
        message: String,
        reply: oneshot::Sender<bool>,
    },

    Remove {
        task_id: TaskId,
        reply: oneshot::Sender<bool>,
    },

    ClearCompleted {
        reply: oneshot::Sender<usize>,
    },

    GetTask {
        task_id: TaskId,
        reply: oneshot::Sender<Option<UploadTask>>,
    },

    GetAllTasks {
        reply: oneshot::Sender<Vec<UploadTask>>,
    },
}

/// Cheap, cloneable handle onto the task store.
///
/// All mutations go through one worker task, so they are applied one at a time in
/// the order they were sent.
#[derive(Clone)]
pub struct TaskManager {
    command_tx: mpsc::UnboundedSender<ManagerCommand>,
    event_tx: broadcast::Sender<UploadEvent>,
}

/// 管理器句柄 - 包含管理器和工作线程
pub struct TaskManagerHandle {
    pub manager: TaskManager,
    pub worker_handle: JoinHandle<()>,
}

impl TaskManagerHandle {
    /// Stop accepting commands and wait for the worker to finish.
    ///
    /// Clones of the manager still held elsewhere keep the worker alive until dropped.
    pub async fn dispose(self) -> Result<()> {
        drop(self.manager);
        self.worker_handle
            .await
            .map_err(|err| UploadError::internal_error(format!("Worker panic: {}", err)))
    }
}

impl TaskManager {
    /// Rehydrate from `journal` and start the worker.
    pub async fn init(journal: TaskJournal, restore_policy: RestorePolicy) -> TaskManagerHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        // 最大缓存 256 个事件
        let (event_tx, _) = broadcast::channel(256);

        let worker = TaskManagerWorker::restore(journal, restore_policy, event_tx.clone()).await;
        let worker_handle = tokio::spawn(worker.run(command_rx));

        TaskManagerHandle {
            manager: Self { command_tx, event_tx },
            worker_handle,
        }
    }

    /// Register a whole batch as `Pending`, in submission order.
    pub async fn create_batch(&self, files: Vec<LocalFile>, target: ContainerId) -> Result<Vec<TaskId>> {
        self.request(|reply| ManagerCommand::CreateBatch { files, target, reply }).await
    }

    /// Fire-and-forget; safe to call from a synchronous progress callback.
    pub fn set_progress(&self, task_ref: impl Into<TaskRef>, progress: u8) -> Result<()> {
        self.command_tx
            .send(ManagerCommand::SetProgress { task_ref: task_ref.into(), progress })
            .map_err(|_| UploadError::ManagerShutdown)
    }

    /// Returns whether a non-terminal task matched.
    pub async fn mark_success(&self, task_ref: impl Into<TaskRef>) -> Result<bool> {
        let task_ref = task_ref.into();
        self.request(|reply| ManagerCommand::MarkSuccess { task_ref, reply }).await
    }

    /// Returns whether a non-terminal task matched.
    pub async fn mark_error(&self, task_ref: impl Into<TaskRef>, message: impl Into<String>) -> Result<bool> {
        let task_ref = task_ref.into();
        let message = message.into();
        self.request(|reply| ManagerCommand::MarkError { task_ref, message, reply }).await
    }

    pub async fn remove(&self, task_id: TaskId) -> Result<bool> {
        self.request(|reply| ManagerCommand::Remove { task_id, reply }).await
    }

    /// Remove every Success/Error task, returning how many went.
    pub async fn clear_completed(&self) -> Result<usize> {
        self.request(|reply| ManagerCommand::ClearCompleted { reply }).await
    }

    /// Get task
    pub async fn get_task(&self, task_id: TaskId) -> Result<Option<UploadTask>> {
        self.request(|reply| ManagerCommand::GetTask { task_id, reply }).await
    }

    /// Get all tasks, in submission order
    pub async fn tasks(&self) -> Result<Vec<UploadTask>> {
        self.request(|reply| ManagerCommand::GetAllTasks { reply }).await
    }

    /// 订阅事件
    ///
    /// 注意：
    /// - 如果接收速度跟不上发送速度，可能会丢失事件（lagged error）
    /// - 任务列表以 `tasks()` 为准
    pub fn subscribe(&self) -> broadcast::Receiver<UploadEvent> {
        self.event_tx.subscribe()
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> ManagerCommand) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(build(reply_tx))
            .map_err(|_| UploadError::ManagerShutdown)?;

        reply_rx
            .await
            .map_err(|_| UploadError::ManagerShutdown)
    }
}
