use tokio::sync::{broadcast, mpsc};
use super::journal::TaskJournal;
use super::manager::ManagerCommand;
use super::store::{Change, TaskStore};
use super::types::{RestorePolicy, TaskId, UploadEvent, UploadStatus};

const INTERRUPTED_MESSAGE: &str = "Interrupted by restart";

/// Sole owner of the [`TaskStore`].
pub(crate) struct TaskManagerWorker {
    store: TaskStore,
    journal: TaskJournal,
    event_tx: broadcast::Sender<UploadEvent>,
}

impl TaskManagerWorker {
    pub(crate) async fn restore(
        journal: TaskJournal,
        restore_policy: RestorePolicy,
        event_tx: broadcast::Sender<UploadEvent>,
    ) -> Self {
        let tasks = journal.load().await;
        let mut worker = Self {
            store: TaskStore::from_tasks(tasks),
            journal,
            event_tx,
        };

        if restore_policy == RestorePolicy::FailInterrupted {
            let failed = worker.store.fail_unfinished(INTERRUPTED_MESSAGE);
            if !failed.is_empty() {
                tracing::info!("Marked {} interrupted upload tasks as failed", failed.len());
                worker.save_state().await;
            }
        }

        tracing::debug!("Task manager started with {} tasks", worker.store.len());
        worker
    }

    pub(crate) async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<ManagerCommand>) {
        // 主事件循环, 循环等待命令
        while let Some(command) = command_rx.recv().await {
            self.handle_command(command).await;
        }

        tracing::debug!("Task manager stopped");
    }

    /// Mutations are persisted before the reply goes out.
    async fn handle_command(&mut self, command: ManagerCommand) {
        match command {
            ManagerCommand::CreateBatch { files, target, reply } => {
                let task_ids = self.store.create_batch(&files, &target);
                tracing::debug!("Created {} upload tasks for {}", task_ids.len(), target);
                self.save_state().await;
                let _ = self.event_tx.send(UploadEvent::BatchCreated {
                    task_ids: task_ids.clone(),
                    target,
                });
                let _ = reply.send(task_ids);
            }
            ManagerCommand::SetProgress { task_ref, progress } => {
                let change = self.store.set_progress(&task_ref, progress);
                self.apply(change).await;
            }
            ManagerCommand::MarkSuccess { task_ref, reply } => {
                let change = self.store.mark_success(&task_ref);
                let _ = reply.send(self.apply(change).await);
            }
            ManagerCommand::MarkError { task_ref, message, reply } => {
                let change = self.store.mark_error(&task_ref, &message);
                let _ = reply.send(self.apply(change).await);
            }
            ManagerCommand::Remove { task_id, reply } => {
                let removed = self.store.remove(task_id);
                if removed {
                    self.save_state().await;
                    let _ = self.event_tx.send(UploadEvent::Removed { task_ids: vec![task_id] });
                }
                let _ = reply.send(removed);
            }
            ManagerCommand::ClearCompleted { reply } => {
                let task_ids = self.store.clear_completed();
                let count = task_ids.len();
                if count > 0 {
                    self.save_state().await;
                    let _ = self.event_tx.send(UploadEvent::Removed { task_ids });
                }
                let _ = reply.send(count);
            }
            ManagerCommand::GetTask { task_id, reply } => {
                let _ = reply.send(self.store.get(task_id).cloned());
            }
            ManagerCommand::GetAllTasks { reply } => {
                let _ = reply.send(self.store.tasks().to_vec());
            }
        }
    }

    /// Persist and broadcast a change; returns whether anything was applied.
    async fn apply(&self, change: Change) -> bool {
        if !change.is_applied() {
            return false;
        }

        self.save_state().await;
        self.emit(&change);
        true
    }

    fn emit(&self, change: &Change) {
        match *change {
            Change::Ignored => {}
            Change::Progress { id, progress, from } => {
                if let Some(old_status) = from {
                    self.emit_state_change(id, old_status, UploadStatus::Uploading);
                }
                let _ = self.event_tx.send(UploadEvent::Progress { task_id: id, progress });
            }
            Change::Status { id, from, to } => {
                self.emit_state_change(id, from, to);
            }
        }
    }

    fn emit_state_change(&self, task_id: TaskId, old_status: UploadStatus, new_status: UploadStatus) {
        let _ = self.event_tx.send(UploadEvent::StateChanged {
            task_id,
            old_status,
            new_status,
        });
    }

    async fn save_state(&self) {
        self.journal.save(self.store.tasks()).await;
    }
}
