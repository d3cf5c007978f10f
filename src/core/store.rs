use super::task::UploadTask;
use super::types::{ContainerId, LocalFile, TaskId, TaskRef, UploadStatus};

/// Outcome of a store mutation, used by the owner to decide what to broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Nothing matched or the match was already terminal
    Ignored,
    Progress {
        id: TaskId,
        progress: u8,
        from: Option<UploadStatus>,
    },
    Status {
        id: TaskId,
        from: UploadStatus,
        to: UploadStatus,
    },
}

impl Change {
    pub fn is_applied(&self) -> bool {
        !matches!(self, Change::Ignored)
    }
}

/// Ordered collection of upload tasks. Submission order is never changed.
#[derive(Debug, Default, Clone)]
pub struct TaskStore {
    tasks: Vec<UploadTask>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tasks(tasks: Vec<UploadTask>) -> Self {
        Self { tasks }
    }

    /// Append one `Pending` task per file, in the given order.
    pub fn create_batch(&mut self, files: &[LocalFile], target: &ContainerId) -> Vec<TaskId> {
        let start = self.tasks.len();
        self.tasks.extend(files.iter().map(|file| UploadTask::new(file, target.clone())));
        self.tasks[start..].iter().map(|task| task.id).collect()
    }

    pub fn set_progress(&mut self, task_ref: &TaskRef, progress: u8) -> Change {
        match self.find_active_mut(task_ref) {
            Some(task) => {
                let from = task.apply_progress(progress);
                Change::Progress { id: task.id, progress: task.progress, from }
            }
            None => Change::Ignored,
        }
    }

    pub fn mark_success(&mut self, task_ref: &TaskRef) -> Change {
        match self.find_active_mut(task_ref) {
            Some(task) => {
                let from = task.succeed();
                Change::Status { id: task.id, from, to: UploadStatus::Success }
            }
            None => Change::Ignored,
        }
    }

    /// Progress is left at its last reported value.
    pub fn mark_error(&mut self, task_ref: &TaskRef, message: &str) -> Change {
        match self.find_active_mut(task_ref) {
            Some(task) => {
                let from = task.fail(message);
                Change::Status { id: task.id, from, to: UploadStatus::Error }
            }
            None => Change::Ignored,
        }
    }

    pub fn remove(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    /// 清除所有 <Success/Error> 状态的任务
    pub fn clear_completed(&mut self) -> Vec<TaskId> {
        let removed = self.tasks
            .iter()
            .filter(|task| task.is_terminal())
            .map(|task| task.id)
            .collect();
        self.tasks.retain(|task| !task.is_terminal());
        removed
    }

    /// Fail every task that is not terminal; used when rehydrating interrupted work.
    pub fn fail_unfinished(&mut self, message: &str) -> Vec<Change> {
        self.tasks
            .iter_mut()
            .filter(|task| !task.is_terminal())
            .map(|task| {
                let from = task.fail(message);
                Change::Status { id: task.id, from, to: UploadStatus::Error }
            })
            .collect()
    }

    pub fn get(&self, id: TaskId) -> Option<&UploadTask> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn tasks(&self) -> &[UploadTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of tasks still pending or uploading
    pub fn active_count(&self) -> usize {
        self.tasks.iter().filter(|task| !task.is_terminal()).count()
    }

    // 只匹配第一个未结束的任务
    fn find_active_mut(&mut self, task_ref: &TaskRef) -> Option<&mut UploadTask> {
        self.tasks
            .iter_mut()
            .find(|task| !task.is_terminal() && task.matches(task_ref))
    }
}
