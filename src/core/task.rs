use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use super::types::{ContainerId, LocalFile, TaskId, TaskRef, UploadStatus};

/// Highest progress a task may show before it succeeds.
pub(crate) const MAX_IN_FLIGHT_PROGRESS: u8 = 99;

/// One tracked attempt to transfer a single local file.
///
/// Persisted as camelCase JSON with epoch-millisecond timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTask {
    pub id: TaskId,
    pub file_name: String,
    pub size: u64,
    pub progress: u8,
    pub status: UploadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub target_container_id: ContainerId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl UploadTask {
    pub fn new(file: &LocalFile, target: ContainerId) -> Self {
        Self {
            id: TaskId::new(),
            file_name: file.name.clone(),
            size: file.size,
            progress: 0,
            status: UploadStatus::Pending,
            error: None,
            target_container_id: target,
            started_at: now_millis(),
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn matches(&self, task_ref: &TaskRef) -> bool {
        match task_ref {
            TaskRef::Id(id) => self.id == *id,
            TaskRef::File { name, size } => self.file_name == *name && self.size == *size,
        }
    }

    /// Returns the previous status when the task moved out of `Pending`.
    pub(crate) fn apply_progress(&mut self, progress: u8) -> Option<UploadStatus> {
        // 100 只属于 Success
        self.progress = progress.min(MAX_IN_FLIGHT_PROGRESS);

        if self.status == UploadStatus::Pending {
            self.status = UploadStatus::Uploading;
            return Some(UploadStatus::Pending);
        }

        None
    }

    pub(crate) fn succeed(&mut self) -> UploadStatus {
        let old = self.status;
        self.status = UploadStatus::Success;
        self.progress = 100;
        self.error = None;
        self.completed_at = Some(now_millis());
        old
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) -> UploadStatus {
        let old = self.status;
        self.status = UploadStatus::Error;
        self.error = Some(message.into());
        self.completed_at = Some(now_millis());
        old
    }
}

/// Current time at millisecond precision, so persisted timestamps round-trip exactly.
pub(crate) fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(TimeDelta::milliseconds(1)).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> UploadTask {
        UploadTask::new(&LocalFile::new("a.txt", 10, "/tmp/a.txt"), ContainerId::Root)
    }

    #[test]
    fn test_wire_format() {
        let mut task = sample();
        task.fail("boom");

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["fileName"], "a.txt");
        assert_eq!(value["targetContainerId"], "root");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "boom");
        assert!(value["startedAt"].is_i64());
        assert!(value["completedAt"].is_i64());
    }

    #[test]
    fn test_progress_capped_until_success() {
        let mut task = sample();
        assert_eq!(task.apply_progress(100), Some(UploadStatus::Pending));
        assert_eq!(task.progress, MAX_IN_FLIGHT_PROGRESS);
        assert_eq!(task.status, UploadStatus::Uploading);

        assert_eq!(task.apply_progress(50), None);
        assert_eq!(task.progress, 50);

        task.succeed();
        assert_eq!(task.progress, 100);
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn test_matches_by_file_key() {
        let task = sample();
        assert!(task.matches(&TaskRef::file("a.txt", 10)));
        assert!(!task.matches(&TaskRef::file("a.txt", 11)));
        assert!(!task.matches(&TaskRef::file("A.txt", 10)));
        assert!(task.matches(&TaskRef::Id(task.id)));
    }
}
