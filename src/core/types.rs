use std::collections::HashMap;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 上传任务唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

const ROOT_SENTINEL: &str = "root";

/// Destination folder. `Root` has no parent and is persisted as `"root"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum ContainerId {
    Root,
    Folder(String),
}

impl ContainerId {
    pub fn folder(id: impl Into<String>) -> Self {
        let id = id.into();
        if id == ROOT_SENTINEL {
            Self::Root
        } else {
            Self::Folder(id)
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Self::Root)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Root => ROOT_SENTINEL,
            Self::Folder(id) => id,
        }
    }
}

impl From<String> for ContainerId {
    fn from(value: String) -> Self {
        Self::folder(value)
    }
}

impl From<ContainerId> for String {
    fn from(value: ContainerId) -> Self {
        match value {
            ContainerId::Root => ROOT_SENTINEL.to_string(),
            ContainerId::Folder(id) => id,
        }
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote object identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ObjectId(pub String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 上传状态
///
/// `Pending -> Uploading -> {Success | Error}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    /// 等待中
    Pending,
    /// 上传中
    Uploading,
    /// 已完成
    Success,
    /// 失败
    Error,
}

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

/// A local file picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub size: u64,
    pub path: PathBuf,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, size: u64, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            size,
            path: path.into(),
        }
    }

    /// Build from a path on disk, reading the size from its metadata.
    pub async fn from_path(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(String::from)
            .ok_or_else(|| std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} has no usable file name", path.display()),
            ))?;

        Ok(Self { name, size: metadata.len(), path })
    }
}

/// How a store mutation addresses its task.
///
/// `File` matches the first non-terminal task with exactly this name and size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRef {
    Id(TaskId),
    File { name: String, size: u64 },
}

impl TaskRef {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self::File { name: name.into(), size }
    }
}

impl From<TaskId> for TaskRef {
    fn from(id: TaskId) -> Self {
        Self::Id(id)
    }
}

impl From<&LocalFile> for TaskRef {
    fn from(file: &LocalFile) -> Self {
        Self::file(file.name.clone(), file.size)
    }
}

/// One entry of a folder snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteEntry {
    #[serde(rename = "id")]
    pub remote_id: ObjectId,
    #[serde(rename = "name")]
    pub display_name: String,
}

impl RemoteEntry {
    pub fn new(remote_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            remote_id: ObjectId::new(remote_id),
            display_name: display_name.into(),
        }
    }
}

/// Where a transfer lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferTarget {
    /// 新建对象
    CreateIn(ContainerId),
    /// 为已有对象追加新版本
    AppendVersion(ObjectId),
}

impl TransferTarget {
    pub fn is_new_version(&self) -> bool {
        matches!(self, Self::AppendVersion(_))
    }
}

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub task_id: TaskId,
    pub target: TransferTarget,
    pub file: LocalFile,
    pub metadata: HashMap<String, String>,
}

/// Success payload of a transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransferReceipt {
    #[serde(rename = "id", default)]
    pub object_id: Option<ObjectId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyKind {
    Success,
    Error,
}

/// 任务事件, 供展示层订阅
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// 批量任务已创建
    BatchCreated {
        task_ids: Vec<TaskId>,
        target: ContainerId,
    },

    /// 进度更新
    Progress {
        task_id: TaskId,
        progress: u8,
    },

    /// 状态变更
    StateChanged {
        task_id: TaskId,
        old_status: UploadStatus,
        new_status: UploadStatus,
    },

    /// 任务被移除
    Removed {
        task_ids: Vec<TaskId>,
    },
}

/// What to do with tasks that were still running when the process went away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestorePolicy {
    /// 原样保留
    #[default]
    Keep,
    /// 标记为失败
    FailInterrupted,
}
