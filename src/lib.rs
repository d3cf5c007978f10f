pub mod config;
pub mod core;
pub mod remote;
pub mod storage;
pub mod utils;

// 重新导出核心类型
pub use crate::core::{
    BatchReport,
    BatchRequest,
    ContainerId,
    FileOutcome,
    LocalFile,
    Orchestrator,
    Result,
    TaskId,
    TaskJournal,
    TaskManager,
    TaskManagerHandle,
    TaskRef,
    UploadError,
    UploadEvent,
    UploadStatus,
    UploadTask,
};

pub use crate::remote::{HttpFolderSnapshot, HttpTransfer, RemoteClient};
pub use crate::storage::{FileStore, MemoryStore};
