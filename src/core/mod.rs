mod errors;
mod journal;
mod manager;
mod manager_worker;
mod orchestrator;
mod store;
mod task;
mod traits;
mod types;

pub use errors::{Result, StorageError, TransferError, UploadError};
pub use journal::{TaskJournal, DEFAULT_STORAGE_KEY};
pub use manager::{TaskManager, TaskManagerHandle};
pub use orchestrator::{plan_target, resolve_target, BatchReport, BatchRequest, FileOutcome, Orchestrator};
pub use store::{Change, TaskStore};
pub use task::UploadTask;
pub use traits::{
    DetachedSurface,
    FolderSnapshot,
    KeyValueStore,
    LogNotifier,
    Notifier,
    ProgressCallback,
    Transfer,
    UploadSurface,
};
pub use types::{
    ContainerId,
    LocalFile,
    NotifyKind,
    ObjectId,
    RemoteEntry,
    RestorePolicy,
    TaskId,
    TaskRef,
    TransferReceipt,
    TransferRequest,
    TransferTarget,
    UploadEvent,
    UploadStatus,
};
