use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use courier::core::{
    FolderSnapshot, Notifier, NotifyKind, ObjectId, ProgressCallback, RemoteEntry, RestorePolicy,
    Transfer, TransferError, TransferReceipt, TransferRequest, TransferTarget, UploadSurface,
};
use courier::{
    BatchRequest, ContainerId, FileOutcome, FileStore, LocalFile, MemoryStore, Orchestrator,
    TaskJournal, TaskManager, TaskManagerHandle, UploadError, UploadStatus,
};

/// 模拟上传器 - 用于测试
#[derive(Default)]
struct MockTransfer {
    failing: HashSet<String>,
    delay: Duration,
    calls: Mutex<Vec<(String, TransferTarget)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransfer {
    fn failing(names: &[&str]) -> Self {
        Self {
            failing: names.iter().map(|name| name.to_string()).collect(),
            ..Default::default()
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> Vec<(String, TransferTarget)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transfer for MockTransfer {
    async fn transfer(
        &self,
        request: TransferRequest,
        progress: ProgressCallback,
    ) -> Result<TransferReceipt, TransferError> {
        self.calls.lock().push((request.file.name.clone(), request.target.clone()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        progress(25);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        progress(60);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.failing.contains(&request.file.name) {
            return Err(TransferError::rejected(500, format!("Simulated failure for {}", request.file.name)));
        }

        progress(100);
        Ok(TransferReceipt { object_id: Some(ObjectId::new(format!("obj-{}", request.file.name))) })
    }
}

#[derive(Default)]
struct MockSnapshot {
    entries: Vec<RemoteEntry>,
    unavailable: bool,
    lookups: Mutex<Vec<ContainerId>>,
    invalidated: Mutex<Vec<ContainerId>>,
}

#[async_trait]
impl FolderSnapshot for MockSnapshot {
    async fn snapshot(&self, container: &ContainerId) -> courier::Result<Vec<RemoteEntry>> {
        self.lookups.lock().push(container.clone());
        if self.unavailable {
            return Err(UploadError::internal_error("listing cache offline"));
        }
        Ok(self.entries.clone())
    }

    async fn invalidate(&self, container: &ContainerId) {
        self.invalidated.lock().push(container.clone());
    }
}

#[derive(Default)]
struct RecordingNotifier {
    messages: Mutex<Vec<(NotifyKind, String)>>,
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NotifyKind, text: &str) {
        self.messages.lock().push((kind, text.to_string()));
    }
}

#[derive(Default)]
struct RecordingSurface {
    closed: AtomicUsize,
    navigations: Mutex<Vec<ContainerId>>,
}

impl UploadSurface for RecordingSurface {
    fn close(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    fn navigate_to(&self, container: &ContainerId) {
        self.navigations.lock().push(container.clone());
    }
}

struct Harness {
    handle: TaskManagerHandle,
    transfer: Arc<MockTransfer>,
    snapshot: Arc<MockSnapshot>,
    notifier: Arc<RecordingNotifier>,
    surface: Arc<RecordingSurface>,
}

impl Harness {
    async fn new(transfer: MockTransfer, snapshot: MockSnapshot) -> Self {
        let journal = TaskJournal::new(Arc::new(MemoryStore::new()));
        Self {
            handle: TaskManager::init(journal, RestorePolicy::Keep).await,
            transfer: Arc::new(transfer),
            snapshot: Arc::new(snapshot),
            notifier: Arc::new(RecordingNotifier::default()),
            surface: Arc::new(RecordingSurface::default()),
        }
    }

    fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(
            self.handle.manager.clone(),
            self.transfer.clone(),
            self.snapshot.clone(),
            self.notifier.clone(),
            self.surface.clone(),
        )
    }
}

fn file(name: &str, size: u64) -> LocalFile {
    LocalFile::new(name, size, format!("/data/{name}"))
}

#[tokio::test]
async fn test_case_insensitive_match_appends_version() {
    let snapshot = MockSnapshot {
        entries: vec![RemoteEntry::new("7", "report.pdf")],
        ..Default::default()
    };
    let harness = Harness::new(MockTransfer::default(), snapshot).await;
    let folder = ContainerId::folder("12");

    let report = harness
        .orchestrator()
        .upload_batch(
            BatchRequest::new(vec![file("Report.PDF", 10), file("summary.txt", 3)])
                .viewing(folder.clone())
                .selected(folder.clone()),
        )
        .await;

    assert_eq!(
        harness.transfer.calls(),
        vec![
            ("Report.PDF".to_string(), TransferTarget::AppendVersion(ObjectId::new("7"))),
            ("summary.txt".to_string(), TransferTarget::CreateIn(folder.clone())),
        ]
    );
    assert_eq!(report.outcomes, vec![FileOutcome::Updated, FileOutcome::Created]);
    assert_eq!(*harness.snapshot.lookups.lock(), vec![folder.clone()]);

    let messages = harness.notifier.messages.lock().clone();
    assert_eq!(
        messages,
        vec![
            (NotifyKind::Success, "\"Report.PDF\" updated".to_string()),
            (NotifyKind::Success, "\"summary.txt\" uploaded".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_failure_does_not_abort_batch() {
    let harness = Harness::new(MockTransfer::failing(&["two.txt"]), MockSnapshot::default()).await;

    let report = harness
        .orchestrator()
        .upload_batch(BatchRequest::new(vec![file("one.txt", 1), file("two.txt", 2), file("three.txt", 3)]))
        .await;

    let tasks = harness.handle.manager.tasks().await.unwrap();
    let statuses: Vec<_> = tasks.iter().map(|task| task.status).collect();
    assert_eq!(statuses, vec![UploadStatus::Success, UploadStatus::Error, UploadStatus::Success]);
    assert!(tasks.iter().all(|task| task.completed_at.is_some()));

    // progress == 100 iff success; failed task keeps its last value
    assert_eq!(tasks[0].progress, 100);
    assert_eq!(tasks[1].progress, 60);
    assert_eq!(tasks[2].progress, 100);
    assert!(tasks[1].error.as_deref().unwrap().contains("Simulated failure for two.txt"));

    assert_eq!((report.created(), report.failed()), (2, 1));
    let errors: Vec<_> = harness
        .notifier
        .messages
        .lock()
        .iter()
        .filter(|(kind, _)| *kind == NotifyKind::Error)
        .map(|(_, text)| text.clone())
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Failed to upload \"two.txt\""));
}

#[tokio::test]
async fn test_unselected_batch_goes_to_root_and_navigates() {
    let harness = Harness::new(MockTransfer::default(), MockSnapshot::default()).await;

    let report = harness
        .orchestrator()
        .upload_batch(BatchRequest::new(vec![file("a.txt", 1)]).selected(ContainerId::folder("99")))
        .await;

    assert_eq!(report.target, ContainerId::Root);
    assert_eq!(harness.transfer.calls()[0].1, TransferTarget::CreateIn(ContainerId::Root));
    assert_eq!(*harness.snapshot.invalidated.lock(), vec![ContainerId::Root]);
    assert_eq!(harness.surface.closed.load(Ordering::SeqCst), 1);
    assert_eq!(*harness.surface.navigations.lock(), vec![ContainerId::Root]);
}

#[tokio::test]
async fn test_no_navigation_when_already_viewing_target() {
    let harness = Harness::new(MockTransfer::default(), MockSnapshot::default()).await;
    let folder = ContainerId::folder("5");

    harness
        .orchestrator()
        .upload_batch(
            BatchRequest::new(vec![file("a.txt", 1)])
                .viewing(folder.clone())
                .selected(folder.clone()),
        )
        .await;

    assert_eq!(harness.surface.closed.load(Ordering::SeqCst), 1);
    assert!(harness.surface.navigations.lock().is_empty());
    assert_eq!(*harness.snapshot.invalidated.lock(), vec![folder]);
}

#[tokio::test]
async fn test_snapshot_failure_falls_back_to_create() {
    let snapshot = MockSnapshot {
        entries: vec![RemoteEntry::new("7", "report.pdf")],
        unavailable: true,
        ..Default::default()
    };
    let harness = Harness::new(MockTransfer::default(), snapshot).await;

    let report = harness
        .orchestrator()
        .upload_batch(BatchRequest::new(vec![file("report.pdf", 4)]))
        .await;

    assert_eq!(report.outcomes, vec![FileOutcome::Created]);
    assert_eq!(harness.transfer.calls()[0].1, TransferTarget::CreateIn(ContainerId::Root));
}

#[tokio::test]
async fn test_same_name_and_size_do_not_cross_update() {
    let transfer = MockTransfer::failing(&["dup.bin"]).with_delay(Duration::from_millis(10));
    let harness = Harness::new(transfer, MockSnapshot::default()).await;
    let orchestrator = harness.orchestrator().with_max_concurrent(2);

    orchestrator.upload_batch(BatchRequest::new(vec![file("ok.bin", 5)])).await;
    let report = orchestrator
        .upload_batch(BatchRequest::new(vec![file("dup.bin", 8), file("dup.bin", 8)]))
        .await;

    let tasks = harness.handle.manager.tasks().await.unwrap();
    assert_eq!(tasks.len(), 3);
    for task_id in &report.task_ids {
        let task = tasks.iter().find(|task| task.id == *task_id).unwrap();
        assert_eq!(task.status, UploadStatus::Error);
        assert_eq!(task.progress, 60);
    }
}

#[tokio::test]
async fn test_sequential_by_default() {
    let transfer = MockTransfer::default().with_delay(Duration::from_millis(20));
    let harness = Harness::new(transfer, MockSnapshot::default()).await;

    harness
        .orchestrator()
        .upload_batch(BatchRequest::new(vec![file("a", 1), file("b", 2), file("c", 3)]))
        .await;

    assert_eq!(harness.transfer.max_in_flight.load(Ordering::SeqCst), 1);
    let names: Vec<_> = harness.transfer.calls().into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_bounded_pool_keeps_order_and_independence() {
    let transfer = MockTransfer::failing(&["b"]).with_delay(Duration::from_millis(20));
    let harness = Harness::new(transfer, MockSnapshot::default()).await;

    let report = harness
        .orchestrator()
        .with_max_concurrent(2)
        .upload_batch(BatchRequest::new(vec![file("a", 1), file("b", 2), file("c", 3), file("d", 4)]))
        .await;

    assert!(harness.transfer.max_in_flight.load(Ordering::SeqCst) <= 2);
    assert_eq!(
        report.outcomes,
        vec![
            FileOutcome::Created,
            FileOutcome::Failed("Server rejected upload: status code 500, message: Simulated failure for b".to_string()),
            FileOutcome::Created,
            FileOutcome::Created,
        ]
    );

    let names: Vec<_> = harness
        .handle
        .manager
        .tasks()
        .await
        .unwrap()
        .into_iter()
        .map(|task| task.file_name)
        .collect();
    assert_eq!(names, vec!["a", "b", "c", "d"]);
}

#[tokio::test]
async fn test_cancelled_batch_skips_unstarted_files() {
    let harness = Harness::new(MockTransfer::default(), MockSnapshot::default()).await;
    let token = CancellationToken::new();
    token.cancel();

    let report = harness
        .orchestrator()
        .with_cancellation(token)
        .upload_batch(BatchRequest::new(vec![file("a", 1), file("b", 2)]))
        .await;

    assert_eq!(report.cancelled(), 2);
    assert!(harness.transfer.calls().is_empty());
    let tasks = harness.handle.manager.tasks().await.unwrap();
    assert!(tasks.iter().all(|task| task.status == UploadStatus::Error && task.progress == 0));
    assert_eq!(tasks[0].error.as_deref(), Some("Upload cancelled"));
}

#[tokio::test]
async fn test_clear_completed_after_batch() {
    let harness = Harness::new(MockTransfer::failing(&["b"]), MockSnapshot::default()).await;
    let manager = harness.handle.manager.clone();
    let pending = manager.create_batch(vec![file("later", 9)], ContainerId::Root).await.unwrap();

    harness
        .orchestrator()
        .upload_batch(BatchRequest::new(vec![file("a", 1), file("b", 2)]))
        .await;

    assert_eq!(manager.clear_completed().await.unwrap(), 2);
    let tasks = manager.tasks().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, pending[0]);
    assert_eq!(tasks[0].status, UploadStatus::Pending);
}

#[tokio::test]
async fn test_tasks_survive_reload_from_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let journal = TaskJournal::new(Arc::new(FileStore::new(dir.path())));

    let handle = TaskManager::init(journal.clone(), RestorePolicy::Keep).await;
    let orchestrator = Orchestrator::new(
        handle.manager.clone(),
        Arc::new(MockTransfer::failing(&["bad.txt"])),
        Arc::new(MockSnapshot::default()),
        Arc::new(RecordingNotifier::default()),
        Arc::new(RecordingSurface::default()),
    );
    orchestrator
        .upload_batch(BatchRequest::new(vec![file("good.txt", 1), file("bad.txt", 2)]))
        .await;
    let before = handle.manager.tasks().await.unwrap();
    drop(orchestrator);
    handle.dispose().await.unwrap();

    let handle = TaskManager::init(journal, RestorePolicy::Keep).await;
    let after = handle.manager.tasks().await.unwrap();
    assert_eq!(after, before);
    assert_eq!(after[1].error.as_deref().map(|e| e.contains("bad.txt")), Some(true));
    handle.dispose().await.unwrap();
}
