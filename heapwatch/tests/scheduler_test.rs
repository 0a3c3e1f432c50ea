use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use heapwatch::scheduler::{
    reporter::{ChannelReporter, TickFailure},
    SamplingScheduler, SchedulerError, SchedulerOptions,
};
use heapwatch_core::{
    record::row_fields, ClassLoading, Clock, MemoryUsage, MetricReadError, MetricSource,
    PoolUsage, RecordSink, Sample, SnapshotError, SnapshotSink, TriggerPolicy, WriteError,
};

struct FakeSource {
    calls: AtomicU64,
    fail_on: Vec<u64>,
    heap_used: u64,
}

impl FakeSource {
    fn new() -> Self {
        Self::failing_on(vec![])
    }

    fn failing_on(fail_on: Vec<u64>) -> Self {
        Self {
            calls: AtomicU64::new(0),
            fail_on,
            heap_used: 2_000_000_000,
        }
    }
}

#[async_trait]
impl MetricSource for FakeSource {
    async fn read(&self, at: DateTime<Utc>) -> Result<Sample, MetricReadError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.contains(&call) {
            return Err(MetricReadError::Malformed {
                metric: "java.lang:type=Memory".to_string(),
                reason: format!("scripted failure on call {call}"),
            });
        }

        Sample::new(
            at,
            MemoryUsage::new(
                Some(268_435_456),
                self.heap_used,
                4_000_000_000,
                Some(8_000_000_000),
            )
            .unwrap(),
            ClassLoading {
                loaded: 5000,
                total_loaded: 5200,
                unloaded: 200,
            },
            vec![PoolUsage {
                name: "G1 Old Gen".to_string(),
                usage: MemoryUsage::new(Some(0), 1024, 2048, None).unwrap(),
            }],
        )
    }
}

/// Holds every read until the test releases it.
struct GatedSource {
    inner: FakeSource,
    entered: Notify,
    release: Notify,
}

impl GatedSource {
    fn new() -> Self {
        Self {
            inner: FakeSource::new(),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

#[async_trait]
impl MetricSource for GatedSource {
    async fn read(&self, at: DateTime<Utc>) -> Result<Sample, MetricReadError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.read(at).await
    }
}

#[derive(Default)]
struct SinkState {
    open: bool,
    opened: u32,
    closed: u32,
    appends: u64,
    rows: Vec<Vec<String>>,
}

#[derive(Clone, Default)]
struct MemorySink {
    state: Arc<Mutex<SinkState>>,
    fail_open: bool,
    fail_append_on: Vec<u64>,
}

impl MemorySink {
    fn rows(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().rows.clone()
    }

    fn opened(&self) -> u32 {
        self.state.lock().unwrap().opened
    }

    fn closed(&self) -> u32 {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn open(&mut self) -> Result<(), WriteError> {
        if self.fail_open {
            return Err(WriteError::Io {
                path: PathBuf::from("memory"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        let mut state = self.state.lock().unwrap();
        state.open = true;
        state.opened += 1;
        Ok(())
    }

    async fn append(&mut self, sample: &Sample) -> Result<(), WriteError> {
        let mut state = self.state.lock().unwrap();
        if !state.open {
            return Err(WriteError::NotOpen {
                path: PathBuf::from("memory"),
            });
        }
        state.appends += 1;
        if self.fail_append_on.contains(&state.appends) {
            return Err(WriteError::Io {
                path: PathBuf::from("memory"),
                source: std::io::Error::new(std::io::ErrorKind::StorageFull, "disk full"),
            });
        }
        state.rows.push(row_fields(sample));
        Ok(())
    }

    async fn close(&mut self) {
        let mut state = self.state.lock().unwrap();
        if state.open {
            state.open = false;
            state.closed += 1;
        }
    }

    fn destination(&self) -> String {
        "memory".to_string()
    }
}

#[derive(Default)]
struct RecordingSnapshots {
    paths: Mutex<Vec<PathBuf>>,
    reject: bool,
}

impl RecordingSnapshots {
    fn paths(&self) -> Vec<PathBuf> {
        self.paths.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotSink for RecordingSnapshots {
    async fn capture(&self, path: &Path) -> Result<(), SnapshotError> {
        self.paths.lock().unwrap().push(path.to_path_buf());
        if self.reject {
            return Err(SnapshotError::Rejected {
                path: path.to_path_buf(),
                status: 500,
                message: "java.io.IOException".to_string(),
            });
        }
        Ok(())
    }
}

struct FixedClock(DateTime<Utc>);

impl FixedClock {
    fn at_secs(secs: i64) -> Arc<Self> {
        Arc::new(Self(DateTime::from_timestamp(secs, 0).unwrap()))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn options() -> SchedulerOptions {
    SchedulerOptions {
        heap_dump_dir: PathBuf::from("dumps"),
        ..SchedulerOptions::default()
    }
}

/// 30 s past the minute lies outside the capture window.
fn scheduler(
    source: FakeSource,
    sink: &MemorySink,
    snapshots: &Arc<RecordingSnapshots>,
) -> SamplingScheduler {
    SamplingScheduler::new(
        Arc::new(source),
        snapshots.clone(),
        Box::new(sink.clone()),
        options(),
    )
    .with_clock(FixedClock::at_secs(30))
}

#[tokio::test(start_paused = true)]
async fn test_each_tick_writes_one_row() {
    let sink = MemorySink::default();
    let snapshots = Arc::new(RecordingSnapshots::default());
    let scheduler = scheduler(FakeSource::new(), &sink, &snapshots);

    scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(25)).await;
    let stats = scheduler.stop().await.unwrap();

    assert_eq!(stats.ticks, 3);
    assert_eq!(stats.samples_written, 3);
    assert_eq!(sink.rows().len(), 3);
    assert_eq!(sink.opened(), 1);
    assert_eq!(sink.closed(), 1);
    assert!(snapshots.paths().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_read_failure_skips_only_its_tick() {
    let sink = MemorySink::default();
    let snapshots = Arc::new(RecordingSnapshots::default());
    let (reporter, mut failures) = ChannelReporter::new();
    let scheduler = scheduler(FakeSource::failing_on(vec![2]), &sink, &snapshots)
        .with_reporter(Arc::new(reporter));

    scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(35)).await;
    let stats = scheduler.stop().await.unwrap();

    assert_eq!(stats.ticks, 4);
    assert_eq!(stats.read_failures, 1);
    assert_eq!(sink.rows().len(), 3);

    let failure = failures.try_recv().unwrap();
    assert!(matches!(failure, TickFailure::Read(_)));
    assert!(failure.to_string().contains("scripted failure on call 2"));
    assert!(failures.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_start_while_running_fails_and_keeps_run() {
    let sink = MemorySink::default();
    let snapshots = Arc::new(RecordingSnapshots::default());
    let scheduler = scheduler(FakeSource::new(), &sink, &snapshots);

    scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert!(matches!(
        scheduler.start().await,
        Err(SchedulerError::AlreadyRunning)
    ));
    assert!(scheduler.is_running().await);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let stats = scheduler.stop().await.unwrap();

    assert_eq!(stats.ticks, 2);
    assert_eq!(sink.opened(), 1);
    assert_eq!(sink.rows().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_twice_is_stop_once() {
    let sink = MemorySink::default();
    let snapshots = Arc::new(RecordingSnapshots::default());
    let scheduler = scheduler(FakeSource::new(), &sink, &snapshots);

    assert!(scheduler.stop().await.is_none());

    scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert!(scheduler.stop().await.is_some());
    assert!(scheduler.stop().await.is_none());
    assert_eq!(sink.closed(), 1);
    assert!(!scheduler.is_running().await);
}

#[tokio::test(start_paused = true)]
async fn test_restart_reuses_record_sink() {
    let sink = MemorySink::default();
    let snapshots = Arc::new(RecordingSnapshots::default());
    let scheduler = scheduler(FakeSource::new(), &sink, &snapshots);

    scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    scheduler.stop().await;

    scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    let stats = scheduler.stop().await.unwrap();

    assert_eq!(stats.ticks, 1);
    assert_eq!(sink.opened(), 2);
    assert_eq!(sink.closed(), 2);
    assert_eq!(sink.rows().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_stats_only_while_running() {
    let sink = MemorySink::default();
    let snapshots = Arc::new(RecordingSnapshots::default());
    let scheduler = scheduler(FakeSource::new(), &sink, &snapshots);

    assert!(matches!(
        scheduler.stats().await,
        Err(SchedulerError::NotRunning)
    ));

    scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(15)).await;
    let stats = scheduler.stats().await.unwrap();
    assert_eq!(stats.ticks, 2);
    assert_eq!(stats.started_at, DateTime::from_timestamp(30, 0).unwrap());

    scheduler.stop().await;
    assert!(scheduler.stats().await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_open_failure_leaves_scheduler_stopped() {
    let sink = MemorySink {
        fail_open: true,
        ..MemorySink::default()
    };
    let snapshots = Arc::new(RecordingSnapshots::default());
    let scheduler = scheduler(FakeSource::new(), &sink, &snapshots);

    assert!(matches!(
        scheduler.start().await,
        Err(SchedulerError::OpenRecordSink(_))
    ));
    assert!(!scheduler.is_running().await);
    assert!(scheduler.stop().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_zero_period_is_rejected() {
    let sink = MemorySink::default();
    let scheduler = SamplingScheduler::new(
        Arc::new(FakeSource::new()),
        Arc::new(RecordingSnapshots::default()),
        Box::new(sink.clone()),
        SchedulerOptions {
            period: Duration::ZERO,
            ..options()
        },
    );

    assert!(matches!(
        scheduler.start().await,
        Err(SchedulerError::InvalidPeriod)
    ));
    assert_eq!(sink.opened(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_row_and_single_capture() {
    let sink = MemorySink::default();
    let snapshots = Arc::new(RecordingSnapshots::default());
    let scheduler = SamplingScheduler::new(
        Arc::new(FakeSource::new()),
        snapshots.clone(),
        Box::new(sink.clone()),
        options(),
    )
    .with_clock(FixedClock::at_secs(65));

    scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    let stats = scheduler.stop().await.unwrap();

    let rows = sink.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][2], "1.862645149230957");

    assert_eq!(
        snapshots.paths(),
        vec![PathBuf::from("dumps/heap_dump_65000.hprof")]
    );
    assert_eq!(stats.snapshots_captured, 1);
}

#[tokio::test(start_paused = true)]
async fn test_snapshot_failures_do_not_stop_sampling() {
    let sink = MemorySink::default();
    let snapshots = Arc::new(RecordingSnapshots {
        reject: true,
        ..RecordingSnapshots::default()
    });
    let (reporter, mut failures) = ChannelReporter::new();
    let scheduler = SamplingScheduler::new(
        Arc::new(FakeSource::new()),
        snapshots.clone(),
        Box::new(sink.clone()),
        options(),
    )
    .with_clock(FixedClock::at_secs(65))
    .with_reporter(Arc::new(reporter));

    scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(15)).await;
    let stats = scheduler.stop().await.unwrap();

    assert_eq!(sink.rows().len(), 2);
    assert_eq!(stats.snapshot_failures, 2);
    assert_eq!(stats.snapshots_captured, 0);
    match failures.try_recv().unwrap() {
        TickFailure::Snapshot { path, error } => {
            assert_eq!(path, PathBuf::from("dumps/heap_dump_65000.hprof"));
            assert!(!error.dump_written());
        }
        other => panic!("unexpected failure: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_disabled_trigger_never_captures() {
    let sink = MemorySink::default();
    let snapshots = Arc::new(RecordingSnapshots::default());
    let scheduler = SamplingScheduler::new(
        Arc::new(FakeSource::new()),
        snapshots.clone(),
        Box::new(sink.clone()),
        SchedulerOptions {
            trigger: None,
            ..options()
        },
    )
    .with_clock(FixedClock::at_secs(65));

    scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(25)).await;
    scheduler.stop().await;

    assert_eq!(sink.rows().len(), 3);
    assert!(snapshots.paths().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_custom_trigger_window() {
    let sink = MemorySink::default();
    let snapshots = Arc::new(RecordingSnapshots::default());
    let scheduler = SamplingScheduler::new(
        Arc::new(FakeSource::new()),
        snapshots.clone(),
        Box::new(sink.clone()),
        SchedulerOptions {
            trigger: Some(
                TriggerPolicy::new(Duration::from_secs(20), Duration::from_secs(20)).unwrap(),
            ),
            ..options()
        },
    )
    .with_clock(FixedClock::at_secs(30));

    scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    scheduler.stop().await;

    assert_eq!(snapshots.paths().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_write_failure_is_reported_and_sampling_continues() {
    let sink = MemorySink {
        fail_append_on: vec![2],
        ..MemorySink::default()
    };
    let snapshots = Arc::new(RecordingSnapshots::default());
    let (reporter, mut failures) = ChannelReporter::new();
    let scheduler = SamplingScheduler::new(
        Arc::new(FakeSource::new()),
        snapshots.clone(),
        Box::new(sink.clone()),
        options(),
    )
    .with_clock(FixedClock::at_secs(65))
    .with_reporter(Arc::new(reporter));

    scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(25)).await;
    let stats = scheduler.stop().await.unwrap();

    assert_eq!(stats.ticks, 3);
    assert_eq!(stats.samples_written, 2);
    assert_eq!(stats.write_failures, 1);
    assert_eq!(sink.rows().len(), 2);

    // The capture step still ran on the tick whose row was lost.
    assert_eq!(snapshots.paths().len(), 3);
    assert_eq!(stats.snapshots_captured, 3);

    match failures.try_recv().unwrap() {
        TickFailure::Write(error) => assert!(error.to_string().contains("disk full")),
        other => panic!("unexpected failure: {other:?}"),
    }
    assert!(failures.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_stop_waits_for_in_flight_tick() {
    let sink = MemorySink::default();
    let source = Arc::new(GatedSource::new());
    let scheduler = Arc::new(
        SamplingScheduler::new(
            source.clone(),
            Arc::new(RecordingSnapshots::default()),
            Box::new(sink.clone()),
            options(),
        )
        .with_clock(FixedClock::at_secs(30)),
    );

    scheduler.start().await.unwrap();
    source.entered.notified().await;

    let stopping = tokio::spawn({
        let scheduler = scheduler.clone();
        async move { scheduler.stop().await }
    });

    // Well past the period: the read is still pending, so stop is too.
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert!(!stopping.is_finished());
    assert_eq!(sink.closed(), 0);

    source.release.notify_one();
    let stats = stopping.await.unwrap().unwrap();

    assert_eq!(stats.ticks, 1);
    assert_eq!(stats.samples_written, 1);
    assert_eq!(sink.rows().len(), 1);
    assert_eq!(sink.closed(), 1);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(source.inner.calls.load(Ordering::SeqCst), 1);
    assert_eq!(sink.rows().len(), 1);
    assert!(!scheduler.is_running().await);
}
