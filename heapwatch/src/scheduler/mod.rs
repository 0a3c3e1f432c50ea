//! The sampling loop.
//!
//! A [`SamplingScheduler`] owns one worker task while running. The worker
//! ticks on a `tokio::time::interval` (first tick immediately) and runs each
//! tick to completion: read, append, then maybe capture. Ticks never overlap
//! and a failure never ends the loop; it is counted and handed to the
//! configured [`FailureReporter`].

pub mod reporter;
pub mod stats;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use chrono::{DateTime, Utc};
use config::ConfigError;
use heapwatch_core::{
    settings::sampler::MissedTick, Clock, MetricSource, RecordSink, SnapshotSink, SystemClock,
    TriggerPolicy, WriteError,
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{error, info, instrument};

use crate::settings::config::Settings;
use crate::stop_flag::StopFlag;
use reporter::{FailureReporter, LogReporter, TickFailure};
use stats::Counters;
pub use stats::RunStats;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Sampling scheduler is already running")]
    AlreadyRunning,

    #[error("Sampling scheduler is not running")]
    NotRunning,

    #[error("Sampling period must be greater than zero")]
    InvalidPeriod,

    #[error("Failed to open record sink: {0}")]
    OpenRecordSink(#[source] WriteError),

    #[error("Record sink was lost when the previous run failed")]
    RecordSinkUnavailable,
}

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub period: Duration,
    pub missed_tick: MissedTick,
    /// `None` disables heap dumps.
    pub trigger: Option<TriggerPolicy>,
    pub heap_dump_dir: PathBuf,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(10),
            missed_tick: MissedTick::default(),
            trigger: Some(TriggerPolicy::default()),
            heap_dump_dir: PathBuf::from("heap_dump"),
        }
    }
}

impl SchedulerOptions {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let trigger = if settings.trigger.enabled {
            Some(settings.trigger_policy()?)
        } else {
            None
        };

        Ok(Self {
            period: settings.sampler.interval.into(),
            missed_tick: settings.sampler.missed_tick,
            trigger,
            heap_dump_dir: settings.output.heap_dump_dir.clone(),
        })
    }
}

/// `<dir>/heap_dump_<epoch-millis>.hprof`
pub fn snapshot_path(dir: &Path, at: DateTime<Utc>) -> PathBuf {
    dir.join(format!("heap_dump_{}.hprof", at.timestamp_millis()))
}

#[derive(Clone)]
struct TickContext {
    source: Arc<dyn MetricSource>,
    snapshot_sink: Arc<dyn SnapshotSink>,
    reporter: Arc<dyn FailureReporter>,
    clock: Arc<dyn Clock>,
    trigger: Option<TriggerPolicy>,
    heap_dump_dir: PathBuf,
    counters: Arc<Counters>,
}

impl TickContext {
    #[instrument(skip(self, sink))]
    async fn tick(&self, tick: u64, sink: &mut dyn RecordSink) {
        Counters::increment(&self.counters.ticks);

        let sample = match self.source.read(self.clock.now()).await {
            Ok(sample) => sample,
            Err(error) => {
                Counters::increment(&self.counters.read_failures);
                self.reporter.report(TickFailure::Read(error));
                return;
            }
        };

        match sink.append(&sample).await {
            Ok(()) => Counters::increment(&self.counters.samples_written),
            Err(error) => {
                Counters::increment(&self.counters.write_failures);
                self.reporter.report(TickFailure::Write(error));
            }
        }

        let Some(trigger) = &self.trigger else {
            return;
        };
        let now = self.clock.now();
        if !trigger.should_capture(now) {
            return;
        }

        let path = snapshot_path(&self.heap_dump_dir, now);
        info!(path = %path.display(), "Capture window reached, requesting heap dump");
        match self.snapshot_sink.capture(&path).await {
            Ok(()) => Counters::increment(&self.counters.snapshots_captured),
            Err(error) => {
                if error.dump_written() {
                    Counters::increment(&self.counters.snapshots_captured);
                } else {
                    Counters::increment(&self.counters.snapshot_failures);
                }
                self.reporter.report(TickFailure::Snapshot { path, error });
            }
        }
    }

    async fn run(
        self,
        mut sink: Box<dyn RecordSink>,
        stop: StopFlag,
        period: Duration,
        missed_tick: MissedTick,
    ) -> Box<dyn RecordSink> {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(missed_tick.into());

        let mut tick = 0;
        loop {
            tokio::select! {
                biased;
                _ = stop.wait() => break,
                _ = interval.tick() => {}
            }
            if stop.is_stopped() {
                break;
            }
            tick += 1;
            self.tick(tick, sink.as_mut()).await;
        }

        sink.close().await;
        sink
    }
}

struct Worker {
    stop: StopFlag,
    handle: JoinHandle<Box<dyn RecordSink>>,
    counters: Arc<Counters>,
    started_at: DateTime<Utc>,
}

enum Lifecycle {
    Stopped(Option<Box<dyn RecordSink>>),
    Running(Worker),
}

pub struct SamplingScheduler {
    source: Arc<dyn MetricSource>,
    snapshot_sink: Arc<dyn SnapshotSink>,
    reporter: Arc<dyn FailureReporter>,
    clock: Arc<dyn Clock>,
    options: SchedulerOptions,
    destination: String,
    lifecycle: Mutex<Lifecycle>,
}

impl SamplingScheduler {
    pub fn new(
        source: Arc<dyn MetricSource>,
        snapshot_sink: Arc<dyn SnapshotSink>,
        record_sink: Box<dyn RecordSink>,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            source,
            snapshot_sink,
            reporter: Arc::new(LogReporter),
            clock: Arc::new(SystemClock),
            options,
            destination: record_sink.destination(),
            lifecycle: Mutex::new(Lifecycle::Stopped(Some(record_sink))),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Opens the record sink and spawns the worker. The first tick fires
    /// right away.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        if self.options.period.is_zero() {
            return Err(SchedulerError::InvalidPeriod);
        }

        let mut lifecycle = self.lifecycle.lock().await;
        let Lifecycle::Stopped(slot) = &mut *lifecycle else {
            return Err(SchedulerError::AlreadyRunning);
        };
        let mut sink = slot.take().ok_or(SchedulerError::RecordSinkUnavailable)?;
        if let Err(e) = sink.open().await {
            *slot = Some(sink);
            return Err(SchedulerError::OpenRecordSink(e));
        }

        let counters = Arc::new(Counters::default());
        let context = TickContext {
            source: self.source.clone(),
            snapshot_sink: self.snapshot_sink.clone(),
            reporter: self.reporter.clone(),
            clock: self.clock.clone(),
            trigger: self.options.trigger,
            heap_dump_dir: self.options.heap_dump_dir.clone(),
            counters: counters.clone(),
        };
        let stop = StopFlag::new();
        let handle = tokio::spawn(context.run(
            sink,
            stop.clone(),
            self.options.period,
            self.options.missed_tick,
        ));

        info!(
            period = ?self.options.period,
            destination = %self.destination,
            snapshots = self.options.trigger.is_some(),
            "Sampling started"
        );

        *lifecycle = Lifecycle::Running(Worker {
            stop,
            handle,
            counters,
            started_at: self.clock.now(),
        });
        Ok(())
    }

    /// Stops ticking, lets an in-flight tick finish and closes the record
    /// sink. Returns the final counters, or `None` if nothing was running.
    pub async fn stop(&self) -> Option<RunStats> {
        let mut lifecycle = self.lifecycle.lock().await;
        if matches!(*lifecycle, Lifecycle::Stopped(_)) {
            return None;
        }
        let Lifecycle::Running(worker) =
            std::mem::replace(&mut *lifecycle, Lifecycle::Stopped(None))
        else {
            return None;
        };

        worker.stop.stop();
        match worker.handle.await {
            Ok(sink) => *lifecycle = Lifecycle::Stopped(Some(sink)),
            Err(e) => error!(error = %e, "Sampling worker failed, record sink lost"),
        }

        let stats = worker.counters.snapshot(worker.started_at);
        info!(
            ticks = stats.ticks,
            samples_written = stats.samples_written,
            read_failures = stats.read_failures,
            write_failures = stats.write_failures,
            snapshots_captured = stats.snapshots_captured,
            snapshot_failures = stats.snapshot_failures,
            "Sampling stopped"
        );
        Some(stats)
    }

    pub async fn stats(&self) -> Result<RunStats, SchedulerError> {
        match &*self.lifecycle.lock().await {
            Lifecycle::Running(worker) => Ok(worker.counters.snapshot(worker.started_at)),
            Lifecycle::Stopped(_) => Err(SchedulerError::NotRunning),
        }
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock().await, Lifecycle::Running(_))
    }
}
