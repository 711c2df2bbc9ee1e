//! Progress/warning queues and the polling report consumer.
//!
//! The worker pushes records with `try_send` and never blocks on reporting;
//! a separate lightweight task polls both queues on a fixed short interval
//! and forwards records to a [`ReportSink`]. Delivery is best-effort: a full
//! or disconnected queue drops the record.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use parking_lot::Mutex;
use tracing::{info, warn};

use cf_types::{ProgressRecord, WarningRecord};

/// Default capacity for each queue; generous next to the measurement
/// cadence (seconds to minutes per record).
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Default consumer poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Producer side, held by the orchestrator.
#[derive(Debug, Clone)]
pub struct ReportQueues {
    progress: Sender<ProgressRecord>,
    warnings: Sender<WarningRecord>,
}

impl ReportQueues {
    /// Fire-and-forget push; a full or disconnected queue drops the record.
    pub fn push_progress(&self, record: ProgressRecord) {
        let _ = self.progress.try_send(record);
    }

    pub fn push_warning(&self, record: WarningRecord) {
        let _ = self.warnings.try_send(record);
    }
}

/// Consumer side, owned by the report consumer task.
#[derive(Debug)]
pub struct ReportReceivers {
    pub progress: Receiver<ProgressRecord>,
    pub warnings: Receiver<WarningRecord>,
}

/// Create the paired progress/warning queues.
pub fn report_channels(capacity: usize) -> (ReportQueues, ReportReceivers) {
    let (progress_tx, progress_rx) = bounded(capacity);
    let (warning_tx, warning_rx) = bounded(capacity);
    (
        ReportQueues {
            progress: progress_tx,
            warnings: warning_tx,
        },
        ReportReceivers {
            progress: progress_rx,
            warnings: warning_rx,
        },
    )
}

/// Receives forwarded records. Implementations must not block; the consumer
/// shares a runtime with everything else.
pub trait ReportSink: Send + 'static {
    fn on_progress(&mut self, record: ProgressRecord);
    fn on_warning(&mut self, record: WarningRecord);
}

/// Sink that forwards everything to structured logs.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn on_progress(&mut self, record: ProgressRecord) {
        info!(
            strategy = %record.strategy,
            iteration = record.iteration,
            cost = record.cost,
            color = %record.color,
            rates = %record.rates,
            "progress"
        );
    }

    fn on_warning(&mut self, record: WarningRecord) {
        warn!(category = ?record.category, "{}", record.message);
    }
}

/// Sink that collects records in memory, for tests and summaries.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    progress: Arc<Mutex<Vec<ProgressRecord>>>,
    warnings: Arc<Mutex<Vec<WarningRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn progress(&self) -> Vec<ProgressRecord> {
        self.progress.lock().clone()
    }

    pub fn warnings(&self) -> Vec<WarningRecord> {
        self.warnings.lock().clone()
    }
}

impl ReportSink for MemorySink {
    fn on_progress(&mut self, record: ProgressRecord) {
        self.progress.lock().push(record);
    }

    fn on_warning(&mut self, record: WarningRecord) {
        self.warnings.lock().push(record);
    }
}

/// Spawn the report consumer: polls both queues every `poll_interval`,
/// forwards to `sink`, and exits once both producers are gone and the
/// queues are drained.
pub fn spawn_consumer<K: ReportSink>(
    receivers: ReportReceivers,
    mut sink: K,
    poll_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        loop {
            interval.tick().await;

            let mut progress_open = true;
            loop {
                match receivers.progress.try_recv() {
                    Ok(record) => sink.on_progress(record),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        progress_open = false;
                        break;
                    }
                }
            }

            let mut warnings_open = true;
            loop {
                match receivers.warnings.try_recv() {
                    Ok(record) => sink.on_warning(record),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        warnings_open = false;
                        break;
                    }
                }
            }

            if !progress_open && !warnings_open {
                break;
            }
        }
    })
}
