//! Buffer/flush engine.
//!
//! Records are pushed into an in-memory buffer guarded by a mutex together
//! with the flush timer state. A flush swaps the buffer out in one step and
//! hands the snapshot to a single writer task, which joins the rendered
//! lines, splits them into append-sized blocks and writes them to the
//! current destination blob one block at a time.
//!
//! Because every snapshot is queued while the buffer lock is held and a
//! single task drains the queue, flushes reach the sink in the same order
//! their records were pushed and never overlap, even when a timer flush and
//! a threshold flush are triggered back to back.

use crate::chunk::{self, MAX_APPEND_BLOCK_SIZE};
use crate::error::{ConfigError, SinkError};
use crate::naming::{Clock, Destination, SystemClock};
use crate::record::LogRecord;
use crate::sink::AppendSink;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Target of the crate's own diagnostics. The layer never ships events
/// with this target.
pub const DIAGNOSTIC_TARGET: &str = "tracing_append_blob";

/// When buffered records are flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    /// `< 1` or `1`: flush on every record. `> 1`: flush once this many
    /// records are buffered.
    pub buffer_log_size: i64,
    /// Maximum time a record waits in the buffer. Zero disables the timer.
    pub sync_timeout: Duration,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self { buffer_log_size: -1, sync_timeout: Duration::ZERO }
    }
}

impl FlushPolicy {
    pub fn new(buffer_log_size: i64, sync_timeout: Duration) -> Self {
        Self { buffer_log_size, sync_timeout }
    }

    /// A buffer larger than one record needs a timer, otherwise a quiet
    /// producer would leave records buffered forever.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_log_size > 1 && self.sync_timeout.is_zero() {
            return Err(ConfigError::SyncTimeoutRequired { buffer_log_size: self.buffer_log_size });
        }
        Ok(())
    }

    fn flushes_at(&self, buffered: usize) -> bool {
        self.buffer_log_size < 1 || i64::try_from(buffered).map_or(true, |n| n >= self.buffer_log_size)
    }

    fn timer_enabled(&self) -> bool {
        !self.sync_timeout.is_zero()
    }
}

/// State of the engine's single flush timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Armed,
}

struct EngineState {
    buffer: Vec<LogRecord>,
    timer: TimerState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushReason {
    Threshold,
    Timer,
    Manual,
}

struct FlushJob {
    records: Vec<LogRecord>,
    reason: FlushReason,
    done: Option<oneshot::Sender<FlushReport>>,
}

/// What a single flush wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Blob the flush was written to, `None` for an empty flush.
    pub destination: Option<String>,
    pub records: usize,
    pub bytes: usize,
    pub chunks: usize,
    /// Chunks whose create or append call failed. Those bytes are lost.
    pub failed_chunks: usize,
}

/// Counters maintained by the engine.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    records_pushed: AtomicU64,
    flushes: AtomicU64,
    records_flushed: AtomicU64,
    chunks_appended: AtomicU64,
    chunks_failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_pushed: u64,
    pub flushes: u64,
    pub records_flushed: u64,
    pub chunks_appended: u64,
    pub chunks_failed: u64,
}

impl EngineMetrics {
    fn record_flush(&self, report: &FlushReport) {
        if report.records == 0 {
            return;
        }
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.records_flushed.fetch_add(report.records as u64, Ordering::Relaxed);
        self.chunks_appended.fetch_add((report.chunks - report.failed_chunks) as u64, Ordering::Relaxed);
        self.chunks_failed.fetch_add(report.failed_chunks as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_pushed: self.records_pushed.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            records_flushed: self.records_flushed.load(Ordering::Relaxed),
            chunks_appended: self.chunks_appended.load(Ordering::Relaxed),
            chunks_failed: self.chunks_failed.load(Ordering::Relaxed),
        }
    }
}

/// Writes flush snapshots to an [`AppendSink`].
pub struct BlobWriter {
    sink: Arc<dyn AppendSink>,
    destination: Destination,
    eol: String,
    max_block_size: usize,
    clock: Arc<dyn Clock>,
}

impl BlobWriter {
    pub fn new(sink: Arc<dyn AppendSink>, destination: Destination) -> Self {
        Self {
            sink,
            destination,
            eol: "\n".to_string(),
            max_block_size: MAX_APPEND_BLOCK_SIZE,
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_eol(mut self, eol: impl Into<String>) -> Self {
        self.eol = eol.into();
        self
    }

    #[must_use]
    pub fn with_max_block_size(mut self, max_block_size: usize) -> Self {
        self.max_block_size = max_block_size;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.destination.blob_name.is_empty() {
            return Err(ConfigError::EmptyName("blobName"));
        }
        if self.max_block_size == 0 || self.max_block_size > MAX_APPEND_BLOCK_SIZE {
            return Err(ConfigError::BlockSizeOutOfRange { value: self.max_block_size, max: MAX_APPEND_BLOCK_SIZE });
        }
        Ok(())
    }

    /// Append `records` to the destination that is current right now.
    ///
    /// Every chunk is attempted, in order, even when an earlier one failed;
    /// failures are logged and counted in the returned report.
    pub async fn write(&self, records: &[LogRecord]) -> FlushReport {
        if records.is_empty() {
            return FlushReport::default();
        }

        let mut payload = records
            .iter()
            .map(|record| record.rendered.as_str())
            .collect::<Vec<_>>()
            .join(&self.eol);
        payload.push_str(&self.eol);

        let destination = self.destination.name(&*self.clock);
        let chunks = chunk::split(&payload, self.max_block_size);
        tracing::debug!(
            target: DIAGNOSTIC_TARGET,
            destination = %destination,
            records = records.len(),
            bytes = payload.len(),
            chunks = chunks.len(),
            "appending flush to blob"
        );

        let mut failed_chunks = 0;
        for (index, chunk) in chunks.iter().enumerate() {
            if let Err(e) = self.append_chunk(&destination, chunk.as_bytes()).await {
                failed_chunks += 1;
                tracing::warn!(
                    target: DIAGNOSTIC_TARGET,
                    destination = %destination,
                    chunk = index,
                    bytes = chunk.len(),
                    error = %e,
                    "dropping log chunk after failed append"
                );
            }
        }

        FlushReport {
            destination: Some(destination),
            records: records.len(),
            bytes: payload.len(),
            chunks: chunks.len(),
            failed_chunks,
        }
    }

    async fn append_chunk(&self, destination: &str, block: &[u8]) -> Result<(), SinkError> {
        self.sink.ensure_exists(destination).await?;
        let outcome = self.sink.append_block(destination, block).await?;
        if let Some(code) = outcome.error_code {
            tracing::debug!(target: DIAGNOSTIC_TARGET, destination, code = %code, "append block reported an error code");
        }
        Ok(())
    }
}

struct Shared {
    policy: FlushPolicy,
    state: Mutex<EngineState>,
    jobs: mpsc::UnboundedSender<FlushJob>,
    runtime: Handle,
    metrics: EngineMetrics,
}

impl Shared {
    // Callers hold the state lock, which keeps the queue in snapshot order.
    fn dispatch(&self, job: FlushJob) {
        if let Err(mpsc::error::SendError(job)) = self.jobs.send(job) {
            tracing::warn!(
                target: DIAGNOSTIC_TARGET,
                records = job.records.len(),
                "blob writer stopped, dropping flush"
            );
        }
    }

    fn fire_timer(&self) {
        let mut state = self.state.lock();
        state.timer = TimerState::Idle;
        let records = std::mem::take(&mut state.buffer);
        if !records.is_empty() {
            self.dispatch(FlushJob { records, reason: FlushReason::Timer, done: None });
        }
    }
}

/// Completion handle returned by [`FlushEngine::push`].
pub struct PushReceipt {
    flush: Option<oneshot::Receiver<FlushReport>>,
}

/// How a pushed record left [`FlushEngine::push`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// The record is buffered (or queued for a timer flush).
    Buffered,
    /// The push triggered a flush that has now been written.
    Flushed(FlushReport),
    /// The push triggered a flush but the writer task is gone.
    WriterClosed,
}

impl PushReceipt {
    /// `true` if the receipt resolves without waiting for any I/O.
    pub fn is_buffered(&self) -> bool {
        self.flush.is_none()
    }

    pub async fn completed(self) -> PushOutcome {
        match self.flush {
            None => PushOutcome::Buffered,
            Some(rx) => match rx.await {
                Ok(report) => PushOutcome::Flushed(report),
                Err(_) => PushOutcome::WriterClosed,
            },
        }
    }
}

/// Buffers pushed records and flushes them through a [`BlobWriter`].
///
/// Cloning is cheap; all clones share the same buffer and writer.
#[derive(Clone)]
pub struct FlushEngine {
    shared: Arc<Shared>,
}

impl FlushEngine {
    /// Validate `policy` and `writer`, then spawn the writer task.
    ///
    /// The writer task ends once every clone of the engine is dropped and
    /// the remaining queued flushes are written.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn new(policy: FlushPolicy, writer: BlobWriter) -> Result<(Self, JoinHandle<()>), ConfigError> {
        policy.validate()?;
        writer.validate()?;

        let runtime = Handle::current();
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            policy,
            state: Mutex::new(EngineState { buffer: Vec::new(), timer: TimerState::Idle }),
            jobs: tx,
            runtime: runtime.clone(),
            metrics: EngineMetrics::default(),
        });

        let shared_bg = Arc::downgrade(&shared);
        let handle = runtime.spawn(async move {
            let mut rx = rx;
            while let Some(job) = rx.recv().await {
                tracing::debug!(
                    target: DIAGNOSTIC_TARGET,
                    reason = ?job.reason,
                    records = job.records.len(),
                    "flush started"
                );
                let report = writer.write(&job.records).await;
                if let Some(shared) = shared_bg.upgrade() {
                    shared.metrics.record_flush(&report);
                }
                if let Some(done) = job.done {
                    let _ = done.send(report);
                }
            }
        });

        Ok((Self { shared }, handle))
    }

    /// Buffer `record` and flush according to the policy.
    ///
    /// Never blocks on I/O. When the push fills the buffer the returned
    /// receipt resolves after that flush was written; otherwise it resolves
    /// immediately.
    pub fn push(&self, record: LogRecord) -> PushReceipt {
        let shared = &self.shared;
        shared.metrics.records_pushed.fetch_add(1, Ordering::Relaxed);

        let mut state = shared.state.lock();
        state.buffer.push(record);

        if shared.policy.flushes_at(state.buffer.len()) {
            let records = std::mem::take(&mut state.buffer);
            let (done, rx) = oneshot::channel();
            shared.dispatch(FlushJob { records, reason: FlushReason::Threshold, done: Some(done) });
            return PushReceipt { flush: Some(rx) };
        }

        if shared.policy.timer_enabled() && state.timer == TimerState::Idle {
            state.timer = TimerState::Armed;
            let timeout = shared.policy.sync_timeout;
            let shared_timer = Arc::clone(shared);
            shared.runtime.spawn(async move {
                tokio::time::sleep(timeout).await;
                shared_timer.fire_timer();
            });
        }

        PushReceipt { flush: None }
    }

    /// Flush whatever is buffered and wait until it, and every flush queued
    /// before it, has been written.
    pub async fn flush(&self) -> FlushReport {
        let rx = {
            let mut state = self.shared.state.lock();
            let records = std::mem::take(&mut state.buffer);
            let (done, rx) = oneshot::channel();
            self.shared.dispatch(FlushJob { records, reason: FlushReason::Manual, done: Some(done) });
            rx
        };
        rx.await.unwrap_or_default()
    }

    pub fn buffered_len(&self) -> usize {
        self.shared.state.lock().buffer.len()
    }

    pub fn timer_state(&self) -> TimerState {
        self.shared.state.lock().timer
    }

    pub fn policy(&self) -> FlushPolicy {
        self.shared.policy
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.shared.runtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_sink::{MemorySink, SinkCall};
    use crate::naming::FixedClock;
    use crate::sink::AppendOutcome;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::AtomicUsize;

    fn record(line: &str) -> LogRecord {
        LogRecord::from_line("INFO", line)
    }

    fn engine(policy: FlushPolicy, sink: Arc<dyn AppendSink>) -> FlushEngine {
        let writer = BlobWriter::new(sink, Destination::new("app"));
        FlushEngine::new(policy, writer).unwrap().0
    }

    fn block_texts(sink: &MemorySink) -> Vec<String> {
        sink.blocks().into_iter().map(|(_, b)| String::from_utf8(b).unwrap()).collect()
    }

    /// Memory sink whose n-th append (0-based) fails.
    struct FlakySink {
        inner: MemorySink,
        fail_append: Vec<usize>,
        fail_create: bool,
        appends: AtomicUsize,
    }

    impl FlakySink {
        fn failing_appends(fail_append: Vec<usize>) -> Self {
            Self { inner: MemorySink::new(), fail_append, fail_create: false, appends: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl AppendSink for FlakySink {
        async fn ensure_exists(&self, destination: &str) -> Result<(), SinkError> {
            if self.fail_create {
                return Err(SinkError::create(destination, "AuthorizationFailure"));
            }
            self.inner.ensure_exists(destination).await
        }

        async fn append_block(&self, destination: &str, block: &[u8]) -> Result<AppendOutcome, SinkError> {
            let n = self.appends.fetch_add(1, Ordering::SeqCst);
            if self.fail_append.contains(&n) {
                return Err(SinkError::append(destination, "ServerBusy"));
            }
            self.inner.append_block(destination, block).await
        }
    }

    #[test]
    fn buffered_policy_requires_timeout() {
        assert!(matches!(
            FlushPolicy::new(5, Duration::ZERO).validate(),
            Err(ConfigError::SyncTimeoutRequired { buffer_log_size: 5 })
        ));
        assert!(FlushPolicy::new(5, Duration::from_secs(1)).validate().is_ok());
        assert!(FlushPolicy::new(1, Duration::ZERO).validate().is_ok());
        assert!(FlushPolicy::new(-1, Duration::ZERO).validate().is_ok());
        assert!(FlushPolicy::default().validate().is_ok());
    }

    #[tokio::test]
    async fn construction_rejects_invalid_policy() {
        let writer = BlobWriter::new(Arc::new(MemorySink::new()), Destination::new("app"));
        assert!(FlushEngine::new(FlushPolicy::new(5, Duration::ZERO), writer).is_err());
    }

    #[tokio::test]
    async fn construction_rejects_invalid_writer() {
        let sink: Arc<dyn AppendSink> = Arc::new(MemorySink::new());
        let writer = BlobWriter::new(sink.clone(), Destination::new(""));
        assert!(matches!(
            FlushEngine::new(FlushPolicy::default(), writer),
            Err(ConfigError::EmptyName("blobName"))
        ));
        let writer = BlobWriter::new(sink, Destination::new("app")).with_max_block_size(MAX_APPEND_BLOCK_SIZE + 1);
        assert!(matches!(
            FlushEngine::new(FlushPolicy::default(), writer),
            Err(ConfigError::BlockSizeOutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn unbounded_policy_flushes_every_record() {
        let sink = Arc::new(MemorySink::new());
        let engine = engine(FlushPolicy::new(-1, Duration::ZERO), sink.clone());

        for line in ["first", "second", "third"] {
            match engine.push(record(line)).completed().await {
                PushOutcome::Flushed(report) => {
                    assert_eq!(report.records, 1);
                    assert_eq!(report.chunks, 1);
                }
                other => panic!("expected a flush, got {:?}", other),
            }
        }

        assert_eq!(block_texts(&sink), vec!["first\n", "second\n", "third\n"]);
        assert_eq!(sink.contents("app").as_deref(), Some("first\nsecond\nthird\n"));
    }

    #[tokio::test]
    async fn size_one_flushes_each_push_in_order() {
        let sink = Arc::new(MemorySink::new());
        let engine = engine(FlushPolicy::new(1, Duration::ZERO), sink.clone());

        let receipts: Vec<_> = (0..5).map(|i| engine.push(record(&format!("line {i}")))).collect();
        assert!(receipts.iter().all(|r| !r.is_buffered()));
        for receipt in receipts {
            assert!(matches!(receipt.completed().await, PushOutcome::Flushed(FlushReport { records: 1, .. })));
        }

        let expected: Vec<_> = (0..5).map(|i| format!("line {i}\n")).collect();
        assert_eq!(block_texts(&sink), expected);
        assert_eq!(engine.metrics().flushes, 5);
    }

    #[tokio::test]
    async fn threshold_flushes_all_buffered_records_once() {
        let sink = Arc::new(MemorySink::new());
        let engine = engine(FlushPolicy::new(3, Duration::from_secs(60)), sink.clone());

        assert_eq!(engine.push(record("a")).completed().await, PushOutcome::Buffered);
        assert_eq!(engine.push(record("b")).completed().await, PushOutcome::Buffered);
        assert_eq!(engine.buffered_len(), 2);
        assert!(sink.blocks().is_empty());

        let receipt = engine.push(record("c"));
        assert_eq!(engine.buffered_len(), 0);
        match receipt.completed().await {
            PushOutcome::Flushed(report) => {
                assert_eq!(report.records, 3);
                assert_eq!(report.destination.as_deref(), Some("app"));
            }
            other => panic!("expected a flush, got {:?}", other),
        }
        assert_eq!(block_texts(&sink), vec!["a\nb\nc\n"]);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_flushes_buffered_records_and_rearms() {
        let sink = Arc::new(MemorySink::new());
        let engine = engine(FlushPolicy::new(10, Duration::from_secs(1)), sink.clone());

        engine.push(record("a"));
        engine.push(record("b"));
        assert_eq!(engine.timer_state(), TimerState::Armed);
        assert!(sink.blocks().is_empty());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        // barrier: waits for the timer flush queued before it
        assert_eq!(engine.flush().await.records, 0);
        assert_eq!(engine.timer_state(), TimerState::Idle);
        assert_eq!(engine.buffered_len(), 0);
        assert_eq!(block_texts(&sink), vec!["a\nb\n"]);

        engine.push(record("c"));
        assert_eq!(engine.timer_state(), TimerState::Armed);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        engine.flush().await;
        assert_eq!(block_texts(&sink), vec!["a\nb\n", "c\n"]);
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_timer_is_armed_at_a_time() {
        let sink = Arc::new(MemorySink::new());
        let engine = engine(FlushPolicy::new(100, Duration::from_secs(1)), sink.clone());

        engine.push(record("a"));
        tokio::time::sleep(Duration::from_millis(600)).await;
        engine.push(record("b"));
        // first timer fires at 1s and takes both records
        tokio::time::sleep(Duration::from_millis(500)).await;
        engine.flush().await;
        assert_eq!(block_texts(&sink), vec!["a\nb\n"]);
    }

    #[tokio::test]
    async fn flushes_are_written_in_dispatch_order() {
        let sink = Arc::new(MemorySink::new());
        let engine = engine(FlushPolicy::new(2, Duration::from_secs(60)), sink.clone());

        let receipts: Vec<_> = ["a", "b", "c", "d", "e"].iter().map(|l| engine.push(record(l))).collect();
        let report = engine.flush().await;
        assert_eq!(report.records, 1);
        drop(receipts);

        assert_eq!(block_texts(&sink), vec!["a\nb\n", "c\nd\n", "e\n"]);
    }

    #[tokio::test]
    async fn failed_chunk_does_not_stop_the_next_one() {
        let sink = Arc::new(FlakySink::failing_appends(vec![0]));
        let writer = BlobWriter::new(sink.clone(), Destination::new("app")).with_max_block_size(4);
        let (engine, _) = FlushEngine::new(FlushPolicy::new(1, Duration::ZERO), writer).unwrap();

        // "abcdef\n" -> "abcd", "ef\n"
        let outcome = engine.push(record("abcdef")).completed().await;
        match outcome {
            PushOutcome::Flushed(report) => {
                assert_eq!(report.chunks, 2);
                assert_eq!(report.failed_chunks, 1);
            }
            other => panic!("expected a flush, got {:?}", other),
        }
        assert_eq!(sink.appends.load(Ordering::SeqCst), 2);
        assert_eq!(sink.inner.contents("app").as_deref(), Some("ef\n"));

        let metrics = engine.metrics();
        assert_eq!(metrics.chunks_appended, 1);
        assert_eq!(metrics.chunks_failed, 1);
    }

    #[tokio::test]
    async fn create_failures_are_swallowed() {
        let sink = Arc::new(FlakySink { fail_create: true, ..FlakySink::failing_appends(vec![]) });
        let writer = BlobWriter::new(sink.clone(), Destination::new("app")).with_max_block_size(2);
        let (engine, _) = FlushEngine::new(FlushPolicy::default(), writer).unwrap();

        let outcome = engine.push(record("abc")).completed().await;
        assert!(matches!(outcome, PushOutcome::Flushed(FlushReport { chunks: 2, failed_chunks: 2, .. })));
        assert_eq!(sink.appends.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ensures_destination_before_every_chunk() {
        let sink = Arc::new(MemorySink::new());
        let writer = BlobWriter::new(sink.clone(), Destination::new("app")).with_max_block_size(3);
        let (engine, _) = FlushEngine::new(FlushPolicy::default(), writer).unwrap();

        engine.push(record("hello")).completed().await;
        assert_eq!(
            sink.calls(),
            vec![
                SinkCall::EnsureExists("app".into()),
                SinkCall::Append { destination: "app".into(), block: b"hel".to_vec() },
                SinkCall::EnsureExists("app".into()),
                SinkCall::Append { destination: "app".into(), block: b"lo\n".to_vec() },
            ]
        );
    }

    #[tokio::test]
    async fn rotated_destination_and_custom_eol() {
        let sink = Arc::new(MemorySink::new());
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()));
        let destination = Destination::new("app").with_rotate_period("YYYY-MM-DD").with_extension(".log");
        let writer = BlobWriter::new(sink.clone(), destination).with_eol("\r\n").with_clock(clock);
        let (engine, _) = FlushEngine::new(FlushPolicy::new(2, Duration::from_secs(5)), writer).unwrap();

        engine.push(record("one"));
        engine.push(record("two")).completed().await;
        assert_eq!(sink.contents("app.2024-03-05.log").as_deref(), Some("one\r\ntwo\r\n"));
    }

    #[tokio::test]
    async fn empty_flush_makes_no_remote_call() {
        let sink = Arc::new(MemorySink::new());
        let engine = engine(FlushPolicy::default(), sink.clone());

        assert_eq!(engine.flush().await, FlushReport::default());
        assert!(sink.calls().is_empty());
        assert_eq!(engine.metrics().flushes, 0);
    }

    #[tokio::test]
    async fn writer_stops_after_engine_is_dropped() {
        let sink = Arc::new(MemorySink::new());
        let writer = BlobWriter::new(sink.clone(), Destination::new("app"));
        let (engine, handle) = FlushEngine::new(FlushPolicy::default(), writer).unwrap();

        let receipt = engine.push(record("last"));
        drop(engine);
        handle.await.unwrap();
        assert!(matches!(receipt.completed().await, PushOutcome::Flushed(_)));
        assert_eq!(sink.contents("app").as_deref(), Some("last\n"));
    }
}
