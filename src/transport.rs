use crate::config::TransportOptions;
use crate::engine::{BlobWriter, FlushEngine, FlushReport, PushOutcome};
use crate::error::ConfigError;
use crate::naming::{self, Clock, SystemClock};
use crate::record::LogRecord;
use crate::sink::AppendSink;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

#[cfg(feature = "azure")]
use crate::azure::{AzureAppendBlobSink, AzureBlobConfig};

/// Capacity of the "logged" notification channel. Slow subscribers miss
/// the oldest notifications rather than slowing down logging.
const LOGGED_CHANNEL_CAPACITY: usize = 1024;

/// Notification sent once a record was accepted by the transport.
///
/// Acceptance means buffered or, when the record triggered a flush, that
/// the flush was attempted. It does not mean the record is durable.
#[derive(Debug, Clone)]
pub struct LoggedEvent {
    pub record: LogRecord,
}

/// Log transport that buffers records and appends them to blobs.
///
/// Owns a [`FlushEngine`] and adds the "logged" notification on top of it.
pub struct BlobTransport {
    engine: FlushEngine,
    logged: broadcast::Sender<LoggedEvent>,
}

impl BlobTransport {
    /// Validate `options` and start a transport writing to `sink`.
    ///
    /// **Returns**
    /// - the transport and the handle of its writer task.
    /// - `Err(ConfigError)` for an invalid credential, empty names, a bad
    ///   block size or a buffer size without `sync_timeout`.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn new(options: &TransportOptions, sink: Arc<dyn AppendSink>) -> Result<(Self, JoinHandle<()>), ConfigError> {
        Self::with_clock(options, sink, Arc::new(SystemClock))
    }

    /// Like [`BlobTransport::new`] with an explicit clock for rotation.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn with_clock(
        options: &TransportOptions,
        sink: Arc<dyn AppendSink>,
        clock: Arc<dyn Clock>,
    ) -> Result<(Self, JoinHandle<()>), ConfigError> {
        options.validate()?;

        let writer = BlobWriter::new(sink, options.destination())
            .with_eol(options.eol.clone())
            .with_max_block_size(options.max_block_size)
            .with_clock(clock);
        let (engine, handle) = FlushEngine::new(options.flush_policy(), writer)?;
        let (logged, _) = broadcast::channel(LOGGED_CHANNEL_CAPACITY);

        Ok((Self { engine, logged }, handle))
    }

    /// Start a transport writing to Azure append blobs in
    /// `options.container_name`.
    #[cfg(feature = "azure")]
    pub fn azure(options: &TransportOptions) -> Result<(Self, JoinHandle<()>), ConfigError> {
        let config = AzureBlobConfig::new(&options.account, options.container_name.clone())?;
        Self::new(options, Arc::new(AzureAppendBlobSink::new(config)))
    }

    /// Hand `record` to the engine, then notify "logged" subscribers.
    ///
    /// Resolves immediately when the record is only buffered, or after the
    /// flush it triggered has been written. Sink failures never surface
    /// here.
    pub async fn log(&self, record: LogRecord) -> PushOutcome {
        let event = self.event_for(&record);
        let outcome = self.engine.push(record).completed().await;
        self.emit(event);
        outcome
    }

    /// Non-async [`log`](BlobTransport::log) for callers that cannot await,
    /// such as a `tracing` layer. Safe to call from any thread.
    pub fn log_detached(&self, record: LogRecord) {
        let event = self.event_for(&record);
        let receipt = self.engine.push(record);
        let Some(event) = event else {
            return;
        };
        if receipt.is_buffered() {
            let _ = self.logged.send(event);
            return;
        }

        let logged = self.logged.clone();
        self.engine.runtime().spawn(async move {
            receipt.completed().await;
            let _ = logged.send(event);
        });
    }

    /// Receive a [`LoggedEvent`] for every record logged from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LoggedEvent> {
        self.logged.subscribe()
    }

    /// Name the blob that writes made right now would go to.
    pub fn generate_blob_name(blob_name: &str, rotate_period: &str, extension: Option<&str>) -> String {
        naming::generate_blob_name(blob_name, rotate_period, extension, Utc::now())
    }

    /// Flush buffered records and wait for all queued writes.
    pub async fn close(&self) -> FlushReport {
        self.engine.flush().await
    }

    pub fn engine(&self) -> &FlushEngine {
        &self.engine
    }

    fn event_for(&self, record: &LogRecord) -> Option<LoggedEvent> {
        (self.logged.receiver_count() > 0).then(|| LoggedEvent { record: record.clone() })
    }

    fn emit(&self, event: Option<LoggedEvent>) {
        if let Some(event) = event {
            // no receivers left is fine
            let _ = self.logged.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::AccountCredential;
    use crate::memory_sink::MemorySink;
    use crate::naming::LOG_EXTENSION;

    fn options() -> TransportOptions {
        TransportOptions::new(AccountCredential::sas("https://acct.blob.core.windows.net", "?sv=1"), "logs", "app")
    }

    #[test]
    fn generate_blob_name_without_rotation() {
        assert_eq!(BlobTransport::generate_blob_name("log", "", None), "log");
        assert_eq!(BlobTransport::generate_blob_name("log", "", Some(LOG_EXTENSION)), "log.log");
    }

    #[test]
    fn generate_blob_name_uses_today() {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let name = BlobTransport::generate_blob_name("test_log", "YYYY-MM-DD", Some(LOG_EXTENSION));
        // tolerate a midnight rollover between the two clock reads
        let tomorrow = (Utc::now() + chrono::Duration::days(1)).format("%Y-%m-%d").to_string();
        assert!(name == format!("test_log.{today}.log") || name == format!("test_log.{tomorrow}.log"), "{name}");
    }

    #[tokio::test]
    async fn rejects_invalid_options_eagerly() {
        let sink: Arc<dyn AppendSink> = Arc::new(MemorySink::new());
        let bad_policy = options().with_buffering(5, std::time::Duration::ZERO);
        assert!(matches!(
            BlobTransport::new(&bad_policy, sink.clone()),
            Err(ConfigError::SyncTimeoutRequired { .. })
        ));

        let mut bad_account = options();
        bad_account.account = AccountCredential::sas("", "");
        assert!(matches!(BlobTransport::new(&bad_account, sink), Err(ConfigError::InvalidHost(_))));
    }

    #[tokio::test]
    async fn log_emits_logged_after_push_completes() {
        let sink = Arc::new(MemorySink::new());
        let (transport, _) = BlobTransport::new(&options(), sink.clone()).unwrap();
        let mut logged = transport.subscribe();

        let outcome = transport.log(LogRecord::from_line("INFO", "hello")).await;
        assert!(matches!(outcome, PushOutcome::Flushed(_)));

        let event = logged.recv().await.unwrap();
        assert_eq!(event.record.rendered, "hello");
        assert_eq!(sink.contents("app").as_deref(), Some("hello\n"));
    }

    #[tokio::test]
    async fn detached_log_without_subscribers_spawns_nothing() {
        let sink = Arc::new(MemorySink::new());
        let (transport, _) = BlobTransport::new(&options(), sink.clone()).unwrap();
        let metrics = tokio::runtime::Handle::current().metrics();
        let alive = metrics.num_alive_tasks();

        for i in 0..10 {
            transport.log_detached(LogRecord::from_line("INFO", i.to_string()));
        }
        assert_eq!(metrics.num_alive_tasks(), alive);

        transport.close().await;
        assert_eq!(sink.blocks().len(), 10);
    }

    #[tokio::test]
    async fn detached_log_notifies_subscribers_after_flush() {
        let sink = Arc::new(MemorySink::new());
        let (transport, _) = BlobTransport::new(&options(), sink.clone()).unwrap();
        let mut logged = transport.subscribe();

        transport.log_detached(LogRecord::from_line("INFO", "hello"));
        let event = logged.recv().await.unwrap();
        assert_eq!(event.record.rendered, "hello");
    }

    #[tokio::test]
    async fn log_without_subscribers_still_writes() {
        let sink = Arc::new(MemorySink::new());
        let (transport, _) = BlobTransport::new(&options(), sink.clone()).unwrap();
        transport.log(LogRecord::from_line("INFO", "quiet")).await;
        assert_eq!(sink.contents("app").as_deref(), Some("quiet\n"));
    }
}
