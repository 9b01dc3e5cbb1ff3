use crate::engine::DIAGNOSTIC_TARGET;
use crate::record::{LogRecord, RenderFormat};
use crate::transport::BlobTransport;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// Targets whose events are never shipped: this crate's own diagnostics and
/// the HTTP stack it drives. Shipping them would feed the transport with
/// events caused by the transport.
const IGNORED_TARGET_PREFIXES: &[&str] = &[DIAGNOSTIC_TARGET, "reqwest", "hyper", "h2", "rustls"];

/// `tracing_subscriber` layer that renders events into [`LogRecord`]s and
/// logs them through a [`BlobTransport`].
///
/// Events more verbose than `min_level` are ignored. The layer never waits
/// for I/O: records are buffered by the transport's engine and written by
/// its background task.
pub struct BlobLogLayer {
    transport: Arc<BlobTransport>,
    min_level: Level,
    format: RenderFormat,
    service_name: Option<String>,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Events handed to the transport.
    pub shipped_events: Arc<AtomicU64>,
}

impl BlobLogLayer {
    pub fn new(transport: Arc<BlobTransport>, min_level: Level, format: RenderFormat) -> Self {
        Self {
            transport,
            min_level,
            format,
            service_name: None,
            total_events: Arc::new(AtomicU64::new(0)),
            shipped_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Stamp every record with `service_name`.
    #[must_use]
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    fn ignored(target: &str) -> bool {
        IGNORED_TARGET_PREFIXES.iter().any(|prefix| {
            target
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
        })
    }
}

impl<S> Layer<S> for BlobLogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        let meta = event.metadata();
        if *meta.level() > self.min_level || Self::ignored(meta.target()) {
            return;
        }

        let mut fields = BTreeMap::new();
        let mut message: Option<String> = None;

        let mut visitor = FieldVisitor { fields: &mut fields, message: &mut message };
        event.record(&mut visitor);

        let mut record = LogRecord {
            timestamp: Utc::now(),
            level: meta.level().to_string(),
            target: meta.target().to_string(),
            module_path: meta.module_path().map(|s| s.to_string()),
            file: meta.file().map(|s| s.to_string()),
            line: meta.line(),
            fields,
            message,
            service_name: self.service_name.clone(),
            rendered: String::new(),
        };
        self.format.apply(&mut record);

        self.transport.log_detached(record);
        self.shipped_events.fetch_add(1, Ordering::Relaxed);
    }
}

use tracing::field::{Field, Visit};

pub struct FieldVisitor<'a> {
    pub fields: &'a mut BTreeMap<String, serde_json::Value>,
    pub message: &'a mut Option<String>,
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), serde_json::Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        // format_args! messages arrive here rather than in record_str
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.fields.insert(field.name().to_string(), serde_json::Value::String(format!("{:?}", value)));
        }
    }
}
