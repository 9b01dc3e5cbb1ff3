use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// A single log record accepted by the transport.
///
/// Only [`rendered`](LogRecord::rendered) is written to the blob; the other
/// fields are kept so "logged" subscribers and custom formats can see the
/// structured event.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub target: String,
    pub module_path: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub fields: BTreeMap<String, serde_json::Value>,
    pub message: Option<String>,
    pub service_name: Option<String>,
    /// The line that ends up in the destination blob, without end-of-line.
    pub rendered: String,
}

impl LogRecord {
    /// Record whose rendered line is `line` verbatim.
    pub fn from_line(level: impl Into<String>, line: impl Into<String>) -> Self {
        let line = line.into();
        LogRecord {
            timestamp: Utc::now(),
            level: level.into(),
            target: String::new(),
            module_path: None,
            file: None,
            line: None,
            fields: BTreeMap::new(),
            message: Some(line.clone()),
            service_name: None,
            rendered: line,
        }
    }
}

/// How a [`LogRecord`] is turned into its rendered line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    /// `{"level":"info","message":"...",<fields>}`
    #[default]
    Json,
    /// `<rfc3339> <LEVEL> <target>: <message> key=value ...`
    Plain,
}

/// Keys owned by the JSON line itself. Fields with these names are written
/// as `fields.<name>` instead.
const RESERVED_JSON_KEYS: &[&str] = &["level", "message", "service"];

#[derive(Serialize)]
struct JsonLine<'a> {
    level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    service: Option<&'a str>,
    #[serde(flatten)]
    fields: BTreeMap<Cow<'a, str>, &'a serde_json::Value>,
}

impl RenderFormat {
    pub fn render(&self, record: &LogRecord) -> String {
        match self {
            RenderFormat::Json => {
                let line = JsonLine {
                    level: record.level.to_ascii_lowercase(),
                    message: record.message.as_deref(),
                    service: record.service_name.as_deref(),
                    fields: record
                        .fields
                        .iter()
                        .map(|(key, value)| {
                            let key = if RESERVED_JSON_KEYS.contains(&key.as_str()) {
                                Cow::Owned(format!("fields.{}", key))
                            } else {
                                Cow::Borrowed(key.as_str())
                            };
                            (key, value)
                        })
                        .collect(),
                };
                // Only string keys and JSON values, serialization cannot fail.
                serde_json::to_string(&line).unwrap_or_default()
            }
            RenderFormat::Plain => {
                let mut out = format!(
                    "{} {} {}:",
                    record.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
                    record.level.to_ascii_uppercase(),
                    record.target,
                );
                if let Some(message) = &record.message {
                    let _ = write!(out, " {}", message);
                }
                for (key, value) in &record.fields {
                    match value {
                        serde_json::Value::String(s) => { let _ = write!(out, " {}={}", key, s); }
                        other => { let _ = write!(out, " {}={}", key, other); }
                    }
                }
                out
            }
        }
    }

    /// Render `record` and store the result in its `rendered` field.
    pub fn apply(&self, record: &mut LogRecord) {
        record.rendered = self.render(record);
    }
}
