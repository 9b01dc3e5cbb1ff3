use std::error::Error;

/// Error returned when a transport, engine or credential is constructed
/// from invalid options. Nothing is spawned when this is returned.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("azure account name must be 3-24 lowercase letters or digits, received {0:?}")]
    InvalidAccountName(String),

    #[error("azure account key must be a non-empty base64 string")]
    InvalidAccountKey,

    #[error("azure account host must be an http(s) URL, received {0:?}")]
    InvalidHost(String),

    #[error("azure account sas token must not be empty")]
    EmptySasToken,

    #[error("connection string is missing {0}")]
    MissingConnectionStringKey(&'static str),

    #[error("malformed connection string segment {0:?}")]
    MalformedConnectionString(String),

    #[error("no azure account configured; set a connection string, name/key or host/sas token")]
    MissingAccount,

    #[error("syncTimeout must be set, if there is a bufferLogSize (bufferLogSize = {buffer_log_size})")]
    SyncTimeoutRequired { buffer_log_size: i64 },

    #[error("{0} must not be empty")]
    EmptyName(&'static str),

    #[error("maxBlockSize must be between 1 and {max} bytes, received {value}")]
    BlockSizeOutOfRange { value: usize, max: usize },

    #[error("environment variable {key} has invalid value {value:?}")]
    InvalidEnv { key: &'static str, value: String },
}

/// Error reported by an [`AppendSink`](crate::sink::AppendSink).
///
/// The engine never propagates these to producers; they are logged on the
/// diagnostic channel and counted in
/// [`EngineMetrics`](crate::engine::EngineMetrics).
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("failed to create append blob {destination}: {source}")]
    Create {
        destination: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    #[error("failed to append block to {destination}: {source}")]
    Append {
        destination: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    #[error("blob service responded with status {status} ({})", .code.as_deref().unwrap_or("no error code"))]
    Status { status: u16, code: Option<String> },
}

impl SinkError {
    pub fn create(destination: &str, source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        SinkError::Create { destination: destination.to_string(), source: source.into() }
    }

    pub fn append(destination: &str, source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        SinkError::Append { destination: destination.to_string(), source: source.into() }
    }
}

/// Error returned by the `init_*` helpers.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("global tracing subscriber already set: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}
