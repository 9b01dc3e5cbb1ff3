use crate::chunk::MAX_APPEND_BLOCK_SIZE;
use crate::credential::AccountCredential;
use crate::engine::FlushPolicy;
use crate::error::ConfigError;
use crate::naming::Destination;
use serde::Deserialize;
use std::time::Duration;

/// Options of a [`BlobTransport`](crate::transport::BlobTransport).
///
/// Field names deserialize in camelCase (`containerName`, `bufferLogSize`,
/// `syncTimeout`, ...) so existing JSON configuration can be reused.
///
/// **Fields**
/// - `account`: storage account credentials.
/// - `container_name`: container that holds the log blobs.
/// - `blob_name`: base name of the destination blob.
/// - `eol`: separator written after every record.
/// - `buffer_log_size`: records buffered before a flush; `< 1` flushes
///   every record.
/// - `sync_timeout`: milliseconds a record may wait in the buffer; `0`
///   disables timed flushes. Required when `buffer_log_size > 1`.
/// - `rotate_period`: date pattern (`YYYY-MM-DD`) appended to the blob
///   name; empty disables rotation.
/// - `extension`: suffix appended after the rotation part, e.g. `.log`.
/// - `max_block_size`: largest block sent in one append call.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportOptions {
    pub account: AccountCredential,
    pub container_name: String,
    pub blob_name: String,
    #[serde(default = "default_eol")]
    pub eol: String,
    #[serde(default = "default_buffer_log_size")]
    pub buffer_log_size: i64,
    #[serde(default)]
    pub sync_timeout: u64,
    #[serde(default)]
    pub rotate_period: String,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default = "default_max_block_size")]
    pub max_block_size: usize,
}

fn default_eol() -> String {
    "\n".to_string()
}

fn default_buffer_log_size() -> i64 {
    -1
}

fn default_max_block_size() -> usize {
    MAX_APPEND_BLOCK_SIZE
}

impl TransportOptions {
    pub fn new(account: AccountCredential, container_name: impl Into<String>, blob_name: impl Into<String>) -> Self {
        TransportOptions {
            account,
            container_name: container_name.into(),
            blob_name: blob_name.into(),
            eol: default_eol(),
            buffer_log_size: default_buffer_log_size(),
            sync_timeout: 0,
            rotate_period: String::new(),
            extension: None,
            max_block_size: default_max_block_size(),
        }
    }

    /// Flush once `buffer_log_size` records are buffered or `sync_timeout`
    /// elapsed since the first of them.
    #[must_use]
    pub fn with_buffering(mut self, buffer_log_size: i64, sync_timeout: Duration) -> Self {
        self.buffer_log_size = buffer_log_size;
        self.sync_timeout = u64::try_from(sync_timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub fn with_rotate_period(mut self, rotate_period: impl Into<String>) -> Self {
        self.rotate_period = rotate_period.into();
        self
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
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

    pub fn flush_policy(&self) -> FlushPolicy {
        FlushPolicy::new(self.buffer_log_size, Duration::from_millis(self.sync_timeout))
    }

    pub fn destination(&self) -> Destination {
        Destination {
            blob_name: self.blob_name.clone(),
            rotate_period: self.rotate_period.clone(),
            extension: self.extension.clone(),
        }
    }

    /// Check every option that can be checked without network access.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.account.validate()?;
        if self.container_name.is_empty() {
            return Err(ConfigError::EmptyName("containerName"));
        }
        if self.blob_name.is_empty() {
            return Err(ConfigError::EmptyName("blobName"));
        }
        if self.max_block_size == 0 || self.max_block_size > MAX_APPEND_BLOCK_SIZE {
            return Err(ConfigError::BlockSizeOutOfRange { value: self.max_block_size, max: MAX_APPEND_BLOCK_SIZE });
        }
        self.flush_policy().validate()
    }
}
