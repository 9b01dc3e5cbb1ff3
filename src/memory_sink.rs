use crate::error::SinkError;
use crate::sink::{AppendOutcome, AppendSink};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// One call observed by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    EnsureExists(String),
    Append { destination: String, block: Vec<u8> },
}

/// Append sink that keeps every destination in memory.
///
/// Records the sequence of calls as well, which makes it the sink of choice
/// for tests and local demos.
#[derive(Default)]
pub struct MemorySink {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    calls: Mutex<Vec<SinkCall>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content of `destination` as UTF-8, if it was created.
    pub fn contents(&self, destination: &str) -> Option<String> {
        self.objects
            .lock()
            .get(destination)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn object_names(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().clone()
    }

    /// Blocks appended so far, in order.
    pub fn blocks(&self) -> Vec<(String, Vec<u8>)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                SinkCall::Append { destination, block } => Some((destination.clone(), block.clone())),
                SinkCall::EnsureExists(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl AppendSink for MemorySink {
    async fn ensure_exists(&self, destination: &str) -> Result<(), SinkError> {
        self.calls.lock().push(SinkCall::EnsureExists(destination.to_string()));
        self.objects.lock().entry(destination.to_string()).or_default();
        Ok(())
    }

    async fn append_block(&self, destination: &str, block: &[u8]) -> Result<AppendOutcome, SinkError> {
        self.calls.lock().push(SinkCall::Append { destination: destination.to_string(), block: block.to_vec() });
        match self.objects.lock().get_mut(destination) {
            Some(object) => {
                object.extend_from_slice(block);
                Ok(AppendOutcome::default())
            }
            None => Err(SinkError::append(destination, "BlobNotFound")),
        }
    }
}
