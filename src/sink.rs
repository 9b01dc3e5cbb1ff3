use crate::error::SinkError;
use async_trait::async_trait;

/// Result of a successful append.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    /// Service error code reported alongside an accepted block, if any.
    pub error_code: Option<String>,
}

/// Append-only object store that receives flushed log blocks.
///
/// Implementations wrap a concrete backend (Azure append blobs, memory,
/// nothing at all). The engine calls them from its writer task only, one
/// block at a time, so a destination never sees two appends in flight.
#[async_trait]
pub trait AppendSink: Send + Sync {
    /// Create `destination` if it does not exist yet.
    ///
    /// **Returns**
    /// - `Ok(())` if the object exists after the call.
    /// - `Err(SinkError::Create { .. })` on transport or authorization
    ///   failure.
    ///
    /// Called before every block, so implementations must treat an
    /// already existing object as success.
    async fn ensure_exists(&self, destination: &str) -> Result<(), SinkError>;

    /// Append `block` at the end of `destination`.
    ///
    /// **Returns**
    /// - `Ok(outcome)` once the block is committed; `outcome.error_code`
    ///   carries any code the service attached to the response.
    /// - `Err(SinkError::Append { .. })` on transport or authorization
    ///   failure.
    async fn append_block(&self, destination: &str, block: &[u8]) -> Result<AppendOutcome, SinkError>;
}
