use crate::error::SinkError;
use crate::sink::{AppendOutcome, AppendSink};
use async_trait::async_trait;

/// A sink that simply drops all blocks.
///
/// Useful for measuring the overhead of the layer and engine without any
/// external I/O.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl AppendSink for NoopSink {
    async fn ensure_exists(&self, _destination: &str) -> Result<(), SinkError> {
        Ok(())
    }

    async fn append_block(&self, _destination: &str, _block: &[u8]) -> Result<AppendOutcome, SinkError> {
        Ok(AppendOutcome::default())
    }
}
