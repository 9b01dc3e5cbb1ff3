use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};
use tracing_append_blob::{
    config::TransportOptions,
    credential::AccountCredential,
    error::SinkError,
    init::init_tracing,
    sink::{AppendOutcome, AppendSink},
    transport::BlobTransport,
};

/// Example of integrating a completely custom append-only store by
/// implementing the `AppendSink` trait directly. Imagine this talks to
/// some proprietary object store for which this crate does not provide a
/// built-in sink.
struct MyObjectStoreSink;

#[async_trait]
impl AppendSink for MyObjectStoreSink {
    async fn ensure_exists(&self, destination: &str) -> Result<(), SinkError> {
        println!("[my-object-store] ensure {}", destination);
        Ok(())
    }

    async fn append_block(&self, destination: &str, block: &[u8]) -> Result<AppendOutcome, SinkError> {
        // Here you would call your own client library for the target store.
        // For the sake of example we just print the block.
        print!("[my-object-store] {} <- {}", destination, String::from_utf8_lossy(block));
        Ok(AppendOutcome::default())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = TransportOptions::new(
        AccountCredential::connection_string("UseDevelopmentStorage=true"),
        "logs",
        "custom_backend",
    );
    let (transport, _writer) = BlobTransport::new(&options, Arc::new(MyObjectStoreSink))?;
    let transport = Arc::new(transport);

    init_tracing(Arc::clone(&transport))?;

    info!("custom backend example started");
    error!(store = "my-object-store", "simulated error sent via custom backend");

    transport.close().await;
    Ok(())
}
