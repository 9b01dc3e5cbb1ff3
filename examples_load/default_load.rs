use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use tracing_append_blob::config::TransportOptions;
use tracing_append_blob::credential::AccountCredential;
use tracing_append_blob::init::init_tracing;
use tracing_append_blob::noop_sink::NoopSink;
use tracing_append_blob::transport::BlobTransport;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = TransportOptions::new(
        AccountCredential::connection_string("UseDevelopmentStorage=true"),
        "logs",
        "default_load",
    );
    let (transport, _writer) = BlobTransport::new(&options, Arc::new(NoopSink))?;
    let transport = Arc::new(transport);
    init_tracing(Arc::clone(&transport))?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    // Wait for the writer to drain every queued flush
    transport.close().await;
    println!("flushed: {:?}", transport.engine().metrics());
    Ok(())
}
