use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::error;

use tracing_append_blob::config::TransportOptions;
use tracing_append_blob::credential::AccountCredential;
use tracing_append_blob::init::{init_tracing_with_config, LayerConfig};
use tracing_append_blob::noop_sink::NoopSink;
use tracing_append_blob::record::RenderFormat;
use tracing_append_blob::transport::BlobTransport;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = TransportOptions::new(
        AccountCredential::connection_string("UseDevelopmentStorage=true"),
        "logs",
        "custom_load",
    )
    .with_buffering(1_000, Duration::from_millis(200));
    let (transport, _writer) = BlobTransport::new(&options, Arc::new(NoopSink))?;
    let transport = Arc::new(transport);

    let layer_config = LayerConfig {
        format: RenderFormat::Plain,
        enable_stdout: false,
        ..LayerConfig::default()
    };

    init_tracing_with_config(Arc::clone(&transport), layer_config)?;

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "custom load test error");
    }

    let elapsed = start.elapsed();
    println!("custom config: sent {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    transport.close().await;
    println!("flushed: {:?}", transport.engine().metrics());
    Ok(())
}
