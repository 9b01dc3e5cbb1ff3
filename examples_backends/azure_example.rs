use std::time::Duration;
use tracing::info;

use tracing_append_blob::env::options_from_env;
use tracing_append_blob::init::{init_azure_tracing, LayerConfig};
use tracing_append_blob::naming::LOG_EXTENSION;

/// Ships 100 lines to `<blob>.<YYYY-MM-DD>.log` in an Azure container.
///
/// Reads the account from `AZURE_STORAGE_CONNECTION_STRING` or the
/// `LOG_SINK_AZURE_*` variables, e.g. against a local Azurite:
///
/// ```text
/// AZURE_STORAGE_CONNECTION_STRING=UseDevelopmentStorage=true \
///     cargo run --example azure_example
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = options_from_env()?
        .with_rotate_period("YYYY-MM-DD")
        .with_extension(LOG_EXTENSION)
        .with_buffering(20, Duration::from_secs(1));

    let transport = init_azure_tracing(&options, LayerConfig::default())?;

    for i in 0..100 {
        info!(index = i, "sample log line");
    }

    let report = transport.close().await;
    println!("last flush: {:?}", report);
    println!("metrics: {:?}", transport.engine().metrics());
    Ok(())
}
