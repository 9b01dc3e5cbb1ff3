use crate::error::InitError;
use crate::layer::BlobLogLayer;
use crate::record::RenderFormat;
use crate::transport::BlobTransport;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, Registry};

#[cfg(feature = "azure")]
use crate::config::TransportOptions;

/// Layer configuration.
///
/// **Fields**
/// - `min_level`: most verbose level that is shipped to the blob.
/// - `format`: how events are rendered into lines.
/// - `service_name`: optional name stamped on every record.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   added next to [`BlobLogLayer`] and events at `min_level` or above are
///   printed to the console.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub min_level: Level,
    pub format: RenderFormat,
    pub service_name: Option<String>,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            min_level: Level::INFO,
            format: RenderFormat::Json,
            service_name: None,
            enable_stdout: true,
        }
    }
}

/// Install a global `tracing` subscriber that ships events through
/// `transport` according to `config`.
///
/// **Returns**
/// - `Err(InitError::Subscriber)` if a global subscriber is already set.
pub fn init_tracing_with_config(transport: Arc<BlobTransport>, config: LayerConfig) -> Result<(), InitError> {
    let mut layer = BlobLogLayer::new(transport, config.min_level, config.format);
    if let Some(service_name) = config.service_name {
        layer = layer.with_service_name(service_name);
    }

    // The two subscriber shapes have different types, hence two branches.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer().with_filter(LevelFilter::from_level(config.min_level));
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

/// Initialize tracing with [`LayerConfig::default`].
pub fn init_tracing(transport: Arc<BlobTransport>) -> Result<(), InitError> {
    init_tracing_with_config(transport, LayerConfig::default())
}

/// Build an Azure transport from `options` and install it as the global
/// subscriber.
///
/// The returned transport should be [`closed`](BlobTransport::close) before
/// the process exits so buffered records are written.
#[cfg(feature = "azure")]
pub fn init_azure_tracing(options: &TransportOptions, config: LayerConfig) -> Result<Arc<BlobTransport>, InitError> {
    let (transport, _writer) = BlobTransport::azure(options)?;
    let transport = Arc::new(transport);
    init_tracing_with_config(Arc::clone(&transport), config)?;
    Ok(transport)
}
