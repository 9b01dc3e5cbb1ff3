pub mod error;
pub mod record;
pub mod chunk;
pub mod naming;
pub mod credential;
pub mod sink;
pub mod engine;
pub mod config;
pub mod transport;
pub mod layer;

#[cfg(feature = "azure")]
pub mod azure;

pub mod init;
pub mod env;
pub mod memory_sink;
pub mod noop_sink;
