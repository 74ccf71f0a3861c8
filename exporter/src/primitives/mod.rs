/// Forwards `log` records to the host and scopes log prefixes.
pub mod logger;

/// Process-wide tunables of the exporter.
pub mod config;

pub use config::{current_config, init_exporter_config, ExporterConfig};
