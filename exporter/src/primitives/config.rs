use std::sync::OnceLock;
use std::time::Duration;

/// Process-wide exporter configuration.
static CONFIG_INSTANCE: OnceLock<ExporterConfig> = OnceLock::new();

/// Tunables of a migration run.
///
/// The defaults mirror what the gateway and the server search backend accept; hosts normally
/// only override `server_app_version`.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ExporterConfig {
    /// Version of the server app, reported in the starting payload.
    pub server_app_version: String,
    /// Source feature tag, reported in the starting payload.
    pub source_app: String,
    /// Name of the macro whose pages are exported.
    pub feature_macro: String,
    /// Group whose first member acts as the run's identity.
    pub admin_group: String,
    /// Namespace prefix of user keys in the gateway's identity mapping.
    pub user_mapping_prefix: String,
    /// Page size of the content search. Each page becomes one chunk.
    pub content_page_size: u32,
    /// Page size when enumerating server spaces.
    pub space_page_size: u32,
    /// Page size when reading update restrictions of a page.
    pub restriction_page_size: u32,
    /// Page size when reading the identity mapping.
    pub identity_mapping_page_size: u32,
    /// Page size when reading the migrated space mapping.
    pub space_mapping_page_size: u32,
    /// Number of server page ids resolved per gateway lookup.
    pub page_mapping_batch_size: u32,
    /// Retries after a failed upload attempt.
    pub upload_max_retries: u32,
    /// First backoff delay in milliseconds.
    pub upload_min_backoff_ms: u64,
    /// Upper bound of the backoff delay in milliseconds.
    pub upload_max_backoff_ms: u64,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            server_app_version: env!("CARGO_PKG_VERSION").to_string(),
            source_app: "markdown-from-url".to_string(),
            feature_macro: "markdown-from-url".to_string(),
            admin_group: "confluence-administrators".to_string(),
            user_mapping_prefix: "confluence.userkey/".to_string(),
            content_page_size: 1000,
            space_page_size: 100,
            restriction_page_size: 100,
            identity_mapping_page_size: 5,
            space_mapping_page_size: 5000,
            page_mapping_batch_size: 100,
            upload_max_retries: 5,
            upload_min_backoff_ms: 2_000,
            upload_max_backoff_ms: 30_000,
        }
    }
}

impl ExporterConfig {
    /// First backoff delay.
    #[must_use]
    pub const fn min_backoff(&self) -> Duration {
        Duration::from_millis(self.upload_min_backoff_ms)
    }

    /// Upper bound of the backoff delay.
    #[must_use]
    pub const fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.upload_max_backoff_ms)
    }
}

/// Returns the built-in defaults.
#[uniffi::export]
#[must_use]
pub fn default_exporter_config() -> ExporterConfig {
    ExporterConfig::default()
}

/// Sets the process-wide configuration.
///
/// Call once when the plugin is enabled, before the listener is constructed. Later calls are
/// ignored with a warning.
///
/// ## kotlin
///
/// ```kotlin
/// initExporterConfig(defaultExporterConfig().copy(serverAppVersion = buildVersion))
/// ```
#[uniffi::export]
pub fn init_exporter_config(config: ExporterConfig) {
    let version = config.server_app_version.clone();
    match CONFIG_INSTANCE.set(config) {
        Ok(()) => crate::info!("exporter_config.initialized server_app_version={version}"),
        Err(_) => crate::warn!("exporter_config.already_initialized ignored=true"),
    }
}

/// Returns the process-wide configuration, or the defaults when none was set.
#[must_use]
pub fn current_config() -> ExporterConfig {
    CONFIG_INSTANCE.get().cloned().unwrap_or_default()
}
