use std::sync::Arc;

use crate::host::{
    ContentRestrictionService, ContentSearchService, HostServices, MigrationGateway, SpaceService,
    UserDirectory,
};
use crate::identity::IdentityMapCache;
use crate::migration::{MigrationDetails, MigrationOrchestrator, MigrationRunSummary};
use crate::primitives::{current_config, ExporterConfig};

/// App key of the exporter, identical on server and cloud.
pub const APP_KEY: &str = "com.atlassian.plugins.confluence.markdown.confluence-markdown-macro";

/// Data the migration assistant lets the app read during a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum AccessScope {
    /// App data uploaded by the app.
    AppDataOther,
    /// Server to cloud mappings of product entities (spaces, pages).
    MigrationTracingProduct,
    /// Server to cloud mappings of users.
    MigrationTracingIdentity,
}

/// Migration listener registered by the host when the plugin is enabled.
///
/// The host calls [`on_start_app_migration`](Self::on_start_app_migration) once per transfer
/// with that transfer's gateway. The call always completes with a summary; failures are
/// reported in the summary and in the log, never raised.
///
/// ## kotlin
///
/// ```kotlin
/// val listener = MarkdownMigrationListener(cqlSearch, spaces, restrictions, directory)
///
/// override fun onStartAppMigration(gateway: AppCloudMigrationGateway, transferId: String, details: MigrationDetailsV1) {
///     val summary = runBlocking {
///         listener.onStartAppMigration(GatewayBridge(gateway), transferId, details.toRecord())
///     }
///     log.info("markdown export finished in state ${summary.state}")
/// }
/// ```
#[derive(uniffi::Object)]
pub struct MarkdownMigrationListener {
    orchestrator: MigrationOrchestrator,
}

#[crate::exporter_export]
impl MarkdownMigrationListener {
    /// Creates a listener over the server services, using the process-wide configuration.
    #[uniffi::constructor]
    #[must_use]
    pub fn new(
        content_search: Arc<dyn ContentSearchService>,
        spaces: Arc<dyn SpaceService>,
        restrictions: Arc<dyn ContentRestrictionService>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self::with_config(
            HostServices {
                content_search,
                spaces,
                restrictions,
                directory,
            },
            current_config(),
        )
    }

    /// Exports the markdown macro data of `transfer_id` through `gateway`.
    pub async fn on_start_app_migration(
        &self,
        gateway: Arc<dyn MigrationGateway>,
        transfer_id: String,
        details: MigrationDetails,
    ) -> MigrationRunSummary {
        self.orchestrator
            .migrate(gateway, transfer_id, details)
            .await
    }

    /// App key of the cloud app receiving the data.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn cloud_app_key(&self) -> String {
        APP_KEY.to_string()
    }

    /// App key of this server app.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn server_app_key(&self) -> String {
        APP_KEY.to_string()
    }

    /// Scopes the exporter needs during a transfer.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub fn data_access_scopes(&self) -> Vec<AccessScope> {
        vec![
            AccessScope::AppDataOther,
            AccessScope::MigrationTracingProduct,
            AccessScope::MigrationTracingIdentity,
        ]
    }
}

impl MarkdownMigrationListener {
    /// Creates a listener with an explicit configuration.
    #[must_use]
    pub fn with_config(services: HostServices, config: ExporterConfig) -> Self {
        let identity_maps = Arc::new(IdentityMapCache::new(
            config.user_mapping_prefix.clone(),
            config.identity_mapping_page_size,
        ));
        Self {
            orchestrator: MigrationOrchestrator::new(services, config, identity_maps),
        }
    }
}
