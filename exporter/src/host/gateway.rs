use std::collections::HashMap;

use crate::host::HostError;

/// Gateway entity type of migrated spaces.
pub const ENTITY_TYPE_SPACE: &str = "confluence:space";

/// Gateway entity type of migrated pages.
pub const ENTITY_TYPE_PAGE: &str = "confluence:page";

/// Gateway entity type of migrated users.
pub const ENTITY_TYPE_USER: &str = "identity:user";

/// Migration gateway of the cloud migration assistant.
///
/// The gateway knows which server entities were migrated in a transfer and what they became in
/// the cloud, and accepts the app data the exporter produces.
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait MigrationGateway: Send + Sync {
    /// Reads one page of the server id to cloud id mapping of `entity_type`.
    ///
    /// `cursor` is `None` for the first page and the previous page's `next_cursor` afterwards.
    ///
    /// # Errors
    /// Any `HostError` raised by the gateway.
    async fn mapping_page(
        &self,
        transfer_id: String,
        entity_type: String,
        page_size: u32,
        cursor: Option<String>,
    ) -> Result<MappingPage, HostError>;

    /// Resolves the cloud ids of the given server ids. Unknown ids are absent from the result.
    ///
    /// # Errors
    /// Any `HostError` raised by the gateway.
    async fn mapping_by_id(
        &self,
        transfer_id: String,
        entity_type: String,
        server_ids: Vec<String>,
    ) -> Result<HashMap<String, String>, HostError>;

    /// Opens an app data stream labeled `label`, writes `data` and closes the stream.
    ///
    /// # Errors
    /// Any `HostError` raised while opening, writing or closing the stream.
    async fn write_app_data(
        &self,
        transfer_id: String,
        label: String,
        data: Vec<u8>,
    ) -> Result<(), HostError>;
}

/// One page of a paginated gateway mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct MappingPage {
    /// Server id to cloud id.
    pub mappings: HashMap<String, String>,
    /// Cursor of the following page, `None` on the last page.
    pub next_cursor: Option<String>,
}

impl MappingPage {
    /// Whether another page follows.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}
