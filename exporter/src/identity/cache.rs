use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;

use crate::host::{HostError, MigrationGateway, ENTITY_TYPE_USER};

/// Server user key (with namespace prefix) to cloud account id.
pub type IdentityMap = HashMap<String, String>;

/// Number of transfers whose identity map is kept in memory.
pub const IDENTITY_CACHE_CAPACITY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(1);

/// Identity maps of the most recent transfers.
///
/// The map of one transfer is read from the gateway once, filtered to keys carrying the user
/// namespace prefix and shared by every chunk of the transfer. The lock is never held while the
/// gateway is queried, so two runs of the same transfer racing on a cold cache both fetch and
/// the last one stores its copy.
pub struct IdentityMapCache {
    entries: Mutex<LruCache<String, Arc<IdentityMap>>>,
    prefix: String,
    page_size: u32,
}

impl IdentityMapCache {
    /// Creates an empty cache keeping [`IDENTITY_CACHE_CAPACITY`] transfers. `page_size` is
    /// raised to 1 if zero.
    #[must_use]
    pub fn new(prefix: String, page_size: u32) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(IDENTITY_CACHE_CAPACITY)),
            prefix,
            page_size: page_size.max(1),
        }
    }

    /// Returns the identity map of `transfer_id`, reading it from the gateway on a miss.
    ///
    /// # Errors
    /// Any gateway failure while reading the mapping. Nothing is cached in that case.
    pub async fn get(
        &self,
        gateway: &dyn MigrationGateway,
        transfer_id: &str,
    ) -> Result<Arc<IdentityMap>, HostError> {
        let cached = self.lock().get(transfer_id).cloned();
        if let Some(map) = cached {
            return Ok(map);
        }

        let map = Arc::new(self.fetch(gateway, transfer_id).await?);
        if let Some((evicted, _)) = self
            .lock()
            .push(transfer_id.to_string(), Arc::clone(&map))
            .filter(|(key, _)| key != transfer_id)
        {
            crate::debug!("identity_map.evicted transfer_id={evicted}");
        }
        Ok(map)
    }

    /// Whether the map of `transfer_id` is cached. Does not touch the recency order.
    #[must_use]
    pub fn contains(&self, transfer_id: &str) -> bool {
        self.lock().contains(transfer_id)
    }

    /// Number of cached transfers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no transfer is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, Arc<IdentityMap>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch(
        &self,
        gateway: &dyn MigrationGateway,
        transfer_id: &str,
    ) -> Result<IdentityMap, HostError> {
        let mut map = IdentityMap::new();
        let mut cursor = None;
        let mut pages = 0_usize;

        loop {
            let page = gateway
                .mapping_page(
                    transfer_id.to_string(),
                    ENTITY_TYPE_USER.to_string(),
                    self.page_size,
                    cursor,
                )
                .await?;
            pages += 1;

            let more = page.has_more();
            map.extend(
                page.mappings
                    .into_iter()
                    .filter(|(server_key, _)| server_key.starts_with(&self.prefix)),
            );
            if !more {
                break;
            }
            cursor = page.next_cursor;
        }

        crate::info!(
            "identity_map.loaded transfer_id={transfer_id} users={} pages={pages}",
            map.len()
        );
        Ok(map)
    }
}
