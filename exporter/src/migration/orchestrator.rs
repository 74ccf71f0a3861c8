use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use crate::error::ErrorChainExt;
use crate::host::{
    ActingContext, ContentObject, HostServices, MigrationGateway, ENTITY_TYPE_PAGE,
    ENTITY_TYPE_SPACE,
};
use crate::identity::{EditorSelector, IdentityMapCache};
use crate::migration::{
    DataPayload, EndingPayload, ErrorPayload, ExportError, MigrationDetails, MigrationRun,
    MigrationRunSummary, MigrationState, ObjectRecord, Payload, PayloadUploader, RetryPolicy,
    SpaceMapping, StartingPayload,
};
use crate::pagination::{ContentPager, PageResponse};
use crate::permissions::{PageRestrictionResolver, PermissionResolver, SpacePermissionResolver};
use crate::primitives::logger::{LogContext, LOG_CONTEXT};
use crate::primitives::ExporterConfig;

/// Sequences one migration run.
///
/// A run authenticates as the first member of the administrative group, uploads the starting
/// payload, scans every migrated space that still exists chunk by chunk and closes with the
/// ending payload. A failing chunk is replaced by an error payload and the scan goes on;
/// anything failing outside a chunk ends the run. Either way the outcome is reported as a
/// [`MigrationRunSummary`], never as an error.
pub struct MigrationOrchestrator {
    services: HostServices,
    config: ExporterConfig,
    identity_maps: Arc<IdentityMapCache>,
}

/// State shared by the chunks of one run. The editor selector is created by the first chunk
/// that has records to enrich.
struct ChunkContext<'a> {
    run: &'a mut MigrationRun,
    gateway: &'a Arc<dyn MigrationGateway>,
    uploader: &'a PayloadUploader,
    acting: &'a ActingContext,
    selector: Option<EditorSelector>,
}

impl MigrationOrchestrator {
    /// Creates an orchestrator. `identity_maps` is shared by every run of the process.
    #[must_use]
    pub const fn new(
        services: HostServices,
        config: ExporterConfig,
        identity_maps: Arc<IdentityMapCache>,
    ) -> Self {
        Self {
            services,
            config,
            identity_maps,
        }
    }

    /// Runs the export of `transfer_id` to completion.
    ///
    /// The run has its own task-local log scope.
    pub async fn migrate(
        &self,
        gateway: Arc<dyn MigrationGateway>,
        transfer_id: String,
        details: MigrationDetails,
    ) -> MigrationRunSummary {
        LOG_CONTEXT
            .scope(
                RefCell::new(None),
                self.run_scoped(gateway, transfer_id, details),
            )
            .await
    }

    async fn run_scoped(
        &self,
        gateway: Arc<dyn MigrationGateway>,
        transfer_id: String,
        details: MigrationDetails,
    ) -> MigrationRunSummary {
        let _ctx = LogContext::new("MigrationOrchestrator");
        let mut run = MigrationRun::new(transfer_id.clone(), details);
        crate::info!(
            "migration_run.started {} timestamp={}",
            run.details_line(),
            Utc::now().to_rfc3339()
        );

        let uploader = PayloadUploader::new(
            Arc::clone(&gateway),
            transfer_id,
            RetryPolicy::from_config(&self.config),
        );

        match self.execute(&mut run, &gateway, &uploader).await {
            Ok(()) => {
                run.transition(MigrationState::Done);
                let summary = run.summary(None);
                crate::info!(
                    "migration_run.completed transfer_id={} spaces_scanned={} non_empty_chunks={} failed_chunks={} timestamp={}",
                    run.transfer_id,
                    summary.spaces_scanned,
                    summary.non_empty_chunks,
                    summary.failed_chunks,
                    Utc::now().to_rfc3339()
                );
                summary
            }
            Err(err) => {
                let failed_in = run.state();
                run.fail();
                crate::error!(
                    "migration_run.failed state={} error={err} {} timestamp={}",
                    failed_in.as_str(),
                    run.details_line(),
                    Utc::now().to_rfc3339()
                );
                run.summary(Some(err.to_string()))
            }
        }
    }

    async fn execute(
        &self,
        run: &mut MigrationRun,
        gateway: &Arc<dyn MigrationGateway>,
        uploader: &PayloadUploader,
    ) -> Result<(), ExportError> {
        let acting = self.authenticate(run).await?;
        run.context = Some(acting.clone());
        run.transition(MigrationState::Authenticated);

        uploader
            .upload(&Payload::Starting(StartingPayload {
                server_app_version: self.config.server_app_version.clone(),
                source_app: self.config.source_app.clone(),
            }))
            .await?;
        run.transition(MigrationState::StartingPayloadSent);

        let spaces = self.migrated_spaces(&**gateway, &acting, &run.transfer_id).await?;
        run.transition(MigrationState::ScanningChunks);

        let mut chunks = ChunkContext {
            run,
            gateway,
            uploader,
            acting: &acting,
            selector: None,
        };
        for space in &spaces {
            self.scan_space(&mut chunks, space).await?;
        }
        let run = chunks.run;

        uploader
            .upload(&Payload::Ending(EndingPayload {
                total_non_empty_chunks: run.non_empty_chunks(),
            }))
            .await?;
        run.transition(MigrationState::EndingPayloadSent);
        Ok(())
    }

    /// Picks the first member of the administrative group as the acting identity.
    async fn authenticate(&self, run: &MigrationRun) -> Result<ActingContext, ExportError> {
        let group = &self.config.admin_group;
        let admin = self
            .services
            .directory
            .group_members(group.clone())
            .await?
            .and_then(|members| members.into_iter().next());

        let Some(user_key) = admin else {
            return Err(ExportError::NoAdministrator {
                group: group.clone(),
            });
        };

        crate::info!(
            "migration_run.authenticated transfer_id={} user_key={user_key}",
            run.transfer_id
        );
        Ok(ActingContext {
            transfer_id: run.transfer_id.clone(),
            user_key,
        })
    }

    /// Spaces known to the gateway for this transfer that still exist on the server, in server
    /// listing order.
    async fn migrated_spaces(
        &self,
        gateway: &dyn MigrationGateway,
        acting: &ActingContext,
        transfer_id: &str,
    ) -> Result<Vec<SpaceMapping>, ExportError> {
        let mut cloud_ids: HashMap<String, String> = HashMap::new();
        let mut cursor = None;
        loop {
            let page = gateway
                .mapping_page(
                    transfer_id.to_string(),
                    ENTITY_TYPE_SPACE.to_string(),
                    self.config.space_mapping_page_size.max(1),
                    cursor,
                )
                .await?;
            let more = page.has_more();
            cloud_ids.extend(page.mappings);
            if !more {
                break;
            }
            cursor = page.next_cursor;
        }

        let server_spaces = ContentPager::spaces(
            Arc::clone(&self.services.spaces),
            acting.clone(),
            self.config.space_page_size,
        )
        .collect_all()
        .await?;

        let spaces: Vec<SpaceMapping> = server_spaces
            .into_iter()
            .filter_map(|space| {
                cloud_ids
                    .get(&space.id.to_string())
                    .map(|cloud_id| SpaceMapping {
                        space_cloud_id: cloud_id.clone(),
                        space_server_id: space.id,
                        space_key: space.key,
                    })
            })
            .collect();

        crate::info!(
            "migrated_spaces.resolved transfer_id={transfer_id} gateway_spaces={} existing={} keys={}",
            cloud_ids.len(),
            spaces.len(),
            spaces
                .iter()
                .map(|space| space.space_key.as_str())
                .collect::<Vec<_>>()
                .join(",")
        );
        Ok(spaces)
    }

    async fn scan_space(
        &self,
        chunks: &mut ChunkContext<'_>,
        space: &SpaceMapping,
    ) -> Result<(), ExportError> {
        let query = format!(
            "macro = \"{}\" AND space = \"{}\"",
            self.config.feature_macro, space.space_key
        );
        let pager = ContentPager::search(
            Arc::clone(&self.services.content_search),
            chunks.acting.clone(),
            query,
            self.config.content_page_size,
        );
        chunks.run.space_scanned();
        // a failed page is skipped only if the page before it was fetched
        let mut resumable = false;

        loop {
            let page = match pager.has_next().await {
                Ok(true) => pager.next().await,
                Ok(false) => break,
                Err(err) => Err(err),
            };
            let index = chunks.run.next_chunk_index();

            let outcome = match page {
                Ok(page) => {
                    resumable = true;
                    crate::info!(
                        "chunk.searched index={index} space_key={} hits={}",
                        space.space_key,
                        page.results.len()
                    );
                    self.process_chunk(chunks, space, page).await
                }
                Err(err) => {
                    let err = anyhow::Error::new(err)
                        .context(format!("searching space {}", space.space_key));
                    self.recover_chunk(chunks, index, &err).await?;
                    if resumable && pager.skip_failed().await {
                        resumable = false;
                        continue;
                    }
                    crate::warn!(
                        "space.search_abandoned space_key={} chunk_index={index}",
                        space.space_key
                    );
                    break;
                }
            };

            match outcome {
                Ok(true) => chunks.run.chunk_uploaded(),
                Ok(false) => crate::debug!("chunk.empty index={index} space_key={}", space.space_key),
                Err(err) => self.recover_chunk(chunks, index, &err).await?,
            }
        }
        Ok(())
    }

    /// Builds, enriches and uploads one chunk. Returns whether a data payload was uploaded.
    async fn process_chunk(
        &self,
        chunks: &mut ChunkContext<'_>,
        space: &SpaceMapping,
        page: PageResponse<ContentObject>,
    ) -> anyhow::Result<bool> {
        let records = self
            .build_records(chunks, space, page.results)
            .await
            .context("resolving cloud page ids")?;
        if records.is_empty() {
            return Ok(false);
        }

        self.enrich(chunks, &records)
            .await
            .context("selecting page editors")?;

        chunks
            .uploader
            .upload(&Payload::Data(DataPayload::from_records(
                &space.space_key,
                &records,
            )))
            .await
            .context("uploading data payload")?;
        Ok(true)
    }

    /// Records for the hits that were migrated, in search order.
    async fn build_records(
        &self,
        chunks: &ChunkContext<'_>,
        space: &SpaceMapping,
        hits: Vec<ContentObject>,
    ) -> Result<Vec<ObjectRecord>, ExportError> {
        let server_ids: Vec<String> = hits.iter().map(|hit| hit.id.to_string()).collect();
        let batch_size = usize::try_from(self.config.page_mapping_batch_size)
            .unwrap_or(usize::MAX)
            .max(1);

        let mut cloud_ids = HashMap::with_capacity(server_ids.len());
        for batch in server_ids.chunks(batch_size) {
            let mapped = chunks
                .gateway
                .mapping_by_id(
                    chunks.run.transfer_id.clone(),
                    ENTITY_TYPE_PAGE.to_string(),
                    batch.to_vec(),
                )
                .await?;
            cloud_ids.extend(mapped);
        }

        let total = hits.len();
        let records: Vec<ObjectRecord> = hits
            .into_iter()
            .zip(server_ids)
            .filter_map(|(hit, server_id)| {
                let Some(cloud_id) = cloud_ids.remove(&server_id) else {
                    crate::trace!(
                        "chunk.unmapped_page space_key={} page_server_id={server_id} title={:?}",
                        space.space_key,
                        hit.title
                    );
                    return None;
                };
                Some(ObjectRecord::new(cloud_id, server_id, space.clone(), hit))
            })
            .collect();

        if records.len() < total {
            crate::debug!(
                "chunk.unmapped_pages space_key={} dropped={}",
                space.space_key,
                total - records.len()
            );
        }
        Ok(records)
    }

    async fn enrich(
        &self,
        chunks: &mut ChunkContext<'_>,
        records: &[ObjectRecord],
    ) -> Result<(), ExportError> {
        let space_permissions = SpacePermissionResolver::new(Arc::clone(&self.services.spaces))
            .resolve(chunks.acting, records)
            .await?;
        let page_permissions = PageRestrictionResolver::new(
            Arc::clone(&self.services.restrictions),
            self.config.restriction_page_size,
        )
        .resolve(chunks.acting, records)
        .await?;

        let selector = match chunks.selector.take() {
            Some(selector) => selector,
            None => {
                let identities = self
                    .identity_maps
                    .get(&**chunks.gateway, &chunks.run.transfer_id)
                    .await?;
                EditorSelector::new(
                    Arc::clone(&self.services.directory),
                    identities,
                    self.config.user_mapping_prefix.clone(),
                )
            }
        };
        let selector = chunks.selector.insert(selector);

        selector
            .assign_editors(records, &page_permissions, &space_permissions)
            .await?;
        Ok(())
    }

    /// Replaces a failed chunk by an error payload. A failure to upload the error payload
    /// itself is returned and ends the run.
    async fn recover_chunk(
        &self,
        chunks: &mut ChunkContext<'_>,
        index: u32,
        err: &anyhow::Error,
    ) -> Result<(), ExportError> {
        let cause = err.flatten_chain();
        crate::error!(
            "chunk.failed index={index} error={cause:?} {}",
            chunks.run.details_line()
        );
        chunks.run.chunk_failed();
        chunks
            .uploader
            .upload(&Payload::Error(ErrorPayload::new(&cause)))
            .await
    }
}
