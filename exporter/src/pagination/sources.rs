use std::sync::Arc;

use crate::host::{
    ActingContext, ContentObject, ContentRestrictionService, ContentSearchService, HostError,
    RestrictionSubject, SpaceObject, SpaceService, SubjectKind,
};
use crate::pagination::{PageIterator, PageRequest, PageResponse, PageSource};

/// A content search bound to one query.
pub struct ContentSearchSource {
    service: Arc<dyn ContentSearchService>,
    context: ActingContext,
    query: String,
}

#[async_trait::async_trait]
impl PageSource for ContentSearchSource {
    type Item = ContentObject;

    async fn fetch(&self, request: PageRequest) -> Result<PageResponse<ContentObject>, HostError> {
        let page = self
            .service
            .search_content(self.context.clone(), self.query.clone(), request)
            .await?;
        Ok(page.into())
    }
}

/// Enumeration of all server spaces.
pub struct SpaceListingSource {
    service: Arc<dyn SpaceService>,
    context: ActingContext,
}

#[async_trait::async_trait]
impl PageSource for SpaceListingSource {
    type Item = SpaceObject;

    async fn fetch(&self, request: PageRequest) -> Result<PageResponse<SpaceObject>, HostError> {
        let page = self
            .service
            .list_spaces(self.context.clone(), request)
            .await?;
        Ok(page.into())
    }
}

/// Subjects of one kind in the update restriction of one content object.
pub struct RestrictionSource {
    service: Arc<dyn ContentRestrictionService>,
    context: ActingContext,
    content_id: i64,
    kind: SubjectKind,
}

#[async_trait::async_trait]
impl PageSource for RestrictionSource {
    type Item = RestrictionSubject;

    async fn fetch(
        &self,
        request: PageRequest,
    ) -> Result<PageResponse<RestrictionSubject>, HostError> {
        let page = self
            .service
            .update_restrictions(self.context.clone(), self.content_id, self.kind, request)
            .await?;

        // no update restriction at all reads as one empty, final page
        Ok(page.map_or_else(
            || PageResponse {
                results: Vec::new(),
                has_more: false,
                request,
            },
            Into::into,
        ))
    }
}

/// Constructors for the paged host queries a migration run walks.
pub struct ContentPager;

impl ContentPager {
    /// Pages over the content matching `query`.
    #[must_use]
    pub fn search(
        service: Arc<dyn ContentSearchService>,
        context: ActingContext,
        query: String,
        page_size: u32,
    ) -> PageIterator<ContentSearchSource> {
        PageIterator::new(
            ContentSearchSource {
                service,
                context,
                query,
            },
            page_size,
        )
    }

    /// Pages over every space of the server.
    #[must_use]
    pub fn spaces(
        service: Arc<dyn SpaceService>,
        context: ActingContext,
        page_size: u32,
    ) -> PageIterator<SpaceListingSource> {
        PageIterator::new(SpaceListingSource { service, context }, page_size)
    }

    /// Pages over the `kind` subjects of the update restriction of `content_id`.
    #[must_use]
    pub fn update_restrictions(
        service: Arc<dyn ContentRestrictionService>,
        context: ActingContext,
        content_id: i64,
        kind: SubjectKind,
        page_size: u32,
    ) -> PageIterator<RestrictionSource> {
        PageIterator::new(
            RestrictionSource {
                service,
                context,
                content_id,
                kind,
            },
            page_size,
        )
    }
}
