use tokio::sync::Mutex;

use crate::host::HostError;

mod sources;

pub use sources::{ContentPager, ContentSearchSource, RestrictionSource, SpaceListingSource};

/// Offset based page request understood by every paged host query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Record)]
pub struct PageRequest {
    /// Index of the first element of the page.
    pub start: u32,
    /// Maximum number of elements of the page.
    pub limit: u32,
}

impl PageRequest {
    /// Request for the page following this one. An echoed `limit` of 0 still advances by one.
    #[must_use]
    pub const fn following(&self, page_size: u32) -> Self {
        let step = if self.limit == 0 { 1 } else { self.limit };
        Self {
            start: self.start.saturating_add(step),
            limit: page_size,
        }
    }
}

/// One page returned by a [`PageSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse<T> {
    /// Elements of the page.
    pub results: Vec<T>,
    /// Whether the backend has more elements after this page.
    pub has_more: bool,
    /// The request the backend answered. The next offset is derived from it, not from the
    /// request that was sent, because backends may clamp `limit`.
    pub request: PageRequest,
}

/// Errors raised while walking a paged query.
#[crate::exporter_error]
pub enum PaginationError {
    /// The iterator was used out of order.
    #[error("invalid iterator state: {message}")]
    InvalidState {
        /// What was wrong.
        message: String,
    },
    /// The backing query failed.
    #[error(transparent)]
    Host(#[from] HostError),
}

/// A paged query, e.g. a content search bound to its query string.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    /// Element type of the pages.
    type Item: Send;

    /// Fetches the page described by `request`.
    ///
    /// # Errors
    /// Any `HostError` of the backing query.
    async fn fetch(&self, request: PageRequest) -> Result<PageResponse<Self::Item>, HostError>;
}

enum Cursor<T> {
    /// Nothing is pending. The next `has_next` fetches from `next_start`.
    Idle { next_start: u32 },
    /// Fetched by `has_next`, not yet handed out by `next`.
    Pending(PageResponse<T>),
    /// The last page has been handed out.
    Exhausted,
}

/// Single-pass sequence of pages over a [`PageSource`].
///
/// `has_next` fetches the following page eagerly and `next` hands it out. The cursor sits behind
/// an async mutex so that concurrent callers are serialized rather than interleaved; the
/// expected usage is one caller driving the loop:
///
/// ```rust,ignore
/// let pages = PageIterator::new(source, 1000);
/// while pages.has_next().await? {
///     let page = pages.next().await?;
///     // ...
/// }
/// ```
pub struct PageIterator<S: PageSource> {
    source: S,
    page_size: u32,
    cursor: Mutex<Cursor<S::Item>>,
}

impl<S: PageSource> PageIterator<S> {
    /// Creates an iterator that requests `page_size` elements per page, at least one.
    pub fn new(source: S, page_size: u32) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
            cursor: Mutex::new(Cursor::Idle { next_start: 0 }),
        }
    }

    /// Returns whether another page is available, fetching it if needed.
    ///
    /// Once a page reporting `has_more == false` has been handed out this returns `false`
    /// without calling the backend again. Calling it twice without `next` in between does not
    /// skip a page.
    ///
    /// # Errors
    /// `PaginationError::Host` if the fetch fails; the cursor is left untouched so the same page
    /// is requested again on the next call.
    pub async fn has_next(&self) -> Result<bool, PaginationError> {
        let mut cursor = self.cursor.lock().await;
        match &*cursor {
            Cursor::Pending(_) => Ok(true),
            Cursor::Exhausted => Ok(false),
            Cursor::Idle { next_start } => {
                let request = PageRequest {
                    start: *next_start,
                    limit: self.page_size,
                };
                crate::trace!(
                    "page_iterator.fetch start={} limit={}",
                    request.start,
                    request.limit
                );
                let page = self.source.fetch(request).await?;
                *cursor = Cursor::Pending(page);
                Ok(true)
            }
        }
    }

    /// Hands out the page fetched by the preceding [`has_next`](Self::has_next).
    ///
    /// # Errors
    /// `PaginationError::InvalidState` when no `has_next() == true` precedes the call, or when
    /// the sequence is exhausted.
    pub async fn next(&self) -> Result<PageResponse<S::Item>, PaginationError> {
        let mut cursor = self.cursor.lock().await;
        match std::mem::replace(&mut *cursor, Cursor::Exhausted) {
            Cursor::Pending(page) => {
                if page.has_more {
                    *cursor = Cursor::Idle {
                        next_start: page.request.following(self.page_size).start,
                    };
                }
                Ok(page)
            }
            Cursor::Idle { next_start } => {
                *cursor = Cursor::Idle { next_start };
                Err(PaginationError::InvalidState {
                    message: "has_next() must be called first".to_string(),
                })
            }
            Cursor::Exhausted => Err(PaginationError::InvalidState {
                message: "no more pages".to_string(),
            }),
        }
    }

    /// Moves past a page whose fetch failed, so that the next `has_next` requests the page
    /// after it. Returns `false` when no fetch is outstanding, i.e. a page is pending or the
    /// sequence is exhausted.
    pub async fn skip_failed(&self) -> bool {
        let mut cursor = self.cursor.lock().await;
        match *cursor {
            Cursor::Idle { next_start } => {
                crate::debug!(
                    "page_iterator.skip start={next_start} limit={}",
                    self.page_size
                );
                *cursor = Cursor::Idle {
                    next_start: next_start.saturating_add(self.page_size),
                };
                true
            }
            Cursor::Pending(_) | Cursor::Exhausted => false,
        }
    }

    /// Drains the remaining pages into one vector.
    ///
    /// # Errors
    /// The first fetch failure.
    pub async fn collect_all(&self) -> Result<Vec<S::Item>, PaginationError> {
        let mut items = Vec::new();
        while self.has_next().await? {
            items.extend(self.next().await?.results);
        }
        Ok(items)
    }
}
