use crate::host::{ActingContext, GroupName, HostError, UserKey};
use crate::pagination::{PageRequest, PageResponse};

/// Content search backend, queried with the host's boolean filter language
/// (e.g. `macro = "markdown-from-url" AND space = "DOCS"`).
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait ContentSearchService: Send + Sync {
    /// Runs `query` and returns the page described by `request`.
    ///
    /// # Errors
    /// Any `HostError` raised by the search backend.
    async fn search_content(
        &self,
        context: ActingContext,
        query: String,
        request: PageRequest,
    ) -> Result<ContentSearchPage, HostError>;
}

/// Space enumeration and space permission lookup.
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait SpaceService: Send + Sync {
    /// Lists the spaces that currently exist on the server.
    ///
    /// # Errors
    /// Any `HostError` raised by the space backend.
    async fn list_spaces(
        &self,
        context: ActingContext,
        request: PageRequest,
    ) -> Result<SpaceListPage, HostError>;

    /// Returns the permission entries of a space, or `None` when the space does not exist.
    ///
    /// # Errors
    /// Any `HostError` raised by the space backend.
    async fn space_permissions(
        &self,
        context: ActingContext,
        space_id: i64,
    ) -> Result<Option<Vec<SpacePermissionEntry>>, HostError>;
}

/// A content object returned by the search.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ContentObject {
    /// Server id of the content.
    pub id: i64,
    /// Title, only written to logs for pages that are dropped or get no editor.
    pub title: String,
    /// Key of the containing space.
    pub space_key: String,
}

/// A server space.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct SpaceObject {
    /// Server id of the space.
    pub id: i64,
    /// Space key.
    pub key: String,
    /// Display name.
    pub name: String,
}

/// One page of content search results.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ContentSearchPage {
    /// Matches on this page.
    pub results: Vec<ContentObject>,
    /// Whether more results follow.
    pub has_more: bool,
    /// The request this page answers, as echoed by the backend.
    pub request: PageRequest,
}

impl From<ContentSearchPage> for PageResponse<ContentObject> {
    fn from(page: ContentSearchPage) -> Self {
        Self {
            results: page.results,
            has_more: page.has_more,
            request: page.request,
        }
    }
}

/// One page of the space listing.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct SpaceListPage {
    /// Spaces on this page.
    pub results: Vec<SpaceObject>,
    /// Whether more spaces follow.
    pub has_more: bool,
    /// The request this page answers, as echoed by the backend.
    pub request: PageRequest,
}

impl From<SpaceListPage> for PageResponse<SpaceObject> {
    fn from(page: SpaceListPage) -> Self {
        Self {
            results: page.results,
            has_more: page.has_more,
            request: page.request,
        }
    }
}

/// One permission entry of a space.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct SpacePermissionEntry {
    /// Permission type, e.g. `EDITSPACE` or `VIEWSPACE`.
    pub permission_type: String,
    /// Who the permission is granted to.
    pub subject: PermissionSubject,
}

/// Grantee of a space permission.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum PermissionSubject {
    /// A single user. `user_key` is `None` when the user no longer resolves.
    User {
        /// Server user key.
        user_key: Option<UserKey>,
    },
    /// A group.
    Group {
        /// Group name, `None` when the group no longer resolves.
        name: Option<GroupName>,
    },
    /// Anonymous access.
    Anonymous,
}
