use crate::host::{ActingContext, GroupName, HostError, UserKey};
use crate::pagination::{PageRequest, PageResponse};

/// Page-level restriction lookup.
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait ContentRestrictionService: Send + Sync {
    /// Reads one page of the subjects of `kind` in the update restriction of `content_id`.
    ///
    /// Returns `None` when the content carries no update restriction at all.
    ///
    /// # Errors
    /// Any `HostError` raised by the restriction backend.
    async fn update_restrictions(
        &self,
        context: ActingContext,
        content_id: i64,
        kind: SubjectKind,
        request: PageRequest,
    ) -> Result<Option<RestrictionPage>, HostError>;
}

/// Kind of restriction subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum SubjectKind {
    /// Individual users.
    User,
    /// Groups.
    Group,
}

/// A subject of a page restriction.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum RestrictionSubject {
    /// A user. `user_key` is `None` for users without a stable key (e.g. deleted accounts).
    User {
        /// Server user key.
        user_key: Option<UserKey>,
    },
    /// A group.
    Group {
        /// Group name.
        name: GroupName,
    },
}

/// One page of restriction subjects.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct RestrictionPage {
    /// Subjects on this page.
    pub subjects: Vec<RestrictionSubject>,
    /// Whether more subjects follow.
    pub has_more: bool,
    /// The request this page answers, as echoed by the backend.
    pub request: PageRequest,
}

impl From<RestrictionPage> for PageResponse<RestrictionSubject> {
    fn from(page: RestrictionPage) -> Self {
        Self {
            results: page.subjects,
            has_more: page.has_more,
            request: page.request,
        }
    }
}
