//! Edit rights of spaces and pages
//!
//! Both resolvers answer the same question for a chunk of records: which individual users and
//! which groups may edit? The space resolver reads the space permissions, the page resolver the
//! update restriction of each page.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use crate::host::{ActingContext, GroupName, UserKey};
use crate::migration::ObjectRecord;
use crate::pagination::PaginationError;

mod restriction;
mod space;

pub use restriction::PageRestrictionResolver;
pub use space::{SpacePermissionResolver, EDIT_SPACE_PERMISSION};

/// Users and groups holding edit rights on one space or page.
///
/// Ordered sets keep "pick any" deterministic: the smallest key wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    /// Individual users.
    pub users: BTreeSet<UserKey>,
    /// Groups.
    pub groups: BTreeSet<GroupName>,
}

impl PermissionSet {
    /// Builds a set from any user and group collections.
    pub fn new(
        users: impl IntoIterator<Item = UserKey>,
        groups: impl IntoIterator<Item = GroupName>,
    ) -> Self {
        Self {
            users: users.into_iter().collect(),
            groups: groups.into_iter().collect(),
        }
    }

    /// True when neither a user nor a group holds the right.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.groups.is_empty()
    }
}

/// Computes a [`PermissionSet`] per entity of a chunk.
#[async_trait::async_trait]
pub trait PermissionResolver: Send + Sync {
    /// Key the result is indexed by.
    type Key: Eq + Hash + Send;

    /// Resolves the edit rights of every entity referenced by `records`. Entities without any
    /// permission metadata map to an empty set.
    ///
    /// # Errors
    /// Host failures while reading permissions.
    async fn resolve(
        &self,
        context: &ActingContext,
        records: &[ObjectRecord],
    ) -> Result<HashMap<Self::Key, PermissionSet>, PaginationError>;
}
