use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::host::{GroupName, HostError, UserDirectory, UserKey};
use crate::identity::IdentityMap;
use crate::migration::ObjectRecord;
use crate::permissions::PermissionSet;

/// Directory lookups memoized for one migration run.
#[derive(Debug, Default)]
pub struct MembershipCache {
    first_member_by_group: HashMap<GroupName, Option<UserKey>>,
    groups_by_user: HashMap<UserKey, BTreeSet<GroupName>>,
}

impl MembershipCache {
    /// Number of groups whose first member is memoized.
    #[must_use]
    pub fn groups_cached(&self) -> usize {
        self.first_member_by_group.len()
    }

    /// Number of users whose groups are memoized.
    #[must_use]
    pub fn users_cached(&self) -> usize {
        self.groups_by_user.len()
    }
}

/// Picks one representative editor per page.
///
/// An unrestricted page inherits the space's edit rights, so any user of the space will do.
/// A restricted page needs a user allowed by both the page restriction and the space
/// permissions. Candidates are tried in this order:
///
/// 1. a user named on both the page and the space
/// 2. a page user who is a member of a space group
/// 3. a space user who is a member of a page group
/// 4. the first member of a group named on both the page and the space
///
/// The chosen server user is then translated through the identity map; a user without a cloud
/// account yields no editor.
pub struct EditorSelector {
    directory: Arc<dyn UserDirectory>,
    identities: Arc<IdentityMap>,
    prefix: String,
    memberships: MembershipCache,
}

impl EditorSelector {
    /// Creates a selector with empty membership caches.
    #[must_use]
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        identities: Arc<IdentityMap>,
        prefix: String,
    ) -> Self {
        Self {
            directory,
            identities,
            prefix,
            memberships: MembershipCache::default(),
        }
    }

    /// Directory lookups memoized so far.
    #[must_use]
    pub const fn memberships(&self) -> &MembershipCache {
        &self.memberships
    }

    /// Assigns the editor of every record from the resolved page and space permissions.
    /// Records missing from either map are treated as carrying no rights at that level.
    ///
    /// # Errors
    /// Directory failures while expanding group memberships.
    pub async fn assign_editors(
        &mut self,
        records: &[ObjectRecord],
        page_permissions: &HashMap<String, PermissionSet>,
        space_permissions: &HashMap<i64, PermissionSet>,
    ) -> Result<(), HostError> {
        let empty = PermissionSet::default();
        for record in records {
            let page = page_permissions.get(&record.server_id).unwrap_or(&empty);
            let space = space_permissions
                .get(&record.space.space_server_id)
                .unwrap_or(&empty);

            let editor = self.select(page, space).await?;
            if editor.is_none() {
                crate::debug!(
                    "editor_selector.no_editor page_server_id={} space_key={} title={:?}",
                    record.server_id,
                    record.space.space_key,
                    record.content.title
                );
            }
            record.assign_editor(editor);
        }
        Ok(())
    }

    /// Returns the cloud id of the representative editor for a page with permissions `page`
    /// in a space with permissions `space`.
    ///
    /// # Errors
    /// Directory failures while expanding group memberships.
    pub async fn select(
        &mut self,
        page: &PermissionSet,
        space: &PermissionSet,
    ) -> Result<Option<String>, HostError> {
        let server_user = self.pick_server_user(page, space).await?;
        Ok(server_user.and_then(|user| self.cloud_id(&user)))
    }

    fn cloud_id(&self, user_key: &str) -> Option<String> {
        self.identities
            .get(&format!("{}{user_key}", self.prefix))
            .cloned()
    }

    async fn pick_server_user(
        &mut self,
        page: &PermissionSet,
        space: &PermissionSet,
    ) -> Result<Option<UserKey>, HostError> {
        if page.is_empty() {
            if let Some(user) = space.users.first() {
                return Ok(Some(user.clone()));
            }
            return self.first_member_of_any(space.groups.iter()).await;
        }

        if let Some(user) = page.users.intersection(&space.users).next() {
            return Ok(Some(user.clone()));
        }

        if let Some(user) = self.first_member_of(&page.users, &space.groups).await? {
            return Ok(Some(user));
        }

        if let Some(user) = self.first_member_of(&space.users, &page.groups).await? {
            return Ok(Some(user));
        }

        self.first_member_of_any(page.groups.intersection(&space.groups))
            .await
    }

    /// First of `users` that belongs to one of `groups`.
    async fn first_member_of(
        &mut self,
        users: &BTreeSet<UserKey>,
        groups: &BTreeSet<GroupName>,
    ) -> Result<Option<UserKey>, HostError> {
        if groups.is_empty() {
            return Ok(None);
        }
        for user in users {
            if !self.groups_of(user).await?.is_disjoint(groups) {
                return Ok(Some(user.clone()));
            }
        }
        Ok(None)
    }

    /// First member of the first group in `groups` that has one.
    async fn first_member_of_any<'a>(
        &mut self,
        groups: impl Iterator<Item = &'a GroupName> + Send,
    ) -> Result<Option<UserKey>, HostError> {
        for group in groups {
            if let Some(user) = self.first_member(group).await? {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    async fn first_member(&mut self, group: &str) -> Result<Option<UserKey>, HostError> {
        if let Some(member) = self.memberships.first_member_by_group.get(group) {
            return Ok(member.clone());
        }

        let member = self
            .directory
            .group_members(group.to_string())
            .await?
            .and_then(|members| members.into_iter().next());
        self.memberships
            .first_member_by_group
            .insert(group.to_string(), member.clone());
        Ok(member)
    }

    async fn groups_of(&mut self, user: &str) -> Result<&BTreeSet<GroupName>, HostError> {
        if !self.memberships.groups_by_user.contains_key(user) {
            let groups: BTreeSet<GroupName> = self
                .directory
                .user_groups(user.to_string())
                .await?
                .unwrap_or_default()
                .into_iter()
                .collect();
            self.memberships
                .groups_by_user
                .insert(user.to_string(), groups);
        }
        Ok(self
            .memberships
            .groups_by_user
            .entry(user.to_string())
            .or_default())
    }
}
