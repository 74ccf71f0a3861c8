use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::host::{ActingContext, PermissionSubject, SpaceService};
use crate::migration::ObjectRecord;
use crate::pagination::PaginationError;
use crate::permissions::{PermissionResolver, PermissionSet};

/// Space permission granting page creation and edit.
pub const EDIT_SPACE_PERMISSION: &str = "EDITSPACE";

/// Edit rights granted by space permissions, keyed by server space id.
pub struct SpacePermissionResolver {
    spaces: Arc<dyn SpaceService>,
}

impl SpacePermissionResolver {
    /// Creates a resolver reading from `spaces`.
    #[must_use]
    pub fn new(spaces: Arc<dyn SpaceService>) -> Self {
        Self { spaces }
    }

    async fn resolve_space(
        &self,
        context: &ActingContext,
        space_id: i64,
    ) -> Result<PermissionSet, PaginationError> {
        let Some(entries) = self
            .spaces
            .space_permissions(context.clone(), space_id)
            .await?
        else {
            crate::debug!("space_permissions.missing space_id={space_id}");
            return Ok(PermissionSet::default());
        };

        let mut set = PermissionSet::default();
        for entry in entries {
            if !entry
                .permission_type
                .eq_ignore_ascii_case(EDIT_SPACE_PERMISSION)
            {
                continue;
            }
            match entry.subject {
                PermissionSubject::User { user_key: Some(key) } => {
                    set.users.insert(key);
                }
                PermissionSubject::Group { name: Some(name) } => {
                    set.groups.insert(name);
                }
                PermissionSubject::User { user_key: None }
                | PermissionSubject::Group { name: None }
                | PermissionSubject::Anonymous => {}
            }
        }
        Ok(set)
    }
}

#[async_trait::async_trait]
impl PermissionResolver for SpacePermissionResolver {
    type Key = i64;

    async fn resolve(
        &self,
        context: &ActingContext,
        records: &[ObjectRecord],
    ) -> Result<HashMap<i64, PermissionSet>, PaginationError> {
        let space_ids: BTreeSet<i64> = records
            .iter()
            .map(|record| record.space.space_server_id)
            .collect();

        let mut resolved = HashMap::with_capacity(space_ids.len());
        for space_id in space_ids {
            let set = self.resolve_space(context, space_id).await?;
            resolved.insert(space_id, set);
        }
        Ok(resolved)
    }
}
