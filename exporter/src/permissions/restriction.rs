use std::collections::HashMap;
use std::sync::Arc;

use crate::host::{ActingContext, ContentRestrictionService, RestrictionSubject, SubjectKind};
use crate::migration::ObjectRecord;
use crate::pagination::{ContentPager, PaginationError};
use crate::permissions::{PermissionResolver, PermissionSet};

/// Edit rights granted by page update restrictions, keyed by server page id.
pub struct PageRestrictionResolver {
    restrictions: Arc<dyn ContentRestrictionService>,
    page_size: u32,
}

impl PageRestrictionResolver {
    /// Creates a resolver reading `page_size` subjects per request.
    #[must_use]
    pub fn new(restrictions: Arc<dyn ContentRestrictionService>, page_size: u32) -> Self {
        Self {
            restrictions,
            page_size,
        }
    }

    async fn subjects(
        &self,
        context: &ActingContext,
        content_id: i64,
        kind: SubjectKind,
    ) -> Result<Vec<RestrictionSubject>, PaginationError> {
        ContentPager::update_restrictions(
            Arc::clone(&self.restrictions),
            context.clone(),
            content_id,
            kind,
            self.page_size,
        )
        .collect_all()
        .await
    }

    async fn resolve_page(
        &self,
        context: &ActingContext,
        content_id: i64,
    ) -> Result<PermissionSet, PaginationError> {
        let mut set = PermissionSet::default();

        for kind in [SubjectKind::User, SubjectKind::Group] {
            for subject in self.subjects(context, content_id, kind).await? {
                match subject {
                    RestrictionSubject::User {
                        user_key: Some(key),
                    } => {
                        set.users.insert(key);
                    }
                    RestrictionSubject::User { user_key: None } => {
                        crate::debug!("page_restriction.user_without_key content_id={content_id}");
                    }
                    RestrictionSubject::Group { name } => {
                        set.groups.insert(name);
                    }
                }
            }
        }

        Ok(set)
    }
}

#[async_trait::async_trait]
impl PermissionResolver for PageRestrictionResolver {
    type Key = String;

    async fn resolve(
        &self,
        context: &ActingContext,
        records: &[ObjectRecord],
    ) -> Result<HashMap<String, PermissionSet>, PaginationError> {
        let mut resolved = HashMap::with_capacity(records.len());
        for record in records {
            let set = self.resolve_page(context, record.content.id).await?;
            resolved.insert(record.server_id.clone(), set);
        }
        Ok(resolved)
    }
}
