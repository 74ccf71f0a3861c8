//! In-memory host for unit tests.
//!
//! `FakeHost` implements every collaborator trait over plain vectors and maps, counts the calls
//! it receives and can be told to fail specific calls.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::host::{
    ActingContext, ContentObject, ContentRestrictionService, ContentSearchPage,
    ContentSearchService, GroupName, HostError, HostServices, MappingPage, MigrationGateway,
    RestrictionPage, RestrictionSubject, SpaceListPage, SpaceObject, SpacePermissionEntry,
    SpaceService, SubjectKind, UserDirectory, UserKey, ENTITY_TYPE_PAGE, ENTITY_TYPE_SPACE,
    ENTITY_TYPE_USER,
};
use crate::migration::{MigrationDetails, ObjectRecord, SpaceMapping};
use crate::pagination::PageRequest;
use crate::primitives::ExporterConfig;

/// Acting context used by tests that call collaborators directly.
pub fn acting_context() -> ActingContext {
    ActingContext {
        transfer_id: "transfer-1".to_string(),
        user_key: "admin".to_string(),
    }
}

/// Record of page `content_id` in space `space_id`, with `cloud-page-*` and `cloud-space-*` ids.
pub fn object_record(content_id: i64, space_id: i64, space_key: &str) -> ObjectRecord {
    ObjectRecord::new(
        format!("cloud-page-{content_id}"),
        content_id.to_string(),
        SpaceMapping {
            space_cloud_id: format!("cloud-space-{space_id}"),
            space_server_id: space_id,
            space_key: space_key.to_string(),
        },
        ContentObject {
            id: content_id,
            title: format!("Page {content_id}"),
            space_key: space_key.to_string(),
        },
    )
}

/// Transfer metadata created at 2024-03-01T12:00:00Z.
pub fn migration_details() -> MigrationDetails {
    MigrationDetails {
        name: "Docs to cloud".to_string(),
        migration_id: "migration-1".to_string(),
        migration_scope_id: "scope-1".to_string(),
        cloud_url: "https://example.atlassian.net".to_string(),
        client_key: "client-1".to_string(),
        created_at: 1_709_294_400_000,
    }
}

/// Default configuration with millisecond backoffs and two retries.
pub fn fast_config() -> ExporterConfig {
    ExporterConfig {
        upload_max_retries: 2,
        upload_min_backoff_ms: 1,
        upload_max_backoff_ms: 2,
        ..ExporterConfig::default()
    }
}

/// One successful app data write.
#[derive(Debug, Clone)]
pub struct Upload {
    pub transfer_id: String,
    pub label: String,
    pub data: Vec<u8>,
}

impl Upload {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.data).unwrap()
    }
}

#[derive(Default)]
struct State {
    contents: Vec<ContentObject>,
    spaces: Vec<SpaceObject>,
    mappings: Vec<(String, String, String)>,
    groups: Vec<(GroupName, Vec<UserKey>)>,
    space_permissions: HashMap<i64, Vec<SpacePermissionEntry>>,
    restrictions: HashMap<i64, Vec<RestrictionSubject>>,
    failing_restrictions: HashSet<i64>,
    failing_searches: HashSet<(String, u32)>,
    failing_mapping_pages: u32,
    failing_uploads: u32,
    uploads: Vec<Upload>,
    acting_users: Vec<UserKey>,
    search_queries: Vec<String>,
    space_permission_calls: usize,
    restriction_calls: usize,
    mapping_page_calls: usize,
    mapping_by_id_batches: Vec<usize>,
    group_member_calls: usize,
    user_group_calls: usize,
    upload_attempts: usize,
}

#[derive(Default)]
pub struct FakeHost {
    state: Mutex<State>,
}

fn page_of<T: Clone>(items: &[T], request: PageRequest) -> (Vec<T>, bool) {
    let start = (request.start as usize).min(items.len());
    let end = start.saturating_add(request.limit as usize).min(items.len());
    (items[start..end].to_vec(), end < items.len())
}

fn space_key_of(query: &str) -> Option<&str> {
    let (_, rest) = query.split_once("space = \"")?;
    rest.split('"').next()
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A host whose administrative group has `admin` as its only member.
    pub fn with_admin(admin: &str) -> Arc<Self> {
        let host = Self::new();
        host.add_group("confluence-administrators", &[admin]);
        host
    }

    pub fn services(self: &Arc<Self>) -> HostServices {
        HostServices {
            content_search: self.clone(),
            spaces: self.clone(),
            restrictions: self.clone(),
            directory: self.clone(),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    // ---- seeding ----

    pub fn add_page(&self, space_key: &str, id: i64, title: &str) {
        self.state().contents.push(ContentObject {
            id,
            title: title.to_string(),
            space_key: space_key.to_string(),
        });
    }

    /// A searchable page with a `cloud-page-<id>` mapping.
    pub fn add_migrated_page(&self, space_key: &str, id: i64, title: &str) {
        self.add_page(space_key, id, title);
        self.add_mapping(ENTITY_TYPE_PAGE, &id.to_string(), &format!("cloud-page-{id}"));
    }

    pub fn add_space(&self, id: i64, key: &str) {
        self.state().spaces.push(SpaceObject {
            id,
            key: key.to_string(),
            name: format!("{key} space"),
        });
    }

    /// A server space with a `cloud-space-<id>` mapping.
    pub fn add_migrated_space(&self, id: i64, key: &str) {
        self.add_space(id, key);
        self.add_mapping(ENTITY_TYPE_SPACE, &id.to_string(), &format!("cloud-space-{id}"));
    }

    pub fn add_mapping(&self, entity_type: &str, server_id: &str, cloud_id: &str) {
        self.state().mappings.push((
            entity_type.to_string(),
            server_id.to_string(),
            cloud_id.to_string(),
        ));
    }

    /// Maps server user `user_key` to `cloud_id` under the user namespace prefix.
    pub fn map_user(&self, user_key: &str, cloud_id: &str) {
        self.add_mapping(
            ENTITY_TYPE_USER,
            &format!("confluence.userkey/{user_key}"),
            cloud_id,
        );
    }

    /// Creates or replaces a group.
    pub fn add_group(&self, name: &str, members: &[&str]) {
        let members = members.iter().map(ToString::to_string).collect();
        let mut state = self.state();
        state.groups.retain(|(group, _)| group != name);
        state.groups.push((name.to_string(), members));
    }

    pub fn set_space_permissions(&self, space_id: i64, entries: Vec<SpacePermissionEntry>) {
        self.state().space_permissions.insert(space_id, entries);
    }

    pub fn set_restrictions(&self, content_id: i64, subjects: Vec<RestrictionSubject>) {
        self.state().restrictions.insert(content_id, subjects);
    }

    // ---- failure injection ----

    pub fn fail_restrictions_for(&self, content_id: i64) {
        self.state().failing_restrictions.insert(content_id);
    }

    /// Searches of `space_key` starting at offset `start` fail. `None` fails every offset.
    pub fn fail_search_at(&self, space_key: &str, start: Option<u32>) {
        self.state()
            .failing_searches
            .insert((space_key.to_string(), start.unwrap_or(u32::MAX)));
    }

    /// The next `count` identity or space mapping reads fail.
    pub fn fail_mapping_pages(&self, count: u32) {
        self.state().failing_mapping_pages = count;
    }

    /// The next `count` app data writes fail.
    pub fn fail_uploads(&self, count: u32) {
        self.state().failing_uploads = count;
    }

    // ---- inspection ----

    pub fn uploads(&self) -> Vec<Upload> {
        self.state().uploads.clone()
    }

    pub fn uploaded_labels(&self) -> Vec<String> {
        self.uploads().into_iter().map(|upload| upload.label).collect()
    }

    pub fn uploads_labeled(&self, label: &str) -> Vec<Upload> {
        self.uploads()
            .into_iter()
            .filter(|upload| upload.label == label)
            .collect()
    }

    pub fn upload_attempts(&self) -> usize {
        self.state().upload_attempts
    }

    pub fn acting_users(&self) -> Vec<UserKey> {
        self.state().acting_users.clone()
    }

    pub fn search_queries(&self) -> Vec<String> {
        self.state().search_queries.clone()
    }

    pub fn search_calls(&self) -> usize {
        self.state().search_queries.len()
    }

    pub fn space_permission_calls(&self) -> usize {
        self.state().space_permission_calls
    }

    pub fn restriction_calls(&self) -> usize {
        self.state().restriction_calls
    }

    pub fn mapping_page_calls(&self) -> usize {
        self.state().mapping_page_calls
    }

    pub fn mapping_by_id_batches(&self) -> Vec<usize> {
        self.state().mapping_by_id_batches.clone()
    }

    pub fn group_member_calls(&self) -> usize {
        self.state().group_member_calls
    }

    pub fn user_group_calls(&self) -> usize {
        self.state().user_group_calls
    }
}

#[async_trait::async_trait]
impl MigrationGateway for FakeHost {
    async fn mapping_page(
        &self,
        _transfer_id: String,
        entity_type: String,
        page_size: u32,
        cursor: Option<String>,
    ) -> Result<MappingPage, HostError> {
        let mut state = self.state();
        state.mapping_page_calls += 1;
        if state.failing_mapping_pages > 0 {
            state.failing_mapping_pages -= 1;
            return Err(HostError::Unavailable {
                message: "mapping service timed out".to_string(),
            });
        }

        let entries: Vec<(String, String)> = state
            .mappings
            .iter()
            .filter(|(entity, _, _)| *entity == entity_type)
            .map(|(_, server, cloud)| (server.clone(), cloud.clone()))
            .collect();
        let start = cursor.map_or(0, |cursor| cursor.parse::<u32>().unwrap());
        let (page, has_more) = page_of(
            &entries,
            PageRequest {
                start,
                limit: page_size,
            },
        );

        Ok(MappingPage {
            mappings: page.into_iter().collect(),
            next_cursor: has_more.then(|| (start + page_size).to_string()),
        })
    }

    async fn mapping_by_id(
        &self,
        _transfer_id: String,
        entity_type: String,
        server_ids: Vec<String>,
    ) -> Result<HashMap<String, String>, HostError> {
        let mut state = self.state();
        state.mapping_by_id_batches.push(server_ids.len());
        Ok(state
            .mappings
            .iter()
            .filter(|(entity, server, _)| *entity == entity_type && server_ids.contains(server))
            .map(|(_, server, cloud)| (server.clone(), cloud.clone()))
            .collect())
    }

    async fn write_app_data(
        &self,
        transfer_id: String,
        label: String,
        data: Vec<u8>,
    ) -> Result<(), HostError> {
        let mut state = self.state();
        state.upload_attempts += 1;
        if state.failing_uploads > 0 {
            state.failing_uploads -= 1;
            return Err(HostError::Unavailable {
                message: "gateway returned 503".to_string(),
            });
        }
        state.uploads.push(Upload {
            transfer_id,
            label,
            data,
        });
        Ok(())
    }
}

#[async_trait::async_trait]
impl ContentSearchService for FakeHost {
    async fn search_content(
        &self,
        context: ActingContext,
        query: String,
        request: PageRequest,
    ) -> Result<ContentSearchPage, HostError> {
        let mut state = self.state();
        state.acting_users.push(context.user_key);
        let space_key = space_key_of(&query).map(ToString::to_string);
        state.search_queries.push(query);
        if let Some(key) = &space_key {
            let fails = state.failing_searches.contains(&(key.clone(), request.start))
                || state.failing_searches.contains(&(key.clone(), u32::MAX));
            if fails {
                return Err(HostError::Unavailable {
                    message: format!("search of {key} at {} timed out", request.start),
                });
            }
        }

        let matches: Vec<ContentObject> = state
            .contents
            .iter()
            .filter(|content| Some(&content.space_key) == space_key.as_ref())
            .cloned()
            .collect();
        let (results, has_more) = page_of(&matches, request);
        Ok(ContentSearchPage {
            results,
            has_more,
            request,
        })
    }
}

#[async_trait::async_trait]
impl SpaceService for FakeHost {
    async fn list_spaces(
        &self,
        context: ActingContext,
        request: PageRequest,
    ) -> Result<SpaceListPage, HostError> {
        let mut state = self.state();
        state.acting_users.push(context.user_key);
        let (results, has_more) = page_of(&state.spaces, request);
        Ok(SpaceListPage {
            results,
            has_more,
            request,
        })
    }

    async fn space_permissions(
        &self,
        context: ActingContext,
        space_id: i64,
    ) -> Result<Option<Vec<SpacePermissionEntry>>, HostError> {
        let mut state = self.state();
        state.acting_users.push(context.user_key);
        state.space_permission_calls += 1;
        if let Some(entries) = state.space_permissions.get(&space_id) {
            return Ok(Some(entries.clone()));
        }
        let exists = state.spaces.iter().any(|space| space.id == space_id);
        Ok(exists.then(Vec::new))
    }
}

#[async_trait::async_trait]
impl ContentRestrictionService for FakeHost {
    async fn update_restrictions(
        &self,
        context: ActingContext,
        content_id: i64,
        kind: SubjectKind,
        request: PageRequest,
    ) -> Result<Option<RestrictionPage>, HostError> {
        let mut state = self.state();
        state.acting_users.push(context.user_key);
        state.restriction_calls += 1;
        if state.failing_restrictions.contains(&content_id) {
            return Err(HostError::Unavailable {
                message: format!("restrictions of {content_id} unavailable"),
            });
        }

        let Some(subjects) = state.restrictions.get(&content_id) else {
            return Ok(None);
        };
        let of_kind: Vec<RestrictionSubject> = subjects
            .iter()
            .filter(|subject| match subject {
                RestrictionSubject::User { .. } => kind == SubjectKind::User,
                RestrictionSubject::Group { .. } => kind == SubjectKind::Group,
            })
            .cloned()
            .collect();
        let (subjects, has_more) = page_of(&of_kind, request);
        Ok(Some(RestrictionPage {
            subjects,
            has_more,
            request,
        }))
    }
}

#[async_trait::async_trait]
impl UserDirectory for FakeHost {
    async fn group_members(&self, group: GroupName) -> Result<Option<Vec<UserKey>>, HostError> {
        let mut state = self.state();
        state.group_member_calls += 1;
        Ok(state
            .groups
            .iter()
            .find(|(name, _)| *name == group)
            .map(|(_, members)| members.clone()))
    }

    async fn user_groups(&self, user_key: UserKey) -> Result<Option<Vec<GroupName>>, HostError> {
        let mut state = self.state();
        state.user_group_calls += 1;
        Ok(Some(
            state
                .groups
                .iter()
                .filter(|(_, members)| members.contains(&user_key))
                .map(|(name, _)| name.clone())
                .collect(),
        ))
    }
}
