#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use exporter::host::{
    ActingContext, ContentObject, ContentRestrictionService, ContentSearchPage,
    ContentSearchService, GroupName, HostError, MappingPage, MigrationGateway, PermissionSubject,
    RestrictionPage, RestrictionSubject, SpaceListPage, SpaceObject, SpacePermissionEntry,
    SpaceService, SubjectKind, UserDirectory, UserKey, ENTITY_TYPE_PAGE, ENTITY_TYPE_SPACE,
    ENTITY_TYPE_USER,
};
use exporter::migration::{MarkdownMigrationListener, MigrationDetails};
use exporter::pagination::PageRequest;
use exporter::primitives::ExporterConfig;

pub const TRANSFER_ID: &str = "transfer-42";

pub fn details() -> MigrationDetails {
    MigrationDetails {
        name: "Engineering wiki".to_string(),
        migration_id: "migration-42".to_string(),
        migration_scope_id: "scope-42".to_string(),
        cloud_url: "https://acme.atlassian.net".to_string(),
        client_key: "client-42".to_string(),
        created_at: 1_709_294_400_000,
    }
}

pub fn config() -> ExporterConfig {
    ExporterConfig {
        server_app_version: "3.1.0".to_string(),
        content_page_size: 2,
        upload_max_retries: 1,
        upload_min_backoff_ms: 1,
        upload_max_backoff_ms: 1,
        ..ExporterConfig::default()
    }
}

fn slice<T: Clone>(items: &[T], request: PageRequest) -> (Vec<T>, bool) {
    let start = (request.start as usize).min(items.len());
    let end = (start + request.limit as usize).min(items.len());
    (items[start..end].to_vec(), end < items.len())
}

/// The server side: spaces, pages, permissions and the user directory.
#[derive(Default)]
pub struct Platform {
    spaces: Mutex<Vec<SpaceObject>>,
    pages: Mutex<Vec<ContentObject>>,
    space_editors: Mutex<HashMap<i64, Vec<SpacePermissionEntry>>>,
    restrictions: Mutex<HashMap<i64, Vec<RestrictionSubject>>>,
    groups: Mutex<HashMap<GroupName, Vec<UserKey>>>,
    broken_searches: Mutex<HashSet<String>>,
    broken_search_pages: Mutex<HashSet<(String, u32)>>,
}

impl Platform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn listener(self: &Arc<Self>) -> MarkdownMigrationListener {
        self.listener_with(config())
    }

    pub fn listener_with(self: &Arc<Self>, config: ExporterConfig) -> MarkdownMigrationListener {
        MarkdownMigrationListener::with_config(
            exporter::host::HostServices {
                content_search: self.clone(),
                spaces: self.clone(),
                restrictions: self.clone(),
                directory: self.clone(),
            },
            config,
        )
    }

    pub fn space(&self, id: i64, key: &str) {
        self.spaces.lock().unwrap().push(SpaceObject {
            id,
            key: key.to_string(),
            name: key.to_lowercase(),
        });
    }

    pub fn page(&self, space_key: &str, id: i64) {
        self.pages.lock().unwrap().push(ContentObject {
            id,
            title: format!("{space_key}-{id}"),
            space_key: space_key.to_string(),
        });
    }

    pub fn group(&self, name: &str, members: &[&str]) {
        self.groups.lock().unwrap().insert(
            name.to_string(),
            members.iter().map(ToString::to_string).collect(),
        );
    }

    pub fn space_editor(&self, space_id: i64, user_key: &str) {
        self.space_editors
            .lock()
            .unwrap()
            .entry(space_id)
            .or_default()
            .push(SpacePermissionEntry {
                permission_type: "EDITSPACE".to_string(),
                subject: PermissionSubject::User {
                    user_key: Some(user_key.to_string()),
                },
            });
    }

    pub fn restrict_to_user(&self, content_id: i64, user_key: &str) {
        self.restrictions
            .lock()
            .unwrap()
            .entry(content_id)
            .or_default()
            .push(RestrictionSubject::User {
                user_key: Some(user_key.to_string()),
            });
    }

    pub fn break_search_of(&self, space_key: &str) {
        self.broken_searches
            .lock()
            .unwrap()
            .insert(space_key.to_string());
    }

    /// Only the search page of `space_key` starting at `start` fails.
    pub fn break_search_page(&self, space_key: &str, start: u32) {
        self.broken_search_pages
            .lock()
            .unwrap()
            .insert((space_key.to_string(), start));
    }
}

#[async_trait::async_trait]
impl ContentSearchService for Platform {
    async fn search_content(
        &self,
        _context: ActingContext,
        query: String,
        request: PageRequest,
    ) -> Result<ContentSearchPage, HostError> {
        let space_key = query
            .rsplit("space = \"")
            .next()
            .unwrap_or_default()
            .trim_end_matches('"')
            .to_string();
        let broken_page = self
            .broken_search_pages
            .lock()
            .unwrap()
            .contains(&(space_key.clone(), request.start));
        if broken_page || self.broken_searches.lock().unwrap().contains(&space_key) {
            return Err(HostError::Unavailable {
                message: "search index is rebuilding".to_string(),
            });
        }

        let hits: Vec<ContentObject> = self
            .pages
            .lock()
            .unwrap()
            .iter()
            .filter(|page| page.space_key == space_key)
            .cloned()
            .collect();
        let (results, has_more) = slice(&hits, request);
        Ok(ContentSearchPage {
            results,
            has_more,
            request,
        })
    }
}

#[async_trait::async_trait]
impl SpaceService for Platform {
    async fn list_spaces(
        &self,
        _context: ActingContext,
        request: PageRequest,
    ) -> Result<SpaceListPage, HostError> {
        let (results, has_more) = slice(&self.spaces.lock().unwrap(), request);
        Ok(SpaceListPage {
            results,
            has_more,
            request,
        })
    }

    async fn space_permissions(
        &self,
        _context: ActingContext,
        space_id: i64,
    ) -> Result<Option<Vec<SpacePermissionEntry>>, HostError> {
        Ok(Some(
            self.space_editors
                .lock()
                .unwrap()
                .get(&space_id)
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

#[async_trait::async_trait]
impl ContentRestrictionService for Platform {
    async fn update_restrictions(
        &self,
        _context: ActingContext,
        content_id: i64,
        kind: SubjectKind,
        request: PageRequest,
    ) -> Result<Option<RestrictionPage>, HostError> {
        let restrictions = self.restrictions.lock().unwrap();
        let Some(subjects) = restrictions.get(&content_id) else {
            return Ok(None);
        };
        let subjects: Vec<RestrictionSubject> = subjects
            .iter()
            .filter(|subject| {
                matches!(
                    (subject, kind),
                    (RestrictionSubject::User { .. }, SubjectKind::User)
                        | (RestrictionSubject::Group { .. }, SubjectKind::Group)
                )
            })
            .cloned()
            .collect();
        let (subjects, has_more) = slice(&subjects, request);
        Ok(Some(RestrictionPage {
            subjects,
            has_more,
            request,
        }))
    }
}

#[async_trait::async_trait]
impl UserDirectory for Platform {
    async fn group_members(&self, group: GroupName) -> Result<Option<Vec<UserKey>>, HostError> {
        Ok(self.groups.lock().unwrap().get(&group).cloned())
    }

    async fn user_groups(&self, user_key: UserKey) -> Result<Option<Vec<GroupName>>, HostError> {
        Ok(Some(
            self.groups
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, members)| members.contains(&user_key))
                .map(|(name, _)| name.clone())
                .collect(),
        ))
    }
}

/// The migration assistant's side of one transfer.
#[derive(Default)]
pub struct Gateway {
    mappings: Mutex<Vec<(String, String, String)>>,
    written: Mutex<Vec<(String, serde_json::Value)>>,
    failing_labels: Mutex<HashMap<String, u32>>,
}

impl Gateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn migrated_space(&self, id: i64) {
        self.map(ENTITY_TYPE_SPACE, &id.to_string(), &format!("cloud-space-{id}"));
    }

    pub fn migrated_page(&self, id: i64) {
        self.map(ENTITY_TYPE_PAGE, &id.to_string(), &format!("cloud-page-{id}"));
    }

    pub fn migrated_user(&self, user_key: &str) {
        self.map(
            ENTITY_TYPE_USER,
            &format!("confluence.userkey/{user_key}"),
            &format!("cloud-{user_key}"),
        );
    }

    fn map(&self, entity_type: &str, server_id: &str, cloud_id: &str) {
        self.mappings.lock().unwrap().push((
            entity_type.to_string(),
            server_id.to_string(),
            cloud_id.to_string(),
        ));
    }

    /// Every write of a label starting with `prefix` fails.
    pub fn reject(&self, prefix: &str) {
        self.failing_labels
            .lock()
            .unwrap()
            .insert(prefix.to_string(), u32::MAX);
    }

    /// The next `times` writes of a label starting with `prefix` fail.
    pub fn reject_times(&self, prefix: &str, times: u32) {
        self.failing_labels
            .lock()
            .unwrap()
            .insert(prefix.to_string(), times);
    }

    pub fn labels(&self) -> Vec<String> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .map(|(label, _)| label.clone())
            .collect()
    }

    pub fn payloads(&self, label: &str) -> Vec<serde_json::Value> {
        self.written
            .lock()
            .unwrap()
            .iter()
            .filter(|(written, _)| written == label)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn payload(&self, label: &str) -> serde_json::Value {
        self.payloads(label)
            .into_iter()
            .next()
            .unwrap_or_else(|| panic!("no payload labeled {label}"))
    }
}

#[async_trait::async_trait]
impl MigrationGateway for Gateway {
    async fn mapping_page(
        &self,
        _transfer_id: String,
        entity_type: String,
        page_size: u32,
        cursor: Option<String>,
    ) -> Result<MappingPage, HostError> {
        let entries: Vec<(String, String)> = self
            .mappings
            .lock()
            .unwrap()
            .iter()
            .filter(|(entity, _, _)| *entity == entity_type)
            .map(|(_, server, cloud)| (server.clone(), cloud.clone()))
            .collect();
        let start: u32 = cursor.map_or(0, |cursor| cursor.parse().unwrap());
        let (page, has_more) = slice(
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
        Ok(self
            .mappings
            .lock()
            .unwrap()
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
        assert_eq!(transfer_id, TRANSFER_ID);
        let mut failing = self.failing_labels.lock().unwrap();
        if let Some(remaining) = failing
            .iter_mut()
            .find(|(prefix, _)| label.starts_with(prefix.as_str()))
            .map(|(_, remaining)| remaining)
        {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(HostError::Unavailable {
                    message: format!("cannot store {label}"),
                });
            }
        }
        drop(failing);

        let body = serde_json::from_slice(&data).unwrap();
        self.written.lock().unwrap().push((label, body));
        Ok(())
    }
}
