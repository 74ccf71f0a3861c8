use std::sync::OnceLock;

use crate::host::ContentObject;

/// A migrated space that still exists on the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpaceMapping {
    /// Id of the space in the cloud.
    pub space_cloud_id: String,
    /// Id of the space on the server.
    pub space_server_id: i64,
    /// Space key, identical on both sides.
    pub space_key: String,
}

/// One page of a chunk, with both of its ids and its space.
///
/// The representative editor is assigned at most once, after the permissions of the chunk
/// have been resolved.
#[derive(Debug)]
pub struct ObjectRecord {
    /// Id of the page in the cloud.
    pub cloud_id: String,
    /// Id of the page on the server, in its serialized form.
    pub server_id: String,
    /// The space of the page.
    pub space: SpaceMapping,
    /// The search hit the record was built from.
    pub content: ContentObject,
    editor_cloud_id: OnceLock<Option<String>>,
}

impl ObjectRecord {
    /// Creates a record whose editor is not assigned yet.
    #[must_use]
    pub fn new(
        cloud_id: String,
        server_id: String,
        space: SpaceMapping,
        content: ContentObject,
    ) -> Self {
        Self {
            cloud_id,
            server_id,
            space,
            content,
            editor_cloud_id: OnceLock::new(),
        }
    }

    /// Records the selected editor. Returns `false` if one was already assigned, in which case
    /// the first assignment is kept.
    pub fn assign_editor(&self, editor_cloud_id: Option<String>) -> bool {
        self.editor_cloud_id.set(editor_cloud_id).is_ok()
    }

    /// Cloud id of the selected editor, `None` when unassigned or undeterminable.
    #[must_use]
    pub fn editor_cloud_id(&self) -> Option<&str> {
        self.editor_cloud_id.get().and_then(Option::as_deref)
    }
}
