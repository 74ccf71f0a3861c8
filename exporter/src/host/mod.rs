//! Host collaborators
//!
//! Everything the exporter needs from the server platform is expressed as a foreign-implementable
//! trait. The host passes the server services to
//! [`MarkdownMigrationListener::new`](crate::migration::MarkdownMigrationListener::new) when the
//! plugin is enabled, and a [`MigrationGateway`] with every transfer it starts.
//!
//! Calls that read content on behalf of a user take an explicit [`ActingContext`]: the identity
//! chosen at the start of a run is threaded through every content, space and restriction query
//! of that run instead of being stashed in ambient state.

use std::sync::Arc;

mod content;
mod directory;
mod gateway;
mod restrictions;

pub use content::{
    ContentObject, ContentSearchPage, ContentSearchService, PermissionSubject, SpaceListPage,
    SpaceObject, SpacePermissionEntry, SpaceService,
};
pub use directory::UserDirectory;
pub use gateway::{
    MappingPage, MigrationGateway, ENTITY_TYPE_PAGE, ENTITY_TYPE_SPACE, ENTITY_TYPE_USER,
};
pub use restrictions::{
    ContentRestrictionService, RestrictionPage, RestrictionSubject, SubjectKind,
};

/// Key of a server-side user.
pub type UserKey = String;

/// Name of a server-side group.
pub type GroupName = String;

/// Identity a migration run acts as.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct ActingContext {
    /// Transfer the run belongs to.
    pub transfer_id: String,
    /// Server user key of the acting administrator.
    pub user_key: UserKey,
}

/// Failure reported by a host collaborator.
///
/// Host implementations should map platform exceptions onto the closest variant.
#[crate::exporter_error]
pub enum HostError {
    /// The requested entity does not exist on the host.
    #[error("{entity} not found")]
    NotFound {
        /// Description of the missing entity.
        entity: String,
    },
    /// The acting identity is not allowed to perform the call.
    #[error("access denied: {message}")]
    AccessDenied {
        /// Host supplied reason.
        message: String,
    },
    /// The backing service could not be reached or timed out.
    #[error("service unavailable: {message}")]
    Unavailable {
        /// Host supplied reason.
        message: String,
    },
}

/// Converts unexpected foreign callback failures (uncaught exceptions in the host
/// implementation) into a `HostError` instead of panicking.
impl From<uniffi::UnexpectedUniFFICallbackError> for HostError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Generic {
            message: error.reason,
        }
    }
}

/// The server-side collaborators of one exporter instance. The migration gateway is not part of
/// it because the host hands out one gateway per transfer.
#[derive(Clone)]
pub struct HostServices {
    /// Content search backend.
    pub content_search: Arc<dyn ContentSearchService>,
    /// Space enumeration and space permissions.
    pub spaces: Arc<dyn SpaceService>,
    /// Page restriction lookup.
    pub restrictions: Arc<dyn ContentRestrictionService>,
    /// Users and groups.
    pub directory: Arc<dyn UserDirectory>,
}
