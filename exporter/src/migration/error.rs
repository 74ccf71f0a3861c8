use crate::host::HostError;
use crate::pagination::PaginationError;

/// Errors that end a migration run or a chunk of it.
#[crate::exporter_error]
pub enum ExportError {
    /// Nobody can act as the run's identity.
    #[error("group {group} has no member to act as, make sure it has at least one user")]
    NoAdministrator {
        /// The administrative group that was looked up.
        group: String,
    },
    /// The gateway kept rejecting a payload.
    #[error("upload of {label} failed after {attempts} attempts: {message}")]
    UploadFailed {
        /// Label of the payload.
        label: String,
        /// Number of attempts made.
        attempts: u32,
        /// Last gateway error.
        message: String,
    },
    /// A payload could not be encoded.
    #[error("failed to serialize {label}: {message}")]
    Serialization {
        /// Label of the payload.
        label: String,
        /// Encoder error.
        message: String,
    },
    /// A host call failed.
    #[error(transparent)]
    Host(#[from] HostError),
    /// A paged host query failed.
    #[error(transparent)]
    Pagination(#[from] PaginationError),
}
