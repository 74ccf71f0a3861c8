//! App data payloads
//!
//! One run uploads, in order: a starting payload, one data payload per non-empty chunk (or an
//! error payload in its place), and an ending payload.

use serde::Serialize;

use crate::migration::{ExportError, ObjectRecord};

/// Label of the starting payload.
pub const STARTING_PAYLOAD: &str = "STARTING_PAYLOAD";
/// Label prefix of data payloads, followed by `:<page count>`.
pub const DATA_PAYLOAD: &str = "DATA_PAYLOAD";
/// Label of error payloads.
pub const ERROR_PAYLOAD: &str = "ERROR_PAYLOAD";
/// Label of the ending payload.
pub const ENDING_PAYLOAD: &str = "ENDING_PAYLOAD";

/// Prefix of the message carried by an error payload.
pub const ERROR_MESSAGE_PREFIX: &str = "Error while preparing migration payload in server app: ";

/// Run metadata, uploaded before any chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartingPayload {
    /// Version of the exporting server app.
    pub server_app_version: String,
    /// Feature tag of the exported data.
    pub source_app: String,
}

/// A page of a data payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct PageEntry {
    pub page_cloud_id: String,
    pub page_server_id: String,
    pub space_cloud_id: String,
    pub space_server_id: String,
    pub space_key: String,
    /// `null` when no editor could be determined.
    pub user_with_edit_cloud_id: Option<String>,
}

impl From<&ObjectRecord> for PageEntry {
    fn from(record: &ObjectRecord) -> Self {
        Self {
            page_cloud_id: record.cloud_id.clone(),
            page_server_id: record.server_id.clone(),
            space_cloud_id: record.space.space_cloud_id.clone(),
            space_server_id: record.space.space_server_id.to_string(),
            space_key: record.space.space_key.clone(),
            user_with_edit_cloud_id: record.editor_cloud_id().map(ToString::to_string),
        }
    }
}

/// The pages of one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataPayload {
    /// Space the chunk was searched in.
    pub space_key: String,
    /// One entry per page.
    pub pages: Vec<PageEntry>,
    /// Cloud ids of `pages`, in the same order.
    pub cloud_page_id: Vec<String>,
}

impl DataPayload {
    /// Builds the payload of one chunk of `space_key`.
    #[must_use]
    pub fn from_records(space_key: &str, records: &[ObjectRecord]) -> Self {
        let pages: Vec<PageEntry> = records.iter().map(PageEntry::from).collect();
        let cloud_page_id = pages.iter().map(|page| page.page_cloud_id.clone()).collect();
        Self {
            space_key: space_key.to_string(),
            pages,
            cloud_page_id,
        }
    }
}

/// Uploaded in place of the data payload of a failed chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    /// Prefixed failure message.
    pub error: String,
}

impl ErrorPayload {
    /// Wraps the flattened cause chain of a failed chunk.
    #[must_use]
    pub fn new(cause: &str) -> Self {
        Self {
            error: format!("{ERROR_MESSAGE_PREFIX}{cause}"),
        }
    }
}

/// Run summary, uploaded after the last chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndingPayload {
    /// Data payloads uploaded successfully.
    pub total_non_empty_chunks: u32,
}

/// Any payload of a run, with its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Run metadata.
    Starting(StartingPayload),
    /// The pages of one chunk.
    Data(DataPayload),
    /// Replaces the data payload of a failed chunk.
    Error(ErrorPayload),
    /// Run summary.
    Ending(EndingPayload),
}

impl Payload {
    /// Stream label the payload is uploaded under.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Starting(_) => STARTING_PAYLOAD.to_string(),
            Self::Data(data) => format!("{DATA_PAYLOAD}:{}", data.pages.len()),
            Self::Error(_) => ERROR_PAYLOAD.to_string(),
            Self::Ending(_) => ENDING_PAYLOAD.to_string(),
        }
    }

    /// JSON encoding of the payload body.
    ///
    /// # Errors
    /// `ExportError::Serialization` if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ExportError> {
        let encoded = match self {
            Self::Starting(payload) => serde_json::to_vec(payload),
            Self::Data(payload) => serde_json::to_vec(payload),
            Self::Error(payload) => serde_json::to_vec(payload),
            Self::Ending(payload) => serde_json::to_vec(payload),
        };
        encoded.map_err(|err| ExportError::Serialization {
            label: self.label(),
            message: err.to_string(),
        })
    }
}
