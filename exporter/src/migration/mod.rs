mod error;
mod listener;
mod orchestrator;
pub mod payload;
mod record;
mod run;
mod uploader;

pub use error::ExportError;
pub use listener::{AccessScope, MarkdownMigrationListener, APP_KEY};
pub use orchestrator::MigrationOrchestrator;
pub use payload::{
    DataPayload, EndingPayload, ErrorPayload, PageEntry, Payload, StartingPayload,
    DATA_PAYLOAD, ENDING_PAYLOAD, ERROR_PAYLOAD, STARTING_PAYLOAD,
};
pub use record::{ObjectRecord, SpaceMapping};
pub use run::{MigrationDetails, MigrationRun, MigrationRunSummary, MigrationState};
pub use uploader::{PayloadUploader, RetryPolicy};
