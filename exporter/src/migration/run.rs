use chrono::{DateTime, Utc};

use crate::host::ActingContext;

/// Metadata of the transfer a run belongs to, as reported by the migration assistant.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct MigrationDetails {
    /// Display name of the migration.
    pub name: String,
    /// Id of the migration.
    pub migration_id: String,
    /// Id of the migration scope.
    pub migration_scope_id: String,
    /// Base URL of the destination cloud site.
    pub cloud_url: String,
    /// Client key of the destination cloud site.
    pub client_key: String,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// Stage a migration run has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum MigrationState {
    /// Nothing done yet.
    Start,
    /// An administrator was chosen as the acting identity.
    Authenticated,
    /// The starting payload is uploaded.
    StartingPayloadSent,
    /// Migrated spaces are being scanned chunk by chunk.
    ScanningChunks,
    /// The ending payload is uploaded.
    EndingPayloadSent,
    /// The run completed.
    Done,
    /// The run could not be set up. Nothing past the starting payload was uploaded.
    Aborted,
}

impl MigrationState {
    /// Log-friendly name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Authenticated => "authenticated",
            Self::StartingPayloadSent => "starting_payload_sent",
            Self::ScanningChunks => "scanning_chunks",
            Self::EndingPayloadSent => "ending_payload_sent",
            Self::Done => "done",
            Self::Aborted => "aborted",
        }
    }
}

/// Outcome of one migration run, returned to the host instead of an error.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct MigrationRunSummary {
    /// State the run ended in.
    pub state: MigrationState,
    /// Migrated spaces whose content was searched.
    pub spaces_scanned: u32,
    /// Data payloads uploaded.
    pub non_empty_chunks: u32,
    /// Chunks replaced by an error payload.
    pub failed_chunks: u32,
    /// Why the run stopped early, if it did.
    pub failure: Option<String>,
}

/// Transient context of one call to the orchestrator.
#[derive(Debug)]
pub struct MigrationRun {
    /// Transfer being exported.
    pub transfer_id: String,
    /// Metadata of the transfer.
    pub details: MigrationDetails,
    /// Identity the run acts as, set once authenticated.
    pub context: Option<ActingContext>,
    state: MigrationState,
    spaces_scanned: u32,
    non_empty_chunks: u32,
    failed_chunks: u32,
    chunk_index: u32,
}

impl MigrationRun {
    /// Creates a run in [`MigrationState::Start`].
    #[must_use]
    pub const fn new(transfer_id: String, details: MigrationDetails) -> Self {
        Self {
            transfer_id,
            details,
            context: None,
            state: MigrationState::Start,
            spaces_scanned: 0,
            non_empty_chunks: 0,
            failed_chunks: 0,
            chunk_index: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> MigrationState {
        self.state
    }

    /// Moves to `next`.
    pub fn transition(&mut self, next: MigrationState) {
        crate::info!(
            "migration_run.transition transfer_id={} from={} to={}",
            self.transfer_id,
            self.state.as_str(),
            next.as_str()
        );
        self.state = next;
    }

    /// Ends the run after a failure that escaped the chunk guard. Setup failures abort the
    /// run; later failures leave the state where the run stopped.
    pub fn fail(&mut self) {
        if matches!(
            self.state,
            MigrationState::Start | MigrationState::Authenticated
        ) {
            self.transition(MigrationState::Aborted);
        }
    }

    /// Index of the next chunk, starting at 0.
    pub fn next_chunk_index(&mut self) -> u32 {
        let index = self.chunk_index;
        self.chunk_index += 1;
        index
    }

    /// Counts a scanned space.
    pub fn space_scanned(&mut self) {
        self.spaces_scanned += 1;
    }

    /// Counts an uploaded data payload.
    pub fn chunk_uploaded(&mut self) {
        self.non_empty_chunks += 1;
    }

    /// Counts a chunk replaced by an error payload.
    pub fn chunk_failed(&mut self) {
        self.failed_chunks += 1;
    }

    /// Data payloads uploaded so far.
    #[must_use]
    pub const fn non_empty_chunks(&self) -> u32 {
        self.non_empty_chunks
    }

    /// Summary of the run so far.
    #[must_use]
    pub fn summary(&self, failure: Option<String>) -> MigrationRunSummary {
        MigrationRunSummary {
            state: self.state,
            spaces_scanned: self.spaces_scanned,
            non_empty_chunks: self.non_empty_chunks,
            failed_chunks: self.failed_chunks,
            failure,
        }
    }

    /// The transfer metadata as one `key=value` line.
    #[must_use]
    pub fn details_line(&self) -> String {
        let created_at = DateTime::<Utc>::from_timestamp_millis(self.details.created_at)
            .map_or_else(|| self.details.created_at.to_string(), |at| at.to_rfc3339());
        format!(
            "name={:?} transfer_id={} cloud_url={} migration_id={} migration_scope_id={} client_key={} created_at={created_at}",
            self.details.name,
            self.transfer_id,
            self.details.cloud_url,
            self.details.migration_id,
            self.details.migration_scope_id,
            self.details.client_key,
        )
    }
}
