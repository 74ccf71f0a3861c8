#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs, dead_code)]

//! `exporter` carries the markdown-from-url macro data of a server deployment over to its
//! cloud counterpart during an app migration.
//!
//! The host platform implements the collaborator traits in [`host`], registers a
//! [`migration::MarkdownMigrationListener`] and calls it once per transfer. The listener scans
//! every migrated space, picks a representative editor for each page that uses the macro and
//! streams labeled JSON payloads to the migration gateway.

/// Error helpers shared by every module, including the `#[exporter_error]` attribute.
pub mod error;

/// Interfaces of the host platform that the exporter consumes.
pub mod host;

/// Turns offset-paged host queries into single-pass page sequences.
pub mod pagination;

/// Space-level and page-level edit rights.
pub mod permissions;

/// Server to cloud identity mapping and representative editor selection.
pub mod identity;

/// The migration run: orchestration, payloads and upload.
pub mod migration;

/// Logging and configuration.
pub mod primitives;

pub use exporter_macros::{exporter_error, exporter_export};

#[cfg(test)]
mod test_utils;

uniffi::setup_scaffolding!("exporter");
