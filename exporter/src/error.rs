//! Error helpers
//!
//! Typed error enums are declared with `#[exporter_error]`, which adds a `Generic` variant and
//! an `anyhow` conversion. Code paths that only need to report a failure (the per-chunk guard of
//! a migration run) work with `anyhow::Result` and flatten the chain with [`ErrorChainExt`].

pub use exporter_macros::exporter_error;

pub use anyhow;

/// Flattens an `anyhow` error chain into a single line.
pub trait ErrorChainExt {
    /// Returns the outermost message followed by every cause, `a: b: c`.
    fn flatten_chain(&self) -> String;
}

impl ErrorChainExt for anyhow::Error {
    fn flatten_chain(&self) -> String {
        self.chain()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(": ")
    }
}
