//! Error types for indexing and querying.
//!
//! The crate distinguishes four kinds of failure:
//! - parse issues (non-fatal, attached to the parsed query — see
//!   [`crate::query::ParseIssue`]),
//! - capacity errors from the provider,
//! - I/O errors from the vault indexer (logged, file skipped for the pass),
//! - query cancellation, which is an outcome rather than a failure.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the inverted-index provider.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The configured document cap would be exceeded. The upsert has no
    /// effect on index state.
    #[error("document cap reached ({max} docs): rejecting '{id}'")]
    CapacityExceeded { id: String, max: usize },
}

/// Errors surfaced by the vault indexer.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("failed to read note '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to load file cache: {0}")]
    CacheLoad(#[from] serde_json::Error),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// The caller's cancellation token was tripped. Distinct from failure:
/// whatever partial result existed is discarded.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("query cancelled")]
pub struct Cancelled;
