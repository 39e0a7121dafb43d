//! Incremental fuzzy search over a markdown note vault.
//!
//! This crate is the search engine of a note-taking application: ranked,
//! low-latency queries over a few thousand markdown documents, combining
//! fuzzy term matching, exact phrases, field filters, regular expressions,
//! and a recency bias — while the index tracks a mutating corpus in real
//! time.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐    ┌──────────────┐    ┌───────────────┐
//! │ query.rs  │───▶│  index.rs    │───▶│  scoring.rs   │
//! │ (parse)   │    │ (NoteIndex,  │    │ (score_note)  │
//! └───────────┘    │  postings)   │    └───────────────┘
//!                  └──────▲───────┘           │
//!                         │               ┌───▼────┐
//! ┌───────────┐    ┌──────┴───────┐       │heap.rs │
//! │watcher.rs │───▶│  vault.rs    │       │ (TopK) │
//! │(coalesce) │    │(VaultIndexer)│       └────────┘
//! └───────────┘    └──────────────┘
//! ```
//!
//! A query flows left to right: the raw string is parsed, candidate ids
//! are gathered from the postings, each candidate is scored, and a bounded
//! min-heap keeps the top K. An update flows bottom-left: file events are
//! coalesced, the vault indexer extracts a document record, and the
//! provider swaps it in atomically.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use talpa::{parse, FsVault, QueryOpts, Settings, VaultIndexer};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::default();
//! let indexer = VaultIndexer::new(Arc::new(FsVault::new("/path/to/vault")), settings.clone());
//! indexer.index_vault().await;
//! indexer.run_body_pass().await;
//!
//! let index = indexer.index();
//! let query = parse("tag:work \"action items\" meeting OR standup", &settings);
//! let results = index.read().await.query(&query, &QueryOpts::with_limit(10))?;
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod error;
pub mod extract;
mod fuzzy;
mod heap;
mod index;
mod normalize;
mod query;
mod scoring;
pub mod settings;
mod stream;
pub mod testing;
mod types;
pub mod vault;
pub mod watcher;

// Re-exports for the public API
pub use error::{Cancelled, IndexError, VaultError};
pub use fuzzy::{damerau_within, MAX_EDIT_DISTANCE};
pub use heap::TopK;
pub use index::{IndexConfig, NoteIndex, QueryOpts};
pub use normalize::{normalize, tokenize, tokenize_with_offsets};
pub use query::{
    parse, parse_with_errors, ParseIssue, ParseIssueKind, ParsedQuery, QueryFilters, QueryMode,
    RegexClause,
};
pub use scoring::{recency_bonus, score_note, token_score, ScoreConfig, Scored};
pub use settings::{ScoreWeights, Settings};
pub use types::{CancelToken, Field, MatchSpan, NoteDoc, Posting, SearchResult};
pub use vault::{CachedMeta, FileStamp, FsVault, NoteSource, SourceMeta, VaultIndexer};
pub use watcher::{EventCoalescer, VaultEvent, VaultWatcher};
