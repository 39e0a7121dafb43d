//! Shared test utilities and fixtures.

#![allow(dead_code)]

use talpa::{CancelToken, NoteDoc, NoteIndex, QueryOpts, Settings};

// Re-export canonical fixture constructors from talpa::testing
pub use talpa::testing::{note, spec_corpus, synthetic_corpus};

/// A fixed "now" so recency scoring is deterministic: shortly after the
/// spec corpus mtimes.
pub const NOW: i64 = 1_641_200_000_000;

/// Query options pinned to the fixed clock.
pub fn opts(limit: usize) -> QueryOpts {
    QueryOpts {
        limit,
        now_ms: NOW,
        cancel: CancelToken::new(),
    }
}

/// An index over the spec's three-document corpus.
pub fn spec_index() -> NoteIndex {
    index_of(spec_corpus())
}

/// An index over an arbitrary corpus with default settings.
pub fn index_of(docs: Vec<NoteDoc>) -> NoteIndex {
    let mut index = NoteIndex::default();
    index.index_all(docs).expect("corpus fits default caps");
    index
}

/// Run a query and return ids in rank order.
pub fn ids(index: &NoteIndex, raw: &str, limit: usize) -> Vec<String> {
    let query = talpa::parse(raw, &Settings::default());
    index
        .query(&query, &opts(limit))
        .expect("no cancellation in tests")
        .into_iter()
        .map(|r| r.id)
        .collect()
}
