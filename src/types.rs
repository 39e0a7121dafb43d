// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The building blocks of the note index.
//!
//! These types define how documents, postings, and results fit together.
//!
//! # Invariants (the stuff that breaks if you ignore it)
//!
//! - **Posting**: every posting's `id` names a live document in the docs
//!   map, and every non-empty field of a live document has postings.
//!   One half without the other means phantom results or unfindable notes.
//!
//! - **MatchSpan**: `start < end ≤ len(field)` in characters. Spans are
//!   handed straight to highlight rendering; an off-by-one here paints the
//!   wrong substring.
//!
//! - **SearchResult**: `score` is finite and non-negative, and only
//!   comparable within a single query invocation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// =============================================================================
// DOCUMENT TYPES
// =============================================================================

/// The searchable fields of a note, in scoring-weight order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Headings,
    Path,
    Tags,
    Symbols,
    Body,
}

impl Field {
    /// All searchable fields, iterated in scoring order.
    pub const ALL: [Field; 6] = [
        Field::Title,
        Field::Headings,
        Field::Path,
        Field::Tags,
        Field::Symbols,
        Field::Body,
    ];
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Title => "title",
            Field::Headings => "headings",
            Field::Path => "path",
            Field::Tags => "tags",
            Field::Symbols => "symbols",
            Field::Body => "body",
        };
        f.write_str(name)
    }
}

/// One indexed note. The `id` is the source path and the primary key;
/// a rename is a remove followed by an upsert under the new id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDoc {
    pub id: String,
    pub title: String,
    /// Folder tokens from the vault root, excluding the file itself.
    pub path: Vec<String>,
    pub tags: Vec<String>,
    pub headings: Vec<String>,
    /// Link targets, block refs, and code-fence labels.
    pub symbols: Vec<String>,
    /// Lowercased content. Truncated to the configured byte cap at upsert.
    pub body: String,
    /// Last-modified timestamp, epoch milliseconds.
    pub mtime: i64,
    /// Byte length of the source file.
    pub size: u64,
}

impl NoteDoc {
    /// The text of one field, flattened. Array-valued fields are joined
    /// with single spaces so token positions land in one coordinate space.
    pub fn field_text(&self, field: Field) -> String {
        match field {
            Field::Title => self.title.clone(),
            Field::Body => self.body.clone(),
            Field::Path => self.path.join(" "),
            Field::Tags => self.tags.join(" "),
            Field::Headings => self.headings.join(" "),
            Field::Symbols => self.symbols.join(" "),
        }
    }
}

// =============================================================================
// POSTINGS
// =============================================================================

/// One posting: a (document, field) pair where a term occurs, with its
/// occurrence count and character positions in the flattened field text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Posting {
    pub id: String,
    pub field: Field,
    pub tf: u32,
    pub positions: Vec<u32>,
}

// =============================================================================
// RESULTS
// =============================================================================

/// A half-open character range within a named field, for highlight
/// rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSpan {
    pub field: Field,
    pub start: usize,
    pub end: usize,
}

/// One ranked result. Higher score = more relevant, within one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    pub score: f64,
    pub spans: Vec<MatchSpan>,
}

/// Heap ordering for results: by score, ties broken by id so that equal
/// scores rank the lexicographically smaller id higher. Total order
/// (scores are finite by scorer contract, `total_cmp` handles the rest).
#[derive(Debug, Clone)]
pub(crate) struct Ranked(pub SearchResult);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Ranked {}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0
            .score
            .total_cmp(&other.0.score)
            .then_with(|| other.0.id.cmp(&self.0.id))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// =============================================================================
// CANCELLATION
// =============================================================================

/// Cooperative cancellation flag for long queries. Cloning shares the flag.
///
/// The query path checks the token before each candidate and between
/// progressive emissions; once tripped it stays tripped.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
