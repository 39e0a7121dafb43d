//! The inverted-index search provider.
//!
//! Postings, per-document metadata, and document frequencies over an
//! incrementally changing corpus, plus ranked query resolution on top.
//!
//! # INVARIANTS (DO NOT VIOLATE)
//!
//! 1. **BIDIRECTIONAL**: every posting's id has a metadata record, and
//!    every metadata record has postings for each non-empty field.
//! 2. **NON_EMPTY**: a term present in `postings` has a non-empty posting
//!    list and a matching `df` entry.
//! 3. **COUNT**: `total_docs` equals the number of metadata records and
//!    never exceeds `max_docs`.
//! 4. **ATOMIC**: `upsert`/`remove` run to completion before any query
//!    observes state; a failed upsert changes nothing.
//!
//! `check_well_formed` verifies 1–3 and backs the property suite.

use crate::error::{Cancelled, IndexError};
use crate::heap::TopK;
use crate::normalize::{normalize, tokenize_with_offsets};
use crate::query::{compile_regex, ParsedQuery, QueryFilters, QueryMode};
use crate::scoring::{score_note, ScoreConfig};
use crate::settings::Settings;
use crate::types::{CancelToken, Field, MatchSpan, NoteDoc, Posting, Ranked, SearchResult};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

/// Provider configuration, lifted out of [`Settings`] at construction.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    pub max_docs: usize,
    pub max_body_bytes: usize,
    /// Cap on documents the regex post-filter inspects.
    pub regex_candidate_k: usize,
    pub preserve_diacritics: bool,
    pub scoring: ScoreConfig,
}

impl IndexConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_docs: settings.indexer.max_docs,
            max_body_bytes: settings.indexer.max_body_bytes,
            regex_candidate_k: settings.search.regex_candidate_k,
            preserve_diacritics: settings.search.preserve_diacritics,
            scoring: ScoreConfig::from_settings(settings),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// Per-query options.
#[derive(Debug, Clone)]
pub struct QueryOpts {
    /// Maximum number of results.
    pub limit: usize,
    /// "Now" for the recency bonus, epoch milliseconds. Fixed per query so
    /// every candidate decays against the same clock.
    pub now_ms: i64,
    pub cancel: CancelToken,
}

impl QueryOpts {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            now_ms: now_epoch_ms(),
            cancel: CancelToken::new(),
        }
    }
}

pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Metadata record plus per-field token counts.
#[derive(Debug, Clone)]
struct DocEntry {
    doc: NoteDoc,
    token_counts: HashMap<Field, usize>,
}

/// A document tokenized and ready for insertion. Produced off the write
/// path so `index_all` can prepare in parallel.
struct PreparedDoc {
    doc: NoteDoc,
    /// One entry per (term, field) pair.
    terms: Vec<(String, Field, u32, Vec<u32>)>,
    token_counts: HashMap<Field, usize>,
}

fn prepare(mut doc: NoteDoc, config: &IndexConfig) -> PreparedDoc {
    truncate_body(&mut doc.body, config.max_body_bytes);

    let mut terms = Vec::new();
    let mut token_counts = HashMap::new();

    for &field in &Field::ALL {
        let text = doc.field_text(field);
        let tokens = tokenize_with_offsets(&text, config.preserve_diacritics);
        token_counts.insert(field, tokens.len());

        let mut by_term: HashMap<String, Vec<u32>> = HashMap::new();
        for (token, offset) in tokens {
            by_term.entry(token).or_default().push(offset as u32);
        }
        for (term, positions) in by_term {
            terms.push((term, field, positions.len() as u32, positions));
        }
    }

    PreparedDoc {
        doc,
        terms,
        token_counts,
    }
}

/// Truncate at the byte cap without splitting a character.
fn truncate_body(body: &mut String, cap: usize) {
    if body.len() <= cap {
        return;
    }
    let mut end = cap;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body.truncate(end);
}

/// The canonical search provider.
pub struct NoteIndex {
    config: IndexConfig,
    postings: HashMap<String, Vec<Posting>>,
    docs: HashMap<String, DocEntry>,
    df: HashMap<String, usize>,
    total_docs: usize,
}

impl Default for NoteIndex {
    fn default() -> Self {
        Self::new(IndexConfig::default())
    }
}

impl NoteIndex {
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            postings: HashMap::new(),
            docs: HashMap::new(),
            df: HashMap::new(),
            total_docs: 0,
        }
    }

    pub fn with_settings(settings: &Settings) -> Self {
        Self::new(IndexConfig::from_settings(settings))
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.total_docs
    }

    pub fn is_empty(&self) -> bool {
        self.total_docs == 0
    }

    pub fn contains(&self, id: &str) -> bool {
        self.docs.contains_key(id)
    }

    /// The stored record for an id (body already truncated).
    pub fn doc(&self, id: &str) -> Option<&NoteDoc> {
        self.docs.get(id).map(|entry| &entry.doc)
    }

    /// Number of distinct (doc, field) pairs a term occurs in.
    pub fn doc_frequency(&self, term: &str) -> usize {
        self.df.get(term).copied().unwrap_or(0)
    }

    /// Token count of one field of one document, as tokenized at upsert.
    pub fn token_count(&self, id: &str, field: Field) -> usize {
        self.docs
            .get(id)
            .and_then(|entry| entry.token_counts.get(&field))
            .copied()
            .unwrap_or(0)
    }

    pub fn posting_list(&self, term: &str) -> Option<&[Posting]> {
        self.postings.get(term).map(Vec::as_slice)
    }

    /// Rebuild from scratch. Tokenization runs in parallel; insertion is
    /// sequential so capacity and atomicity behave exactly like repeated
    /// `upsert`s.
    pub fn index_all(&mut self, docs: Vec<NoteDoc>) -> Result<(), IndexError> {
        self.clear();
        let config = self.config.clone();
        let prepared: Vec<PreparedDoc> = docs
            .into_par_iter()
            .map(|doc| prepare(doc, &config))
            .collect();
        for doc in prepared {
            self.check_capacity(&doc.doc.id)?;
            self.apply(doc);
        }
        Ok(())
    }

    /// Insert or replace one document.
    pub fn upsert(&mut self, doc: NoteDoc) -> Result<(), IndexError> {
        self.check_capacity(&doc.id)?;
        let prepared = prepare(doc, &self.config);
        self.apply(prepared);
        Ok(())
    }

    fn check_capacity(&self, id: &str) -> Result<(), IndexError> {
        if !self.docs.contains_key(id) && self.total_docs >= self.config.max_docs {
            return Err(IndexError::CapacityExceeded {
                id: id.to_string(),
                max: self.config.max_docs,
            });
        }
        Ok(())
    }

    fn apply(&mut self, prepared: PreparedDoc) {
        let id = prepared.doc.id.clone();
        if self.docs.contains_key(&id) {
            self.remove(&id);
        }

        for (term, field, tf, positions) in prepared.terms {
            self.postings.entry(term.clone()).or_default().push(Posting {
                id: id.clone(),
                field,
                tf,
                positions,
            });
            *self.df.entry(term).or_insert(0) += 1;
        }
        self.docs.insert(
            id,
            DocEntry {
                doc: prepared.doc,
                token_counts: prepared.token_counts,
            },
        );
        self.total_docs += 1;
    }

    /// Remove a document. Returns whether it was present.
    ///
    /// Only posting lists of the document's own terms are touched; the
    /// stored record re-tokenizes to exactly the terms it was inserted
    /// under.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(entry) = self.docs.remove(id) else {
            return false;
        };

        let prepared = prepare(entry.doc, &self.config);
        let touched: HashSet<&String> = prepared.terms.iter().map(|(term, ..)| term).collect();
        for term in touched {
            let Some(list) = self.postings.get_mut(term) else {
                continue;
            };
            let before = list.len();
            list.retain(|posting| posting.id != id);
            let removed = before - list.len();
            if list.is_empty() {
                self.postings.remove(term);
            }
            if removed > 0 {
                match self.df.get_mut(term) {
                    Some(df) if *df > removed => *df -= removed,
                    _ => {
                        self.df.remove(term);
                    }
                }
            }
        }

        self.total_docs -= 1;
        true
    }

    /// Reset all state.
    pub fn clear(&mut self) {
        self.postings.clear();
        self.docs.clear();
        self.df.clear();
        self.total_docs = 0;
    }

    /// Verify the structural invariants. Linear in index size; meant for
    /// tests and debug assertions, not the query path.
    pub fn check_well_formed(&self) -> bool {
        if self.total_docs != self.docs.len() {
            return false;
        }
        for (term, list) in &self.postings {
            if list.is_empty() {
                return false;
            }
            if self.df.get(term).copied().unwrap_or(0) != list.len() {
                return false;
            }
            for posting in list {
                if !self.docs.contains_key(&posting.id) {
                    return false;
                }
                if posting.tf as usize != posting.positions.len() {
                    return false;
                }
            }
        }
        self.df.keys().all(|term| self.postings.contains_key(term))
    }

    // =========================================================================
    // QUERY RESOLUTION
    // =========================================================================

    /// Resolve a parsed query to the top `opts.limit` results, descending
    /// by score.
    pub fn query(
        &self,
        query: &ParsedQuery,
        opts: &QueryOpts,
    ) -> Result<Vec<SearchResult>, Cancelled> {
        if query.mode == QueryMode::Commands {
            return Ok(Vec::new());
        }
        if query.is_blank() {
            return Ok(self.recent(opts.limit));
        }
        if !query.has_positive_constraints() {
            return Ok(Vec::new());
        }

        let candidates = self.gather(query);
        let mut heap = TopK::new(self.heap_capacity(query, opts.limit));
        for id in &candidates {
            if opts.cancel.is_cancelled() {
                return Err(Cancelled);
            }
            if let Some(result) = self.score_candidate(id, query, opts) {
                heap.push(Ranked(result));
            }
        }

        let mut ranked: Vec<SearchResult> =
            heap.extract_all().into_iter().rev().map(|r| r.0).collect();
        ranked = self.apply_regex(query, ranked, opts.limit);
        Ok(ranked)
    }

    /// With a regex clause the heap keeps `regex_candidate_k` documents so
    /// the post-filter can reject and still fill `limit` slots.
    pub(crate) fn heap_capacity(&self, query: &ParsedQuery, limit: usize) -> usize {
        if query.regex.is_some() {
            limit.max(self.config.regex_candidate_k)
        } else {
            limit
        }
    }

    /// Blank query: the most recently modified documents, scored `N - rank`
    /// so downstream consumers can sort.
    pub(crate) fn recent(&self, limit: usize) -> Vec<SearchResult> {
        let mut metas: Vec<(&String, i64)> = self
            .docs
            .iter()
            .map(|(id, entry)| (id, entry.doc.mtime))
            .collect();
        metas.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        metas.truncate(limit);

        let count = metas.len();
        metas
            .into_iter()
            .enumerate()
            .map(|(rank, (id, _))| SearchResult {
                id: id.clone(),
                score: (count - rank) as f64,
                spans: Vec::new(),
            })
            .collect()
    }

    /// Candidate gathering: AND across plain terms and or-groups, OR
    /// inside each group. With no terms at all (phrases, filters, or regex
    /// only) every indexed id is a candidate.
    ///
    /// Returned sorted by id so scoring iterates deterministically.
    pub(crate) fn gather(&self, query: &ParsedQuery) -> Vec<&String> {
        let restriction = query.filters.field;

        let mut sets: Vec<HashSet<&String>> = Vec::new();
        for term in &query.terms {
            sets.push(self.term_candidates(term, restriction));
        }
        for group in &query.or_groups {
            let mut union = HashSet::new();
            for term in group {
                union.extend(self.term_candidates(term, restriction));
            }
            sets.push(union);
        }

        let mut candidates: Vec<&String> = if sets.is_empty() {
            self.docs.keys().collect()
        } else {
            // Intersect starting from the smallest set
            sets.sort_unstable_by_key(HashSet::len);
            let (first, rest) = sets.split_first().expect("sets is non-empty");
            first
                .iter()
                .filter(|id| rest.iter().all(|set| set.contains(*id)))
                .copied()
                .collect()
        };
        candidates.sort_unstable();
        candidates
    }

    /// Ids whose postings contain a term the query term would match: the
    /// vocabulary is expanded by the same prefix-or-edit-distance predicate
    /// the scorer uses, so gathering never starves the scorer.
    fn term_candidates(&self, raw_term: &str, restriction: Option<Field>) -> HashSet<&String> {
        let term = normalize(raw_term, self.config.preserve_diacritics);
        let mut out = HashSet::new();
        if term.is_empty() {
            return out;
        }
        for (vocab, list) in &self.postings {
            let hit = vocab.starts_with(&term)
                || crate::fuzzy::damerau_within(&term, vocab, crate::fuzzy::MAX_EDIT_DISTANCE)
                    .is_some();
            if !hit {
                continue;
            }
            for posting in list {
                if restriction.map_or(true, |field| posting.field == field) {
                    out.insert(&posting.id);
                }
            }
        }
        out
    }

    /// Score one candidate: filters first, then the scorer.
    pub(crate) fn score_candidate(
        &self,
        id: &str,
        query: &ParsedQuery,
        opts: &QueryOpts,
    ) -> Option<SearchResult> {
        let entry = self.docs.get(id)?;
        if !self.passes_filters(&entry.doc, &query.filters) {
            return None;
        }
        score_note(&entry.doc, query, &self.config.scoring, opts.now_ms).map(|scored| {
            SearchResult {
                id: id.to_string(),
                score: scored.score,
                spans: scored.spans,
            }
        })
    }

    fn passes_filters(&self, doc: &NoteDoc, filters: &QueryFilters) -> bool {
        let pd = self.config.preserve_diacritics;

        for tag in &filters.tags {
            let want = normalize(tag.trim_start_matches('#'), pd);
            let hit = doc.tags.iter().any(|have| {
                let have = normalize(have.trim_start_matches('#'), pd);
                have == want || have.starts_with(&format!("{want}/"))
            });
            if !hit {
                return false;
            }
        }

        if !filters.paths.is_empty() {
            let joined = normalize(&doc.path.join("/"), pd);
            for path in &filters.paths {
                if !joined.contains(&normalize(path, pd)) {
                    return false;
                }
            }
        }

        for folder in &filters.folders {
            let want = normalize(folder, pd);
            if !doc.path.iter().any(|segment| normalize(segment, pd) == want) {
                return false;
            }
        }

        true
    }

    /// Regex post-filter: compile once, test the top `regex_candidate_k`
    /// candidates' title and body, append match spans, drop non-matching.
    pub(crate) fn apply_regex(
        &self,
        query: &ParsedQuery,
        ranked: Vec<SearchResult>,
        limit: usize,
    ) -> Vec<SearchResult> {
        let Some(clause) = &query.regex else {
            let mut ranked = ranked;
            ranked.truncate(limit);
            return ranked;
        };
        // The parser only stores clauses that compiled; a failure here
        // means "behave as if the clause were absent".
        let Ok(re) = compile_regex(&clause.source, &clause.flags) else {
            let mut ranked = ranked;
            ranked.truncate(limit);
            return ranked;
        };

        let mut out = Vec::new();
        for mut result in ranked.into_iter().take(self.config.regex_candidate_k) {
            let Some(entry) = self.docs.get(&result.id) else {
                continue;
            };
            let mut spans = Vec::new();
            for m in re.find_iter(&entry.doc.title) {
                let (start, end) = char_span(&entry.doc.title, m.start(), m.end());
                spans.push(MatchSpan {
                    field: Field::Title,
                    start,
                    end,
                });
            }
            for m in re.find_iter(&entry.doc.body) {
                let (start, end) = char_span(&entry.doc.body, m.start(), m.end());
                spans.push(MatchSpan {
                    field: Field::Body,
                    start,
                    end,
                });
            }
            if spans.is_empty() {
                continue;
            }
            result.spans.extend(spans);
            out.push(result);
            if out.len() == limit {
                break;
            }
        }
        out
    }
}

/// Convert a byte range into a char range within `text`.
fn char_span(text: &str, byte_start: usize, byte_end: usize) -> (usize, usize) {
    let start = text[..byte_start].chars().count();
    let end = start + text[byte_start..byte_end].chars().count();
    (start, end)
}
