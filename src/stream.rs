//! Progressive query resolution.
//!
//! The streaming entry point yields partial results while candidates are
//! still being scored, trading monotonic score order for lower perceived
//! latency. Consumers either present early emissions live or treat them as
//! hints and re-rank once the stream completes.
//!
//! Guarantees:
//! - an id is never yielded twice;
//! - the final yielded set equals the non-streaming [`NoteIndex::query`]
//!   result set;
//! - with a regex clause, partial emission is withheld until the
//!   post-filter has run (an early emission the regex later rejects could
//!   not be un-yielded).

use crate::error::Cancelled;
use crate::heap::TopK;
use crate::index::{NoteIndex, QueryOpts};
use crate::query::{ParsedQuery, QueryMode};
use crate::types::{Ranked, SearchResult};
use std::collections::HashSet;
use tokio::sync::mpsc::UnboundedSender;

/// Candidates processed between partial emissions.
const EMIT_INTERVAL: usize = 100;

/// Partial emission size for a given limit.
fn emit_slice(limit: usize) -> usize {
    5.min(limit / 2)
}

impl NoteIndex {
    /// Streaming variant of [`NoteIndex::query`]: results are pushed into
    /// `sink` progressively instead of returned at once.
    ///
    /// Returns `Ok` when the stream completed (or the receiver hung up),
    /// `Err(Cancelled)` when the token tripped mid-query.
    pub async fn query_stream(
        &self,
        query: &ParsedQuery,
        opts: &QueryOpts,
        sink: &UnboundedSender<SearchResult>,
    ) -> Result<(), Cancelled> {
        if query.mode == QueryMode::Commands {
            return Ok(());
        }
        if query.is_blank() {
            for result in self.recent(opts.limit) {
                if sink.send(result).is_err() {
                    return Ok(());
                }
            }
            return Ok(());
        }
        if !query.has_positive_constraints() {
            return Ok(());
        }

        let defer_partials = query.regex.is_some();
        let candidates = self.gather(query);
        let mut heap = TopK::new(self.heap_capacity(query, opts.limit));
        let mut yielded: HashSet<String> = HashSet::new();
        let mut processed = 0usize;

        for id in &candidates {
            if opts.cancel.is_cancelled() {
                return Err(Cancelled);
            }
            if let Some(result) = self.score_candidate(id, query, opts) {
                heap.push(Ranked(result));
            }
            processed += 1;

            if processed % EMIT_INTERVAL == 0 && !defer_partials {
                if !emit_top(&heap, opts.limit, &mut yielded, sink) {
                    return Ok(());
                }
                // Suspension point between progressive emits
                tokio::task::yield_now().await;
                if opts.cancel.is_cancelled() {
                    return Err(Cancelled);
                }
            }
        }

        let ranked: Vec<SearchResult> =
            heap.extract_all().into_iter().rev().map(|r| r.0).collect();
        for result in self.apply_regex(query, ranked, opts.limit) {
            if !yielded.contains(&result.id) && sink.send(result).is_err() {
                return Ok(());
            }
        }
        Ok(())
    }
}

/// Send the heap's current best few, skipping anything already yielded.
/// Returns false when the receiver is gone.
fn emit_top(
    heap: &TopK<Ranked>,
    limit: usize,
    yielded: &mut HashSet<String>,
    sink: &UnboundedSender<SearchResult>,
) -> bool {
    let take = emit_slice(limit);
    if take == 0 {
        return true;
    }
    let mut snapshot = heap.snapshot();
    snapshot.sort_by(|a, b| b.cmp(a));
    for ranked in snapshot.into_iter().take(take) {
        if yielded.insert(ranked.0.id.clone()) && sink.send(ranked.0).is_err() {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse;
    use crate::settings::Settings;
    use crate::testing::{spec_corpus, synthetic_corpus};
    use crate::types::CancelToken;
    use tokio::sync::mpsc;

    const NOW: i64 = 1_700_000_000_000;

    fn opts(limit: usize) -> QueryOpts {
        QueryOpts {
            limit,
            now_ms: NOW,
            cancel: CancelToken::new(),
        }
    }

    async fn drain(
        index: &NoteIndex,
        raw: &str,
        limit: usize,
    ) -> (Vec<SearchResult>, Result<(), Cancelled>) {
        let query = parse(raw, &Settings::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let outcome = index.query_stream(&query, &opts(limit), &tx).await;
        drop(tx);
        let mut received = Vec::new();
        while let Some(result) = rx.recv().await {
            received.push(result);
        }
        (received, outcome)
    }

    fn sorted_ids(results: &[SearchResult]) -> Vec<String> {
        let mut ids: Vec<String> = results.iter().map(|r| r.id.clone()).collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn stream_matches_query_on_small_corpus() {
        let mut index = NoteIndex::default();
        index.index_all(spec_corpus()).unwrap();

        let (streamed, outcome) = drain(&index, "project", 10).await;
        assert!(outcome.is_ok());

        let direct = index
            .query(&parse("project", &Settings::default()), &opts(10))
            .unwrap();
        assert_eq!(sorted_ids(&streamed), sorted_ids(&direct));
    }

    #[tokio::test]
    async fn large_corpus_streams_partials_without_duplicates() {
        let mut index = NoteIndex::default();
        index.index_all(synthetic_corpus(200, NOW)).unwrap();

        let (streamed, outcome) = drain(&index, "document", 5).await;
        assert!(outcome.is_ok());

        // No duplicate ids
        let ids: Vec<String> = streamed.iter().map(|r| r.id.clone()).collect();
        let unique: HashSet<&String> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());

        // Final set equals the non-streaming result set
        let direct = index
            .query(&parse("document", &Settings::default()), &opts(5))
            .unwrap();
        assert_eq!(sorted_ids(&streamed), sorted_ids(&direct));

        // The two newest notes were emitted at the first checkpoint,
        // before the remaining 100 candidates were scored.
        assert_eq!(streamed[0].id, "note000.md");
        assert_eq!(streamed[1].id, "note001.md");
    }

    #[tokio::test]
    async fn regex_defers_partial_emission() {
        let mut index = NoteIndex::default();
        index.index_all(synthetic_corpus(150, NOW)).unwrap();

        let (streamed, outcome) = drain(&index, "document /number 1\\d\\d/", 5).await;
        assert!(outcome.is_ok());
        // Only notes 100..149 match the regex; every yielded id does.
        assert!(!streamed.is_empty());
        for result in &streamed {
            assert!(result.id >= "note100.md".to_string());
        }

        let direct = index
            .query(
                &parse("document /number 1\\d\\d/", &Settings::default()),
                &opts(5),
            )
            .unwrap();
        assert_eq!(sorted_ids(&streamed), sorted_ids(&direct));
    }

    #[tokio::test]
    async fn blank_query_streams_recent_listing() {
        let mut index = NoteIndex::default();
        index.index_all(spec_corpus()).unwrap();

        let (streamed, outcome) = drain(&index, "", 3).await;
        assert!(outcome.is_ok());
        let ids: Vec<&str> = streamed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["note3.md", "note2.md", "note1.md"]);
    }

    #[tokio::test]
    async fn cancellation_stops_the_stream() {
        let mut index = NoteIndex::default();
        index.index_all(synthetic_corpus(50, NOW)).unwrap();

        let query = parse("document", &Settings::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut o = opts(5);
        o.cancel.cancel();
        assert_eq!(index.query_stream(&query, &o, &tx).await, Err(Cancelled));
    }

    #[test]
    fn emit_slice_shrinks_with_limit() {
        assert_eq!(emit_slice(10), 5);
        assert_eq!(emit_slice(100), 5);
        assert_eq!(emit_slice(5), 2);
        assert_eq!(emit_slice(1), 0);
    }
}
