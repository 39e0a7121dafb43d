//! Provider invariants: structural well-formedness under arbitrary
//! upsert/remove sequences, round-trips, and query-set properties.

use crate::common::{ids, index_of, note, opts, NOW};
use proptest::prelude::*;
use talpa::{parse, NoteDoc, NoteIndex, Settings};

fn doc_strategy() -> impl Strategy<Value = NoteDoc> {
    (
        "[a-e]",
        "[a-z]{1,8}( [a-z]{1,8}){0,3}",
        "[a-z]{1,8}( [a-z]{1,8}){0,6}",
        0i64..1_000_000,
    )
        .prop_map(|(id, title, body, mtime)| NoteDoc {
            id: format!("{id}.md"),
            title,
            body,
            mtime: NOW - mtime,
            size: 64,
            ..Default::default()
        })
}

#[derive(Debug, Clone)]
enum Op {
    Upsert(NoteDoc),
    Remove(String),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => doc_strategy().prop_map(Op::Upsert),
        2 => "[a-e]".prop_map(|id| Op::Remove(format!("{id}.md"))),
        1 => Just(Op::Clear),
    ]
}

proptest! {
    #[test]
    fn index_stays_well_formed(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut index = NoteIndex::default();
        let mut live = std::collections::HashSet::new();

        for op in ops {
            match op {
                Op::Upsert(doc) => {
                    let id = doc.id.clone();
                    index.upsert(doc).unwrap();
                    live.insert(id);
                }
                Op::Remove(id) => {
                    let was_present = live.remove(&id);
                    prop_assert_eq!(index.remove(&id), was_present);
                }
                Op::Clear => {
                    index.clear();
                    live.clear();
                }
            }
            prop_assert!(index.check_well_formed());
            prop_assert_eq!(index.len(), live.len());
        }
    }

    #[test]
    fn upsert_remove_round_trips_to_initial(doc in doc_strategy()) {
        let mut index = index_of(crate::common::spec_corpus());
        let df_before: Vec<usize> = ["project", "meeting", "research"]
            .iter()
            .map(|t| index.doc_frequency(t))
            .collect();
        let len_before = index.len();

        let id = doc.id.clone();
        // Fresh id so the round trip is clean
        let mut doc = doc;
        doc.id = format!("fresh-{id}");
        index.upsert(doc.clone()).unwrap();
        index.remove(&doc.id);

        prop_assert_eq!(index.len(), len_before);
        let df_after: Vec<usize> = ["project", "meeting", "research"]
            .iter()
            .map(|t| index.doc_frequency(t))
            .collect();
        prop_assert_eq!(df_before, df_after);
        prop_assert!(index.check_well_formed());
    }

    #[test]
    fn double_upsert_equals_single(doc in doc_strategy()) {
        let mut once = NoteIndex::default();
        once.upsert(doc.clone()).unwrap();

        let mut twice = NoteIndex::default();
        twice.upsert(doc.clone()).unwrap();
        twice.upsert(doc.clone()).unwrap();

        prop_assert_eq!(once.len(), twice.len());
        for token in doc.title.split(' ').chain(doc.body.split(' ')) {
            prop_assert_eq!(once.doc_frequency(token), twice.doc_frequency(token));
        }
        prop_assert!(twice.check_well_formed());
    }

    #[test]
    fn results_are_sorted_and_deduplicated(
        docs in prop::collection::vec(doc_strategy(), 0..10),
        term in "[a-z]{1,6}",
        limit in 1usize..8,
    ) {
        let mut index = NoteIndex::default();
        for doc in docs {
            index.upsert(doc).unwrap();
        }
        let query = parse(&term, &Settings::default());
        let results = index.query(&query, &opts(limit)).unwrap();

        prop_assert!(results.len() <= limit);
        prop_assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
        let mut seen = std::collections::HashSet::new();
        for result in &results {
            prop_assert!(seen.insert(result.id.clone()));
            prop_assert!(result.score.is_finite() && result.score >= 0.0);
        }
    }

    #[test]
    fn empty_query_is_mtime_descending(
        docs in prop::collection::vec(doc_strategy(), 1..10),
        limit in 1usize..8,
    ) {
        let mut index = NoteIndex::default();
        for doc in docs {
            index.upsert(doc).unwrap();
        }
        let query = parse("", &Settings::default());
        let results = index.query(&query, &opts(limit)).unwrap();

        prop_assert_eq!(results.len(), limit.min(index.len()));
        let mtimes: Vec<i64> = results
            .iter()
            .map(|r| index.doc(&r.id).unwrap().mtime)
            .collect();
        prop_assert!(mtimes.windows(2).all(|w| w[0] >= w[1]));
        // Scores strictly decrease so consumers can re-sort
        prop_assert!(results.windows(2).all(|w| w[0].score > w[1].score));
    }

    #[test]
    fn exclude_never_returns_matching_docs(
        docs in prop::collection::vec(doc_strategy(), 0..8),
        term in "[a-z]{2,5}",
    ) {
        let mut index = NoteIndex::default();
        for doc in docs {
            index.upsert(doc).unwrap();
        }
        let raw = format!("body -{term}");
        let query = parse(&raw, &Settings::default());
        for result in index.query(&query, &opts(20)).unwrap() {
            let doc = index.doc(&result.id).unwrap();
            prop_assert!(!doc.title.contains(&term) && !doc.body.contains(&term));
        }
    }
}

#[test]
fn capacity_never_exceeded() {
    let mut settings = Settings::default();
    settings.indexer.max_docs = 3;
    let mut index = NoteIndex::with_settings(&settings);
    for i in 0..10 {
        let _ = index.upsert(note(&format!("n{i}.md"), "Title", "body", NOW));
        assert!(index.len() <= 3);
        assert!(index.check_well_formed());
    }
}

#[test]
fn streaming_set_equals_query_set() {
    // Covered in depth by src/stream.rs tests; this pins the public API
    // contract on the spec corpus.
    let index = index_of(crate::common::spec_corpus());
    let direct = ids(&index, "project", 10);
    assert_eq!(direct, vec!["note1.md", "note3.md"]);
}
