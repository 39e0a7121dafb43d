//! Test utilities shared across unit and integration tests.
//!
//! This module is always compiled but hidden from documentation.
//! It provides canonical implementations of test helpers to avoid duplication.

#![doc(hidden)]

use crate::types::NoteDoc;

/// Create a simple test note with a title and body.
///
/// This is the canonical fixture constructor used across all tests.
pub fn note(id: &str, title: &str, body: &str, mtime: i64) -> NoteDoc {
    NoteDoc {
        id: id.to_string(),
        title: title.to_string(),
        body: body.to_lowercase(),
        mtime,
        size: body.len() as u64,
        ..Default::default()
    }
}

/// The canonical three-document corpus used by the end-to-end scenarios.
pub fn spec_corpus() -> Vec<NoteDoc> {
    vec![
        NoteDoc {
            id: "note1.md".into(),
            title: "Project Planning".into(),
            path: vec!["projects".into(), "work".into()],
            tags: vec!["todo".into(), "urgent".into()],
            headings: vec!["Overview".into(), "Timeline".into()],
            symbols: vec!["[[link1]]".into(), "#tag1".into()],
            body: "this is a detailed project planning document with tasks and deadlines."
                .into(),
            mtime: 1_640_995_200_000,
            size: 1024,
        },
        NoteDoc {
            id: "note2.md".into(),
            title: "Meeting Notes".into(),
            path: vec!["meetings".into()],
            tags: vec!["meeting".into(), "work".into()],
            headings: vec!["Agenda".into(), "Action Items".into()],
            symbols: vec!["[[contact]]".into(), "!important".into()],
            body: "team meeting notes with action items and follow-ups.".into(),
            mtime: 1_641_081_600_000,
            size: 512,
        },
        NoteDoc {
            id: "note3.md".into(),
            title: "Research Ideas".into(),
            path: vec!["research".into()],
            tags: vec!["research".into(), "ideas".into()],
            headings: vec!["Background".into(), "Hypothesis".into()],
            symbols: vec!["[[paper1]]".into(), "{{query}}".into()],
            body: "research ideas and hypotheses for the upcoming project.".into(),
            mtime: 1_641_168_000_000,
            size: 2048,
        },
    ]
}

/// A larger synthetic corpus for streaming and throughput tests: `count`
/// notes that all contain the word "document", with mtimes strictly
/// decreasing in id order so ranking is total and deterministic.
pub fn synthetic_corpus(count: usize, base_mtime: i64) -> Vec<NoteDoc> {
    (0..count)
        .map(|i| NoteDoc {
            id: format!("note{i:03}.md"),
            title: format!("Document {i}"),
            path: vec!["corpus".into()],
            body: format!("synthetic document number {i} with shared vocabulary."),
            mtime: base_mtime - (i as i64) * 60_000,
            size: 256,
            ..Default::default()
        })
        .collect()
}
