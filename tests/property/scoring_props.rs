//! Scorer invariants: range, monotonicity, rejection, span validity.

use crate::common::{note, NOW};
use proptest::prelude::*;
use talpa::{parse, recency_bonus, score_note, token_score, Field, ScoreConfig, Settings};

proptest! {
    #[test]
    fn scores_are_finite_and_non_negative(
        title in "[a-z ]{0,20}",
        body in "[a-z ]{0,60}",
        raw in "[a-z \\-\"]{0,30}",
    ) {
        let doc = note("x.md", &title, &body, NOW);
        let query = parse(&raw, &Settings::default());
        if let Some(scored) = score_note(&doc, &query, &ScoreConfig::default(), NOW) {
            prop_assert!(scored.score.is_finite());
            prop_assert!(scored.score >= 0.0);
        }
    }

    #[test]
    fn token_score_is_a_unit_interval(term in "[a-zü]{0,8}", token in "[a-zü]{0,8}") {
        let score = token_score(&term, &token);
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn exclude_hit_always_rejects(
        body_prefix in "[a-z ]{0,20}",
        needle in "[a-z]{2,6}",
    ) {
        let body = format!("{body_prefix} {needle} suffix");
        let doc = note("x.md", "Title Words", &body, NOW);
        let raw = format!("title -{needle}");
        let query = parse(&raw, &Settings::default());
        prop_assert!(score_note(&doc, &query, &ScoreConfig::default(), NOW).is_none());
    }

    #[test]
    fn recency_is_monotonic_and_capped(
        age_a in 0i64..1_000_000_000,
        age_b in 0i64..1_000_000_000,
        half_life in 1.0f64..365.0,
    ) {
        let a = recency_bonus(NOW - age_a, NOW, half_life);
        let b = recency_bonus(NOW - age_b, NOW, half_life);
        prop_assert!((0.0..=0.5).contains(&a));
        if age_a < age_b {
            prop_assert!(a >= b);
        }
    }

    #[test]
    fn newer_mtime_never_scores_lower(
        body in "[a-z ]{1,40}",
        age in 1i64..5_000_000_000,
    ) {
        let newer = note("a.md", "Shared Title", &body, NOW);
        let older = note("b.md", "Shared Title", &body, NOW - age);
        let query = parse("shared", &Settings::default());
        let cfg = ScoreConfig::default();
        let s_new = score_note(&newer, &query, &cfg, NOW).unwrap().score;
        let s_old = score_note(&older, &query, &cfg, NOW).unwrap().score;
        prop_assert!(s_new >= s_old);
    }

    #[test]
    fn spans_are_valid_half_open_ranges(
        title in "[a-z ]{1,20}",
        body in "[a-z ]{1,60}",
        term in "[a-z]{1,8}",
    ) {
        let doc = note("x.md", &title, &body, NOW);
        let query = parse(&term, &Settings::default());
        if let Some(scored) = score_note(&doc, &query, &ScoreConfig::default(), NOW) {
            for span in &scored.spans {
                prop_assert!(span.start < span.end);
                let field_len = match span.field {
                    Field::Title => doc.title.chars().count(),
                    Field::Body => doc.body.chars().count(),
                    _ => continue,
                };
                prop_assert!(span.end <= field_len, "span {:?} beyond field", span);
            }
        }
    }
}

#[test]
fn title_weight_dominates_body_weight() {
    let in_title = note("t.md", "unique", "filler words here", NOW);
    let in_body = note("b.md", "filler words", "unique here", NOW);
    let query = parse("unique", &Settings::default());
    let cfg = ScoreConfig::default();
    let title_score = score_note(&in_title, &query, &cfg, NOW).unwrap().score;
    let body_score = score_note(&in_body, &query, &cfg, NOW).unwrap().score;
    assert!(title_score > body_score);
}
