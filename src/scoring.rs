//! Weighted multi-field scoring.
//!
//! Given one document and one parsed query, produce either nothing (the
//! document is rejected) or a score with the match spans that earned it.
//!
//! # INVARIANTS (DO NOT VIOLATE)
//!
//! ## SCORE_RANGE
//! Scores are finite and non-negative. Token scores live in [0, 1], field
//! aggregates are means of token scores, and every weight and bonus is
//! non-negative.
//!
//! ## FIELD_WEIGHT_DOMINANCE
//! With default weights, a perfect title match (4.0) outranks a perfect
//! body match (1.0) even with the maximum recency bonus (0.5 · 0.5) on the
//! body side. Changing the defaults can invert ranking; the settings
//! module documents the hierarchy.
//!
//! ## EXCLUDE_TOTAL
//! An exclude term rejects on a substring hit in *any* searchable field,
//! before any scoring happens.

use crate::fuzzy::{damerau_within, MAX_EDIT_DISTANCE};
use crate::normalize::{normalize, tokenize_with_offsets};
use crate::query::ParsedQuery;
use crate::settings::{ScoreWeights, Settings};
use crate::types::{Field, MatchSpan, NoteDoc};

/// Everything the scorer needs besides the document and query.
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    pub weights: ScoreWeights,
    pub half_life_days: f64,
    pub preserve_diacritics: bool,
}

impl ScoreConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            weights: settings.search.weights,
            half_life_days: settings.search.recency_half_life_days,
            preserve_diacritics: settings.search.preserve_diacritics,
        }
    }
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// A scored document: total score plus the spans that produced it.
///
/// Span positions index the normalized, flattened field text (array
/// fields joined by single spaces), which is the same coordinate space
/// the highlighter renders.
#[derive(Debug, Clone, PartialEq)]
pub struct Scored {
    pub score: f64,
    pub spans: Vec<MatchSpan>,
}

/// Per-occurrence bonus for a phrase hit in title or body.
const PHRASE_BONUS: f64 = 0.25;

/// Score one document against one query. `None` means rejected.
///
/// Rejection happens when an exclude term occurs in any field, or when a
/// required phrase is absent from title and body.
pub fn score_note(
    doc: &NoteDoc,
    query: &ParsedQuery,
    cfg: &ScoreConfig,
    now_ms: i64,
) -> Option<Scored> {
    let pd = cfg.preserve_diacritics;

    let field_texts: Vec<(Field, String)> = Field::ALL
        .iter()
        .map(|&f| (f, normalize(&doc.field_text(f), pd)))
        .collect();

    // Exclusion: substring check over the concatenation of every field.
    if !query.excludes.is_empty() {
        let haystack = field_texts
            .iter()
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        for exclude in &query.excludes {
            let needle = normalize(exclude, pd);
            if !needle.is_empty() && haystack.contains(&needle) {
                return None;
            }
        }
    }

    let title = &field_texts[0].1;
    let body = &field_texts[5].1;

    // Phrases must appear literally in title or body; each occurrence
    // earns a flat bonus.
    let mut phrase_hits = 0usize;
    for phrase in &query.phrases {
        let needle = normalize(phrase, pd);
        if needle.is_empty() {
            continue;
        }
        let count = title.matches(&needle).count() + body.matches(&needle).count();
        if count == 0 {
            return None;
        }
        phrase_hits += count;
    }

    // Term units: each plain term, and each or-group scored as the max
    // over its alternatives.
    let units: Vec<Vec<String>> = query
        .terms
        .iter()
        .map(|t| vec![normalize(t, pd)])
        .chain(
            query
                .or_groups
                .iter()
                .map(|g| g.iter().map(|t| normalize(t, pd)).collect()),
        )
        .collect();

    let restricted_holder;
    let scorable: &[Field] = match query.filters.field {
        Some(restricted) => {
            restricted_holder = [restricted];
            &restricted_holder
        }
        None => &Field::ALL,
    };

    let mut total = 0.0;
    let mut spans = Vec::new();

    if !units.is_empty() {
        for &field in scorable {
            let text = &field_texts
                .iter()
                .find(|(f, _)| *f == field)
                .expect("Field::ALL covers every field")
                .1;
            let tokens = tokenize_with_offsets(text, pd);
            if tokens.is_empty() {
                continue;
            }

            let mut unit_sum = 0.0;
            for unit in &units {
                let mut best = 0.0f64;
                let mut best_span: Option<MatchSpan> = None;
                for (token, offset) in &tokens {
                    for alternative in unit {
                        let score = token_score(alternative, token);
                        if score > best {
                            best = score;
                            best_span = Some(MatchSpan {
                                field,
                                start: *offset,
                                end: offset + token.chars().count(),
                            });
                        }
                    }
                }
                unit_sum += best;
                if let Some(span) = best_span {
                    spans.push(span);
                }
            }

            total += field_weight(&cfg.weights, field) * (unit_sum / units.len() as f64);
        }
    }

    total += PHRASE_BONUS * phrase_hits as f64;
    total += cfg.weights.recency * recency_bonus(doc.mtime, now_ms, cfg.half_life_days);

    debug_assert!(total.is_finite() && total >= 0.0);
    Some(Scored {
        score: total,
        spans,
    })
}

/// Score a query term against one field token.
///
/// Prefix hits are perfect; otherwise bounded Damerau–Levenshtein with the
/// distance folded into [0, 1] by the longer length.
pub fn token_score(term: &str, token: &str) -> f64 {
    if term.is_empty() {
        return 0.0;
    }
    if token.starts_with(term) {
        return 1.0;
    }
    match damerau_within(term, token, MAX_EDIT_DISTANCE) {
        Some(distance) => {
            let longest = term.chars().count().max(token.chars().count());
            (1.0 - distance as f64 / longest as f64).max(0.0)
        }
        None => 0.0,
    }
}

/// Exponential recency decay with a hard ceiling: half a point at age
/// zero, halving every `half_life_days`, never negative.
pub fn recency_bonus(mtime: i64, now_ms: i64, half_life_days: f64) -> f64 {
    if half_life_days <= 0.0 {
        return 0.0;
    }
    let age_days = (now_ms - mtime).max(0) as f64 / 86_400_000.0;
    (0.5 * (-age_days / half_life_days).exp2()).clamp(0.0, 0.5)
}

fn field_weight(weights: &ScoreWeights, field: Field) -> f64 {
    match field {
        Field::Title => weights.title,
        Field::Headings => weights.headings,
        Field::Path => weights.path,
        Field::Tags => weights.tags,
        Field::Symbols => weights.symbols,
        Field::Body => weights.body,
    }
}
