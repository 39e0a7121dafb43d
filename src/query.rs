//! Query parsing: raw input string → structured query.
//!
//! Parsing is single-pass and total: it never fails. Malformed input
//! produces a best-effort structure plus a parallel list of non-fatal
//! [`ParseIssue`]s (currently only invalid regexes produce issues).
//!
//! Precedence, highest first:
//! 1. Commands prefix (`>` by default) captures the whole input.
//! 2. Quoted `"…"` phrases.
//! 3. The first valid `/pattern/flags` regex clause.
//! 4. Token classification: `#`/`@` field restriction, `#tag`/`tag:`,
//!    `path:`, `in:`, `-exclude`, isolated `OR`, ordinary term.
//! 5. OR-group resolution over the ordinary terms.
//!
//! Same input and settings always produce the identical structure, and the
//! raw string is preserved verbatim for UI echo.

use crate::settings::Settings;
use crate::types::Field;
use serde::{Deserialize, Serialize};

/// How the input should be interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryMode {
    /// Search the note corpus.
    #[default]
    Files,
    /// Opaque command-name lookup, resolved by the host.
    Commands,
}

/// A regex clause: pattern source and flags, verbatim from the input.
/// Only clauses that compiled successfully are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexClause {
    pub source: String,
    pub flags: String,
}

/// Structured filter constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFilters {
    /// Every listed tag must match one of the document's tags.
    pub tags: Vec<String>,
    /// Every listed value must occur as a substring of the folder path.
    pub paths: Vec<String>,
    /// Every listed value must equal some segment of the folder path.
    pub folders: Vec<String>,
    /// Restrict scoring to a single field (`#` → headings, `@` → symbols).
    pub field: Option<Field>,
}

impl QueryFilters {
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
            && self.paths.is_empty()
            && self.folders.is_empty()
            && self.field.is_none()
    }
}

/// The parsed query consumed by the provider and scorer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuery {
    /// Verbatim input, preserved for UI echo.
    pub raw: String,
    pub mode: QueryMode,
    /// Conjunctive fuzzy terms, in input order.
    pub terms: Vec<String>,
    /// Substrings that must appear literally (after normalization).
    pub phrases: Vec<String>,
    /// A document containing any of these (in any field) is rejected.
    pub excludes: Vec<String>,
    /// Disjunctive inside a group, conjunctive across groups.
    pub or_groups: Vec<Vec<String>>,
    pub filters: QueryFilters,
    pub regex: Option<RegexClause>,
}

impl ParsedQuery {
    /// True when the query carries nothing at all — no terms, phrases,
    /// groups, regex, filters, or excludes. Blank queries resolve to the
    /// most-recently-modified listing.
    pub fn is_blank(&self) -> bool {
        self.terms.is_empty()
            && self.phrases.is_empty()
            && self.or_groups.is_empty()
            && self.excludes.is_empty()
            && self.regex.is_none()
            && self.filters.is_empty()
    }

    /// True when at least one positive constraint exists. A query with
    /// only excludes has nothing to select and yields the empty set.
    pub fn has_positive_constraints(&self) -> bool {
        !self.terms.is_empty()
            || !self.phrases.is_empty()
            || !self.or_groups.is_empty()
            || self.regex.is_some()
            || !self.filters.is_empty()
    }
}

/// Kind of a non-fatal parse issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseIssueKind {
    Regex,
}

/// A non-fatal problem found while parsing. The rest of the query is
/// still evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseIssue {
    pub kind: ParseIssueKind,
    pub message: String,
    /// Character position in the raw input where the construct started.
    pub position: usize,
}

/// Flags a regex clause may carry. `i`, `m`, `s` map to inline regex
/// flags; `g` is implied by the post-filter (all matches are collected);
/// `u` and `y` are accepted for compatibility and ignored.
const REGEX_FLAGS: &[char] = &['i', 'g', 'm', 's', 'u', 'y'];

/// Parse a raw query string. Issues are discarded; see
/// [`parse_with_errors`] to keep them.
pub fn parse(raw: &str, settings: &Settings) -> ParsedQuery {
    parse_with_errors(raw, settings).0
}

/// Parse a raw query string, returning the structure plus any non-fatal
/// issues encountered.
pub fn parse_with_errors(raw: &str, settings: &Settings) -> (ParsedQuery, Vec<ParseIssue>) {
    let mut query = ParsedQuery {
        raw: raw.to_string(),
        ..Default::default()
    };
    let mut issues = Vec::new();

    // 1. Commands mode short-circuits everything else.
    let trimmed = raw.trim();
    if settings.commands.enable_prefix && trimmed.starts_with(settings.commands.prefix_char) {
        query.mode = QueryMode::Commands;
        let rest = trimmed[settings.commands.prefix_char.len_utf8()..].trim();
        if !rest.is_empty() {
            query.terms.push(rest.to_string());
        }
        return (query, issues);
    }

    // Residual characters tagged with their char position in `raw`, so
    // issue positions survive phrase removal.
    let chars: Vec<(char, usize)> = raw.chars().zip(0..).collect();

    // 2. Quoted phrases.
    let residual = extract_phrases(&chars, &mut query.phrases);

    // 3. First valid regex clause.
    let residual = extract_regex(&residual, &mut query.regex, &mut issues);

    // 4 + 5. Token classification and OR-group resolution.
    classify_tokens(&residual, &mut query);

    (query, issues)
}

/// Pull maximal `"…"` substrings with non-empty interiors out as phrases.
/// Unclosed quotes (and empty `""` pairs) stay in the residual as literal
/// text.
fn extract_phrases(chars: &[(char, usize)], phrases: &mut Vec<String>) -> Vec<(char, usize)> {
    let mut residual = Vec::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i].0 == '"' {
            if let Some(close) = chars[i + 1..].iter().position(|&(c, _)| c == '"') {
                let close = i + 1 + close;
                if close > i + 1 {
                    phrases.push(chars[i + 1..close].iter().map(|&(c, _)| c).collect());
                    // Leave a separator so surrounding tokens stay split
                    residual.push((' ', chars[i].1));
                } else {
                    residual.push(chars[i]);
                    residual.push(chars[close]);
                }
                i = close + 1;
                continue;
            }
        }
        residual.push(chars[i]);
        i += 1;
    }

    residual
}

/// Find the first valid `/pattern/flags` clause. Candidates that fail to
/// compile emit an issue and are dropped from the residual; scanning then
/// continues. Once a clause is retained the rest of the input is left
/// untouched.
fn extract_regex(
    chars: &[(char, usize)],
    regex: &mut Option<RegexClause>,
    issues: &mut Vec<ParseIssue>,
) -> Vec<(char, usize)> {
    let mut residual = Vec::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        let at_boundary = i == 0 || chars[i - 1].0.is_whitespace();
        if chars[i].0 == '/' && at_boundary && regex.is_none() {
            if let Some((pattern, flags, next)) = regex_candidate(chars, i) {
                match compile_regex(&pattern, &flags) {
                    Ok(_) => {
                        *regex = Some(RegexClause {
                            source: pattern,
                            flags,
                        });
                    }
                    Err(err) => {
                        issues.push(ParseIssue {
                            kind: ParseIssueKind::Regex,
                            message: err.to_string(),
                            position: chars[i].1,
                        });
                    }
                }
                i = next;
                continue;
            }
        }
        residual.push(chars[i]);
        i += 1;
    }

    residual
}

/// Try to read a `/pattern/flags` candidate starting at `start`. Returns
/// (pattern, flags, index-after-candidate) when the shape matches:
/// a non-empty pattern with no unescaped `/`, closed by `/`, followed by
/// optional known flag letters, ending at whitespace or end of input.
fn regex_candidate(chars: &[(char, usize)], start: usize) -> Option<(String, String, usize)> {
    let mut j = start + 1;
    while j < chars.len() {
        match chars[j].0 {
            '\\' => j += 2,
            '/' => break,
            _ => j += 1,
        }
    }
    if j >= chars.len() || j == start + 1 {
        return None;
    }

    let mut k = j + 1;
    while k < chars.len() && chars[k].0.is_ascii_alphabetic() {
        if !REGEX_FLAGS.contains(&chars[k].0) {
            return None;
        }
        k += 1;
    }
    if k < chars.len() && !chars[k].0.is_whitespace() {
        return None;
    }

    let pattern = chars[start + 1..j].iter().map(|&(c, _)| c).collect();
    let flags = chars[j + 1..k].iter().map(|&(c, _)| c).collect();
    Some((pattern, flags, k))
}

/// Compile a clause with its flags applied. `i`/`m`/`s` become inline
/// flags; the rest have no compile-time effect.
pub(crate) fn compile_regex(source: &str, flags: &str) -> Result<regex::Regex, regex::Error> {
    let inline: String = ['i', 'm', 's']
        .iter()
        .filter(|f| flags.contains(**f))
        .collect();
    if inline.is_empty() {
        regex::Regex::new(source)
    } else {
        regex::Regex::new(&format!("(?{inline}){source}"))
    }
}

/// Classify whitespace-separated residual tokens and resolve OR groups.
fn classify_tokens(chars: &[(char, usize)], query: &mut ParsedQuery) {
    let text: String = chars.iter().map(|&(c, _)| c).collect();

    // True while the most recent ordinary term sits in an open or-group
    // that the next `OR term` pair may extend.
    let mut group_open = false;
    let mut pending_or = false;

    for token in text.split_whitespace() {
        match token {
            "#" => {
                query.filters.field = Some(Field::Headings);
                continue;
            }
            "@" => {
                query.filters.field = Some(Field::Symbols);
                continue;
            }
            _ => {}
        }

        if let Some(tag) = token.strip_prefix('#') {
            if !tag.is_empty() {
                query.filters.tags.push(tag.to_string());
                continue;
            }
        }
        if let Some(value) = token.strip_prefix("tag:") {
            if !value.is_empty() {
                query.filters.tags.push(value.to_string());
                continue;
            }
        }
        if let Some(value) = token.strip_prefix("path:") {
            if !value.is_empty() {
                query.filters.paths.push(value.to_string());
                continue;
            }
        }
        if let Some(value) = token.strip_prefix("in:") {
            if !value.is_empty() {
                query.filters.folders.push(value.to_string());
                continue;
            }
        }
        if let Some(term) = token.strip_prefix('-') {
            if !term.is_empty() {
                query.excludes.push(term.to_string());
                continue;
            }
        }

        if token.eq_ignore_ascii_case("or") {
            // Only meaningful after an ordinary term; leading and doubled
            // ORs are inert.
            if group_open || !query.terms.is_empty() {
                pending_or = true;
            }
            continue;
        }

        // Ordinary term.
        if pending_or {
            pending_or = false;
            if group_open {
                query
                    .or_groups
                    .last_mut()
                    .expect("group_open implies a group exists")
                    .push(token.to_string());
            } else if let Some(prev) = query.terms.pop() {
                query.or_groups.push(vec![prev, token.to_string()]);
                group_open = true;
            } else {
                query.terms.push(token.to_string());
            }
        } else {
            query.terms.push(token.to_string());
            group_open = false;
        }
    }
    // A trailing OR leaves pending_or set; nothing consumed it, so the
    // last term simply stays an ordinary term.
}
