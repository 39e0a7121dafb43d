//! Engine configuration.
//!
//! A layered settings tree in the shape the host application persists:
//! every field has a serde default so a partial TOML file (or an empty one)
//! deserializes to the documented defaults.

use serde::{Deserialize, Serialize};

/// Top-level settings consumed by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub commands: CommandsSettings,
    pub search: SearchSettings,
    pub indexer: IndexerSettings,
    pub watcher: WatcherSettings,
}

impl Settings {
    /// Parse settings from a TOML document. Missing keys fall back to
    /// defaults; unknown keys are ignored.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Preset for mobile hosts: smaller body-pass batches with longer
    /// pauses so the UI thread keeps breathing.
    pub fn for_mobile(mut self) -> Self {
        self.indexer.batch_size = 5;
        self.indexer.batch_delay_ms = 100;
        self
    }
}

/// Commands-mode settings. When enabled, a query starting with
/// `prefix_char` is handed back to the host as an opaque command lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandsSettings {
    pub enable_prefix: bool,
    pub prefix_char: char,
}

impl Default for CommandsSettings {
    fn default() -> Self {
        Self {
            enable_prefix: true,
            prefix_char: '>',
        }
    }
}

/// Search-side settings: normalization, regex post-filter cap, scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// When false, diacritics are folded during normalization and matching
    /// ("café" matches "cafe").
    pub preserve_diacritics: bool,
    /// Cap on how many top-ranked documents the regex post-filter inspects.
    pub regex_candidate_k: usize,
    /// Include fenced code content in the indexed body.
    pub include_code_blocks: bool,
    /// Folder path prefixes skipped during indexing.
    pub exclude_folders: Vec<String>,
    pub weights: ScoreWeights,
    /// Days for the recency bonus to decay by half.
    pub recency_half_life_days: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            preserve_diacritics: true,
            regex_candidate_k: 300,
            include_code_blocks: false,
            exclude_folders: Vec::new(),
            weights: ScoreWeights::default(),
            recency_half_life_days: 30.0,
        }
    }
}

/// Per-field scoring weights.
///
/// The defaults keep title matches dominant: a perfect body match (1.0)
/// cannot outrank a perfect title match (4.0), and the recency ceiling is
/// small enough that freshness never beats relevance on its own.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub title: f64,
    pub headings: f64,
    pub path: f64,
    pub tags: f64,
    pub symbols: f64,
    pub body: f64,
    pub recency: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            title: 4.0,
            headings: 2.0,
            path: 1.5,
            tags: 1.5,
            symbols: 1.5,
            body: 1.0,
            recency: 0.5,
        }
    }
}

/// Vault-indexer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerSettings {
    /// Per-document body cap in bytes. Bodies beyond the cap are truncated
    /// at the nearest character boundary.
    pub max_body_bytes: usize,
    /// Corpus cap; upserts past it fail with a capacity error.
    pub max_docs: usize,
    /// Files per lazy body-pass batch.
    pub batch_size: usize,
    /// Pause between body-pass batches, milliseconds.
    pub batch_delay_ms: u64,
}

impl Default for IndexerSettings {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024,
            max_docs: 50_000,
            batch_size: 10,
            batch_delay_ms: 50,
        }
    }
}

/// Event-coalescer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherSettings {
    /// Quiet window before pending create/modify events are flushed to the
    /// indexer, milliseconds.
    pub coalesce_ms: u64,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self { coalesce_ms: 500 }
    }
}
