//! The vault indexer: source files in, document records out.
//!
//! Wraps a [`NoteSource`] (the host side of file I/O) and keeps a
//! [`NoteIndex`] consistent with it. A cold corpus is indexed in two
//! phases: a fully-awaited metadata pass so every note is findable by
//! title, tags, and headings immediately, then a lazy body pass that
//! pulls files through in small batches with pauses in between so the
//! host UI never starves.
//!
//! Read failures are logged and the file is skipped for that pass; a
//! later change event retries it. Only the `{id → (mtime, size)}` file
//! cache is ever persisted — the index itself is memory-only and rebuilt
//! per process.

use crate::error::VaultError;
use crate::extract::parse_markdown;
use crate::index::NoteIndex;
use crate::settings::Settings;
use crate::types::NoteDoc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Identity and filesystem facts about one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMeta {
    /// Stable vault-relative path; doubles as the document id.
    pub path: String,
    pub basename: String,
    /// Parent folder tokens from the vault root.
    pub folder: Vec<String>,
    /// Epoch milliseconds.
    pub mtime: i64,
    pub size: u64,
}

/// The host's cached parse of a note: what phase 1 can index without a
/// raw read.
#[derive(Debug, Clone, Default)]
pub struct CachedMeta {
    pub tags: Vec<String>,
    pub headings: Vec<String>,
    /// Outbound link targets.
    pub links: Vec<String>,
}

/// The source-document producer interface the host supplies.
pub trait NoteSource: Send + Sync {
    /// Enumerate every markdown file in the vault.
    fn list(&self) -> Vec<SourceMeta>;

    /// Facts about a single file, or `None` if it no longer exists.
    fn meta(&self, path: &str) -> Option<SourceMeta>;

    /// The cached parse for a file, if available.
    fn cached_parse(&self, path: &str) -> Option<CachedMeta>;

    /// Raw content. Non-UTF-8 input is read lossily.
    fn read(&self, path: &str) -> Result<String, VaultError>;
}

/// Filesystem-backed vault rooted at a directory. Keeps its own parse
/// cache keyed by mtime, standing in for the host's metadata cache.
pub struct FsVault {
    root: PathBuf,
    parse_cache: Mutex<HashMap<String, (i64, CachedMeta)>>,
}

impl FsVault {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            parse_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn meta_for(&self, relative: &str, absolute: &Path) -> Option<SourceMeta> {
        let metadata = std::fs::metadata(absolute).ok()?;
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        let mut folder: Vec<String> = relative.split('/').map(str::to_string).collect();
        let basename = folder.pop().unwrap_or_default();
        Some(SourceMeta {
            path: relative.to_string(),
            basename,
            folder,
            mtime,
            size: metadata.len(),
        })
    }
}

/// Is this a file the engine indexes at all?
fn is_markdown(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md") | Some("markdown")
    )
}

impl NoteSource for FsVault {
    fn list(&self) -> Vec<SourceMeta> {
        let mut out = Vec::new();
        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() || !is_markdown(entry.path()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if let Some(meta) = self.meta_for(&relative, entry.path()) {
                out.push(meta);
            }
        }
        out.sort_by(|a, b| a.path.cmp(&b.path));
        out
    }

    fn meta(&self, path: &str) -> Option<SourceMeta> {
        let absolute = self.root.join(path);
        if !is_markdown(&absolute) || !absolute.is_file() {
            return None;
        }
        self.meta_for(path, &absolute)
    }

    fn cached_parse(&self, path: &str) -> Option<CachedMeta> {
        let meta = self.meta(path)?;
        if let Some((mtime, cached)) = self.parse_cache.lock().get(path) {
            if *mtime == meta.mtime {
                return Some(cached.clone());
            }
        }
        let content = self.read(path).ok()?;
        let parsed = parse_markdown(&content, false);
        let cached = CachedMeta {
            tags: parsed.tags,
            headings: parsed.headings,
            links: parsed.links,
        };
        self.parse_cache
            .lock()
            .insert(path.to_string(), (meta.mtime, cached.clone()));
        Some(cached)
    }

    fn read(&self, path: &str) -> Result<String, VaultError> {
        let absolute = self.root.join(path);
        match std::fs::read(&absolute) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(source) => Err(VaultError::Read {
                path: absolute,
                source,
            }),
        }
    }
}

/// `{mtime, size}` stamp used to skip unchanged files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStamp {
    pub mtime: i64,
    pub size: u64,
}

/// Keeps the provider consistent with a mutating vault.
pub struct VaultIndexer {
    source: Arc<dyn NoteSource>,
    index: Arc<RwLock<NoteIndex>>,
    settings: Settings,
    file_cache: Mutex<HashMap<String, FileStamp>>,
    body_queue: Mutex<VecDeque<String>>,
}

impl VaultIndexer {
    pub fn new(source: Arc<dyn NoteSource>, settings: Settings) -> Self {
        let index = Arc::new(RwLock::new(NoteIndex::with_settings(&settings)));
        Self {
            source,
            index,
            settings,
            file_cache: Mutex::new(HashMap::new()),
            body_queue: Mutex::new(VecDeque::new()),
        }
    }

    /// The shared provider. Queries take a read guard; the indexer takes
    /// a write guard per upsert/remove.
    pub fn index(&self) -> Arc<RwLock<NoteIndex>> {
        Arc::clone(&self.index)
    }

    /// Files queued for the lazy body pass.
    pub fn pending_bodies(&self) -> usize {
        self.body_queue.lock().len()
    }

    fn excluded(&self, meta: &SourceMeta) -> bool {
        if self.settings.search.exclude_folders.is_empty() {
            return false;
        }
        let folder = meta.folder.join("/");
        self.settings.search.exclude_folders.iter().any(|prefix| {
            let prefix = prefix.trim_matches('/');
            !prefix.is_empty() && (folder == prefix || folder.starts_with(&format!("{prefix}/")))
        })
    }

    /// Phase 1: index every file's metadata (empty body), fully awaited.
    /// Queues each file for the body pass. Returns how many were indexed.
    pub async fn index_vault(&self) -> usize {
        let mut count = 0;
        for meta in self.source.list() {
            if self.excluded(&meta) {
                continue;
            }
            let cached = self.source.cached_parse(&meta.path).unwrap_or_default();
            let doc = self.metadata_doc(&meta, cached);
            match self.index.write().await.upsert(doc) {
                Ok(()) => {
                    self.body_queue.lock().push_back(meta.path);
                    count += 1;
                }
                Err(err) => warn!(path = %meta.path, %err, "metadata upsert failed"),
            }
        }
        count
    }

    /// Phase 2: drain the body queue in batches, pausing between batches.
    pub async fn run_body_pass(&self) {
        let batch_size = self.settings.indexer.batch_size.max(1);
        let delay = Duration::from_millis(self.settings.indexer.batch_delay_ms);

        loop {
            let batch: Vec<String> = {
                let mut queue = self.body_queue.lock();
                let take = batch_size.min(queue.len());
                queue.drain(..take).collect()
            };
            if batch.is_empty() {
                return;
            }

            for path in batch {
                if let Err(err) = self.upsert_file(&path).await {
                    warn!(%path, %err, "body pass skipped file");
                }
            }

            if !self.body_queue.lock().is_empty() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    fn metadata_doc(&self, meta: &SourceMeta, cached: CachedMeta) -> NoteDoc {
        NoteDoc {
            id: meta.path.clone(),
            title: title_of(&meta.basename),
            path: meta.folder.clone(),
            tags: cached.tags,
            headings: cached.headings,
            symbols: cached
                .links
                .iter()
                .map(|target| format!("[[{target}]]"))
                .collect(),
            body: String::new(),
            mtime: meta.mtime,
            size: meta.size,
        }
    }

    /// Full (body-bearing) upsert of one file. `Ok(false)` means the file
    /// is gone or excluded — a silent no-op.
    pub async fn upsert_file(&self, path: &str) -> Result<bool, VaultError> {
        let Some(meta) = self.source.meta(path) else {
            debug!(path, "file vanished before upsert");
            return Ok(false);
        };
        if self.excluded(&meta) {
            return Ok(false);
        }

        let content = self.source.read(path)?;
        let parsed = parse_markdown(&content, self.settings.search.include_code_blocks);

        let doc = NoteDoc {
            id: meta.path.clone(),
            title: title_of(&meta.basename),
            path: meta.folder.clone(),
            tags: parsed.tags.clone(),
            headings: parsed.headings.clone(),
            symbols: parsed.symbols(),
            body: parsed.body,
            mtime: meta.mtime,
            size: meta.size,
        };

        self.index.write().await.upsert(doc).map_err(VaultError::from)?;
        self.file_cache.lock().insert(
            meta.path,
            FileStamp {
                mtime: meta.mtime,
                size: meta.size,
            },
        );
        Ok(true)
    }

    /// Upsert only when the file's `{mtime, size}` stamp differs from the
    /// cached one. Returns whether an upsert happened.
    pub async fn upsert_if_changed(&self, path: &str) -> Result<bool, VaultError> {
        let Some(meta) = self.source.meta(path) else {
            return Ok(false);
        };
        let stamp = FileStamp {
            mtime: meta.mtime,
            size: meta.size,
        };
        if self.file_cache.lock().get(path) == Some(&stamp) {
            return Ok(false);
        }
        self.upsert_file(path).await
    }

    /// Drop a file from the index and cache.
    pub async fn remove(&self, path: &str) -> bool {
        self.file_cache.lock().remove(path);
        self.index.write().await.remove(path)
    }

    /// Rename: remove the old id, upsert under the new one.
    pub async fn rename(&self, from: &str, to: &str) -> Result<(), VaultError> {
        self.remove(from).await;
        self.upsert_file(to).await.map(|_| ())
    }

    // =========================================================================
    // PERSISTENCE HOOK
    // =========================================================================

    /// Serialize the file cache for the host to persist.
    pub fn file_cache_blob(&self) -> String {
        serde_json::to_string(&*self.file_cache.lock()).expect("stamp map always serializes")
    }

    /// Load a previously persisted file cache so `upsert_if_changed` can
    /// skip unchanged files.
    pub fn load_file_cache(&self, blob: &str) -> Result<usize, VaultError> {
        let stamps: HashMap<String, FileStamp> = serde_json::from_str(blob)?;
        let count = stamps.len();
        *self.file_cache.lock() = stamps;
        Ok(count)
    }
}

fn title_of(basename: &str) -> String {
    basename
        .strip_suffix(".md")
        .or_else(|| basename.strip_suffix(".markdown"))
        .unwrap_or(basename)
        .to_string()
}
