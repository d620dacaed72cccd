//! Incremental build cache for detail pages.
//!
//! Rendering a detail page is cheap, but rewriting every page on every run
//! churns the output directory (and the git history of a published site).
//! This module lets the emitter skip detail pages whose article hasn't
//! changed since the last run.
//!
//! # Design
//!
//! The cache maps article id to the article's **marker**, an opaque string
//! (the issue's `updated_at`). Markers are compared for equality only, never
//! ordered: a clock change or a different marker format simply forces a
//! rebuild.
//!
//! A page is rendered when:
//! 1. its id has no entry, or
//! 2. the stored marker differs from the current one.
//!
//! An entry is recorded only after the page was written successfully, so
//! the cache never claims a page that does not exist.
//!
//! The home page and the data file aggregate over every article and are
//! always rewritten; they never consult the cache.
//!
//! ## Template fingerprint
//!
//! The manifest also stores a SHA-256 of the detail template. Editing
//! `article.html` changes the fingerprint, and a manifest with a different
//! fingerprint loads as empty, rebuilding every page.
//!
//! ## Storage
//!
//! The manifest is a JSON file at `<state>/cache.json`. It is read once at
//! the start of a run and fully rewritten at the end, after entries for ids
//! that no longer exist have been pruned.
//!
//! ## Bypassing the cache
//!
//! Pass `--no-cache` to `build` to start from an empty manifest. Every page
//! is re-rendered and the manifest is rebuilt from scratch.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Version of the cache manifest format. Bump this to invalidate all
/// existing caches when the format changes.
const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BuildCache {
    pub version: u32,
    /// SHA-256 of the detail template the entries were rendered with.
    #[serde(default)]
    pub template: String,
    /// Article id → marker.
    pub entries: BTreeMap<String, String>,
}

impl BuildCache {
    /// Empty cache bound to a template fingerprint (used for `--no-cache`
    /// or the first build).
    pub fn empty(template: &str) -> Self {
        Self {
            version: MANIFEST_VERSION,
            template: template.to_string(),
            entries: BTreeMap::new(),
        }
    }

    /// Load from `path`. Returns an empty cache if the file doesn't exist,
    /// can't be parsed, has another version, or was written for a different
    /// template.
    pub fn load(path: &Path, template: &str) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Self::empty(template),
            Err(e) => {
                warn!("Cannot read build cache {}: {}; rebuilding all pages", path.display(), e);
                return Self::empty(template);
            }
        };
        let cache: Self = match serde_json::from_str(&content) {
            Ok(c) => c,
            Err(e) => {
                warn!("Build cache {} is corrupt ({}); rebuilding all pages", path.display(), e);
                return Self::empty(template);
            }
        };
        if cache.version != MANIFEST_VERSION {
            warn!(
                "Build cache version {} is not {}; rebuilding all pages",
                cache.version, MANIFEST_VERSION
            );
            return Self::empty(template);
        }
        if cache.template != template {
            debug!("Detail template changed; rebuilding all pages");
            return Self::empty(template);
        }
        cache
    }

    /// Save to `path`, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Whether the page for `id` must be (re)rendered.
    pub fn needs_render(&self, id: &str, marker: &str) -> bool {
        self.entries.get(id).is_none_or(|cached| cached != marker)
    }

    /// Record a successfully written page.
    pub fn record(&mut self, id: &str, marker: &str) {
        self.entries.insert(id.to_string(), marker.to_string());
    }

    /// Drop entries whose id is not in `current`. Returns the dropped ids.
    pub fn prune<'a>(&mut self, current: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let keep: HashSet<&str> = current.into_iter().collect();
        let stale: Vec<String> = self
            .entries
            .keys()
            .filter(|id| !keep.contains(id.as_str()))
            .cloned()
            .collect();
        for id in &stale {
            self.entries.remove(id);
        }
        stale
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// SHA-256 of a template's contents, as a hex string. An unreadable
/// template fingerprints as the empty string.
pub fn template_fingerprint(path: &Path) -> String {
    match std::fs::read(path) {
        Ok(bytes) => format!("{:x}", Sha256::digest(&bytes)),
        Err(_) => String::new(),
    }
}

/// Summary of cache decisions for a build run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub rendered: u32,
    pub failed: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn render(&mut self) {
        self.rendered += 1;
    }

    pub fn fail(&mut self) {
        self.failed += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.rendered + self.failed
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} rendered ({} total)",
                self.hits,
                self.rendered,
                self.total()
            )?;
        } else {
            write!(f, "{} rendered", self.rendered)?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        Ok(())
    }
}
