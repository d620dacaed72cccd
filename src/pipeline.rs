//! One build run, end to end.
//!
//! ```text
//! config.toml ─► fetch (live or snapshot) ─► drop PRs ─► normalize
//!            ─► classify ─► detail pages (cached) ─► home page + data.json
//! ```
//!
//! The run is best effort. Only two conditions abort it: an invalid
//! configuration (before anything is fetched) and a failed fetch with no
//! snapshot to fall back to. Everything else (an issue that cannot be
//! normalized, a missing template, an unwritable file) is logged, counted
//! in the [`BuildReport`], and the remaining outputs are still produced.

use crate::article::Normalizer;
use crate::cache::{BuildCache, CacheStats, template_fingerprint};
use crate::classify::{Bucket, classify};
use crate::config::{ConfigError, SiteConfig, load_config};
use crate::emit;
use crate::layout::{ARTICLE_TEMPLATE, Layout};
use crate::render::{TemplateSet, renderer_for};
use crate::source::{
    GithubSource, IssueOrigin, IssueSource, SnapshotSource, SourceError, fetch_issues,
    without_pull_requests,
};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Start from the persisted cache. `false` re-renders every page.
    pub use_cache: bool,
    /// Read the issue snapshot instead of calling the API.
    pub offline: bool,
    /// Build date, used for the running-day counter and `generated`.
    pub today: NaiveDate,
}

impl BuildOptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            use_cache: true,
            offline: false,
            today,
        }
    }
}

/// What a run did. Produced even when some outputs failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub origin: IssueOrigin,
    pub fetched: usize,
    pub pull_requests: usize,
    /// Issues that could not be normalized, with the reason.
    pub skipped: Vec<String>,
    pub articles: usize,
    pub pinned: usize,
    pub tagged_top: usize,
    pub special: usize,
    pub ordinary: usize,
    pub static_view: bool,
    pub menu_links: usize,
    pub menu_unresolved: usize,
    pub pages: CacheStats,
    /// Ids whose detail page was written this run.
    pub rendered: Vec<String>,
    /// Ids whose detail page was removed because the issue is gone.
    pub removed: Vec<String>,
    pub home_written: bool,
    pub data_written: bool,
    pub static_files: usize,
    pub files_written: usize,
    pub warnings: Vec<String>,
    /// Outputs that could not be produced.
    pub errors: Vec<String>,
}

impl BuildReport {
    fn new(origin: IssueOrigin) -> Self {
        Self {
            origin,
            fetched: 0,
            pull_requests: 0,
            skipped: Vec::new(),
            articles: 0,
            pinned: 0,
            tagged_top: 0,
            special: 0,
            ordinary: 0,
            static_view: false,
            menu_links: 0,
            menu_unresolved: 0,
            pages: CacheStats::default(),
            rendered: Vec::new(),
            removed: Vec::new(),
            home_written: false,
            data_written: false,
            static_files: 0,
            files_written: 0,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Load the configuration, pick the issue source and build. Returns the
/// report and the layout the run wrote to.
///
/// `make_source` is only called once the configuration is valid, so an
/// invalid config never reaches the network.
pub fn run<F>(
    root: &Path,
    config_path: &Path,
    options: &BuildOptions,
    make_source: F,
) -> Result<(BuildReport, Layout), BuildError>
where
    F: FnOnce(&SiteConfig, &Layout, &BuildOptions) -> Box<dyn IssueSource>,
{
    let config = load_config(config_path)?;
    let layout = Layout::resolve(root, &config.paths);
    let source = make_source(&config, &layout, options);
    let report = build(&config, &layout, source.as_ref(), options)?;
    Ok((report, layout))
}

/// The source used by the CLI: the snapshot when offline or when no
/// repository can be determined, GitHub otherwise.
pub fn default_source(
    config: &SiteConfig,
    layout: &Layout,
    options: &BuildOptions,
) -> Box<dyn IssueSource> {
    if options.offline {
        return Box::new(SnapshotSource::new(layout.snapshot_file()));
    }
    match GithubSource::from_config(&config.source, &layout.root) {
        Ok(source) => Box::new(source),
        Err(e) => {
            warn!("{}; reading the issue snapshot instead", e);
            Box::new(SnapshotSource::new(layout.snapshot_file()))
        }
    }
}

/// Build the site from an already validated configuration.
pub fn build(
    config: &SiteConfig,
    layout: &Layout,
    source: &dyn IssueSource,
    options: &BuildOptions,
) -> Result<BuildReport, BuildError> {
    info!("Fetching issues from {}", source.describe());
    let fetched = fetch_issues(source, &layout.snapshot_file())?;
    let mut report = BuildReport::new(fetched.origin);
    report.fetched = fetched.issues.len();

    let (issues, pull_requests) = without_pull_requests(fetched.issues);
    report.pull_requests = pull_requests;
    if pull_requests > 0 {
        info!("Ignoring {} pull request(s)", pull_requests);
    }

    // Normalize
    let mut normalizer =
        Normalizer::new(&config.article, &config.preview, &config.special, layout);
    let mut seen = HashSet::new();
    let mut articles = Vec::with_capacity(issues.len());
    for issue in &issues {
        match normalizer.normalize(issue) {
            Ok(article) if !seen.insert(article.id.clone()) => {
                let message = format!("duplicate issue #{}", article.number);
                warn!("Skipping {}", message);
                report.skipped.push(message);
            }
            Ok(article) => {
                if let Err(e) = emit::archive_markdown(layout, &article) {
                    warn!("Cannot archive issue #{}: {}", article.number, e);
                    report.warnings.push(e.to_string());
                }
                articles.push(article);
            }
            Err(e) => {
                warn!("Skipping issue: {}", e);
                report.skipped.push(e.to_string());
            }
        }
    }

    // Classify
    let classification = classify(articles, config, options.today);
    report.warnings.extend(classification.warnings.iter().cloned());
    report.articles = classification.all_articles().count();
    report.pinned = classification.count(Bucket::Pinned);
    report.tagged_top = classification.count(Bucket::TaggedTop);
    report.special = classification.count(Bucket::Special);
    report.ordinary = classification.count(Bucket::Ordinary);
    report.static_view = classification.has_static_view();
    report.menu_links = classification.menu.len();
    report.menu_unresolved = classification.menu.iter().filter(|m| m.url.is_none()).count();
    for link in classification.menu.iter().filter(|m| m.url.is_none()) {
        warn!("No article carries menu tag '{}'", link.tag);
    }

    // Templates and cache
    let templates = TemplateSet::load(&layout.templates_dir);
    for problem in templates.problems() {
        error!("{}", problem);
    }
    let renderer = renderer_for(config.render.strategy, templates);

    let fingerprint = template_fingerprint(&layout.template(ARTICLE_TEMPLATE));
    let mut cache = if options.use_cache {
        BuildCache::load(&layout.cache_file(), &fingerprint)
    } else {
        BuildCache::empty(&fingerprint)
    };

    // Detail pages
    for classified in classification.all_articles() {
        let article = classified.article();
        if !cache.needs_render(&article.id, &article.marker)
            && layout.article_page(&article.id).exists()
        {
            report.pages.hit();
            continue;
        }
        match emit::emit_article(renderer.as_ref(), layout, classified, config) {
            Ok(_) => {
                cache.record(&article.id, &article.marker);
                report.pages.render();
                report.rendered.push(article.id.clone());
                report.files_written += 1;
            }
            Err(e) => {
                error!("Cannot write page for issue #{}: {}", article.number, e);
                report.pages.fail();
                report.errors.push(format!("article {}: {}", article.id, e));
            }
        }
    }

    let current: Vec<&str> = classification
        .all_articles()
        .map(|c| c.article().id.as_str())
        .collect();
    cache.prune(current.iter().copied());
    if let Err(e) = cache.save(&layout.cache_file()) {
        error!("Cannot save build cache: {}", e);
        report.errors.push(format!("cache: {e}"));
    }
    report.removed = emit::remove_stale_pages(layout, current.iter().copied());

    // Home page and data file
    let generated = options.today.format("%Y-%m-%d").to_string();
    let site = emit::site_data(&classification, config, &generated);
    match emit::emit_home(renderer.as_ref(), layout, &site) {
        Ok(path) => {
            info!("Wrote {}", path.display());
            report.home_written = true;
            report.files_written += 1;
        }
        Err(e) => {
            error!("Cannot write home page: {}", e);
            report.errors.push(format!("home page: {e}"));
        }
    }
    match emit::write_site_data(layout, &site) {
        Ok(path) => {
            info!("Wrote {}", path.display());
            report.data_written = true;
            report.files_written += 1;
        }
        Err(e) => {
            error!("Cannot write data file: {}", e);
            report.errors.push(format!("data file: {e}"));
        }
    }

    match emit::copy_static(layout) {
        Ok(n) => {
            report.static_files = n;
            report.files_written += n;
        }
        Err(e) => {
            error!("Cannot copy static files: {}", e);
            report.errors.push(format!("static files: {e}"));
        }
    }

    Ok(report)
}
