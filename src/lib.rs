//! # valog
//!
//! A static blog generator whose content lives in GitHub Issues. Every open
//! issue of a repository is an article: the title and body come from the
//! issue, labels become tags, and a handful of labels (pinned, top, special)
//! decide where the article appears on the home page.
//!
//! # Architecture: One Batch Pipeline
//!
//! A run is a single synchronous pass over the complete issue list:
//!
//! ```text
//! 1. Fetch      GitHub API (or snapshot)  →  Vec<RawIssue>
//! 2. Normalize  RawIssue                  →  Article      (directives, Markdown, preview)
//! 3. Classify   Vec<Article>              →  Classification (buckets, menu links)
//! 4. Emit       Classification            →  docs/        (pages, data.json)
//! ```
//!
//! Each stage is a plain function over owned data, so unit tests exercise
//! normalization and classification without touching the network or disk.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `config.toml` schema, defaults, validation, stock config |
//! | [`layout`] | Per-run filesystem layout resolved from the project root |
//! | [`source`] | Issue sources: GitHub REST API, snapshot fallback |
//! | [`directive`] | `!vml-` inline HTML directives and teaser extraction |
//! | [`markdown`] | Markdown to HTML |
//! | [`article`] | Issue → article normalization |
//! | [`classify`] | Bucket assignment and floating-menu links |
//! | [`cache`] | Incremental build cache for detail pages |
//! | [`render`] | Template rendering: Jinja or placeholder substitution |
//! | [`emit`] | Writing pages, data file, archives and static assets |
//! | [`pipeline`] | One end-to-end run with best-effort error handling |
//! | [`types`] | Template and data-file records (`ArticleCard`, `SiteData`, ...) |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Issues as the Database
//!
//! Writing happens in the GitHub issue editor, with its previews, drafts and
//! image uploads. The generator only reads. The last successful fetch is kept
//! as `O-MD/issues.json`, so a build still succeeds when the API is down or
//! rate-limited.
//!
//! ## Raw HTML Escape Hatch
//!
//! Markdown is great for prose and poor for layout. A line starting with
//! `!vml-` is copied to the page as raw HTML, and the first one doubles as
//! the home-page teaser. See [`directive`].
//!
//! ## Incremental Pages
//!
//! Detail pages are only rewritten when the issue changed (its `updated_at`
//! differs from the cached value) or the article template changed. A blog
//! published from the `docs/` folder of a repository then gets small diffs
//! per build. See [`cache`].
//!
//! ## User Templates
//!
//! Templates are user files under `template/`, not compiled in. They are
//! rendered with `minijinja`, or with literal `{{ path }}` substitution for
//! templates written for a plain string replacer. See [`render`].

pub mod article;
pub mod cache;
pub mod classify;
pub mod config;
pub mod directive;
pub mod emit;
pub mod layout;
pub mod markdown;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod source;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
