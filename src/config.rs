//! Site configuration module.
//!
//! Handles loading and validating `config.toml`. The file is read once per
//! run, validated once, and the resulting [`SiteConfig`] is read-only for the
//! rest of the pipeline. Validation failures are fatal and surface before any
//! issue is fetched.
//!
//! ## Configuration Options
//!
//! ```toml
//! [blog]                         # required
//! name = "My Blog"               # required
//! description = "Notes"          # required
//! avatar = "static/avatar.png"
//! favicon = "static/favicon.ico"
//!
//! [theme]
//! mode = "default"               # "default" or "light"
//! primary_color = "#3498db"
//!
//! [special]
//! top = false                    # collapse pinned/top articles into special
//! tags = ["special"]
//! pin_labels = ["pinned"]
//! top_labels = ["top"]
//! max_pinned = 1
//!
//! [special.view]                 # optional static-view card
//! title = "About this blog"
//! since = "2023.01.01"           # enables the running-day counter
//! "Powered by" = "valog"
//!
//! [[floating_menu]]              # at most 10 entries
//! tag = "rust"
//! display = "Rust"
//!
//! [article]
//! strip_control_labels = true
//! placeholder_title = "none"
//! date_format = "%Y-%m-%d"
//! vertical_title_chars = 4
//! vertical_fallback = "Blog"
//! summary_fallback = ["no summary"]
//!
//! [preview]
//! mode = "paragraphs"            # "paragraphs" or "chars"
//! max_paragraphs = 3
//! max_chars = 100
//!
//! [render]
//! strategy = "jinja"             # "jinja" or "placeholder"
//!
//! [source]
//! # repository = "owner/name"
//! state = "open"
//! per_page = 100
//! api_url = "https://api.github.com"
//!
//! [paths]
//! templates = "template"
//! output = "docs"
//! articles = "article"
//! static_dir = "static"
//! state = "O-MD"
//! data_file = "data.json"
//! ```
//!
//! Unknown keys are rejected to catch typos early, except inside
//! `[special.view]`, which is free-form.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum number of `[[floating_menu]]` entries.
pub const MAX_FLOATING_MENU: usize = 10;

/// Date format of `[special.view].since`.
pub const STATIC_VIEW_DATE_FORMAT: &str = "%Y.%m.%d";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    Missing(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// Only `[blog]` is required. Every other table falls back to the defaults
/// shown in the module docs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Blog metadata handed to every template.
    pub blog: BlogConfig,
    /// Theme metadata handed to every template.
    #[serde(default)]
    pub theme: ThemeConfig,
    /// Bucket rules for pinned, top and special articles.
    #[serde(default)]
    pub special: SpecialConfig,
    /// Floating menu entries, resolved to the first article carrying the tag.
    #[serde(default)]
    pub floating_menu: Vec<MenuEntry>,
    /// Article normalization settings.
    #[serde(default)]
    pub article: ArticleConfig,
    /// Home-page preview settings.
    #[serde(default)]
    pub preview: PreviewConfig,
    /// Template rendering strategy.
    #[serde(default)]
    pub render: RenderConfig,
    /// Issue source settings.
    #[serde(default)]
    pub source: SourceConfig,
    /// Input and output locations, relative to the project root.
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlogConfig {
    pub name: String,
    pub description: String,
    #[serde(default = "default_avatar")]
    pub avatar: String,
    #[serde(default = "default_favicon")]
    pub favicon: String,
}

fn default_avatar() -> String {
    "static/avatar.png".to_string()
}

fn default_favicon() -> String {
    "static/favicon.ico".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    /// `"default"` or `"light"`.
    pub mode: String,
    /// Primary accent color as `#rgb` or `#rrggbb`.
    pub primary_color: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            mode: "default".to_string(),
            primary_color: "#3498db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpecialConfig {
    /// When true, pinned and top articles land in the special bucket instead
    /// of leading the home page.
    pub top: bool,
    /// Labels that put an article into the special bucket.
    pub tags: Vec<String>,
    /// Labels that pin an article to the front of the home page.
    pub pin_labels: Vec<String>,
    /// Labels that mark an article as tagged-top.
    pub top_labels: Vec<String>,
    /// How many pinned articles are honored. Extras become ordinary.
    pub max_pinned: usize,
    /// Informational card used when no article lands in the special bucket.
    pub view: Option<StaticViewConfig>,
}

impl Default for SpecialConfig {
    fn default() -> Self {
        Self {
            top: false,
            tags: vec!["special".to_string()],
            pin_labels: vec!["pinned".to_string()],
            top_labels: vec!["top".to_string()],
            max_pinned: 1,
            view: None,
        }
    }
}

impl SpecialConfig {
    /// Every label that drives classification rather than describing content.
    pub fn control_labels(&self) -> impl Iterator<Item = &str> {
        self.pin_labels
            .iter()
            .chain(&self.top_labels)
            .chain(&self.tags)
            .map(String::as_str)
    }
}

/// Free-form `[special.view]` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticViewConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Start date (`YYYY.MM.DD`) for the running-day counter. Also read
    /// from `Total_time`, the key older configs use.
    #[serde(default, alias = "Total_time", skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    /// Remaining key/value pairs, shown as-is.
    #[serde(flatten)]
    pub items: BTreeMap<String, String>,
}

impl StaticViewConfig {
    /// Parsed `since` date. Validation guarantees this succeeds when set.
    pub fn since_date(&self) -> Option<NaiveDate> {
        self.since
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s, STATIC_VIEW_DATE_FORMAT).ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MenuEntry {
    pub tag: String,
    pub display: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArticleConfig {
    /// Remove pin/top/special labels from the displayed tag list.
    pub strip_control_labels: bool,
    /// Titles equal to this keyword (case-insensitive) are blanked. Empty
    /// disables the check.
    pub placeholder_title: String,
    /// `chrono` strftime format for `Article::date`.
    pub date_format: String,
    /// Character budget for a vertical title derived from a tag or title.
    pub vertical_title_chars: usize,
    /// Vertical title when nothing else is available.
    pub vertical_fallback: String,
    /// Summary lines when the body has no summary directive.
    pub summary_fallback: Vec<String>,
}

impl Default for ArticleConfig {
    fn default() -> Self {
        Self {
            strip_control_labels: true,
            placeholder_title: "none".to_string(),
            date_format: "%Y-%m-%d".to_string(),
            vertical_title_chars: 4,
            vertical_fallback: "Blog".to_string(),
            summary_fallback: vec!["no summary".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewMode {
    /// Keep the first `max_paragraphs` blocks, rendered to HTML.
    Paragraphs,
    /// Keep the first `max_chars` characters of plain text.
    Chars,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewConfig {
    pub mode: PreviewMode,
    pub max_paragraphs: usize,
    pub max_chars: usize,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            mode: PreviewMode::Paragraphs,
            max_paragraphs: 3,
            max_chars: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStrategy {
    /// Jinja templates with a structured context.
    #[default]
    Jinja,
    /// Literal `{{ path }}` substitution; non-string values become JSON.
    Placeholder,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub strategy: RenderStrategy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// `owner/name`. Falls back to `GITHUB_REPOSITORY`, then the `origin`
    /// remote of the project root.
    pub repository: Option<String>,
    /// Issue state filter passed to the API.
    pub state: String,
    /// Page size for the paginated issue listing (1-100).
    pub per_page: u32,
    pub api_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            repository: None,
            state: "open".to_string(),
            per_page: 100,
            api_url: "https://api.github.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Directory holding `home.html` and `article.html`.
    pub templates: String,
    /// Site output directory.
    pub output: String,
    /// Detail page directory, relative to `output`.
    pub articles: String,
    /// Static assets copied to `<output>/static`.
    pub static_dir: String,
    /// Working directory for the cache, issue snapshot and raw markdown.
    pub state: String,
    /// Aggregate data file, relative to `output`.
    pub data_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            templates: "template".to_string(),
            output: "docs".to_string(),
            articles: "article".to_string(),
            static_dir: "static".to_string(),
            state: "O-MD".to_string(),
            data_file: "data.json".to_string(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blog.name.trim().is_empty() {
            return Err(ConfigError::Validation("blog.name must not be empty".into()));
        }
        if self.floating_menu.len() > MAX_FLOATING_MENU {
            return Err(ConfigError::Validation(format!(
                "floating_menu allows at most {} entries, found {}",
                MAX_FLOATING_MENU,
                self.floating_menu.len()
            )));
        }
        if !matches!(self.theme.mode.as_str(), "default" | "light") {
            return Err(ConfigError::Validation(format!(
                "theme.mode must be 'default' or 'light', found '{}'",
                self.theme.mode
            )));
        }
        if !is_hex_color(&self.theme.primary_color) {
            return Err(ConfigError::Validation(format!(
                "theme.primary_color must be #rgb or #rrggbb, found '{}'",
                self.theme.primary_color
            )));
        }
        if let Some(since) = self.special.view.as_ref().and_then(|v| v.since.as_deref())
            && NaiveDate::parse_from_str(since, STATIC_VIEW_DATE_FORMAT).is_err()
        {
            return Err(ConfigError::Validation(format!(
                "special.view.since must look like 2023.01.01, found '{since}'"
            )));
        }
        if self.preview.max_paragraphs == 0 {
            return Err(ConfigError::Validation(
                "preview.max_paragraphs must be at least 1".into(),
            ));
        }
        if self.preview.max_chars == 0 {
            return Err(ConfigError::Validation(
                "preview.max_chars must be at least 1".into(),
            ));
        }
        if self.article.vertical_title_chars == 0 {
            return Err(ConfigError::Validation(
                "article.vertical_title_chars must be at least 1".into(),
            ));
        }
        if !is_strftime(&self.article.date_format) {
            return Err(ConfigError::Validation(format!(
                "article.date_format is not a valid strftime format: '{}'",
                self.article.date_format
            )));
        }
        if !(1..=100).contains(&self.source.per_page) {
            return Err(ConfigError::Validation(
                "source.per_page must be 1-100".into(),
            ));
        }
        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => {
            matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        None => false,
    }
}

fn is_strftime(format: &str) -> bool {
    use chrono::format::{Item, StrftimeItems};
    !format.is_empty() && !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Parse and validate config file contents.
pub fn parse_config(content: &str) -> Result<SiteConfig, ConfigError> {
    let config: SiteConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate the config file at `path`.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    parse_config(&content)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# valog configuration
# ===================
# Only [blog] is required. Values shown below are the defaults.
# Unknown keys will cause an error (except inside [special.view]).

[blog]
name = "My Blog"
description = "Posts written as GitHub Issues"
avatar = "static/avatar.png"
favicon = "static/favicon.ico"

# ---------------------------------------------------------------------------
# Theme
# ---------------------------------------------------------------------------
[theme]
# "default" or "light"
mode = "default"
# Primary accent color, #rgb or #rrggbb
primary_color = "#3498db"

# ---------------------------------------------------------------------------
# Special cards and pinning
# ---------------------------------------------------------------------------
[special]
# true: pinned and top articles become special cards instead of leading
# the article list.
top = false
# Labels that turn an issue into a special card.
tags = ["special"]
# Labels that pin an issue to the front of the article list.
pin_labels = ["pinned"]
# Labels that mark an issue as "top" (listed right after pinned ones).
top_labels = ["top"]
# Pinned articles beyond this count are listed as ordinary articles.
max_pinned = 1

# Shown as a single special card when no issue is special.
# [special.view]
# title = "About"
# since = "2023.01.01"    # running-day counter start, YYYY.MM.DD
# "Powered by" = "valog"

# ---------------------------------------------------------------------------
# Floating menu (at most 10 entries). Each entry links to the first
# article carrying the tag.
# ---------------------------------------------------------------------------
# [[floating_menu]]
# tag = "rust"
# display = "Rust"

# ---------------------------------------------------------------------------
# Articles
# ---------------------------------------------------------------------------
[article]
# Hide pin/top/special labels from the displayed tags.
strip_control_labels = true
# Titles equal to this keyword (any case) are shown blank. "" disables.
placeholder_title = "none"
date_format = "%Y-%m-%d"
# Length of the vertical title derived from a tag or the title.
vertical_title_chars = 4
vertical_fallback = "Blog"
# Summary used when the body has no !vml- summary directive.
summary_fallback = ["no summary"]

# ---------------------------------------------------------------------------
# Home page previews
# ---------------------------------------------------------------------------
[preview]
# "paragraphs": first max_paragraphs blocks as HTML
# "chars": first max_chars characters of plain text
mode = "paragraphs"
max_paragraphs = 3
max_chars = 100

# ---------------------------------------------------------------------------
# Rendering
# ---------------------------------------------------------------------------
[render]
# "jinja": templates get a structured context
# "placeholder": {{ path }} tokens are replaced literally, lists and
# objects are inserted as JSON
strategy = "jinja"

# ---------------------------------------------------------------------------
# Issue source
# ---------------------------------------------------------------------------
[source]
# owner/name; defaults to $GITHUB_REPOSITORY, then the origin remote.
# repository = "owner/name"
state = "open"
per_page = 100
api_url = "https://api.github.com"

# ---------------------------------------------------------------------------
# Paths (relative to the project root)
# ---------------------------------------------------------------------------
[paths]
templates = "template"
output = "docs"
# Detail pages, relative to output
articles = "article"
# Copied to <output>/static
static_dir = "static"
# Cache, issue snapshot and raw markdown
state = "O-MD"
# Aggregate data file, relative to output
data_file = "data.json"
"##
}
