//! Issue → [`Article`] normalization.
//!
//! Each non-pull-request [`RawIssue`] becomes one [`Article`]. The body goes
//! through the directive parser first, so `!vml-` payloads reach the
//! Markdown renderer as raw HTML. Two projections of the body are kept side
//! by side:
//!
//! - `html`: the full rendered body, used by the detail page.
//! - `preview`: a short list of chunks, used by the home page. Chunks are
//!   the blank-line separated blocks of the source, rendered one by one and
//!   capped by `[preview]`.
//!
//! ## Vertical title resolution
//!
//! First available wins:
//!
//! 1. `data-vertical` on the summary directive (used as-is)
//! 2. first tag that is not a control label (pin, top, special), truncated
//!    to `article.vertical_title_chars`
//! 3. title, truncated the same way (unless it is the placeholder keyword)
//! 4. `article.vertical_fallback`

use crate::config::{ArticleConfig, PreviewConfig, PreviewMode, SpecialConfig};
use crate::directive::{self, strip_tags};
use crate::layout::Layout;
use crate::markdown;
use crate::source::RawIssue;
use chrono::DateTime;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("issue has no number")]
    MissingId,
    #[error("issue #{0} has no title")]
    MissingTitle(u64),
    #[error("issue #{number} has an invalid creation time '{value}': {source}")]
    InvalidDate {
        number: u64,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Two-color gradient assigned by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Accent(pub &'static str, pub &'static str);

pub const PALETTE: [Accent; 5] = [
    Accent("#e74c3c", "#c0392b"),
    Accent("#3498db", "#2980b9"),
    Accent("#2ecc71", "#27ae60"),
    Accent("#9b59b6", "#8e44ad"),
    Accent("#1abc9c", "#16a085"),
];

pub fn accent_for(position: usize) -> Accent {
    PALETTE[position % PALETTE.len()]
}

/// A normalized issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Issue number as a string. Unique per run, used for file names.
    pub id: String,
    pub number: u64,
    pub title: String,
    /// Labels in issue order, deduplicated.
    pub tags: Vec<String>,
    pub vertical_title: String,
    pub date: String,
    pub summary: Vec<String>,
    /// Full rendered body (detail page projection).
    pub html: String,
    /// Rendered preview chunks (home page projection).
    pub preview: Vec<String>,
    /// Detail page URL relative to the home page.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_url: Option<String>,
    pub accent: Accent,
    /// Last-modified marker used by the build cache.
    pub marker: String,
    #[serde(skip)]
    pub raw_body: String,
}

impl Article {
    pub fn has_any_tag<'a>(&self, labels: impl IntoIterator<Item = &'a String>) -> bool {
        labels.into_iter().any(|l| self.tags.contains(l))
    }
}

/// Converts issues to articles, assigning accents by the number of articles
/// produced so far.
pub struct Normalizer<'a> {
    article: &'a ArticleConfig,
    preview: &'a PreviewConfig,
    special: &'a SpecialConfig,
    layout: &'a Layout,
    produced: usize,
}

impl<'a> Normalizer<'a> {
    pub fn new(
        article: &'a ArticleConfig,
        preview: &'a PreviewConfig,
        special: &'a SpecialConfig,
        layout: &'a Layout,
    ) -> Self {
        Self {
            article,
            preview,
            special,
            layout,
            produced: 0,
        }
    }

    pub fn normalize(&mut self, issue: &RawIssue) -> Result<Article, NormalizeError> {
        let number = issue
            .number
            .filter(|n| *n > 0)
            .ok_or(NormalizeError::MissingId)?;
        let title = issue
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(NormalizeError::MissingTitle(number))?;
        let created = DateTime::parse_from_rfc3339(&issue.created_at).map_err(|source| {
            NormalizeError::InvalidDate {
                number,
                value: issue.created_at.clone(),
                source,
            }
        })?;

        let mut tags: Vec<String> = Vec::new();
        for label in issue.label_names() {
            if !tags.iter().any(|t| t == label) {
                tags.push(label.to_string());
            }
        }

        let raw_body = issue.body.clone().unwrap_or_default();
        let (html, preview, parsed_summary) = {
            let parsed = directive::parse(&raw_body);
            let html = markdown::to_html(&parsed.body);
            let preview = preview_chunks(&parsed.body, &html, self.preview);
            (html, preview, parsed.summary)
        };

        let (summary, explicit_vertical) = match parsed_summary {
            Some(s) => (s.lines, s.vertical),
            None => (self.article.summary_fallback.clone(), None),
        };

        let title_for_vertical = (!is_placeholder(title, &self.article.placeholder_title))
            .then_some(title);
        let first_tag = tags
            .iter()
            .map(String::as_str)
            .find(|tag| !self.special.control_labels().any(|label| label == *tag));
        let vertical_title = vertical_title(
            explicit_vertical.as_deref(),
            first_tag,
            title_for_vertical,
            self.article,
        );

        let marker = if issue.updated_at.is_empty() {
            issue.created_at.clone()
        } else {
            issue.updated_at.clone()
        };

        let id = number.to_string();
        let article = Article {
            url: self.layout.article_url(&id),
            id,
            number,
            title: title.to_string(),
            tags,
            vertical_title,
            date: created.format(&self.article.date_format).to_string(),
            summary,
            html,
            preview,
            issue_url: issue.html_url.clone(),
            accent: accent_for(self.produced),
            marker,
            raw_body,
        };
        self.produced += 1;
        Ok(article)
    }
}

/// Case-insensitive match against the placeholder keyword. An empty keyword
/// never matches.
pub fn is_placeholder(title: &str, keyword: &str) -> bool {
    !keyword.is_empty() && title.trim().eq_ignore_ascii_case(keyword.trim())
}

fn vertical_title(
    explicit: Option<&str>,
    first_tag: Option<&str>,
    title: Option<&str>,
    config: &ArticleConfig,
) -> String {
    explicit
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .or_else(|| {
            [first_tag, title]
                .into_iter()
                .flatten()
                .map(str::trim)
                .find(|s| !s.is_empty())
                .map(|s| truncate_chars(s, config.vertical_title_chars))
        })
        .unwrap_or_else(|| config.vertical_fallback.clone())
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Home page preview of a body. `source` is the directive-substituted
/// Markdown and `html` its full rendering.
pub fn preview_chunks(source: &str, html: &str, config: &PreviewConfig) -> Vec<String> {
    match config.mode {
        PreviewMode::Paragraphs => {
            let mut chunks: Vec<String> = split_blocks(source)
                .iter()
                .map(|block| markdown::to_html(block).trim().to_string())
                .filter(|chunk| !chunk.is_empty())
                .take(config.max_paragraphs)
                .collect();
            if chunks.is_empty() {
                chunks.push(html.trim().to_string());
            }
            chunks
        }
        PreviewMode::Chars => {
            let text = strip_tags(html)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            if text.chars().count() > config.max_chars {
                vec![format!("{}...", truncate_chars(&text, config.max_chars))]
            } else {
                vec![text]
            }
        }
    }
}

/// Split Markdown into blank-line separated blocks. Fenced code blocks are
/// never split.
fn split_blocks(source: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in source.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }
        if !in_fence && line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }
    blocks
}
