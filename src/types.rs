//! Shared records handed to templates and written to the data file.
//!
//! The home page, the detail pages and `data.json` all see articles through
//! one of two projections:
//!
//! - [`ArticleCard`]: home page. Carries the short `preview` chunks.
//! - [`ArticlePage`]: detail page. Carries the full rendered `content`.
//!
//! Keeping them as separate types means a template can never receive the
//! wrong body by accident.

use crate::article::{Accent, Article};
use crate::classify::Bucket;
use crate::config::{BlogConfig, ThemeConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Floating-menu entry resolved against the article list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuLink {
    pub tag: String,
    pub display: String,
    /// URL of the first article carrying `tag`; `null` when none does.
    pub url: Option<String>,
}

/// Synthetic special card built from `[special.view]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    /// Days elapsed since `since`, counted against the build date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running_days: Option<i64>,
    #[serde(default)]
    pub items: BTreeMap<String, String>,
}

/// Home page projection of an article.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleCard {
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub vertical_title: String,
    pub date: String,
    pub summary: Vec<String>,
    pub preview: Vec<String>,
    pub url: String,
    pub accent: Accent,
    pub bucket: Bucket,
}

impl ArticleCard {
    pub fn new(article: &Article, bucket: Bucket) -> Self {
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            tags: article.tags.clone(),
            vertical_title: article.vertical_title.clone(),
            date: article.date.clone(),
            summary: article.summary.clone(),
            preview: article.preview.clone(),
            url: article.url.clone(),
            accent: article.accent,
            bucket,
        }
    }
}

/// Detail page projection of an article.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePage {
    pub id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub vertical_title: String,
    pub date: String,
    pub summary: Vec<String>,
    /// Full rendered body.
    pub content: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_url: Option<String>,
    pub accent: Accent,
    pub bucket: Bucket,
}

impl ArticlePage {
    pub fn new(article: &Article, bucket: Bucket) -> Self {
        Self {
            id: article.id.clone(),
            title: article.title.clone(),
            tags: article.tags.clone(),
            vertical_title: article.vertical_title.clone(),
            date: article.date.clone(),
            summary: article.summary.clone(),
            content: article.html.clone(),
            url: article.url.clone(),
            issue_url: article.issue_url.clone(),
            accent: article.accent,
            bucket,
        }
    }
}

/// One entry of the special section: either a real article or the
/// configured static view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SpecialCard {
    Article(ArticleCard),
    View(StaticView),
}

/// Everything the home page shows, also written verbatim to `data.json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteData<'a> {
    pub blog: &'a BlogConfig,
    pub theme: &'a ThemeConfig,
    pub articles: Vec<ArticleCard>,
    pub specials: Vec<SpecialCard>,
    pub menu_items: Vec<MenuLink>,
    /// Build date, `YYYY-MM-DD`.
    pub generated: String,
}

/// The part of a previous `data.json` needed for stale page cleanup.
#[derive(Debug, Default, Deserialize)]
pub struct PreviousSite {
    #[serde(default)]
    pub articles: Vec<PreviousArticle>,
    #[serde(default)]
    pub specials: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct PreviousArticle {
    pub id: String,
}

impl PreviousSite {
    /// Ids of every article listed in the previous run, specials included.
    pub fn ids(&self) -> Vec<String> {
        let special_ids = self.specials.iter().filter_map(|card| {
            (card.get("kind").and_then(|k| k.as_str()) == Some("article"))
                .then(|| card.get("id").and_then(|id| id.as_str()))
                .flatten()
                .map(String::from)
        });
        self.articles
            .iter()
            .map(|a| a.id.clone())
            .chain(special_ids)
            .collect()
    }
}
