//! Bucket assignment for normalized articles.
//!
//! Every article lands in exactly one [`Bucket`]. Rules are evaluated per
//! article in input order, first match wins:
//!
//! 1. a `special.pin_labels` label: pin candidate
//! 2. a `special.top_labels` label: tagged-top candidate
//! 3. a `special.tags` label: special
//! 4. otherwise: ordinary
//!
//! With `special.top = true` pin and top candidates are collapsed into the
//! special bucket. Otherwise the first `special.max_pinned` pin candidates
//! are pinned and the rest are demoted to ordinary with a warning.
//!
//! Display order of the home page list is pinned, tagged-top, ordinary, each
//! group keeping input order. The special bucket is shown separately; when it
//! is empty and `[special.view]` is configured, one synthetic static-view
//! card fills it.
//!
//! Floating-menu links resolve against the display order, using the labels
//! as they were before control labels are stripped for display.

use crate::article::{Article, is_placeholder};
use crate::config::{MenuEntry, SiteConfig, SpecialConfig, StaticViewConfig};
use crate::types::{MenuLink, StaticView};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Bucket {
    Pinned,
    TaggedTop,
    Special,
    Ordinary,
}

/// An article with its bucket. Both are fixed once classification is done.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    bucket: Bucket,
    article: Article,
}

impl Classified {
    pub fn bucket(&self) -> Bucket {
        self.bucket
    }

    pub fn article(&self) -> &Article {
        &self.article
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpecialEntry {
    Article(Classified),
    View(StaticView),
}

#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Pinned, then tagged-top, then ordinary.
    pub articles: Vec<Classified>,
    pub specials: Vec<SpecialEntry>,
    pub menu: Vec<MenuLink>,
    /// Human-readable notes about demoted pins.
    pub warnings: Vec<String>,
}

impl Classification {
    /// Every article-backed entry, list articles first, then specials.
    pub fn all_articles(&self) -> impl Iterator<Item = &Classified> {
        self.articles.iter().chain(self.specials.iter().filter_map(|s| match s {
            SpecialEntry::Article(c) => Some(c),
            SpecialEntry::View(_) => None,
        }))
    }

    pub fn count(&self, bucket: Bucket) -> usize {
        self.all_articles().filter(|c| c.bucket == bucket).count()
    }

    pub fn has_static_view(&self) -> bool {
        self.specials.iter().any(|s| matches!(s, SpecialEntry::View(_)))
    }
}

pub fn classify(articles: Vec<Article>, config: &SiteConfig, today: NaiveDate) -> Classification {
    let special = &config.special;
    let mut pinned = Vec::new();
    let mut top = Vec::new();
    let mut specials = Vec::new();
    let mut ordinary = Vec::new();
    let mut warnings = Vec::new();

    for article in articles {
        let is_pin = article.has_any_tag(&special.pin_labels);
        let is_top = !is_pin && article.has_any_tag(&special.top_labels);

        if (is_pin || is_top) && special.top {
            specials.push(article);
        } else if is_pin {
            if pinned.len() < special.max_pinned {
                pinned.push(article);
            } else {
                let message = format!(
                    "issue #{} is pinned but only {} pinned article(s) are allowed; listing it as ordinary",
                    article.number, special.max_pinned
                );
                warn!("{}", message);
                warnings.push(message);
                ordinary.push(article);
            }
        } else if is_top {
            top.push(article);
        } else if article.has_any_tag(&special.tags) {
            specials.push(article);
        } else {
            ordinary.push(article);
        }
    }

    let display: Vec<(Bucket, Article)> = pinned
        .into_iter()
        .map(|a| (Bucket::Pinned, a))
        .chain(top.into_iter().map(|a| (Bucket::TaggedTop, a)))
        .chain(ordinary.into_iter().map(|a| (Bucket::Ordinary, a)))
        .collect();

    let menu = resolve_menu(&config.floating_menu, display.iter().map(|(_, a)| a));

    let mut special_entries: Vec<SpecialEntry> = specials
        .into_iter()
        .map(|a| {
            SpecialEntry::Article(Classified {
                bucket: Bucket::Special,
                article: present(a, config),
            })
        })
        .collect();
    if special_entries.is_empty()
        && let Some(view) = &special.view
    {
        special_entries.push(SpecialEntry::View(static_view(view, today)));
    }

    let articles = display
        .into_iter()
        .map(|(bucket, a)| Classified {
            bucket,
            article: present(a, config),
        })
        .collect();

    Classification {
        articles,
        specials: special_entries,
        menu,
        warnings,
    }
}

/// Display-time adjustments: blank placeholder titles, hide control labels.
fn present(mut article: Article, config: &SiteConfig) -> Article {
    if is_placeholder(&article.title, &config.article.placeholder_title) {
        article.title.clear();
    }
    if config.article.strip_control_labels {
        article.tags.retain(|tag| !is_control_label(&config.special, tag));
    }
    article
}

fn is_control_label(special: &SpecialConfig, tag: &str) -> bool {
    special.control_labels().any(|label| label == tag)
}

/// Resolve each menu entry to the first article carrying its tag.
pub fn resolve_menu<'a>(
    entries: &[MenuEntry],
    articles: impl Iterator<Item = &'a Article> + Clone,
) -> Vec<MenuLink> {
    entries
        .iter()
        .map(|entry| MenuLink {
            tag: entry.tag.clone(),
            display: entry.display.clone(),
            url: articles
                .clone()
                .find(|a| a.tags.iter().any(|t| *t == entry.tag))
                .map(|a| a.url.clone()),
        })
        .collect()
}

fn static_view(view: &StaticViewConfig, today: NaiveDate) -> StaticView {
    StaticView {
        title: view.title.clone(),
        since: view.since.clone(),
        running_days: view.since_date().map(|since| (today - since).num_days()),
        items: view.items.clone(),
    }
}
