//! Shared test utilities for the valog test suite.
//!
//! Builders for the records each stage consumes, so unit tests can start
//! from a realistic value and override only the fields they care about.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let mut raw = issue(12, "Hello", "!vml-<span>Teaser</span>", &["rust"]);
//! raw.updated_at = "2024-02-01T00:00:00Z".into();
//!
//! let a = article(3, &["pinned"]);
//! assert_eq!(a.url, "article/3.html");
//! ```

use crate::article::{Article, accent_for};
use crate::layout::{ARTICLE_TEMPLATE, HOME_TEMPLATE, Layout};
use crate::source::{Label, RawIssue};

// =========================================================================
// Config
// =========================================================================

/// The smallest valid `config.toml`: just the required `[blog]` table.
pub fn minimal_config_toml() -> &'static str {
    "[blog]\nname = \"Test Blog\"\ndescription = \"A blog for tests\"\n"
}

// =========================================================================
// Records
// =========================================================================

/// An open issue created 2024-01-15 and updated the next day.
pub fn issue(number: u64, title: &str, body: &str, labels: &[&str]) -> RawIssue {
    RawIssue {
        number: Some(number),
        title: Some(title.to_string()),
        body: Some(body.to_string()),
        created_at: "2024-01-15T08:30:00Z".to_string(),
        updated_at: "2024-01-16T09:00:00Z".to_string(),
        labels: labels
            .iter()
            .map(|name| Label {
                name: name.to_string(),
            })
            .collect(),
        html_url: Some(format!("https://github.com/owner/blog/issues/{number}")),
        pull_request: None,
    }
}

/// A normalized article titled `Article <number>`, as the normalizer would
/// produce it with the default config.
pub fn article(number: u64, tags: &[&str]) -> Article {
    let id = number.to_string();
    Article {
        url: format!("article/{id}.html"),
        number,
        title: format!("Article {number}"),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        vertical_title: tags
            .first()
            .map(|t| t.chars().take(4).collect())
            .unwrap_or_else(|| "Blog".to_string()),
        date: "2024-01-15".to_string(),
        summary: vec!["no summary".to_string()],
        html: format!("<p>Body of {number}</p>\n"),
        preview: vec![format!("<p>Body of {number}</p>")],
        issue_url: None,
        accent: accent_for(number as usize),
        marker: "2024-01-16T09:00:00Z".to_string(),
        raw_body: format!("Body of {number}"),
        id,
    }
}

// =========================================================================
// Templates
// =========================================================================

/// Write small Jinja templates for both pages into the layout's template
/// directory.
pub fn write_templates(layout: &Layout) {
    std::fs::create_dir_all(&layout.templates_dir).unwrap();
    std::fs::write(
        layout.template(HOME_TEMPLATE),
        "<h1>{{ blog.name }}</h1>{% for a in articles %}<a href=\"{{ a.url }}\">{{ a.title }}</a>{% endfor %}",
    )
    .unwrap();
    std::fs::write(
        layout.template(ARTICLE_TEMPLATE),
        "<h1>{{ article.title }}</h1>{{ article.content }}",
    )
    .unwrap();
}
