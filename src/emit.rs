//! Page emitter.
//!
//! Turns a [`Classification`] into files under the output directory:
//!
//! ```text
//! docs/
//! ├── index.html          # home template, every run
//! ├── data.json           # SiteData, every run
//! ├── static/             # copied from <root>/static
//! └── article/
//!     └── <id>.html       # detail template, only when the cache says so
//! ```
//!
//! Raw issue bodies are archived as `<state>/<id>.md` alongside.
//!
//! Every write is a full overwrite; parent directories are created on
//! demand. Each function here produces one artifact and reports its own
//! error, so the pipeline can keep going when one output fails.

use crate::article::Article;
use crate::classify::{Classification, Classified, SpecialEntry};
use crate::config::SiteConfig;
use crate::layout::Layout;
use crate::render::{RenderError, Renderer, TemplateId};
use crate::types::{ArticleCard, ArticlePage, PreviousSite, SiteData, SpecialCard};
use serde_json::{Value, json};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum EmitError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot walk static directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Overwrite `path` with `contents`, creating parent directories.
pub fn write_file(path: &Path, contents: &str) -> Result<(), EmitError> {
    let write = || -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)
    };
    write().map_err(|source| EmitError::Write {
        path: path.to_path_buf(),
        source,
    })
}

// ============================================================================
// Contexts
// ============================================================================

/// Aggregate data set shown on the home page and written to `data.json`.
pub fn site_data<'a>(
    classification: &Classification,
    config: &'a SiteConfig,
    generated: &str,
) -> SiteData<'a> {
    SiteData {
        blog: &config.blog,
        theme: &config.theme,
        articles: classification
            .articles
            .iter()
            .map(|c| ArticleCard::new(c.article(), c.bucket()))
            .collect(),
        specials: classification
            .specials
            .iter()
            .map(|s| match s {
                SpecialEntry::Article(c) => SpecialCard::Article(ArticleCard::new(c.article(), c.bucket())),
                SpecialEntry::View(view) => SpecialCard::View(view.clone()),
            })
            .collect(),
        menu_items: classification.menu.clone(),
        generated: generated.to_string(),
    }
}

pub fn home_context(site: &SiteData) -> Result<Value, EmitError> {
    Ok(serde_json::to_value(site)?)
}

pub fn article_context(classified: &Classified, config: &SiteConfig) -> Value {
    json!({
        "article": ArticlePage::new(classified.article(), classified.bucket()),
        "blog": &config.blog,
        "theme": &config.theme,
    })
}

// ============================================================================
// Artifacts
// ============================================================================

/// Render and write one detail page. Returns the written path.
pub fn emit_article(
    renderer: &dyn Renderer,
    layout: &Layout,
    classified: &Classified,
    config: &SiteConfig,
) -> Result<PathBuf, EmitError> {
    let html = renderer.render(TemplateId::Article, &article_context(classified, config))?;
    let path = layout.article_page(&classified.article().id);
    write_file(&path, &html)?;
    debug!("Wrote {}", path.display());
    Ok(path)
}

/// Render and write the home page. Returns the written path.
pub fn emit_home(
    renderer: &dyn Renderer,
    layout: &Layout,
    site: &SiteData,
) -> Result<PathBuf, EmitError> {
    let html = renderer.render(TemplateId::Home, &home_context(site)?)?;
    let path = layout.home_page();
    write_file(&path, &html)?;
    Ok(path)
}

pub fn write_site_data(layout: &Layout, site: &SiteData) -> Result<PathBuf, EmitError> {
    let json = serde_json::to_string_pretty(site)?;
    write_file(&layout.data_file, &json)?;
    Ok(layout.data_file.clone())
}

/// Archive the raw issue body as `<state>/<id>.md`.
pub fn archive_markdown(layout: &Layout, article: &Article) -> Result<PathBuf, EmitError> {
    let path = layout.raw_markdown(&article.id);
    write_file(&path, &article.raw_body)?;
    Ok(path)
}

/// Copy `<root>/static` into `<output>/static`. Returns the number of files
/// copied; a missing source directory copies nothing.
pub fn copy_static(layout: &Layout) -> Result<usize, EmitError> {
    if !layout.static_source.is_dir() {
        debug!("No static directory at {}", layout.static_source.display());
        return Ok(0);
    }

    let mut copied = 0;
    for entry in WalkDir::new(&layout.static_source) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(&layout.static_source)
            .unwrap_or(entry.path());
        let target = layout.static_output.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            copied += 1;
        }
    }
    info!("Copied {} static file(s)", copied);
    Ok(copied)
}

/// Delete detail pages of articles listed in the previous `data.json` but
/// absent from `current`. Must run before the new data file is written.
/// Ids that are not issue numbers are ignored. Returns the removed ids.
pub fn remove_stale_pages<'a>(
    layout: &Layout,
    current: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let previous = match read_previous_site(&layout.data_file) {
        Ok(Some(previous)) => previous,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(
                "Cannot read previous data file {}: {}; skipping stale page cleanup",
                layout.data_file.display(),
                e
            );
            return Vec::new();
        }
    };

    let current: HashSet<&str> = current.into_iter().collect();
    let mut removed = Vec::new();
    for id in previous.ids() {
        if current.contains(id.as_str()) {
            continue;
        }
        if id.parse::<u64>().is_err() {
            warn!("Ignoring invalid article id '{}' in previous data file", id);
            continue;
        }
        let page = layout.article_page(&id);
        match fs::remove_file(&page) {
            Ok(()) => {
                info!("Removed stale page {}", page.display());
                removed.push(id);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => removed.push(id),
            Err(e) => warn!("Cannot remove stale page {}: {}", page.display(), e),
        }
    }
    removed
}

fn read_previous_site(path: &Path) -> Result<Option<PreviousSite>, EmitError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&content)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::config::{PathsConfig, parse_config};
    use crate::render::{PlaceholderRenderer, TemplateSet};
    use crate::test_helpers::{article, minimal_config_toml};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Layout, SiteConfig) {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::resolve(tmp.path(), &PathsConfig::default());
        let config = parse_config(&format!(
            "{}\n[special.view]\ntitle = \"About\"\n",
            minimal_config_toml()
        ))
        .unwrap();
        (tmp, layout, config)
    }

    fn classification(config: &SiteConfig) -> Classification {
        let mut first = article(1, &["rust"]);
        first.html = "<p>Full body</p>".into();
        first.preview = vec!["<p>Full</p>".into()];
        classify(
            vec![first, article(2, &[])],
            config,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
    }

    // =========================================================================
    // Contexts
    // =========================================================================

    #[test]
    fn detail_context_carries_full_body() {
        let (_tmp, _layout, config) = setup();
        let c = classification(&config);
        let ctx = article_context(&c.articles[0], &config);
        assert_eq!(ctx["article"]["content"], "<p>Full body</p>");
        assert_eq!(ctx["article"]["verticalTitle"], "rust");
        assert_eq!(ctx["blog"]["name"], config.blog.name);
        assert!(ctx["article"].get("preview").is_none());
    }

    #[test]
    fn home_context_carries_previews_specials_and_menu() {
        let (_tmp, _layout, config) = setup();
        let c = classification(&config);
        let site = site_data(&c, &config, "2024-01-01");
        let ctx = home_context(&site).unwrap();
        assert_eq!(ctx["articles"][0]["preview"][0], "<p>Full</p>");
        assert!(ctx["articles"][0].get("content").is_none());
        assert_eq!(ctx["specials"][0]["kind"], "view");
        assert!(ctx["menuItems"].as_array().unwrap().is_empty());
        assert_eq!(ctx["generated"], "2024-01-01");
    }

    // =========================================================================
    // Artifacts
    // =========================================================================

    #[test]
    fn article_page_written_under_articles_dir() {
        let (_tmp, layout, config) = setup();
        let c = classification(&config);
        let renderer = PlaceholderRenderer::new(TemplateSet::from_sources(&[(
            TemplateId::Article,
            "<title>{{ blog.name }}</title>{{ article.content }}",
        )]));

        let path = emit_article(&renderer, &layout, &c.articles[0], &config).unwrap();
        assert_eq!(path, layout.article_page("1"));
        let html = fs::read_to_string(path).unwrap();
        assert!(html.contains("<p>Full body</p>"));
    }

    #[test]
    fn missing_template_is_reported() {
        let (_tmp, layout, config) = setup();
        let c = classification(&config);
        let renderer = PlaceholderRenderer::new(TemplateSet::default());
        let err = emit_article(&renderer, &layout, &c.articles[0], &config).unwrap_err();
        assert!(matches!(err, EmitError::Render(RenderError::TemplateMissing(_))));
        assert!(!layout.article_page("1").exists());
    }

    #[test]
    fn home_and_data_file_written() {
        let (_tmp, layout, config) = setup();
        let c = classification(&config);
        let site = site_data(&c, &config, "2024-01-01");
        let renderer = PlaceholderRenderer::new(TemplateSet::from_sources(&[(
            TemplateId::Home,
            "<script>var data = {{ articles }};</script>",
        )]));

        emit_home(&renderer, &layout, &site).unwrap();
        write_site_data(&layout, &site).unwrap();

        let home = fs::read_to_string(layout.home_page()).unwrap();
        assert!(home.contains(r#""id":"1""#));
        let data: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&layout.data_file).unwrap()).unwrap();
        assert_eq!(data["articles"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn raw_markdown_archived() {
        let (_tmp, layout, _config) = setup();
        let mut a = article(5, &[]);
        a.raw_body = "# Raw\n!vml-<b>x</b>".into();
        let path = archive_markdown(&layout, &a).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "# Raw\n!vml-<b>x</b>");
    }

    #[test]
    fn static_files_copied_recursively() {
        let (tmp, layout, _config) = setup();
        fs::create_dir_all(tmp.path().join("static/css")).unwrap();
        fs::write(tmp.path().join("static/avatar.png"), "png").unwrap();
        fs::write(tmp.path().join("static/css/site.css"), "body{}").unwrap();

        assert_eq!(copy_static(&layout).unwrap(), 2);
        assert!(layout.static_output.join("avatar.png").exists());
        assert!(layout.static_output.join("css/site.css").exists());
    }

    #[test]
    fn missing_static_dir_copies_nothing() {
        let (_tmp, layout, _config) = setup();
        assert_eq!(copy_static(&layout).unwrap(), 0);
    }

    // =========================================================================
    // Stale cleanup
    // =========================================================================

    #[test]
    fn stale_pages_removed() {
        let (_tmp, layout, _config) = setup();
        write_file(
            &layout.data_file,
            r#"{"articles": [{"id": "1"}, {"id": "2"}], "specials": [{"kind": "article", "id": "3"}]}"#,
        )
        .unwrap();
        for id in ["1", "2", "3"] {
            write_file(&layout.article_page(id), "page").unwrap();
        }

        let removed = remove_stale_pages(&layout, ["1"]);
        assert_eq!(removed, vec!["2", "3"]);
        assert!(layout.article_page("1").exists());
        assert!(!layout.article_page("2").exists());
        assert!(!layout.article_page("3").exists());
    }

    #[test]
    fn stale_cleanup_ignores_non_numeric_ids() {
        let (_tmp, layout, _config) = setup();
        write_file(
            &layout.data_file,
            r#"{"articles": [{"id": "../index"}, {"id": "7"}], "specials": []}"#,
        )
        .unwrap();
        write_file(&layout.home_page(), "home").unwrap();
        write_file(&layout.article_page("7"), "page").unwrap();

        assert_eq!(remove_stale_pages(&layout, ["1"]), vec!["7"]);
        assert!(layout.home_page().exists());
    }

    #[test]
    fn stale_cleanup_without_previous_data_is_noop() {
        let (_tmp, layout, _config) = setup();
        assert!(remove_stale_pages(&layout, ["1"]).is_empty());
    }

    #[test]
    fn corrupt_previous_data_skips_cleanup() {
        let (_tmp, layout, _config) = setup();
        write_file(&layout.data_file, "not json").unwrap();
        write_file(&layout.article_page("9"), "page").unwrap();
        assert!(remove_stale_pages(&layout, ["1"]).is_empty());
        assert!(layout.article_page("9").exists());
    }
}
