//! Filesystem layout for one run.
//!
//! [`Layout`] is constructed once from the project root and `[paths]`, then
//! passed by reference to every stage that touches the disk. Nothing else in
//! the crate joins paths against the project root.
//!
//! ```text
//! <root>/
//! ├── config.toml
//! ├── template/
//! │   ├── home.html
//! │   └── article.html
//! ├── static/                   # copied to docs/static/
//! ├── O-MD/                     # state
//! │   ├── cache.json            # id → marker
//! │   ├── issues.json           # last successful fetch
//! │   └── 12.md                 # raw bodies
//! └── docs/                     # output
//!     ├── index.html
//!     ├── data.json
//!     ├── static/
//!     └── article/
//!         └── 12.html
//! ```

use crate::config::PathsConfig;
use std::path::{Path, PathBuf};

pub const HOME_TEMPLATE: &str = "home.html";
pub const ARTICLE_TEMPLATE: &str = "article.html";
pub const PAGE_EXTENSION: &str = "html";

const CACHE_FILENAME: &str = "cache.json";
const SNAPSHOT_FILENAME: &str = "issues.json";
const HOME_FILENAME: &str = "index.html";

#[derive(Debug, Clone)]
pub struct Layout {
    pub root: PathBuf,
    pub templates_dir: PathBuf,
    pub output_dir: PathBuf,
    pub articles_dir: PathBuf,
    pub static_source: PathBuf,
    pub static_output: PathBuf,
    pub state_dir: PathBuf,
    pub data_file: PathBuf,
    /// `[paths].articles`, used to build relative article URLs.
    articles_url_prefix: String,
}

impl Layout {
    pub fn resolve(root: &Path, paths: &PathsConfig) -> Self {
        let output_dir = root.join(&paths.output);
        Self {
            root: root.to_path_buf(),
            templates_dir: root.join(&paths.templates),
            articles_dir: output_dir.join(&paths.articles),
            static_source: root.join(&paths.static_dir),
            static_output: output_dir.join("static"),
            state_dir: root.join(&paths.state),
            data_file: output_dir.join(&paths.data_file),
            output_dir,
            articles_url_prefix: paths.articles.trim_matches('/').to_string(),
        }
    }

    pub fn home_page(&self) -> PathBuf {
        self.output_dir.join(HOME_FILENAME)
    }

    /// `<articles_dir>/<id>.html`
    pub fn article_page(&self, id: &str) -> PathBuf {
        self.articles_dir.join(format!("{id}.{PAGE_EXTENSION}"))
    }

    /// URL of a detail page relative to the home page.
    pub fn article_url(&self, id: &str) -> String {
        if self.articles_url_prefix.is_empty() {
            format!("{id}.{PAGE_EXTENSION}")
        } else {
            format!("{}/{id}.{PAGE_EXTENSION}", self.articles_url_prefix)
        }
    }

    pub fn template(&self, name: &str) -> PathBuf {
        self.templates_dir.join(name)
    }

    pub fn cache_file(&self) -> PathBuf {
        self.state_dir.join(CACHE_FILENAME)
    }

    pub fn snapshot_file(&self) -> PathBuf {
        self.state_dir.join(SNAPSHOT_FILENAME)
    }

    pub fn raw_markdown(&self, id: &str) -> PathBuf {
        self.state_dir.join(format!("{id}.md"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout() {
        let layout = Layout::resolve(Path::new("/blog"), &PathsConfig::default());
        assert_eq!(layout.home_page(), Path::new("/blog/docs/index.html"));
        assert_eq!(layout.article_page("12"), Path::new("/blog/docs/article/12.html"));
        assert_eq!(layout.article_url("12"), "article/12.html");
        assert_eq!(layout.data_file, Path::new("/blog/docs/data.json"));
        assert_eq!(layout.cache_file(), Path::new("/blog/O-MD/cache.json"));
        assert_eq!(layout.raw_markdown("12"), Path::new("/blog/O-MD/12.md"));
        assert_eq!(layout.template(HOME_TEMPLATE), Path::new("/blog/template/home.html"));
        assert_eq!(layout.static_output, Path::new("/blog/docs/static"));
    }

    #[test]
    fn article_url_without_prefix() {
        let paths = PathsConfig {
            articles: String::new(),
            ..PathsConfig::default()
        };
        let layout = Layout::resolve(Path::new("/blog"), &paths);
        assert_eq!(layout.article_url("7"), "7.html");
        assert_eq!(layout.article_page("7"), Path::new("/blog/docs/7.html"));
    }
}
