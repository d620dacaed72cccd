//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Build
//!
//! ```text
//! Issues: 14 fetched (live), 1 pull request ignored, 1 skipped
//! Articles: 12 (1 pinned, 2 top, 1 special, 8 ordinary)
//! Menu: 3 links, 1 unresolved
//! Pages: 10 cached, 2 rendered (12 total)
//!     rendered 7, 15
//!     removed 4
//! Home → index.html
//! Data → data.json
//! Static: 3 files
//!
//! Warnings
//!     issue #9 is pinned but only 1 pinned article(s) are allowed; ...
//!
//! Wrote 17 files, 0 errors
//! ```
//!
//! ## Check
//!
//! ```text
//! Config: config.toml
//!     Blog: My Blog
//!     Render: jinja
//! Templates
//!     home.html: ok
//!     article.html: missing
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::config::{RenderStrategy, SiteConfig};
use crate::pipeline::BuildReport;
use crate::source::IssueOrigin;
use std::path::{Path, PathBuf};

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, one: &str, many: &str) -> String {
    if n == 1 {
        format!("{n} {one}")
    } else {
        format!("{n} {many}")
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_report(report: &BuildReport, home: &Path, data: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    let origin = match report.origin {
        IssueOrigin::Live => "live",
        IssueOrigin::Snapshot => "snapshot",
    };
    let mut issues = format!("Issues: {} fetched ({})", report.fetched, origin);
    if report.pull_requests > 0 {
        issues.push_str(&format!(
            ", {} ignored",
            plural(report.pull_requests, "pull request", "pull requests")
        ));
    }
    if !report.skipped.is_empty() {
        issues.push_str(&format!(", {} skipped", report.skipped.len()));
    }
    lines.push(issues);

    lines.push(format!(
        "Articles: {} ({} pinned, {} top, {} special, {} ordinary)",
        report.articles, report.pinned, report.tagged_top, report.special, report.ordinary
    ));
    if report.static_view {
        lines.push("Special: static view".to_string());
    }
    if report.menu_links > 0 {
        let mut menu = format!("Menu: {}", plural(report.menu_links, "link", "links"));
        if report.menu_unresolved > 0 {
            menu.push_str(&format!(", {} unresolved", report.menu_unresolved));
        }
        lines.push(menu);
    }

    lines.push(format!("Pages: {}", report.pages));
    if !report.rendered.is_empty() {
        lines.push(format!("{}rendered {}", indent(1), report.rendered.join(", ")));
    }
    if !report.removed.is_empty() {
        lines.push(format!("{}removed {}", indent(1), report.removed.join(", ")));
    }

    if report.home_written {
        lines.push(format!("Home \u{2192} {}", file_name(home)));
    }
    if report.data_written {
        lines.push(format!("Data \u{2192} {}", file_name(data)));
    }
    if report.static_files > 0 {
        lines.push(format!(
            "Static: {}",
            plural(report.static_files, "file", "files")
        ));
    }

    let notes: Vec<&String> = report.skipped.iter().chain(&report.warnings).collect();
    if !notes.is_empty() {
        lines.push(String::new());
        lines.push("Warnings".to_string());
        for note in notes {
            lines.push(format!("{}{}", indent(1), note));
        }
    }
    if !report.errors.is_empty() {
        lines.push(String::new());
        lines.push("Errors".to_string());
        for error in &report.errors {
            lines.push(format!("{}{}", indent(1), error));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Wrote {}, {}",
        plural(report.files_written, "file", "files"),
        plural(report.errors.len(), "error", "errors")
    ));
    lines
}

/// Print the build summary to stdout.
pub fn print_build_report(report: &BuildReport, home: &Path, data: &Path) {
    for line in format_build_report(report, home, data) {
        println!("{}", line);
    }
}

// ============================================================================
// Check
// ============================================================================

pub fn format_check_output(
    config_path: &Path,
    config: &SiteConfig,
    templates: &[(PathBuf, bool)],
) -> Vec<String> {
    let mut lines = vec![format!("Config: {}", config_path.display())];
    lines.push(format!("{}Blog: {}", indent(1), config.blog.name));
    let strategy = match config.render.strategy {
        RenderStrategy::Jinja => "jinja",
        RenderStrategy::Placeholder => "placeholder",
    };
    lines.push(format!("{}Render: {}", indent(1), strategy));
    if !config.floating_menu.is_empty() {
        lines.push(format!(
            "{}Menu: {}",
            indent(1),
            plural(config.floating_menu.len(), "entry", "entries")
        ));
    }

    lines.push("Templates".to_string());
    for (path, found) in templates {
        lines.push(format!(
            "{}{}: {}",
            indent(1),
            file_name(path),
            if *found { "ok" } else { "missing" }
        ));
    }
    lines
}

/// Print the `check` result to stdout.
pub fn print_check_output(config_path: &Path, config: &SiteConfig, templates: &[(PathBuf, bool)]) {
    for line in format_check_output(config_path, config, templates) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStats;
    use crate::config::parse_config;
    use crate::test_helpers::minimal_config_toml;

    fn report() -> BuildReport {
        BuildReport {
            origin: IssueOrigin::Live,
            fetched: 4,
            pull_requests: 1,
            skipped: Vec::new(),
            articles: 3,
            pinned: 1,
            tagged_top: 0,
            special: 0,
            ordinary: 2,
            static_view: false,
            menu_links: 0,
            menu_unresolved: 0,
            pages: CacheStats {
                hits: 2,
                rendered: 1,
                failed: 0,
            },
            rendered: vec!["7".into()],
            removed: Vec::new(),
            home_written: true,
            data_written: true,
            static_files: 0,
            files_written: 3,
            warnings: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn paths() -> (PathBuf, PathBuf) {
        (PathBuf::from("docs/index.html"), PathBuf::from("docs/data.json"))
    }

    // =========================================================================
    // Build
    // =========================================================================

    #[test]
    fn clean_build_summary() {
        let (home, data) = paths();
        let lines = format_build_report(&report(), &home, &data);
        assert_eq!(
            lines,
            vec![
                "Issues: 4 fetched (live), 1 pull request ignored",
                "Articles: 3 (1 pinned, 0 top, 0 special, 2 ordinary)",
                "Pages: 2 cached, 1 rendered (3 total)",
                "    rendered 7",
                "Home \u{2192} index.html",
                "Data \u{2192} data.json",
                "",
                "Wrote 3 files, 0 errors",
            ]
        );
    }

    #[test]
    fn snapshot_origin_and_skips_shown() {
        let (home, data) = paths();
        let mut r = report();
        r.origin = IssueOrigin::Snapshot;
        r.skipped = vec!["issue #3 has no title".into()];
        let lines = format_build_report(&r, &home, &data);
        assert_eq!(lines[0], "Issues: 4 fetched (snapshot), 1 pull request ignored, 1 skipped");
        assert!(lines.contains(&"Warnings".to_string()));
        assert!(lines.contains(&"    issue #3 has no title".to_string()));
    }

    #[test]
    fn errors_listed_and_counted() {
        let (home, data) = paths();
        let mut r = report();
        r.home_written = false;
        r.errors = vec!["home page: template not found: template/home.html".into()];
        let lines = format_build_report(&r, &home, &data);
        assert!(!lines.iter().any(|l| l.starts_with("Home")));
        assert!(lines.contains(&"Errors".to_string()));
        assert_eq!(lines.last().unwrap(), "Wrote 3 files, 1 error");
    }

    #[test]
    fn menu_and_static_view_lines() {
        let (home, data) = paths();
        let mut r = report();
        r.static_view = true;
        r.menu_links = 3;
        r.menu_unresolved = 1;
        r.static_files = 1;
        let lines = format_build_report(&r, &home, &data);
        assert!(lines.contains(&"Special: static view".to_string()));
        assert!(lines.contains(&"Menu: 3 links, 1 unresolved".to_string()));
        assert!(lines.contains(&"Static: 1 file".to_string()));
    }

    // =========================================================================
    // Check
    // =========================================================================

    #[test]
    fn check_output_lists_templates() {
        let config = parse_config(minimal_config_toml()).unwrap();
        let lines = format_check_output(
            Path::new("config.toml"),
            &config,
            &[
                (PathBuf::from("template/home.html"), true),
                (PathBuf::from("template/article.html"), false),
            ],
        );
        assert_eq!(
            lines,
            vec![
                "Config: config.toml",
                "    Blog: Test Blog",
                "    Render: jinja",
                "Templates",
                "    home.html: ok",
                "    article.html: missing",
            ]
        );
    }
}
