//! Issue sources.
//!
//! The pipeline consumes a flat list of [`RawIssue`] records from an
//! [`IssueSource`]. Two sources exist:
//!
//! - [`GithubSource`]: the GitHub REST API, walked page by page.
//! - [`SnapshotSource`]: the `issues.json` snapshot written after the last
//!   successful live fetch (used by `--offline`).
//!
//! [`fetch_issues`] wraps a source with the fallback policy: a failed fetch
//! is logged and replaced by the snapshot; only a failed fetch with no
//! snapshot aborts the run.

use crate::config::SourceConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use ureq::Agent;

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

const USER_AGENT: &str = concat!("valog/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("cannot determine the GitHub repository; set [source].repository or GITHUB_REPOSITORY")]
    NoRepository,
    #[error("HTTP error: {status} - {body}")]
    Http { status: u16, body: String },
    #[error("request failed: {0}")]
    Request(#[from] ureq::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("issue snapshot not found: {0}")]
    SnapshotMissing(PathBuf),
    #[error("{cause}; no issue snapshot to fall back to")]
    NoFallback { cause: Box<SourceError> },
}

/// An issue as returned by the GitHub API. Only the fields the pipeline
/// reads are kept; everything else is ignored on deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawIssue {
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
    /// Present (non-null) only on pull requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
}

impl RawIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }

    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|l| l.name.as_str())
    }
}

/// Where the issue list of a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueOrigin {
    Live,
    Snapshot,
}

pub struct Fetched {
    pub issues: Vec<RawIssue>,
    pub origin: IssueOrigin,
}

/// A provider of the complete issue list for one run.
pub trait IssueSource {
    fn fetch(&self) -> Result<Vec<RawIssue>, SourceError>;

    /// Human-readable name for log lines.
    fn describe(&self) -> String;

    /// Live sources refresh the snapshot after a successful fetch.
    fn is_live(&self) -> bool {
        true
    }
}

/// GitHub REST API issue listing.
pub struct GithubSource {
    agent: Agent,
    api_url: String,
    repository: String,
    state: String,
    per_page: u32,
    token: Option<String>,
}

impl GithubSource {
    pub fn new(api_url: &str, repository: &str, state: &str, per_page: u32) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            api_url: api_url.trim_end_matches('/').to_string(),
            repository: repository.to_string(),
            state: state.to_string(),
            per_page,
            token: None,
        }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    /// Build a source from `[source]`, the environment and the git remote of
    /// `root`, in that order of precedence.
    pub fn from_config(config: &SourceConfig, root: &Path) -> Result<Self, SourceError> {
        let repository = config
            .repository
            .clone()
            .filter(|r| !r.trim().is_empty())
            .or_else(|| std::env::var("GITHUB_REPOSITORY").ok().filter(|r| !r.is_empty()))
            .or_else(|| origin_repository(root))
            .ok_or(SourceError::NoRepository)?;

        Ok(
            Self::new(&config.api_url, &repository, &config.state, config.per_page)
                .with_token(std::env::var("GITHUB_TOKEN").ok()),
        )
    }

    fn fetch_page(&self, page: u32) -> Result<Vec<RawIssue>, SourceError> {
        let url = format!("{}/repos/{}/issues", self.api_url, self.repository);
        let mut request = self
            .agent
            .get(&url)
            .query("state", self.state.as_str())
            .query("per_page", self.per_page.to_string())
            .query("page", page.to_string())
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            request = request.header("Authorization", &format!("token {token}"));
        }

        let response = request.call()?;
        let status = response.status().as_u16();
        let mut body_reader = response.into_body();

        if status >= 400 {
            let error_body = body_reader
                .read_to_string()
                .unwrap_or_else(|_| "(unable to read error body)".to_string());
            return Err(SourceError::Http {
                status,
                body: error_body.chars().take(200).collect(),
            });
        }

        Ok(body_reader.read_json()?)
    }
}

impl IssueSource for GithubSource {
    fn fetch(&self) -> Result<Vec<RawIssue>, SourceError> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            info!("Fetching issues page {} of {}", page, self.repository);
            let issues = self.fetch_page(page)?;
            let count = issues.len();
            all.extend(issues);
            if count < self.per_page as usize {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    fn describe(&self) -> String {
        format!("GitHub {}", self.repository)
    }
}

/// Reads the snapshot written by the previous live fetch.
pub struct SnapshotSource {
    path: PathBuf,
}

impl SnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl IssueSource for SnapshotSource {
    fn fetch(&self) -> Result<Vec<RawIssue>, SourceError> {
        load_snapshot(&self.path)?.ok_or_else(|| SourceError::SnapshotMissing(self.path.clone()))
    }

    fn describe(&self) -> String {
        format!("snapshot {}", self.path.display())
    }

    fn is_live(&self) -> bool {
        false
    }
}

/// Fetch from `source`, falling back to the snapshot at `snapshot` on error.
///
/// A successful live fetch rewrites the snapshot. Failing to write it is
/// logged and otherwise ignored.
pub fn fetch_issues(source: &dyn IssueSource, snapshot: &Path) -> Result<Fetched, SourceError> {
    match source.fetch() {
        Ok(issues) => {
            let origin = if source.is_live() {
                if let Err(e) = save_snapshot(snapshot, &issues) {
                    warn!("Could not write issue snapshot {}: {}", snapshot.display(), e);
                }
                IssueOrigin::Live
            } else {
                IssueOrigin::Snapshot
            };
            Ok(Fetched { issues, origin })
        }
        Err(cause) => {
            warn!("Fetching from {} failed: {}", source.describe(), cause);
            match load_snapshot(snapshot) {
                Ok(Some(issues)) => {
                    warn!(
                        "Using {} cached issues from {}",
                        issues.len(),
                        snapshot.display()
                    );
                    Ok(Fetched {
                        issues,
                        origin: IssueOrigin::Snapshot,
                    })
                }
                Ok(None) => Err(SourceError::NoFallback {
                    cause: Box::new(cause),
                }),
                Err(e) => {
                    warn!("Issue snapshot {} is unreadable: {}", snapshot.display(), e);
                    Err(SourceError::NoFallback {
                        cause: Box::new(cause),
                    })
                }
            }
        }
    }
}

/// Drop pull requests. Returns the remaining issues and how many were dropped.
pub fn without_pull_requests(issues: Vec<RawIssue>) -> (Vec<RawIssue>, usize) {
    let before = issues.len();
    let kept: Vec<RawIssue> = issues.into_iter().filter(|i| !i.is_pull_request()).collect();
    let dropped = before - kept.len();
    (kept, dropped)
}

pub fn save_snapshot(path: &Path, issues: &[RawIssue]) -> Result<(), SourceError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(issues)?;
    fs::write(path, json)?;
    Ok(())
}

/// `Ok(None)` when no snapshot exists.
pub fn load_snapshot(path: &Path) -> Result<Option<Vec<RawIssue>>, SourceError> {
    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&content)?))
}

/// `owner/name` of the `origin` remote, when it points at GitHub.
fn origin_repository(root: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["remote", "get-url", "origin"])
        .current_dir(root)
        .output()
        .ok()
        .filter(|o| o.status.success())?;
    parse_github_remote(String::from_utf8_lossy(&output.stdout).trim())
}

/// Extract `owner/name` from an https or ssh GitHub remote URL.
pub fn parse_github_remote(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("https://github.com/")
        .or_else(|| url.strip_prefix("http://github.com/"))
        .or_else(|| url.strip_prefix("git@github.com:"))
        .or_else(|| url.strip_prefix("ssh://git@github.com/"))?;
    let rest = rest.trim_end_matches('/');
    let rest = rest.strip_suffix(".git").unwrap_or(rest);
    let mut parts = rest.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
            Some(format!("{owner}/{name}"))
        }
        _ => None,
    }
}
