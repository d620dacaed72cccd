//! `!vml-` inline directives.
//!
//! Issue bodies are Markdown, which escapes or reflows most hand-written
//! HTML. A line starting with `!vml-` opts out: everything after the prefix
//! up to the end of the line is emitted verbatim as HTML.
//!
//! ```text
//! !vml-<span data-vertical="Notes">A short teaser<br>on two lines</span>
//! Regular *markdown* continues here.
//! !vml-<div class="callout">Raw HTML block</div>
//! ```
//!
//! The first directive doubles as the article summary when its payload holds
//! a tagged element: the element's text becomes the teaser (one line per
//! `<br>`), and a `data-vertical` attribute overrides the vertical title.
//!
//! Rules:
//! - A directive is a single line; leading whitespace before `!vml-` is
//!   allowed. Directives never span lines.
//! - Every directive is substituted; only the first is read as a summary.
//! - An empty payload substitutes to an empty line.
//! - A body without directives passes through untouched.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

pub const DIRECTIVE_PREFIX: &str = "!vml-";

static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<([A-Za-z][A-Za-z0-9-]*)(\s[^<>]*)?>").expect("open tag regex")
});

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("line break regex"));

static VERTICAL_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"data-vertical\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("vertical attr regex")
});

/// Teaser extracted from the first directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Plain-text teaser lines, never empty.
    pub lines: Vec<String>,
    /// `data-vertical` attribute of the summary element, if any.
    pub vertical: Option<String>,
}

/// A body with its directives resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBody<'a> {
    /// Body with each directive line replaced by its payload.
    pub body: Cow<'a, str>,
    /// `None` when there is no directive or the first one has no tagged element.
    pub summary: Option<Summary>,
    pub directive_count: usize,
}

/// Payload of a directive line, or `None` for ordinary lines.
fn directive_payload(line: &str) -> Option<&str> {
    let payload = line.trim_start().strip_prefix(DIRECTIVE_PREFIX)?;
    Some(payload.strip_suffix('\r').unwrap_or(payload))
}

/// Payloads of every directive in `body`, in order.
pub fn directives(body: &str) -> impl Iterator<Item = &str> {
    body.lines().filter_map(directive_payload)
}

/// Replace every directive line with its payload.
pub fn substitute(body: &str) -> Cow<'_, str> {
    if directives(body).next().is_none() {
        return Cow::Borrowed(body);
    }

    let mut out = String::with_capacity(body.len());
    for segment in body.split_inclusive('\n') {
        let (line, newline) = match segment.strip_suffix('\n') {
            Some(line) => (line, "\n"),
            None => (segment, ""),
        };
        match directive_payload(line) {
            Some(payload) => out.push_str(payload),
            None => out.push_str(line),
        }
        out.push_str(newline);
    }
    Cow::Owned(out)
}

/// Read the summary from the first directive of `body`.
pub fn extract_summary(body: &str) -> Option<Summary> {
    directives(body).next().and_then(parse_summary)
}

/// Resolve every directive of `body` in one pass.
pub fn parse(body: &str) -> ParsedBody<'_> {
    ParsedBody {
        summary: extract_summary(body),
        directive_count: directives(body).count(),
        body: substitute(body),
    }
}

/// Interpret a directive payload as a tagged element and read its text.
fn parse_summary(payload: &str) -> Option<Summary> {
    let open = OPEN_TAG.captures(payload)?;
    let whole = open.get(0)?;
    let name = open.get(1)?.as_str();
    let attrs = open.get(2).map(|m| m.as_str()).unwrap_or_default();
    if attrs.trim_end().ends_with('/') {
        return None;
    }

    let inner_start = whole.end();
    let inner_end = inner_start + matching_close(&payload[inner_start..], name)?;
    let inner = &payload[inner_start..inner_end];

    let lines: Vec<String> = LINE_BREAK
        .split(inner)
        .map(|part| strip_tags(part).trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return None;
    }

    let vertical = VERTICAL_ATTR.captures(attrs).and_then(|c| {
        c.get(1)
            .or_else(|| c.get(2))
            .map(|m| m.as_str().trim().to_string())
            .filter(|v| !v.is_empty())
    });

    Some(Summary { lines, vertical })
}

/// Offset of the `</name>` that closes an element whose content starts at
/// `rest`, accounting for nested elements with the same name.
fn matching_close(rest: &str, name: &str) -> Option<usize> {
    let lower = rest.to_ascii_lowercase();
    let name = name.to_ascii_lowercase();
    let open = format!("<{name}");
    let close = format!("</{name}>");

    let mut depth = 0usize;
    let mut pos = 0;
    loop {
        let next_close = lower[pos..].find(&close)? + pos;
        let next_open = lower[pos..]
            .match_indices(&open)
            .map(|(i, _)| i + pos)
            .find(|&i| {
                lower[i + open.len()..]
                    .chars()
                    .next()
                    .is_some_and(|c| c == '>' || c.is_whitespace())
            });
        match next_open {
            Some(o) if o < next_close => {
                depth += 1;
                pos = o + open.len();
            }
            _ if depth == 0 => return Some(next_close),
            _ => {
                depth -= 1;
                pos = next_close + close.len();
            }
        }
    }
}

/// Strip HTML tags from a string (simple angle-bracket stripping).
pub fn strip_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(c),
            _ => {}
        }
    }
    result
}
