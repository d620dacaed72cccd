//! Markdown to HTML conversion.
//!
//! Thin wrapper over `pulldown-cmark` with the GitHub-flavored extensions
//! issue authors expect. Raw HTML (including substituted `!vml-` payloads)
//! passes through unescaped.

use pulldown_cmark::{Options, Parser, html};

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

pub fn to_html(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(markdown, options()));
    out
}
