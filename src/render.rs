//! Template rendering.
//!
//! Every page goes through one abstraction: a [`Renderer`] maps a
//! [`TemplateId`] and a JSON context to a string. Two strategies exist,
//! selected by `[render].strategy`:
//!
//! | Strategy | Engine | Non-string values |
//! |----------|--------|-------------------|
//! | `jinja` | `minijinja`, full expressions, loops and filters | native |
//! | `placeholder` | literal `{{ dotted.path }}` replacement | inserted as JSON |
//!
//! Both strategies render undefined and null values as the empty string, so a
//! template never leaks an unresolved token. HTML is not auto-escaped:
//! article bodies are already HTML.
//!
//! Templates are read from disk once per run. A missing or unreadable
//! template only fails the outputs that use it
//! ([`RenderError::TemplateMissing`], [`RenderError::Unreadable`]).

use crate::config::RenderStrategy;
use crate::layout::{ARTICLE_TEMPLATE, HOME_TEMPLATE};
use minijinja::{AutoEscape, Environment, UndefinedBehavior, escape_formatter};
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("template not found: {}", .0.display())]
    TemplateMissing(PathBuf),
    #[error("template {} is unreadable: {message}", .path.display())]
    Unreadable { path: PathBuf, message: String },
    #[error("template {name} is invalid: {message}")]
    Invalid { name: &'static str, message: String },
    #[error("template error: {0}")]
    Jinja(#[from] minijinja::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateId {
    Home,
    Article,
}

impl TemplateId {
    pub const ALL: [TemplateId; 2] = [TemplateId::Home, TemplateId::Article];

    pub fn file_name(self) -> &'static str {
        match self {
            TemplateId::Home => HOME_TEMPLATE,
            TemplateId::Article => ARTICLE_TEMPLATE,
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A pure function from template and context to rendered text.
pub trait Renderer {
    fn render(&self, template: TemplateId, ctx: &Value) -> Result<String, RenderError>;
}

/// Template sources read from the templates directory.
///
/// A template that could not be read is remembered with its error, so only
/// the renders that need it fail.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    dir: PathBuf,
    sources: HashMap<TemplateId, Result<String, String>>,
}

impl TemplateSet {
    /// Read every known template under `dir`. Missing or unreadable files
    /// are not an error here; they surface when the template is rendered.
    pub fn load(dir: &Path) -> Self {
        let mut sources = HashMap::new();
        for id in TemplateId::ALL {
            match std::fs::read_to_string(dir.join(id.file_name())) {
                Ok(source) => {
                    sources.insert(id, Ok(source));
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    sources.insert(id, Err(e.to_string()));
                }
            }
        }
        Self {
            dir: dir.to_path_buf(),
            sources,
        }
    }

    #[cfg(test)]
    pub fn from_sources(sources: &[(TemplateId, &str)]) -> Self {
        Self {
            dir: PathBuf::from("template"),
            sources: sources
                .iter()
                .map(|(id, s)| (*id, Ok(s.to_string())))
                .collect(),
        }
    }

    pub fn path(&self, id: TemplateId) -> PathBuf {
        self.dir.join(id.file_name())
    }

    pub fn source(&self, id: TemplateId) -> Result<&str, RenderError> {
        match self.sources.get(&id) {
            Some(Ok(source)) => Ok(source),
            Some(Err(message)) => Err(RenderError::Unreadable {
                path: self.path(id),
                message: message.clone(),
            }),
            None => Err(RenderError::TemplateMissing(self.path(id))),
        }
    }

    /// Why each unusable template cannot be rendered.
    pub fn problems(&self) -> Vec<RenderError> {
        TemplateId::ALL
            .into_iter()
            .filter_map(|id| self.source(id).err())
            .collect()
    }
}

/// Build the renderer selected by `[render].strategy`.
pub fn renderer_for(strategy: RenderStrategy, templates: TemplateSet) -> Box<dyn Renderer> {
    match strategy {
        RenderStrategy::Jinja => Box::new(JinjaRenderer::new(templates)),
        RenderStrategy::Placeholder => Box::new(PlaceholderRenderer::new(templates)),
    }
}

// ============================================================================
// Jinja
// ============================================================================

pub struct JinjaRenderer {
    env: Environment<'static>,
    templates: TemplateSet,
    invalid: HashMap<TemplateId, String>,
}

impl JinjaRenderer {
    /// Compile every available template. A template with a syntax error is
    /// logged and fails only its own renders.
    pub fn new(templates: TemplateSet) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_formatter(|out, state, value| {
            if value.is_none() {
                Ok(())
            } else {
                escape_formatter(out, state, value)
            }
        });

        let mut invalid = HashMap::new();
        for id in TemplateId::ALL {
            let Ok(source) = templates.source(id) else {
                continue;
            };
            if let Err(e) = env.add_template_owned(id.file_name(), source.to_string()) {
                warn!("Template {} is invalid: {}", templates.path(id).display(), e);
                invalid.insert(id, e.to_string());
            }
        }

        Self {
            env,
            templates,
            invalid,
        }
    }
}

impl Renderer for JinjaRenderer {
    fn render(&self, template: TemplateId, ctx: &Value) -> Result<String, RenderError> {
        self.templates.source(template)?;
        if let Some(message) = self.invalid.get(&template) {
            return Err(RenderError::Invalid {
                name: template.file_name(),
                message: message.clone(),
            });
        }
        let tmpl = self.env.get_template(template.file_name())?;
        Ok(tmpl.render(ctx)?)
    }
}

// ============================================================================
// Placeholder substitution
// ============================================================================

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}\}").expect("placeholder regex")
});

/// Replaces `{{ path }}` tokens with values looked up in the context.
///
/// Strings are inserted as-is. Numbers, booleans, arrays and objects are
/// inserted as JSON with `</` escaped, so `{{ articles }}` can be assigned
/// to a script variable. Unresolved paths and `null` become empty.
pub struct PlaceholderRenderer {
    templates: TemplateSet,
}

impl PlaceholderRenderer {
    pub fn new(templates: TemplateSet) -> Self {
        Self { templates }
    }
}

impl Renderer for PlaceholderRenderer {
    fn render(&self, template: TemplateId, ctx: &Value) -> Result<String, RenderError> {
        let source = self.templates.source(template)?;
        Ok(substitute_placeholders(source, ctx))
    }
}

pub fn substitute_placeholders(source: &str, ctx: &Value) -> String {
    PLACEHOLDER
        .replace_all(source, |caps: &Captures| {
            lookup(ctx, &caps[1]).map(placeholder_text).unwrap_or_default()
        })
        .into_owned()
}

/// Walk a dotted path. Numeric segments index arrays.
fn lookup<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(ctx, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn placeholder_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string().replace("</", "<\\/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn ctx() -> Value {
        json!({
            "blog": {"name": "Notes", "description": "d"},
            "article": {"title": "Hello", "content": "<p>Body</p>", "tags": ["a", "b"]},
            "articles": [{"title": "x</script>"}],
            "count": 3,
            "missing": null
        })
    }

    // =========================================================================
    // Template set
    // =========================================================================

    #[test]
    fn load_reports_missing_templates() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(HOME_TEMPLATE), "home").unwrap();
        let set = TemplateSet::load(tmp.path());

        assert_eq!(set.source(TemplateId::Home).unwrap(), "home");
        assert_eq!(set.problems().len(), 1);
        assert!(matches!(
            set.source(TemplateId::Article),
            Err(RenderError::TemplateMissing(p)) if p == tmp.path().join(ARTICLE_TEMPLATE)
        ));
    }

    #[test]
    fn load_from_missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let set = TemplateSet::load(&tmp.path().join("nope"));
        assert_eq!(set.problems().len(), 2);
    }

    #[test]
    fn unreadable_template_fails_only_itself() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(HOME_TEMPLATE), "{{ blog.name }}").unwrap();
        std::fs::create_dir(tmp.path().join(ARTICLE_TEMPLATE)).unwrap();
        let set = TemplateSet::load(tmp.path());

        assert!(matches!(
            set.source(TemplateId::Article),
            Err(RenderError::Unreadable { path, .. }) if path == tmp.path().join(ARTICLE_TEMPLATE)
        ));
        let renderer = JinjaRenderer::new(set);
        assert_eq!(renderer.render(TemplateId::Home, &ctx()).unwrap(), "Notes");
        assert!(renderer.render(TemplateId::Article, &ctx()).is_err());
    }

    // =========================================================================
    // Jinja
    // =========================================================================

    #[test]
    fn jinja_renders_structured_context() {
        let set = TemplateSet::from_sources(&[(
            TemplateId::Article,
            "<h1>{{ article.title }}</h1>{{ article.content }}{% for t in article.tags %}[{{ t }}]{% endfor %}",
        )]);
        let out = JinjaRenderer::new(set).render(TemplateId::Article, &ctx()).unwrap();
        assert_eq!(out, "<h1>Hello</h1><p>Body</p>[a][b]");
    }

    #[test]
    fn jinja_undefined_renders_empty() {
        let set = TemplateSet::from_sources(&[(TemplateId::Home, "[{{ nothing.here }}][{{ missing }}]")]);
        let out = JinjaRenderer::new(set).render(TemplateId::Home, &ctx()).unwrap();
        assert_eq!(out, "[][]");
    }

    #[test]
    fn jinja_missing_template_fails_only_that_template() {
        let set = TemplateSet::from_sources(&[(TemplateId::Home, "{{ blog.name }}")]);
        let renderer = JinjaRenderer::new(set);
        assert_eq!(renderer.render(TemplateId::Home, &ctx()).unwrap(), "Notes");
        assert!(matches!(
            renderer.render(TemplateId::Article, &ctx()),
            Err(RenderError::TemplateMissing(_))
        ));
    }

    #[test]
    fn jinja_syntax_error_is_reported_per_template() {
        let set = TemplateSet::from_sources(&[
            (TemplateId::Home, "{{ blog.name }}"),
            (TemplateId::Article, "{% for %}"),
        ]);
        let renderer = JinjaRenderer::new(set);
        assert!(renderer.render(TemplateId::Home, &ctx()).is_ok());
        assert!(matches!(
            renderer.render(TemplateId::Article, &ctx()),
            Err(RenderError::Invalid { name: "article.html", .. })
        ));
    }

    // =========================================================================
    // Placeholder
    // =========================================================================

    #[test]
    fn placeholder_inserts_strings_raw() {
        let out = substitute_placeholders("<h1>{{article.title}}</h1>{{ article.content }}", &ctx());
        assert_eq!(out, "<h1>Hello</h1><p>Body</p>");
    }

    #[test]
    fn placeholder_inserts_json_for_structures() {
        let out = substitute_placeholders("var tags = {{ article.tags }}; var n = {{ count }};", &ctx());
        assert_eq!(out, r#"var tags = ["a","b"]; var n = 3;"#);
    }

    #[test]
    fn placeholder_escapes_closing_tags_in_json() {
        let out = substitute_placeholders("{{ articles }}", &ctx());
        assert_eq!(out, r#"[{"title":"x<\/script>"}]"#);
    }

    #[test]
    fn placeholder_indexes_arrays() {
        assert_eq!(substitute_placeholders("{{ article.tags.1 }}", &ctx()), "b");
    }

    #[test]
    fn placeholder_unresolved_becomes_empty() {
        let out = substitute_placeholders("[{{ nope }}][{{ blog.nope.deeper }}][{{ missing }}]", &ctx());
        assert_eq!(out, "[][][]");
    }

    #[test]
    fn placeholder_ignores_non_path_braces() {
        let out = substitute_placeholders("{{ 1 + 1 }} {{blog.name}}", &ctx());
        assert_eq!(out, "{{ 1 + 1 }} Notes");
    }

    #[test]
    fn strategy_selects_renderer() {
        let set = TemplateSet::from_sources(&[(
            TemplateId::Home,
            "{{ blog.name }}{% if count %}!{% endif %}",
        )]);
        let jinja = renderer_for(RenderStrategy::Jinja, set.clone());
        let placeholder = renderer_for(RenderStrategy::Placeholder, set);
        assert_eq!(jinja.render(TemplateId::Home, &ctx()).unwrap(), "Notes!");
        assert_eq!(
            placeholder.render(TemplateId::Home, &ctx()).unwrap(),
            "Notes{% if count %}!{% endif %}"
        );
    }
}
