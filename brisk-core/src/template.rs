use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tera::{Context, Tera};
use thiserror::Error;
use tracing::debug;

use crate::frontmatter::Frontmatter;
use crate::mustache;
use crate::partials::PartialRegistry;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found: '{name}' (looked for {})", .path.display())]
    NotFound { name: String, path: PathBuf },
    #[error("failed to compile template '{name}': {}", describe(.source))]
    Compile {
        name: String,
        #[source]
        source: tera::Error,
    },
    #[error("failed to render template '{name}': {}", describe(.source))]
    Render {
        name: String,
        #[source]
        source: tera::Error,
    },
    #[error("failed to read template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Tera keeps the useful part of a message (the missing include, the bad
/// token) in the source chain.
fn describe(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// The data a page template is rendered against.
///
/// Holds every frontmatter field at the top level plus the reserved
/// `content` (rendered HTML) and `frontmatter` (the raw mapping) keys.
/// Templates also see the whole context again as `this`, which is how keys
/// that are not identifiers (`og-image`) are reached.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    values: serde_json::Map<String, Value>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_page(frontmatter: &Frontmatter, content_html: &str) -> Self {
        let mut values = frontmatter.clone();
        // Reserved keys go in last so they win over same-named fields
        values.insert("content".to_string(), Value::String(content_html.to_string()));
        values.insert("frontmatter".to_string(), Value::Object(frontmatter.clone()));

        Self { values }
    }

    pub fn insert<K: Into<String>>(&mut self, key: K, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn to_tera(&self) -> Context {
        let mut context = Context::new();
        for (key, value) in &self.values {
            context.insert(key.as_str(), value);
        }
        context.insert(mustache::ROOT_KEY, &self.values);
        context
    }
}

/// Escapes `&<>"'` and leaves everything else, slashes included, as is.
fn escape_html(input: &str) -> String {
    html_escape::encode_quoted_attribute(input).into_owned()
}

/// A template language: templates and partials are compiled under a name and
/// rendered by name. Partials are includable from any template.
pub trait TemplateEngine {
    fn compile(&mut self, name: &str, source: &str) -> Result<(), TemplateError>;
    fn register_partial(&mut self, name: &str, source: &str) -> Result<(), TemplateError>;
    fn render(&self, name: &str, context: &RenderContext) -> Result<String, TemplateError>;
    fn has_template(&self, name: &str) -> bool;
}

/// [`TemplateEngine`] backed by Tera, accepting the mustache-style tags
/// handled by [`mustache::normalize`]. Output is HTML-escaped for every
/// template.
pub struct TeraEngine {
    tera: Tera,
}

impl Default for TeraEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TeraEngine {
    pub fn new() -> Self {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![""]);
        tera.set_escape_fn(escape_html);
        Self { tera }
    }

    fn add(&mut self, name: &str, source: &str) -> Result<(), TemplateError> {
        self.tera
            .add_raw_template(name, &mustache::normalize(source))
            .map_err(|source| TemplateError::Compile {
                name: name.to_string(),
                source,
            })
    }
}

impl TemplateEngine for TeraEngine {
    fn compile(&mut self, name: &str, source: &str) -> Result<(), TemplateError> {
        self.add(name, source)
    }

    fn register_partial(&mut self, name: &str, source: &str) -> Result<(), TemplateError> {
        self.add(name, source)
    }

    fn render(&self, name: &str, context: &RenderContext) -> Result<String, TemplateError> {
        self.tera
            .render(name, &context.to_tera())
            .map_err(|source| TemplateError::Render {
                name: name.to_string(),
                source,
            })
    }

    fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }
}

/// Finds page templates on disk by name and renders them.
///
/// `default` resolves to `<root>/default.<extension>`. Each template is read
/// and compiled the first time it is asked for; later renders reuse it.
pub struct TemplateResolver<E: TemplateEngine = TeraEngine> {
    engine: E,
    root: PathBuf,
    extension: String,
    compiled: HashSet<String>,
}

impl TemplateResolver<TeraEngine> {
    pub fn tera<P: AsRef<Path>>(root: P, extension: &str) -> Self {
        Self::new(TeraEngine::new(), root, extension)
    }
}

impl<E: TemplateEngine> TemplateResolver<E> {
    pub fn new<P: AsRef<Path>>(engine: E, root: P, extension: &str) -> Self {
        Self {
            engine,
            root: root.as_ref().to_path_buf(),
            extension: extension.trim_start_matches('.').to_string(),
            compiled: HashSet::new(),
        }
    }

    /// Hand every registered partial to the engine under its namespaced name.
    pub fn register_partials(&mut self, partials: &PartialRegistry) -> Result<(), TemplateError> {
        for (name, source) in partials.iter() {
            self.engine.register_partial(name, source)?;
        }
        Ok(())
    }

    pub fn template_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{}", self.extension))
    }

    /// Render the template called `name` against `context`.
    pub fn render(&mut self, name: &str, context: &RenderContext) -> Result<String, TemplateError> {
        let key = self.resolve(name)?;
        self.engine.render(&key, context)
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Compile the template on first use. Page templates are keyed by their
    /// file name so they never shadow a partial of the same name.
    fn resolve(&mut self, name: &str) -> Result<String, TemplateError> {
        let key = format!("{name}.{}", self.extension);
        if self.compiled.contains(&key) {
            return Ok(key);
        }

        let path = self.template_path(name);
        if !path.is_file() {
            return Err(TemplateError::NotFound {
                name: name.to_string(),
                path,
            });
        }

        let source = std::fs::read_to_string(&path).map_err(|source| TemplateError::Io {
            path: path.clone(),
            source,
        })?;
        self.engine.compile(&key, &source)?;
        self.compiled.insert(key.clone());
        debug!(template = %name, path = %path.display(), "compiled template");

        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn page(yaml: &str, html: &str) -> RenderContext {
        let (fm, _) = crate::frontmatter::extract(&format!("---\n{yaml}\n---\n")).unwrap();
        RenderContext::from_page(&fm, html)
    }

    fn resolver_with(templates: &[(&str, &str)]) -> (TempDir, TemplateResolver) {
        let dir = TempDir::new().unwrap();
        for (name, source) in templates {
            fs::write(dir.path().join(format!("{name}.hbs")), source).unwrap();
        }
        let resolver = TemplateResolver::tera(dir.path(), "hbs");
        (dir, resolver)
    }

    #[test]
    fn test_render_title_and_content() {
        let (_dir, mut resolver) = resolver_with(&[(
            "default",
            "<html><head><title>{{title}}</title></head><body>{{{content}}}</body></html>",
        )]);
        let context = page("title: Test Page", "<h1>Hello World</h1>");

        let html = resolver.render("default", &context).unwrap();
        assert!(html.contains("<title>Test Page</title>"));
        assert!(html.contains("<h1>Hello World</h1>"));
    }

    #[test]
    fn test_missing_template_names_it() {
        let (_dir, mut resolver) = resolver_with(&[]);
        let err = resolver.render("nonexistent", &RenderContext::new()).unwrap_err();

        assert!(matches!(&err, TemplateError::NotFound { name, .. } if name == "nonexistent"));
        assert!(err.to_string().contains("nonexistent"));
    }

    #[test]
    fn test_escaping_and_missing_values() {
        let (_dir, mut resolver) = resolver_with(&[("default", "[{{title}}][{{subtitle}}][{{{raw}}}]")]);
        let context = page("title: <b>bold</b>", "");

        let html = resolver.render("default", &context).unwrap();
        assert!(html.starts_with("[&lt;b&gt;bold"));
        assert!(html.ends_with("][][]"));
    }

    #[test]
    fn test_urls_are_not_mangled() {
        let (_dir, mut resolver) =
            resolver_with(&[("default", r#"<a href="{{url}}">{{label}}</a>"#)]);
        let context = page("url: https://x.com/a/b?q=1&r=2\nlabel: '\"Tom''s\" <page>'", "");

        let html = resolver.render("default", &context).unwrap();
        assert_eq!(
            html,
            r#"<a href="https://x.com/a/b?q=1&amp;r=2">&quot;Tom&#x27;s&quot; &lt;page&gt;</a>"#
        );
    }

    #[test]
    fn test_hyphenated_frontmatter_keys() {
        let (_dir, mut resolver) = resolver_with(&[(
            "default",
            r#"<meta content="{{og-image}}">{{#if hero-alt}}[{{hero-alt}}]{{/if}}{{author.first-name}}{{missing-key}}"#,
        )]);
        let context = page("og-image: /img/cover.png\nauthor:\n  first-name: Ana", "");

        let html = resolver.render("default", &context).unwrap();
        assert_eq!(html, r#"<meta content="/img/cover.png">Ana"#);
    }

    #[test]
    fn test_reserved_keys_win() {
        let (_dir, mut resolver) =
            resolver_with(&[("default", "{{{content}}}|{{frontmatter.content}}")]);
        let context = page("content: from frontmatter", "<p>rendered</p>");

        let html = resolver.render("default", &context).unwrap();
        assert_eq!(html, "<p>rendered</p>|from frontmatter");
    }

    #[test]
    fn test_conditionals() {
        let (_dir, mut resolver) = resolver_with(&[(
            "default",
            "{{#if author}}by {{author}}{{else}}anonymous{{/if}}{{#unless draft}}!{{/unless}}",
        )]);

        let html = resolver.render("default", &page("author: Ana", "")).unwrap();
        assert_eq!(html, "by Ana!");

        let html = resolver.render("default", &page("author: ''\ndraft: true", "")).unwrap();
        assert_eq!(html, "anonymous");
    }

    #[test]
    fn test_namespaced_partials() {
        let (_dir, mut resolver) =
            resolver_with(&[("default", "{{> blog/header}}<main></main>{{> footer}}")]);
        let mut partials = PartialRegistry::new();
        partials.register("blog/header", "<header>Blog Header</header>");
        partials.register("footer", "<footer>Footer</footer>");
        resolver.register_partials(&partials).unwrap();

        let html = resolver.render("default", &RenderContext::new()).unwrap();
        assert_eq!(html, "<header>Blog Header</header><main></main><footer>Footer</footer>");
    }

    #[test]
    fn test_unregistered_partial_fails_at_render() {
        let (_dir, mut resolver) = resolver_with(&[("default", "{{> missing/part}}")]);

        let err = resolver.render("default", &RenderContext::new()).unwrap_err();
        assert!(matches!(err, TemplateError::Render { .. }));
    }

    #[test]
    fn test_partial_and_template_may_share_a_name() {
        let (_dir, mut resolver) = resolver_with(&[("default", "<page>{{> default}}</page>")]);
        let mut partials = PartialRegistry::new();
        partials.register("default", "fragment");
        resolver.register_partials(&partials).unwrap();

        let html = resolver.render("default", &RenderContext::new()).unwrap();
        assert_eq!(html, "<page>fragment</page>");
    }

    #[test]
    fn test_templates_are_compiled_once() {
        let (dir, mut resolver) = resolver_with(&[("default", "first")]);
        assert_eq!(resolver.render("default", &RenderContext::new()).unwrap(), "first");

        fs::write(dir.path().join("default.hbs"), "second").unwrap();
        assert_eq!(resolver.render("default", &RenderContext::new()).unwrap(), "first");
        assert!(resolver.engine().has_template("default.hbs"));
    }
}
