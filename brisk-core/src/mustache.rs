//! Handlebars-style tags on top of Tera.
//!
//! Templates and partials may be written with the short mustache forms:
//!
//! | written                  | compiled as                                  |
//! |--------------------------|----------------------------------------------|
//! | `{{title}}`              | `{{ title \| default(value="") }}`           |
//! | `{{{content}}}`          | `{{ content \| default(value="") \| safe }}` |
//! | `{{> blog/header}}`      | `{% include "blog/header" %}`                |
//! | `{{#if x}}` / `{{/if}}`  | `{% if x %}` / `{% endif %}`                 |
//! | `{{#unless x}}`          | `{% if not x %}`                             |
//! | `{{else}}`               | `{% else %}`                                 |
//! | `{{! note}}`             | removed                                      |
//!
//! Keys that are not Tera identifiers, such as `{{og-image}}` or
//! `{{author.first-name}}`, are looked up by subscript through the reserved
//! `this` context entry: `this["og-image"]`, `author["first-name"]`.
//!
//! Anything else, including native Tera syntax, is left alone.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Name under which the whole render context is also reachable.
pub const ROOT_KEY: &str = "this";

fn pattern(re: &str) -> Regex {
    Regex::new(re).unwrap_or_else(|e| panic!("invalid built-in pattern {re}: {e}"))
}

static LONG_COMMENT: LazyLock<Regex> = LazyLock::new(|| pattern(r"\{\{!--[\s\S]*?--\}\}"));
static COMMENT: LazyLock<Regex> = LazyLock::new(|| pattern(r"\{\{![^}]*\}\}"));
static RAW: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\{\{\{\s*([A-Za-z_][\w-]*(?:\.[\w-]+)*)\s*\}\}\}"));
static PARTIAL: LazyLock<Regex> = LazyLock::new(|| pattern(r"\{\{>\s*([\w./-]+)\s*\}\}"));
static IF_OPEN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\{\{#if\s+([A-Za-z_][\w-]*(?:\.[\w-]+)*)\s*\}\}"));
static UNLESS_OPEN: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\{\{#unless\s+([A-Za-z_][\w-]*(?:\.[\w-]+)*)\s*\}\}"));
static ELSE: LazyLock<Regex> = LazyLock::new(|| pattern(r"\{\{\s*else\s*\}\}"));
static BLOCK_CLOSE: LazyLock<Regex> = LazyLock::new(|| pattern(r"\{\{/(?:if|unless)\s*\}\}"));
static ESCAPED: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"\{\{\s*([A-Za-z_][\w-]*(?:\.[\w-]+)*)\s*\}\}"));

/// Tera expression for a dotted key path.
fn lookup(path: &str) -> String {
    if !path.contains('-') {
        return path.to_string();
    }

    let mut segments = path.split('.');
    let mut expr = match segments.next() {
        Some(first) if !first.contains('-') => first.to_string(),
        Some(first) => format!(r#"{ROOT_KEY}["{first}"]"#),
        None => return path.to_string(),
    };
    for segment in segments {
        if segment.contains('-') {
            expr.push_str(&format!(r#"["{segment}"]"#));
        } else {
            expr.push('.');
            expr.push_str(segment);
        }
    }
    expr
}

/// Rewrite mustache tags in `source` into Tera syntax.
pub fn normalize(source: &str) -> String {
    // Order matters: `{{{x}}}` and `{{else}}` would otherwise be taken for
    // plain `{{x}}` interpolations.
    let out = LONG_COMMENT.replace_all(source, "");
    let out = COMMENT.replace_all(&out, "");
    let out = RAW.replace_all(&out, |caps: &Captures| {
        format!(r#"{{{{ {} | default(value="") | safe }}}}"#, lookup(&caps[1]))
    });
    let out = PARTIAL.replace_all(&out, r#"{% include "${1}" %}"#);
    let out = IF_OPEN.replace_all(&out, |caps: &Captures| format!("{{% if {} %}}", lookup(&caps[1])));
    let out = UNLESS_OPEN.replace_all(&out, |caps: &Captures| {
        format!("{{% if not {} %}}", lookup(&caps[1]))
    });
    let out = ELSE.replace_all(&out, "{% else %}");
    let out = BLOCK_CLOSE.replace_all(&out, "{% endif %}");
    let out = ESCAPED.replace_all(&out, |caps: &Captures| {
        format!(r#"{{{{ {} | default(value="") }}}}"#, lookup(&caps[1]))
    });

    out.into_owned()
}
