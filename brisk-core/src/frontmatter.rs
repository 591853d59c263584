//! Frontmatter extraction for content files.
//!
//! A frontmatter block is YAML between two `---` lines at the very top of a
//! file. Everything after the closing line is the body, untouched.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use thiserror::Error;

/// Parsed frontmatter fields, kept as JSON values so they can be handed to
/// the template context as-is.
pub type Frontmatter = serde_json::Map<String, Value>;

const DELIMITER: &str = "---";

/// Template used when a page does not name one.
pub const DEFAULT_TEMPLATE: &str = "default";

#[derive(Debug, Error)]
pub enum FrontmatterError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("expected a mapping of keys to values")]
    NotAMapping,
}

/// Split `text` into the raw frontmatter block and the body.
///
/// Returns `None` when the text does not open with a delimiter line or the
/// block is never closed.
pub fn split(text: &str) -> Option<(&str, &str)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let newline = text.find('\n')?;
    if text[..newline].trim_end() != DELIMITER {
        return None;
    }

    let rest = &text[newline + 1..];
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == DELIMITER {
            return Some((&rest[..offset], &rest[offset + line.len()..]));
        }
        offset += line.len();
    }

    None
}

/// Extract frontmatter and body from a content file.
///
/// Without a block the frontmatter is empty and the body is the whole input.
pub fn extract(text: &str) -> Result<(Frontmatter, String), FrontmatterError> {
    let Some((block, body)) = split(text) else {
        return Ok((Frontmatter::new(), text.to_string()));
    };

    if block.trim().is_empty() {
        return Ok((Frontmatter::new(), body.to_string()));
    }

    match serde_yaml::from_str::<Value>(block)? {
        Value::Object(map) => Ok((map, body.to_string())),
        // A block holding only comments
        Value::Null => Ok((Frontmatter::new(), body.to_string())),
        _ => Err(FrontmatterError::NotAMapping),
    }
}

/// The template a page asks for, falling back to [`DEFAULT_TEMPLATE`].
pub fn template_name(frontmatter: &Frontmatter) -> &str {
    match frontmatter.get("template") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim(),
        _ => DEFAULT_TEMPLATE,
    }
}

/// Calendar date from the `date` field.
///
/// Accepts `YYYY-MM-DD` and RFC 3339 timestamps; anything else is `None`.
pub fn date(frontmatter: &Frontmatter) -> Option<NaiveDate> {
    let raw = frontmatter.get("date")?.as_str()?.trim();

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_yaml_block() {
        let text = "---\ntitle: Test Page\ndate: 2024-01-01\ntemplate: default\n---\n\n# Hello World\n";
        let (fm, body) = extract(text).unwrap();

        assert_eq!(fm["title"], "Test Page");
        assert_eq!(fm["date"], "2024-01-01");
        assert_eq!(fm["template"], "default");
        assert_eq!(body, "\n# Hello World\n");
    }

    #[test]
    fn test_no_frontmatter_returns_input_unchanged() {
        let text = "# Just a heading\n\n---\n\nAfter a rule.";
        let (fm, body) = extract(text).unwrap();

        assert!(fm.is_empty());
        assert_eq!(body, text);
    }

    #[test]
    fn test_unclosed_block_is_body() {
        let text = "---\ntitle: dangling\n";
        let (fm, body) = extract(text).unwrap();

        assert!(fm.is_empty());
        assert_eq!(body, text);
    }

    #[test]
    fn test_empty_block() {
        let (fm, body) = extract("---\n---\nbody").unwrap();
        assert!(fm.is_empty());
        assert_eq!(body, "body");
    }

    #[test]
    fn test_crlf_and_bom() {
        let text = "\u{feff}---\r\ntitle: Windows\r\n---\r\nBody\r\n";
        let (fm, body) = extract(text).unwrap();

        assert_eq!(fm["title"], "Windows");
        assert_eq!(body, "Body\r\n");
    }

    #[test]
    fn test_structured_values() {
        let text = "---\ntags:\n  - rust\n  - web\nauthor:\n  name: Ana\ndraft: false\n---\n";
        let (fm, _) = extract(text).unwrap();

        assert_eq!(fm["tags"], serde_json::json!(["rust", "web"]));
        assert_eq!(fm["author"]["name"], "Ana");
        assert_eq!(fm["draft"], false);
    }

    #[test]
    fn test_malformed_yaml_is_an_error() {
        let text = "---\ntitle: [unclosed\n---\nbody";
        assert!(matches!(extract(text), Err(FrontmatterError::Yaml(_))));
    }

    #[test]
    fn test_non_mapping_is_an_error() {
        let text = "---\n- one\n- two\n---\nbody";
        assert!(matches!(extract(text), Err(FrontmatterError::NotAMapping)));
    }

    #[test]
    fn test_template_name() {
        let (fm, _) = extract("---\ntemplate: blog\n---\n").unwrap();
        assert_eq!(template_name(&fm), "blog");

        let (fm, _) = extract("---\ntitle: x\n---\n").unwrap();
        assert_eq!(template_name(&fm), "default");

        let (fm, _) = extract("---\ntemplate: ''\n---\n").unwrap();
        assert_eq!(template_name(&fm), "default");
    }

    #[test]
    fn test_date() {
        let (fm, _) = extract("---\ndate: 2024-01-15\n---\n").unwrap();
        assert_eq!(date(&fm), NaiveDate::from_ymd_opt(2024, 1, 15));

        let (fm, _) = extract("---\ndate: \"2024-03-02T10:00:00Z\"\n---\n").unwrap();
        assert_eq!(date(&fm), NaiveDate::from_ymd_opt(2024, 3, 2));

        let (fm, _) = extract("---\ndate: last tuesday\n---\n").unwrap();
        assert_eq!(date(&fm), None);

        assert_eq!(date(&Frontmatter::new()), None);
    }
}
