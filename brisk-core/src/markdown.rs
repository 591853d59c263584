use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, html};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

// Initialize syntax highlighting resources once
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

pub const DEFAULT_SYNTAX_THEME: &str = "base16-ocean.dark";

/// Turns a Markdown body into HTML.
pub trait MarkdownRenderer {
    fn render(&self, source: &str) -> String;
}

/// CommonMark renderer with GitHub-style extensions, smart punctuation and
/// optional syntax highlighting of fenced code blocks. Raw HTML is passed
/// through.
pub struct CmarkRenderer {
    options: Options,
    highlight: bool,
    theme: String,
}

impl Default for CmarkRenderer {
    fn default() -> Self {
        Self::new(true, DEFAULT_SYNTAX_THEME)
    }
}

impl CmarkRenderer {
    pub fn new<S: Into<String>>(highlight: bool, theme: S) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);

        Self {
            options,
            highlight,
            theme: theme.into(),
        }
    }

    fn process<'a>(&self, parser: Parser<'a>) -> Vec<Event<'a>> {
        let mut events = Vec::new();
        // (language, collected source) while inside a fenced block
        let mut code: Option<(String, String)> = None;

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(ref info))) if self.highlight => {
                    let lang = info
                        .split(|c: char| c == ',' || c.is_whitespace())
                        .next()
                        .unwrap_or_default()
                        .to_string();
                    code = Some((lang, String::new()));
                }
                Event::Text(ref text) if code.is_some() => {
                    if let Some((_, buffer)) = code.as_mut() {
                        buffer.push_str(text);
                    }
                }
                Event::End(TagEnd::CodeBlock) if code.is_some() => {
                    if let Some((lang, buffer)) = code.take() {
                        events.push(Event::Html(self.highlight_code(&lang, &buffer).into()));
                    }
                }
                other => events.push(other),
            }
        }

        events
    }

    fn highlight_code(&self, lang: &str, code: &str) -> String {
        let plain = || {
            if lang.is_empty() {
                format!("<pre><code>{}</code></pre>\n", html_escape::encode_text(code))
            } else {
                format!(
                    "<pre><code class=\"language-{}\">{}</code></pre>\n",
                    html_escape::encode_double_quoted_attribute(lang),
                    html_escape::encode_text(code)
                )
            }
        };

        if lang.is_empty() {
            return plain();
        }

        let Some(syntax) = SYNTAX_SET.find_syntax_by_token(lang) else {
            return plain();
        };
        let Some(theme) = THEME_SET.themes.get(&self.theme) else {
            return plain();
        };

        highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme).unwrap_or_else(|_| plain())
    }
}

impl MarkdownRenderer for CmarkRenderer {
    fn render(&self, source: &str) -> String {
        let parser = Parser::new_ext(source, self.options);
        let events = self.process(parser);

        let mut out = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        out
    }
}

/// Render with the default renderer.
pub fn render_markdown(source: &str) -> String {
    CmarkRenderer::default().render(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_and_paragraph() {
        let html = render_markdown("# Hello World\n\nThis is a test.");
        assert!(html.contains("<h1>Hello World</h1>"));
        assert!(html.contains("<p>This is a test.</p>"));
    }

    #[test]
    fn test_raw_html_passthrough() {
        let html = render_markdown("<div class=\"text-blue-500 font-bold\">Tailwind works!</div>\n");
        assert!(html.contains("<div class=\"text-blue-500 font-bold\">Tailwind works!</div>"));
    }

    #[test]
    fn test_tables_and_strikethrough() {
        let html = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_fenced_code_is_highlighted() {
        let html = render_markdown("```rust\nfn main() {}\n```\n");
        assert!(html.contains("<pre style="));
        assert!(html.contains("main"));
    }

    #[test]
    fn test_unknown_language_falls_back_to_plain_block() {
        let html = render_markdown("```nosuchlang\n<b>x</b>\n```\n");
        assert!(html.contains("<pre><code class=\"language-nosuchlang\">&lt;b&gt;x&lt;/b&gt;"));
    }

    #[test]
    fn test_highlighting_disabled() {
        let renderer = CmarkRenderer::new(false, DEFAULT_SYNTAX_THEME);
        let html = renderer.render("```rust\nlet x = 1;\n```\n");
        assert!(html.contains("<pre><code class=\"language-rust\">"));
    }
}
