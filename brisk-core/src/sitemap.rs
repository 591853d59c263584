use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("failed to write sitemap {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapEntry {
    /// Site-relative URL, starting with `/`.
    pub url: String,
    pub last_modified: NaiveDate,
    pub priority: &'static str,
}

/// Sitemap entries in the order pages were processed.
#[derive(Debug, Default, Clone)]
pub struct Sitemap {
    entries: Vec<SitemapEntry>,
}

impl Sitemap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: SitemapEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[SitemapEntry] {
        &self.entries
    }

    pub fn to_xml(&self, base_url: &str) -> String {
        let base_url = base_url.trim_end_matches('/');

        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&format!("<urlset xmlns=\"{SITEMAP_NS}\">\n"));
        for entry in &self.entries {
            xml.push_str("  <url>\n");
            xml.push_str(&format!(
                "    <loc>{}</loc>\n",
                escape_xml(&format!("{base_url}{}", entry.url))
            ));
            xml.push_str(&format!(
                "    <lastmod>{}</lastmod>\n",
                entry.last_modified.format("%Y-%m-%d")
            ));
            xml.push_str(&format!("    <priority>{}</priority>\n", entry.priority));
            xml.push_str("  </url>\n");
        }
        xml.push_str("</urlset>\n");

        xml
    }

    /// Write `sitemap.xml` into `output_dir`. Nothing is written for an empty
    /// sitemap; the returned path is `None` in that case.
    pub fn write<P: AsRef<Path>>(
        &self,
        output_dir: P,
        base_url: &str,
    ) -> Result<Option<PathBuf>, SitemapError> {
        if self.is_empty() {
            debug!("no pages, skipping sitemap");
            return Ok(None);
        }

        let path = output_dir.as_ref().join("sitemap.xml");
        std::fs::write(&path, self.to_xml(base_url)).map_err(|source| SitemapError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(Some(path))
    }
}

pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(url: &str, priority: &'static str) -> SitemapEntry {
        SitemapEntry {
            url: url.to_string(),
            last_modified: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            priority,
        }
    }

    #[test]
    fn test_to_xml() {
        let mut sitemap = Sitemap::new();
        sitemap.push(entry("/", "1.0"));
        sitemap.push(entry("/blog/post.html", "0.8"));

        let xml = sitemap.to_xml("https://example.com/");
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
        assert!(xml.contains("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">"));
        assert!(xml.contains("<loc>https://example.com/</loc>"));
        assert!(xml.contains("<loc>https://example.com/blog/post.html</loc>"));
        assert!(xml.contains("<lastmod>2024-01-01</lastmod>"));
        assert!(xml.contains("<priority>0.8</priority>"));
        assert_eq!(xml.matches("<url>").count(), 2);
        assert!(xml.find("/blog/post.html").unwrap() > xml.find("<loc>https://example.com/</loc>").unwrap());
    }

    #[test]
    fn test_loc_is_escaped() {
        let mut sitemap = Sitemap::new();
        sitemap.push(entry("/q&a.html", "0.7"));
        assert!(sitemap.to_xml("https://example.com").contains("<loc>https://example.com/q&amp;a.html</loc>"));
    }

    #[test]
    fn test_write_skips_empty() {
        let dir = TempDir::new().unwrap();
        let written = Sitemap::new().write(dir.path(), "https://example.com").unwrap();

        assert!(written.is_none());
        assert!(!dir.path().join("sitemap.xml").exists());
    }

    #[test]
    fn test_write() {
        let dir = TempDir::new().unwrap();
        let mut sitemap = Sitemap::new();
        sitemap.push(entry("/about.html", "0.7"));

        let written = sitemap.write(dir.path(), "https://example.com").unwrap();
        assert_eq!(written, Some(dir.path().join("sitemap.xml")));
        let xml = std::fs::read_to_string(dir.path().join("sitemap.xml")).unwrap();
        assert!(xml.contains("<loc>https://example.com/about.html</loc>"));
    }
}
