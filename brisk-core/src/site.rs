use std::path::{Component, Path, PathBuf};

use chrono::NaiveDate;

use crate::frontmatter::{self, Frontmatter, FrontmatterError};
use crate::scanner::{ContentFile, ContentKind};

/// A content file read from disk, with its frontmatter split off.
///
/// HTML files are taken as-is: their frontmatter is always empty and the
/// body is the whole file.
#[derive(Debug, Clone)]
pub struct ContentRecord {
    pub page: Page,
    pub frontmatter: Frontmatter,
    pub body: String,
}

impl ContentRecord {
    pub fn parse(file: &ContentFile, text: String) -> Result<Self, FrontmatterError> {
        let page = Page::new(&file.relative, file.kind);
        let (frontmatter, body) = match file.kind {
            ContentKind::Markdown => frontmatter::extract(&text)?,
            ContentKind::Html => (Frontmatter::new(), text),
        };

        Ok(Self {
            page,
            frontmatter,
            body,
        })
    }

    pub fn template_name(&self) -> &str {
        frontmatter::template_name(&self.frontmatter)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        frontmatter::date(&self.frontmatter)
    }
}

/// Where a content file lands in the build output and how it is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Path below the content root.
    pub path: PathBuf,
    pub kind: ContentKind,
}

impl Page {
    pub fn new<P: AsRef<Path>>(path: P, kind: ContentKind) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            kind,
        }
    }

    /// Path below the build root: `.md` becomes `.html`, HTML is unchanged.
    pub fn out_path(&self) -> PathBuf {
        match self.kind {
            ContentKind::Markdown => self.path.with_extension("html"),
            ContentKind::Html => self.path.clone(),
        }
    }

    /// `/` followed by the output path with forward slashes.
    pub fn public_url(&self) -> String {
        let segments: Vec<_> = self
            .out_path()
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();

        format!("/{}", segments.join("/"))
    }

    pub fn is_root(&self) -> bool {
        self.public_url() == "/index.html"
    }

    /// URL recorded in the sitemap. The root page is `/`; with `clean_urls`
    /// other pages drop their `.html` suffix.
    pub fn sitemap_url(&self, clean_urls: bool) -> String {
        if self.is_root() {
            return "/".to_string();
        }

        let url = self.public_url();
        if clean_urls {
            if let Some(stripped) = url.strip_suffix(".html") {
                return stripped.to_string();
            }
        }
        url
    }

    pub fn priority(&self) -> &'static str {
        if self.is_root() {
            "1.0"
        } else if self.public_url().contains("/blog/") {
            "0.8"
        } else {
            "0.7"
        }
    }
}
