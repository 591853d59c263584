use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to walk content directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("invalid path: {}", .0.display())]
    InvalidPath(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Markdown,
    Html,
}

impl ContentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "md" | "markdown" => Some(Self::Markdown),
            "html" | "htm" => Some(Self::Html),
            _ => None,
        }
    }
}

/// A content file found by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFile {
    pub path: PathBuf,
    /// Path below the content root.
    pub relative: PathBuf,
    pub kind: ContentKind,
}

pub struct ContentScanner {
    source_dir: PathBuf,
}

impl ContentScanner {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            source_dir: path.as_ref().to_path_buf(),
        }
    }

    /// Every Markdown and HTML file below the root, depth first, sorted by
    /// file name within each directory. Symlinks are skipped. A missing root
    /// yields no files.
    pub fn scan(&self) -> Result<Vec<ContentFile>, ScanError> {
        if !self.source_dir.is_dir() {
            info!(dir = %self.source_dir.display(), "no content directory, skipping");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.source_dir).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Some(kind) = ContentKind::from_path(path) else {
                continue;
            };
            let relative = path
                .strip_prefix(&self.source_dir)
                .map_err(|_| ScanError::InvalidPath(path.to_path_buf()))?;

            files.push(ContentFile {
                path: path.to_path_buf(),
                relative: relative.to_path_buf(),
                kind,
            });
        }

        debug!(count = files.len(), dir = %self.source_dir.display(), "scanned content");
        Ok(files)
    }
}
