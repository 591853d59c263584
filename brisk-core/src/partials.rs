use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum PartialError {
    #[error("failed to walk partials directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("failed to read partial {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Named template fragments, keyed by their slash-namespaced name.
///
/// `partials/blog/header.hbs` is registered as `blog/header`,
/// `partials/footer.hbs` as `footer`. Registering a name twice keeps the
/// last source.
#[derive(Debug, Default, Clone)]
pub struct PartialRegistry {
    entries: BTreeMap<String, String>,
}

impl PartialRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every `*.{extension}` file below `root`.
    ///
    /// A missing root is not an error; nothing is registered. Returns the
    /// number of files registered.
    pub fn scan<P: AsRef<Path>>(&mut self, root: P, extension: &str) -> Result<usize, PartialError> {
        let root = root.as_ref();
        if !root.is_dir() {
            info!(dir = %root.display(), "no partials directory, skipping");
            return Ok(0);
        }

        let mut count = 0;
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != extension) {
                continue;
            }

            let Some(name) = partial_name(root, path) else {
                continue;
            };
            let source = std::fs::read_to_string(path).map_err(|source| PartialError::Read {
                path: path.to_path_buf(),
                source,
            })?;

            self.register(&name, source);
            info!(partial = %name, "registered partial");
            count += 1;
        }

        Ok(count)
    }

    /// Register a partial, replacing any earlier one with the same name.
    pub fn register<S: Into<String>>(&mut self, name: &str, source: S) -> Option<String> {
        let previous = self.entries.insert(name.to_string(), source.into());
        if previous.is_some() {
            warn!(partial = %name, "partial registered twice, keeping the latest");
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// `blog/header.hbs` under `root` becomes `blog/header`.
fn partial_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let segments: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}
