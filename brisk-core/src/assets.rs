use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to walk static directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid asset path: {}", .0.display())]
    InvalidPath(PathBuf),
}

/// Mirror everything under `source_dir` into `dest_dir`, byte for byte.
///
/// Directories are created as needed and existing files are overwritten.
/// A missing source is a no-op. Returns the number of files copied.
pub fn copy_static(source_dir: &Path, dest_dir: &Path) -> Result<usize, AssetError> {
    if !source_dir.is_dir() {
        info!(dir = %source_dir.display(), "no static directory, skipping");
        return Ok(0);
    }

    let mut count = 0;
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        let relative = path
            .strip_prefix(source_dir)
            .map_err(|_| AssetError::InvalidPath(path.to_path_buf()))?;
        let dest = dest_dir.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(|source| AssetError::Copy {
                from: path.to_path_buf(),
                to: dest.clone(),
                source,
            })?;
        } else if path.is_file() {
            fs::copy(path, &dest).map_err(|source| AssetError::Copy {
                from: path.to_path_buf(),
                to: dest.clone(),
                source,
            })?;
            debug!(file = %relative.display(), "copied asset");
            count += 1;
        }
    }

    info!(count, "copied static assets");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copies_tree_verbatim() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let bytes: Vec<u8> = (0..=255).collect();

        fs::create_dir_all(src.path().join("img/icons")).unwrap();
        fs::create_dir_all(src.path().join("empty")).unwrap();
        fs::write(src.path().join("img/icons/logo.bin"), &bytes).unwrap();
        fs::write(src.path().join("script.js"), "console.log('hi');").unwrap();

        let count = copy_static(src.path(), dest.path()).unwrap();

        assert_eq!(count, 2);
        assert_eq!(fs::read(dest.path().join("img/icons/logo.bin")).unwrap(), bytes);
        assert_eq!(
            fs::read_to_string(dest.path().join("script.js")).unwrap(),
            "console.log('hi');"
        );
        assert!(dest.path().join("empty").is_dir());
    }

    #[test]
    fn test_overwrites_existing_files() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        fs::write(src.path().join("robots.txt"), "new").unwrap();
        fs::write(dest.path().join("robots.txt"), "old").unwrap();

        copy_static(src.path(), dest.path()).unwrap();
        assert_eq!(fs::read_to_string(dest.path().join("robots.txt")).unwrap(), "new");
    }

    #[test]
    fn test_missing_source_is_noop() {
        let dest = TempDir::new().unwrap();
        let count = copy_static(&dest.path().join("static"), dest.path()).unwrap();
        assert_eq!(count, 0);
    }
}
