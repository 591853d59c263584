use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parsing(#[from] toml::de::Error),
}

/// Site configuration. Every field has a conventional default, so an empty
/// (or missing) `brisk.toml` is a valid configuration.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// Prefix for every `<loc>` in the sitemap.
    pub base_url: String,
    /// Extension of template and partial files, without the dot.
    pub template_extension: String,
    /// Drop the `.html` suffix from sitemap URLs.
    pub clean_urls: bool,
    /// Syntax-highlight fenced code blocks in Markdown.
    pub highlight_code: bool,
    /// syntect theme used for highlighting.
    pub syntax_theme: String,
    pub paths: PathsConfig,
    pub tailwind: TailwindConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "https://example.com".to_string(),
            template_extension: "hbs".to_string(),
            clean_urls: false,
            highlight_code: true,
            syntax_theme: crate::markdown::DEFAULT_SYNTAX_THEME.to_string(),
            paths: PathsConfig::default(),
            tailwind: TailwindConfig::default(),
        }
    }
}

impl Config {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&data)?;

        Ok(config)
    }

    /// Resolve the configured directories against a project root.
    ///
    /// Every resulting path is absolute with `.` and `..` folded away, so the
    /// paths stay valid whatever the working directory of a child process.
    pub fn project_paths<P: AsRef<Path>>(&self, root: P) -> ProjectPaths {
        let root = normalize(root.as_ref());
        let resolve = |dir: &str| normalize(&root.join(dir));
        ProjectPaths {
            content: resolve(&self.paths.content),
            templates: resolve(&self.paths.templates),
            partials: resolve(&self.paths.partials),
            static_dir: resolve(&self.paths.static_dir),
            styles: resolve(&self.paths.styles),
            output: resolve(&self.paths.output),
            root,
        }
    }
}

/// Absolute form of `path` with `.` and `..` resolved lexically.
pub fn normalize(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Directory layout, relative to the project root.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct PathsConfig {
    pub content: String,
    pub templates: String,
    pub partials: String,
    #[serde(rename = "static")]
    pub static_dir: String,
    pub styles: String,
    pub output: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            content: "content".to_string(),
            templates: "templates".to_string(),
            partials: "templates/partials".to_string(),
            static_dir: "static".to_string(),
            styles: "styles".to_string(),
            output: "build".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct TailwindConfig {
    pub enable: bool,
    /// Program and leading arguments used to invoke the compiler.
    pub command: Vec<String>,
    pub minify: bool,
}

impl Default for TailwindConfig {
    fn default() -> Self {
        Self {
            enable: true,
            command: vec!["npx".to_string(), "tailwindcss".to_string()],
            minify: true,
        }
    }
}

/// Absolute (or root-relative) locations of every conventional directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub content: PathBuf,
    pub templates: PathBuf,
    pub partials: PathBuf,
    pub static_dir: PathBuf,
    pub styles: PathBuf,
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.base_url, "https://example.com");
        assert_eq!(config.template_extension, "hbs");
        assert_eq!(config.paths.output, "build");
        assert_eq!(config.paths.partials, "templates/partials");
        assert!(config.tailwind.enable);
        assert_eq!(config.tailwind.command, vec!["npx", "tailwindcss"]);
        assert!(config.highlight_code);
        assert_eq!(config.syntax_theme, "base16-ocean.dark");
    }

    #[test]
    fn test_read_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("brisk.toml");
        std::fs::write(
            &path,
            r#"
base_url = "https://brisk.dev"

[paths]
output = "dist"
static = "public"

[tailwind]
command = ["tailwindcss"]
"#,
        )
        .unwrap();

        let config = Config::read(&path).unwrap();
        assert_eq!(config.base_url, "https://brisk.dev");
        assert_eq!(config.paths.output, "dist");
        assert_eq!(config.paths.static_dir, "public");
        assert_eq!(config.paths.content, "content");
        assert_eq!(config.tailwind.command, vec!["tailwindcss"]);
        assert!(config.tailwind.minify);
    }

    #[test]
    fn test_read_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("brisk.toml");
        std::fs::write(&path, "base_url = [").unwrap();

        assert!(matches!(Config::read(&path), Err(ConfigError::Parsing(_))));
    }

    #[test]
    fn test_project_paths() {
        let paths = Config::default().project_paths("/site");
        assert_eq!(paths.root, PathBuf::from("/site"));
        assert_eq!(paths.content, PathBuf::from("/site/content"));
        assert_eq!(paths.partials, PathBuf::from("/site/templates/partials"));
        assert_eq!(paths.output, PathBuf::from("/site/build"));
    }

    #[test]
    fn test_relative_root_becomes_absolute() {
        let cwd = std::env::current_dir().unwrap();
        let paths = Config::default().project_paths("./site/../site");

        assert_eq!(paths.root, cwd.join("site"));
        assert_eq!(paths.styles, cwd.join("site/styles"));
        assert!(paths.output.is_absolute());
    }

    #[test]
    fn test_parent_output_is_resolved() {
        let mut config = Config::default();
        config.paths.output = "../public".to_string();
        assert_eq!(config.project_paths("/site").output, PathBuf::from("/public"));

        config.paths.output = "..".to_string();
        assert_eq!(config.project_paths("/work/site").output, PathBuf::from("/work"));
    }
}
