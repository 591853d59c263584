//! Tailwind stylesheet compilation.
//!
//! The first candidate stylesheet that imports `tailwindcss` is compiled into
//! `<output>/styles.css`, scanning templates, content and already-built HTML
//! for class names. A hand-written `<static>/styles.css` is appended after
//! the compiled rules so framework utilities come first.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::{Config, ProjectPaths};

const TAILWIND_DIRECTIVES: [&str; 2] = [r#"@import "tailwindcss""#, "@import 'tailwindcss'"];

pub const OUTPUT_FILE: &str = "styles.css";
pub const LEGACY_FILE: &str = "styles.css";
pub const LEGACY_SEPARATOR: &str = "\n\n/* Custom CSS from static/styles.css */\n";

#[derive(Debug, Error)]
pub enum StyleError {
    #[error("no stylesheet compiler command configured")]
    EmptyCommand,
    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited with {status}")]
    Exit { program: String, status: ExitStatus },
    #[error("failed to access stylesheet {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What to compile and where, as handed to a [`StyleCompiler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRequest {
    /// Working directory for the compiler.
    pub root: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    pub minify: bool,
    /// Globs, relative to `root`, scanned for class names.
    pub content: Vec<String>,
}

pub trait StyleCompiler {
    fn compile(&self, request: &CompileRequest) -> Result<(), StyleError>;
}

/// Runs the Tailwind CLI (`npx tailwindcss` unless configured otherwise)
/// with inherited stdio.
#[derive(Debug, Clone)]
pub struct TailwindCli {
    command: Vec<String>,
}

impl TailwindCli {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    pub fn arguments(request: &CompileRequest) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-i".into(),
            request.input.clone().into_os_string(),
            "-o".into(),
            request.output.clone().into_os_string(),
        ];
        if request.minify {
            args.push("--minify".into());
        }
        for glob in &request.content {
            args.push("--content".into());
            args.push(glob.into());
        }
        args
    }
}

impl StyleCompiler for TailwindCli {
    fn compile(&self, request: &CompileRequest) -> Result<(), StyleError> {
        let (program, leading) = self.command.split_first().ok_or(StyleError::EmptyCommand)?;

        debug!(program = %program, input = %request.input.display(), "running tailwind");
        let status = Command::new(program)
            .args(leading)
            .args(Self::arguments(request))
            .current_dir(&request.root)
            .status()
            .map_err(|source| StyleError::Spawn {
                program: program.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(StyleError::Exit {
                program: program.clone(),
                status,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleOutcome {
    /// Disabled, or no entry point imports Tailwind.
    Skipped,
    Compiled { merged_legacy: bool },
    Failed { reason: String },
}

pub struct StylePipeline<'a> {
    paths: &'a ProjectPaths,
    template_extension: &'a str,
    enabled: bool,
    minify: bool,
}

impl<'a> StylePipeline<'a> {
    pub fn new(paths: &'a ProjectPaths, config: &'a Config) -> Self {
        Self {
            paths,
            template_extension: &config.template_extension,
            enabled: config.tailwind.enable,
            minify: config.tailwind.minify,
        }
    }

    /// Candidate entry points, most specific first.
    pub fn candidates(&self) -> Vec<PathBuf> {
        vec![
            self.paths.styles.join("main.css"),
            self.paths.styles.join("styles.css"),
            self.paths.styles.join("tailwind.css"),
            self.paths.root.join("tailwind.css"),
            self.paths.styles.join("index.css"),
        ]
    }

    pub fn find_entry(&self) -> Option<PathBuf> {
        self.candidates().into_iter().find(|path| {
            std::fs::read_to_string(path)
                .map(|css| imports_tailwind(&css))
                .unwrap_or(false)
        })
    }

    pub fn request(&self, input: PathBuf) -> CompileRequest {
        let root = &self.paths.root;
        let templates = relative_to(root, &self.paths.templates);
        let content = relative_to(root, &self.paths.content);
        let output = relative_to(root, &self.paths.output);

        CompileRequest {
            root: root.clone(),
            input,
            output: self.paths.output.join(OUTPUT_FILE),
            minify: self.minify,
            content: vec![
                format!("{templates}/**/*.{}", self.template_extension),
                format!("{content}/**/*.{{md,html}}"),
                format!("{output}/**/*.html"),
            ],
        }
    }

    /// Compile the stylesheet if a Tailwind entry point exists.
    ///
    /// Never returns an error: a failing compiler is reported as
    /// [`StyleOutcome::Failed`] and it is up to the caller whether that
    /// stops anything else.
    pub fn run(&self, compiler: &dyn StyleCompiler) -> StyleOutcome {
        if !self.enabled {
            info!("tailwind disabled, skipping stylesheet");
            return StyleOutcome::Skipped;
        }

        let Some(entry) = self.find_entry() else {
            info!("no tailwind entry point detected, skipping stylesheet");
            return StyleOutcome::Skipped;
        };

        info!(entry = %entry.display(), "compiling tailwind stylesheet");
        let request = self.request(entry);
        if let Err(e) = compiler.compile(&request) {
            error!(error = %e, "tailwind compilation failed");
            return StyleOutcome::Failed {
                reason: e.to_string(),
            };
        }

        match self.merge_legacy(&request.output) {
            Ok(merged_legacy) => StyleOutcome::Compiled { merged_legacy },
            Err(e) => {
                error!(error = %e, "failed to merge legacy stylesheet");
                StyleOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn merge_legacy(&self, compiled_path: &Path) -> Result<bool, StyleError> {
        let legacy_path = self.paths.static_dir.join(LEGACY_FILE);
        if !legacy_path.is_file() {
            return Ok(false);
        }

        let read = |path: &Path| {
            std::fs::read_to_string(path).map_err(|source| StyleError::Io {
                path: path.to_path_buf(),
                source,
            })
        };
        let compiled = read(compiled_path)?;
        let legacy = read(&legacy_path)?;

        std::fs::write(compiled_path, format!("{compiled}{LEGACY_SEPARATOR}{legacy}")).map_err(
            |source| StyleError::Io {
                path: compiled_path.to_path_buf(),
                source,
            },
        )?;
        info!(legacy = %legacy_path.display(), "appended legacy stylesheet");

        Ok(true)
    }
}

pub fn imports_tailwind(css: &str) -> bool {
    TAILWIND_DIRECTIVES.iter().any(|directive| css.contains(directive))
}

fn relative_to(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}
