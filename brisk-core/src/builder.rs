use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::assets::{self, AssetError};
use crate::config::{Config, ProjectPaths};
use crate::frontmatter::FrontmatterError;
use crate::markdown::{CmarkRenderer, MarkdownRenderer};
use crate::partials::{PartialError, PartialRegistry};
use crate::scanner::{ContentKind, ContentScanner, ScanError};
use crate::site::ContentRecord;
use crate::sitemap::{Sitemap, SitemapEntry, SitemapError};
use crate::styles::{StyleCompiler, StyleOutcome, StylePipeline, TailwindCli};
use crate::template::{RenderContext, TemplateError, TemplateResolver};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Partials(#[from] PartialError),
    #[error("failed to register partials: {0}")]
    PartialTemplate(#[from] TemplateError),
    #[error(
        "refusing to clean output directory {}: it would remove {}",
        .output.display(),
        .source_dir.display()
    )]
    UnsafeOutput { output: PathBuf, source_dir: PathBuf },
    #[error("failed to prepare output directory {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Assets(#[from] AssetError),
    #[error("stylesheet compilation failed: {0}")]
    Styles(String),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid frontmatter in {path}: {source}")]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: FrontmatterError,
    },
    #[error("{path}: {source}")]
    Render {
        path: PathBuf,
        #[source]
        source: TemplateError,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Sitemap(#[from] SitemapError),
}

/// Progress of a build. Steps run strictly in this order; any failure moves
/// the build to [`BuildState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Start,
    PartialsRegistered,
    OutputCleaned,
    StaticCopied,
    StylesCompiled,
    ContentProcessed,
    SitemapWritten,
    Done,
    Failed,
}

impl BuildState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::PartialsRegistered => "partials-registered",
            Self::OutputCleaned => "output-cleaned",
            Self::StaticCopied => "static-copied",
            Self::StylesCompiled => "styles-compiled",
            Self::ContentProcessed => "content-processed",
            Self::SitemapWritten => "sitemap-written",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A build that stopped early. `reached` is the last state completed.
#[derive(Debug, Error)]
#[error("build failed after {reached}: {error}")]
pub struct BuildFailure {
    pub reached: BuildState,
    #[source]
    pub error: BuildError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Content files written, Markdown and HTML.
    pub pages: usize,
    /// Of which HTML passthrough.
    pub html_pages: usize,
    pub assets: usize,
    pub styles: StyleOutcome,
    pub sitemap_urls: usize,
    pub duration_ms: u128,
}

pub struct SiteBuilder {
    config: Config,
    project_root: PathBuf,
    today: Option<NaiveDate>,
    markdown: Option<Box<dyn MarkdownRenderer>>,
    styles: Option<Box<dyn StyleCompiler>>,
}

impl SiteBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            project_root: PathBuf::from("."),
            today: None,
            markdown: None,
            styles: None,
        }
    }

    pub fn project_root<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.project_root = path.as_ref().to_path_buf();
        self
    }

    /// Date recorded in the sitemap for pages without a `date` field.
    /// Defaults to the local date when the site is built.
    pub fn today(mut self, date: NaiveDate) -> Self {
        self.today = Some(date);
        self
    }

    pub fn markdown_renderer<R: MarkdownRenderer + 'static>(mut self, renderer: R) -> Self {
        self.markdown = Some(Box::new(renderer));
        self
    }

    pub fn style_compiler<C: StyleCompiler + 'static>(mut self, compiler: C) -> Self {
        self.styles = Some(Box::new(compiler));
        self
    }

    pub fn build(self) -> Site {
        let paths = self.config.project_paths(&self.project_root);
        let markdown: Box<dyn MarkdownRenderer> = match self.markdown {
            Some(renderer) => renderer,
            None => Box::new(CmarkRenderer::new(
                self.config.highlight_code,
                self.config.syntax_theme.clone(),
            )),
        };
        let styles: Box<dyn StyleCompiler> = match self.styles {
            Some(compiler) => compiler,
            None => Box::new(TailwindCli::new(self.config.tailwind.command.clone())),
        };

        Site {
            today: self.today.unwrap_or_else(|| chrono::Local::now().date_naive()),
            config: self.config,
            paths,
            markdown,
            styles,
            state: BuildState::Start,
        }
    }
}

pub struct Site {
    config: Config,
    paths: ProjectPaths,
    today: NaiveDate,
    markdown: Box<dyn MarkdownRenderer>,
    styles: Box<dyn StyleCompiler>,
    state: BuildState,
}

impl Site {
    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn paths(&self) -> &ProjectPaths {
        &self.paths
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run every build step from a clean output directory.
    pub fn render_all(&mut self) -> Result<BuildReport, BuildFailure> {
        let started = Instant::now();
        self.state = BuildState::Start;

        match self.run(started) {
            Ok(report) => Ok(report),
            Err(error) => {
                let reached = self.state;
                self.state = BuildState::Failed;
                error!(state = %reached, error = %error, "build failed");
                Err(BuildFailure { reached, error })
            }
        }
    }

    fn advance(&mut self, state: BuildState) {
        debug!(from = %self.state, to = %state, "build state");
        self.state = state;
    }

    fn run(&mut self, started: Instant) -> Result<BuildReport, BuildError> {
        let extension = self.config.template_extension.clone();

        let mut partials = PartialRegistry::new();
        partials.scan(&self.paths.partials, &extension)?;
        let mut resolver = TemplateResolver::tera(&self.paths.templates, &extension);
        resolver.register_partials(&partials)?;
        info!(count = partials.len(), "partials registered");
        self.advance(BuildState::PartialsRegistered);

        self.clean_output()?;
        self.advance(BuildState::OutputCleaned);

        let assets = assets::copy_static(&self.paths.static_dir, &self.paths.output)?;
        self.advance(BuildState::StaticCopied);

        let styles = StylePipeline::new(&self.paths, &self.config).run(&*self.styles);
        if let StyleOutcome::Failed { reason } = &styles {
            return Err(BuildError::Styles(reason.clone()));
        }
        self.advance(BuildState::StylesCompiled);

        let mut sitemap = Sitemap::new();
        let (pages, html_pages) = self.process_content(&mut resolver, &mut sitemap)?;
        info!(pages, "content processed");
        self.advance(BuildState::ContentProcessed);

        if let Some(path) = sitemap.write(&self.paths.output, &self.config.base_url)? {
            info!(urls = sitemap.len(), path = %path.display(), "sitemap written");
        }
        self.advance(BuildState::SitemapWritten);

        self.advance(BuildState::Done);
        Ok(BuildReport {
            pages,
            html_pages,
            assets,
            styles,
            sitemap_urls: sitemap.len(),
            duration_ms: started.elapsed().as_millis(),
        })
    }

    fn clean_output(&self) -> Result<(), BuildError> {
        let output = &self.paths.output;
        let paths = &self.paths;
        // The output may not be the project, an ancestor of it, or hold sources
        let protected = [
            &paths.root,
            &paths.content,
            &paths.templates,
            &paths.partials,
            &paths.static_dir,
            &paths.styles,
        ];
        if let Some(dir) = protected.into_iter().find(|dir| dir.starts_with(output)) {
            return Err(BuildError::UnsafeOutput {
                output: output.clone(),
                source_dir: dir.clone(),
            });
        }

        let io_err = |source| BuildError::Output {
            path: output.clone(),
            source,
        };
        if output.exists() {
            fs::remove_dir_all(output).map_err(io_err)?;
        }
        fs::create_dir_all(output).map_err(io_err)?;

        debug!(dir = %output.display(), "output directory cleaned");
        Ok(())
    }

    /// Render or copy every content file and record it in the sitemap.
    /// Returns (pages written, of which HTML).
    fn process_content(
        &self,
        resolver: &mut TemplateResolver,
        sitemap: &mut Sitemap,
    ) -> Result<(usize, usize), BuildError> {
        let files = ContentScanner::new(&self.paths.content).scan()?;
        let mut html_pages = 0;

        for file in &files {
            let text = fs::read_to_string(&file.path).map_err(|source| BuildError::Read {
                path: file.path.clone(),
                source,
            })?;
            let record =
                ContentRecord::parse(file, text).map_err(|source| BuildError::Frontmatter {
                    path: file.path.clone(),
                    source,
                })?;

            let html = match file.kind {
                ContentKind::Markdown => {
                    let content = self.markdown.render(&record.body);
                    let context = RenderContext::from_page(&record.frontmatter, &content);
                    resolver
                        .render(record.template_name(), &context)
                        .map_err(|source| BuildError::Render {
                            path: file.path.clone(),
                            source,
                        })?
                }
                ContentKind::Html => {
                    html_pages += 1;
                    record.body.clone()
                }
            };

            let out_path = self.paths.output.join(record.page.out_path());
            write_file(&out_path, &html)?;
            info!(page = %record.page.out_path().display(), "wrote page");

            sitemap.push(SitemapEntry {
                url: record.page.sitemap_url(self.config.clean_urls),
                last_modified: self.last_modified(&record),
                priority: record.page.priority(),
            });
        }

        Ok((files.len(), html_pages))
    }

    fn last_modified(&self, record: &ContentRecord) -> NaiveDate {
        if let Some(date) = record.date() {
            return date;
        }
        if let Some(raw) = record.frontmatter.get("date") {
            warn!(
                file = %record.page.path.display(),
                date = %raw,
                "unrecognized date, using the build date"
            );
        }
        self.today
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), BuildError> {
    let io_err = |source| BuildError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(path, contents).map_err(io_err)
}

/// Build the project at `root` with the default Markdown renderer and
/// Tailwind CLI.
pub fn build_site<P: AsRef<Path>>(config: Config, root: P) -> Result<BuildReport, BuildFailure> {
    SiteBuilder::new(config).project_root(root).build().render_all()
}
