pub mod assets;
pub mod builder;
pub mod config;
pub mod frontmatter;
pub mod markdown;
pub mod mustache;
pub mod partials;
pub mod scaffold;
pub mod scanner;
pub mod site;
pub mod sitemap;
pub mod styles;
pub mod template;

// Re-export main types
pub use builder::{BuildError, BuildFailure, BuildReport, BuildState, Site, SiteBuilder, build_site};
pub use config::{Config, ProjectPaths};
pub use markdown::{CmarkRenderer, MarkdownRenderer, render_markdown};
pub use partials::PartialRegistry;
pub use scaffold::{ScaffoldReport, scaffold};
pub use site::{ContentRecord, Page};
pub use styles::{StyleCompiler, StyleOutcome, TailwindCli};
pub use template::{RenderContext, TemplateEngine, TemplateError, TemplateResolver, TeraEngine};
